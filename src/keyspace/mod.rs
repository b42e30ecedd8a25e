//! Keyspace and activation vectors.
//!
//! - **Family / Dimension / Atom**: the typed, immutable address scheme
//! - **Feature**: a `dim ** val` binding between two atoms
//! - **ActivationVector**: sparse weights over features and chunk identities

pub mod activation;
pub mod family;

pub use activation::{ActivationVector, Combine, Feature, Key};
pub use family::{Atom, Dimension, Family, KeySpace};
