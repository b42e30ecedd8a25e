//! Runtime module: drives participants through discrete events.
//!
//! This module provides:
//! - Event queue ordered by time, priority and enqueue order
//! - Participant agent (store + pool + choice) and its phase machine

pub mod participant;
pub mod scheduler;

pub use participant::{transition, CueRoute, Participant, ParticipantConfig, Phase};
pub use scheduler::{Event, EventKind, Priority, Scheduler};
