//! # CHUNKRECALL
//!
//! Weighted associative chunk memory for simulating human serial recall.
//!
//! ## Components
//!
//! 1. **Keyspace**: family tree of dimensions and atoms; sparse activation vectors
//! 2. **Chunks**: named weighted bundles of feature bindings and chunk references
//! 3. **Associative store**: compiles chunks into bottom-up / top-down weights
//! 4. **Pool & choice**: evidence combination, inhibition and response selection
//! 5. **Runtime**: discrete-event scheduler and the participant agent
//! 6. **Experiment**: digit-list stimuli, recall sessions, scoring, batch runs
//!
//! ## Flow
//!
//! - cue → (top-down reinstatement) → bottom-up scores → pool ⊕ −inhibition → choice
//! - every winner is fed back as context and inhibited until nil is selected

pub mod error;
pub mod experiment;
pub mod keyspace;
pub mod memory;
pub mod runtime;
pub mod selection;

pub use error::{RecallError, Result};

/// Model-wide constants.
pub mod config {
    /// Reserved name of the empty selection.
    pub const NIL_CHUNK: &str = "nil";

    /// Default selection noise scale.
    pub const DEFAULT_SD: f64 = 1e-3;

    /// Digits per group chunk.
    pub const DEFAULT_GROUP_SIZE: usize = 3;

    /// Default participant RNG seed.
    pub const DEFAULT_SEED: u64 = 42;

    /// Inhibition gain that fully cancels a chunk's retrieval score.
    pub const DEFAULT_INHIBITION_GAIN: f64 = 1.0;

    /// Pool source carrying bottom-up retrieval scores.
    pub const BOTTOM_UP_SOURCE: &str = "store.bu";

    /// Pool source carrying the (negated) inhibition signal.
    pub const INHIBITION_SOURCE: &str = "inhibition";
}
