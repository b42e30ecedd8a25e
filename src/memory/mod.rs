//! Associative chunk memory.
//!
//! - **Chunk**: named, immutable weighted bindings over features and other chunks
//! - **AssociativeStore**: compiled chunks with bottom-up (cue → chunk) and
//!   top-down (chunk → bindings) propagation

pub mod chunk;
pub mod store;

pub use chunk::{Chunk, ChunkBuilder, Term};
pub use store::{ks_crawl, AssociativeStore};
