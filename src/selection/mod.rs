//! Evidence pooling and response selection.
//!
//! The pool sums retrieval scores with any inhibition signal; the choice
//! component turns the pooled scores into a single winning chunk or nil.

pub mod choice;
pub mod pool;

pub use choice::{select, softmax, Choice, ChoiceStats, Selection, SelectionPolicy};
pub use pool::{Pool, Transform};
