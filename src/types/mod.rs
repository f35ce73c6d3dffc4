pub mod quote;

pub use quote::{Quote, RankedQuote};

/// Symbols ordered by rank; index 0 is rank 1.
pub type RankedList = Vec<String>;
