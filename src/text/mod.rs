//! Text Module
//!
//! Stopwords and the free-text tokenizer that feed terms to lookups.

mod stopwords;
mod tokenize;

pub use stopwords::Stopwords;
pub use tokenize::{tokenize, try_tokenize};
