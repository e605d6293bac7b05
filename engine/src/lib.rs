//! Source phrase filtering for translation-model extraction.
//!
//! A [`FilterIndex`] collects the source phrases of a corpus (contiguous
//! spans plus, optionally, discontinuous phrases with up to `max_gaps` gaps)
//! or of an explicit list, and answers whether a phrase belongs to the
//! current extraction shard.

pub mod config;
pub mod corpus;
mod error;
pub mod filter;
pub mod gaps;
pub mod spans;
pub mod term_map;

pub use config::FilterConfig;
pub use error::{Error, Result};
pub use filter::{FilterIndex, Progress};
pub use storage::{DynamicIndex, PhraseKey, SequenceIndex, TrieIndex};
