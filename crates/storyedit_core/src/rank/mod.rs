//! Candidate ranking for completion lists.
//!
//! # Responsibility
//! - Own the single string-similarity metric and confidence filter used by
//!   passage-name, command and variable completion.

pub mod similarity;
