//! Passage editing session.
//!
//! # Responsibility
//! - Tie the surface, markers, change pipeline, completion and format
//!   extensions together for one open passage.
//! - Contain surface crashes with a two-strike policy.

pub mod health;
pub mod passage_edit;
