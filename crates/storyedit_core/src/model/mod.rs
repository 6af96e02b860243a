//! Story domain model consumed by the editor core.
//!
//! # Responsibility
//! - Define passages, stories and the store contract used to read and
//!   mutate them.
//!
//! # Invariants
//! - Passage identity (`PassageId`) is stable across edits; revisions are
//!   distinguished by `Rc` pointer.

pub mod passage;
pub mod store;
