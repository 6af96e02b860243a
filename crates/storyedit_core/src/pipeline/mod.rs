//! Local-first text pipeline.
//!
//! The surface sees every keystroke at once; the story store sees the text
//! after a quiet period.

pub mod debounce;
