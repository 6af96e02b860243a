//! Story variables discovered by the format's variable parser.

pub mod index;
pub mod tracker;
