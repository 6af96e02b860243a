//! Story format extensions.
//!
//! Formats contribute editor hooks (syntax mode, toolbar, commands, variable
//! and reference parsers). This module registers formats, tracks their load
//! state and runs every hook behind a fault-isolating guard.

pub mod guard;
pub mod hooks;
pub mod registry;
