//! Live annotation and autocomplete engine for a hyperlinked-passage story
//! editor.
//!
//! The crate owns the editor-side invariants: marker reconciliation for
//! links and placeholders, the debounced commit of passage text, prefix
//! completion, the per-session variable index and story format fault
//! isolation. Rendering and keystroke handling stay with the host surface.

pub mod completion;
pub mod config;
pub mod extension;
pub mod logging;
pub mod markers;
pub mod model;
pub mod pipeline;
pub mod rank;
pub mod session;
pub mod surface;
pub mod variables;

pub use completion::{CompletionAction, CompletionItem, CompletionKind, CompletionList};
pub use config::{AppTheme, ConfigError, EditorConfig, FormatRef};
pub use extension::guard::{ExtensionFault, ExtensionGuard, HookKind};
pub use extension::hooks::{
    ExtensionError, FormatExtensions, ToolbarButton, ToolbarContext, ToolbarItem, VariableHooks,
};
pub use extension::registry::{FormatError, FormatRegistry, LoadState, StoryFormat};
pub use logging::{default_log_level, init_logging, logging_status, LogSettings};
pub use model::passage::{Passage, PassageId, PassageUpdate, Story, StoryId};
pub use model::store::{MemoryStoryStore, StoryStore};
pub use rank::similarity::{jaro_winkler, rank};
pub use session::health::{EditorHealth, RenderState};
pub use session::passage_edit::{PassageEditSession, SessionError, SessionEvent};
pub use surface::memory::MemorySurface;
pub use surface::{EditorSurface, SelectionRange, SurfaceError, TextPosition, TextRange};
pub use variables::index::{VariableIndex, VariableIndexError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
