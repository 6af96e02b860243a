//! Two-strike crash policy for the editing surface.
//!
//! # Invariants
//! - The first crash disables format extensions; the second is terminal.
//! - `Crashed` never recovers within a session.

use log::error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditorHealth {
    #[default]
    Full,
    ExtensionsDisabled,
    Crashed,
}

impl EditorHealth {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::ExtensionsDisabled => "extensions_disabled",
            Self::Crashed => "crashed",
        }
    }

    /// State after one more surface crash.
    pub fn after_crash(self) -> Self {
        let next = match self {
            Self::Full => Self::ExtensionsDisabled,
            Self::ExtensionsDisabled | Self::Crashed => Self::Crashed,
        };
        error!(
            "event=editor_crash module=session status=error from={} to={}",
            self.as_str(),
            next.as_str()
        );
        next
    }

    pub fn extensions_enabled(self) -> bool {
        self == Self::Full
    }
}

/// What the host should render for the passage text area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderState {
    Editor {
        extensions_enabled: bool,
        mode_name: String,
    },
    /// Terminal error message in place of the editor.
    Crashed { message: String },
}
