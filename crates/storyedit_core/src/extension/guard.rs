//! Fault isolation around format-supplied code.
//!
//! # Responsibility
//! - Run every format hook behind one call wrapper that turns errors and
//!   panics into `ExtensionFault` values.
//! - Log each fault with the format name/version and hook kind.
//!
//! # Invariants
//! - A hook failure never unwinds past `ExtensionGuard::call`.
//! - Fault messages are sanitized and length-capped before logging.

use crate::extension::hooks::ExtensionError;
use crate::logging::{panic_payload_summary, sanitize_message, MAX_PANIC_PAYLOAD_CHARS};
use log::warn;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Integration point a hook is called from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    Mode,
    Toolbar,
    Command,
    References,
    ParseDefinitions,
    SuggestVariableName,
}

impl HookKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mode => "mode",
            Self::Toolbar => "toolbar",
            Self::Command => "command",
            Self::References => "references",
            Self::ParseDefinitions => "parse_definitions",
            Self::SuggestVariableName => "suggest_variable_name",
        }
    }
}

/// What went wrong inside a hook.
#[derive(Debug)]
pub enum FaultCause {
    Error(ExtensionError),
    Panic(String),
}

/// A contained hook failure.
#[derive(Debug)]
pub struct ExtensionFault {
    pub format_name: String,
    pub format_version: String,
    pub hook: HookKind,
    pub cause: FaultCause,
}

impl Display for ExtensionFault {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} {} hook ",
            self.format_name,
            self.format_version,
            self.hook.as_str()
        )?;
        match &self.cause {
            FaultCause::Error(err) => write!(f, "failed: {err}"),
            FaultCause::Panic(message) => write!(f, "panicked: {message}"),
        }
    }
}

impl Error for ExtensionFault {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.cause {
            FaultCause::Error(err) => Some(err),
            FaultCause::Panic(_) => None,
        }
    }
}

/// Call wrapper scoped to one story format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionGuard {
    format_name: String,
    format_version: String,
}

impl ExtensionGuard {
    pub fn new(format_name: impl Into<String>, format_version: impl Into<String>) -> Self {
        Self {
            format_name: format_name.into(),
            format_version: format_version.into(),
        }
    }

    pub fn format_name(&self) -> &str {
        &self.format_name
    }

    pub fn format_version(&self) -> &str {
        &self.format_version
    }

    /// Runs `hook_fn`, containing both returned errors and panics.
    pub fn call<T>(
        &self,
        hook: HookKind,
        hook_fn: impl FnOnce() -> Result<T, ExtensionError>,
    ) -> Result<T, ExtensionFault> {
        let cause = match catch_unwind(AssertUnwindSafe(hook_fn)) {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(err)) => FaultCause::Error(err),
            Err(payload) => FaultCause::Panic(panic_payload_summary(payload.as_ref())),
        };

        let fault = ExtensionFault {
            format_name: self.format_name.clone(),
            format_version: self.format_version.clone(),
            hook,
            cause,
        };
        warn!(
            "event=extension_fault module=extension status=error format={} version={} hook={} panic={} detail={}",
            self.format_name,
            self.format_version,
            hook.as_str(),
            matches!(fault.cause, FaultCause::Panic(_)),
            sanitize_message(&fault.to_string(), MAX_PANIC_PAYLOAD_CHARS)
        );
        Err(fault)
    }

    /// Like `call`, substituting `fallback` on failure.
    pub fn call_or<T>(
        &self,
        hook: HookKind,
        fallback: T,
        hook_fn: impl FnOnce() -> Result<T, ExtensionError>,
    ) -> T {
        self.call(hook, hook_fn).unwrap_or(fallback)
    }
}
