//! Story format registry and load-state tracking.
//!
//! # Responsibility
//! - Register story formats by `(name, version)` after validation.
//! - Track each format's load lifecycle and hold its editor extensions once
//!   loaded.
//!
//! # Invariants
//! - Format versions are `major.minor.patch` triplets.
//! - `(name, version)` is unique within a registry.
//! - Extensions are exposed only for `Loaded` formats that the user has not
//!   disabled.

use crate::config::{EditorConfig, FormatRef};
use crate::extension::hooks::FormatExtensions;
use log::{info, warn};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::rc::Rc;
use uuid::Uuid;

/// Load lifecycle of a story format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Unloaded,
    Loading,
    Loaded,
    Error,
}

impl LoadState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unloaded => "unloaded",
            Self::Loading => "loading",
            Self::Loaded => "loaded",
            Self::Error => "error",
        }
    }
}

/// Registered story format snapshot.
#[derive(Debug, Clone)]
pub struct StoryFormat {
    pub id: Uuid,
    pub name: String,
    pub version: String,
    pub load_state: LoadState,
    pub load_error: Option<String>,
    pub extensions: Option<Rc<FormatExtensions>>,
}

impl StoryFormat {
    /// Validates declaration-level invariants.
    pub fn validate(&self) -> Result<(), FormatError> {
        if self.name.trim().is_empty() {
            return Err(FormatError::EmptyName);
        }
        if !is_semver_triplet(self.version.trim()) {
            return Err(FormatError::InvalidVersion(self.version.clone()));
        }
        Ok(())
    }
}

/// Syntax-mode name for a format: lowercased name plus major version.
pub fn namespace_for_format(name: &str, version: &str) -> String {
    let major = version.split('.').next().unwrap_or_default();
    format!("{}-{}", name.to_lowercase(), major)
}

/// In-process story format registry.
#[derive(Debug, Default)]
pub struct FormatRegistry {
    formats: BTreeMap<FormatRef, StoryFormat>,
}

impl FormatRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an unloaded format.
    pub fn register(&mut self, name: &str, version: &str) -> Result<(), FormatError> {
        let format = StoryFormat {
            id: Uuid::new_v4(),
            name: name.trim().to_string(),
            version: version.trim().to_string(),
            load_state: LoadState::Unloaded,
            load_error: None,
            extensions: None,
        };
        format.validate()?;

        let key = FormatRef::new(format.name.clone(), format.version.clone());
        if self.formats.contains_key(&key) {
            return Err(FormatError::Duplicate(key));
        }
        self.formats.insert(key, format);
        Ok(())
    }

    pub fn format_with_name_and_version(
        &self,
        name: &str,
        version: &str,
    ) -> Result<&StoryFormat, FormatError> {
        self.formats
            .get(&FormatRef::new(name, version))
            .ok_or_else(|| FormatError::NotFound(FormatRef::new(name, version)))
    }

    /// Moves an unloaded format to `Loading`.
    ///
    /// Returns `true` when the caller should start fetching the format, and
    /// `false` when a load is in flight or already settled.
    pub fn begin_load(&mut self, name: &str, version: &str) -> Result<bool, FormatError> {
        let format = self.format_mut(name, version)?;
        if format.load_state != LoadState::Unloaded {
            return Ok(false);
        }
        format.load_state = LoadState::Loading;
        Ok(true)
    }

    /// Settles a `Loading` format with its extensions or a load error.
    pub fn finish_load(
        &mut self,
        name: &str,
        version: &str,
        result: Result<FormatExtensions, String>,
    ) -> Result<(), FormatError> {
        let format = self.format_mut(name, version)?;
        if format.load_state != LoadState::Loading {
            return Err(FormatError::NotLoading {
                format: FormatRef::new(name, version),
                state: format.load_state,
            });
        }

        match result {
            Ok(extensions) => {
                format.load_state = LoadState::Loaded;
                format.load_error = None;
                format.extensions = Some(Rc::new(extensions));
                info!(
                    "event=format_loaded module=extension status=ok format={} version={}",
                    format.name, format.version
                );
            }
            Err(message) => {
                warn!(
                    "event=format_loaded module=extension status=error format={} version={}",
                    format.name, format.version
                );
                format.load_state = LoadState::Error;
                format.load_error = Some(message);
                format.extensions = None;
            }
        }
        Ok(())
    }

    /// Extensions of a loaded format, unless disabled by preference.
    pub fn editor_extensions(
        &self,
        name: &str,
        version: &str,
        config: &EditorConfig,
    ) -> Option<Rc<FormatExtensions>> {
        if config.extensions_disabled(name, version) {
            return None;
        }
        let format = self.format_with_name_and_version(name, version).ok()?;
        if format.load_state != LoadState::Loaded {
            return None;
        }
        format.extensions.clone()
    }

    pub fn len(&self) -> usize {
        self.formats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formats.is_empty()
    }

    fn format_mut(&mut self, name: &str, version: &str) -> Result<&mut StoryFormat, FormatError> {
        self.formats
            .get_mut(&FormatRef::new(name, version))
            .ok_or_else(|| FormatError::NotFound(FormatRef::new(name, version)))
    }
}

fn is_semver_triplet(value: &str) -> bool {
    let parts: Vec<&str> = value.split('.').collect();
    if parts.len() != 3 {
        return false;
    }
    parts
        .iter()
        .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()))
}

/// Format registry errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    EmptyName,
    InvalidVersion(String),
    Duplicate(FormatRef),
    NotFound(FormatRef),
    NotLoading { format: FormatRef, state: LoadState },
}

impl Display for FormatError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "story format name must not be empty"),
            Self::InvalidVersion(value) => write!(
                f,
                "story format version is invalid: {value} (expected major.minor.patch)"
            ),
            Self::Duplicate(format) => write!(
                f,
                "story format already registered: {} {}",
                format.name, format.version
            ),
            Self::NotFound(format) => {
                write!(f, "story format not found: {} {}", format.name, format.version)
            }
            Self::NotLoading { format, state } => write!(
                f,
                "story format {} {} is {}, not loading",
                format.name,
                format.version,
                state.as_str()
            ),
        }
    }
}

impl Error for FormatError {}
