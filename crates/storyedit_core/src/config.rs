//! Editor preferences consumed by the core.
//!
//! # Responsibility
//! - Hold the user/host preferences that shape editing behavior.
//! - Decode them from JSON with every field defaulted, then validate.
//!
//! # Invariants
//! - A validated config has a positive debounce interval, a compilable
//!   variable-name pattern and a non-empty locale.

use crate::surface::events::Modifier;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const DEFAULT_DEBOUNCE_MS: u64 = 1000;
pub const DEFAULT_VARIABLE_NAME_PATTERN: &str = r"^\w+$";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppTheme {
    #[default]
    Light,
    Dark,
}

impl AppTheme {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }
}

/// Story format addressed by name and version.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FormatRef {
    pub name: String,
    pub version: String,
}

impl FormatRef {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

/// Preferences for one editing session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Quiet period before a local edit is committed to the story.
    pub debounce_ms: u64,
    /// Modifier that turns passage links into open-passage buttons.
    pub link_modifier: Modifier,
    /// `@name` pattern used when the format does not supply one.
    pub variable_name_pattern: String,
    pub locale: String,
    pub app_theme: AppTheme,
    pub foreground_color: String,
    /// Formats whose editor extensions the user switched off.
    pub disabled_format_extensions: Vec<FormatRef>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            link_modifier: Modifier::Alt,
            variable_name_pattern: DEFAULT_VARIABLE_NAME_PATTERN.to_string(),
            locale: "en-US".to_string(),
            app_theme: AppTheme::Light,
            foreground_color: "#000000".to_string(),
            disabled_format_extensions: Vec::new(),
        }
    }
}

impl EditorConfig {
    /// Decodes and validates a JSON preferences object.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.debounce_ms == 0 {
            return Err(ConfigError::InvalidDebounce(self.debounce_ms));
        }
        if self.locale.trim().is_empty() {
            return Err(ConfigError::EmptyLocale);
        }
        self.variable_name_regex()?;
        Ok(())
    }

    pub fn variable_name_regex(&self) -> Result<Regex, ConfigError> {
        Regex::new(&self.variable_name_pattern).map_err(|source| ConfigError::InvalidPattern {
            pattern: self.variable_name_pattern.clone(),
            source,
        })
    }

    pub fn extensions_disabled(&self, name: &str, version: &str) -> bool {
        self.disabled_format_extensions
            .iter()
            .any(|format| format.name == name && format.version == version)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Parse(serde_json::Error),
    InvalidDebounce(u64),
    InvalidPattern {
        pattern: String,
        source: regex::Error,
    },
    EmptyLocale,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "invalid editor config: {err}"),
            Self::InvalidDebounce(value) => {
                write!(f, "debounce_ms must be positive, got {value}")
            }
            Self::InvalidPattern { pattern, .. } => {
                write!(f, "variable_name_pattern does not compile: {pattern}")
            }
            Self::EmptyLocale => write!(f, "locale must not be empty"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            Self::InvalidPattern { source, .. } => Some(source),
            Self::InvalidDebounce(_) | Self::EmptyLocale => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}
