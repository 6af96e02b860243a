//! Editor-extension hooks a story format may supply.
//!
//! # Responsibility
//! - Define the hook signatures the editor calls into (mode, toolbar,
//!   commands, reference parser, variable hooks).
//! - Define the toolbar item snapshot and its JSON form.
//!
//! # Invariants
//! - Every hook returns `Result<_, ExtensionError>`; hooks are only ever
//!   invoked through `ExtensionGuard`, which also absorbs panics.

use crate::extension::guard::{ExtensionGuard, HookKind};
use crate::extension::registry::namespace_for_format;
use crate::surface::{EditorMode, EditorSurface};
use crate::variables::index::ParsedToken;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::rc::Rc;

/// Failure reported by format-supplied code.
#[derive(Debug)]
pub enum ExtensionError {
    /// Hook reported a failure of its own.
    Failed(String),
    /// Hook produced output that does not decode.
    InvalidPayload(serde_json::Error),
}

impl ExtensionError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

impl Display for ExtensionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Failed(message) => write!(f, "extension failed: {message}"),
            Self::InvalidPayload(err) => write!(f, "extension returned invalid payload: {err}"),
        }
    }
}

impl Error for ExtensionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Failed(_) => None,
            Self::InvalidPayload(err) => Some(err),
        }
    }
}

impl From<serde_json::Error> for ExtensionError {
    fn from(value: serde_json::Error) -> Self {
        Self::InvalidPayload(value)
    }
}

/// Environment handed to toolbar factories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolbarContext {
    pub app_theme: String,
    pub foreground_color: String,
    pub locale: String,
}

/// Clickable toolbar button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolbarButton {
    pub command: String,
    pub label: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub icon_only: bool,
    #[serde(default)]
    pub disabled: bool,
}

/// Entry nested inside a toolbar menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolbarMenuEntry {
    Button(ToolbarButton),
    Separator,
}

/// Drop-down toolbar menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolbarMenu {
    pub label: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub icon_only: bool,
    #[serde(default)]
    pub disabled: bool,
    pub items: Vec<ToolbarMenuEntry>,
}

/// Top-level toolbar item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolbarItem {
    Button(ToolbarButton),
    Menu(ToolbarMenu),
    Separator,
}

impl ToolbarItem {
    /// Decodes a toolbar snapshot from the JSON form formats emit.
    pub fn list_from_json(json: &str) -> Result<Vec<ToolbarItem>, ExtensionError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Buttons of `items` with menus expanded and separators dropped.
pub fn flatten_buttons(items: &[ToolbarItem]) -> Vec<&ToolbarButton> {
    let mut buttons = Vec::new();
    for item in items {
        match item {
            ToolbarItem::Button(button) => buttons.push(button),
            ToolbarItem::Menu(menu) => {
                buttons.extend(menu.items.iter().filter_map(|entry| match entry {
                    ToolbarMenuEntry::Button(button) => Some(button),
                    ToolbarMenuEntry::Separator => None,
                }));
            }
            ToolbarItem::Separator => {}
        }
    }
    buttons
}

pub type ModeFactory = Rc<dyn Fn() -> Result<EditorMode, ExtensionError>>;
pub type ToolbarFactory =
    Rc<dyn Fn(&dyn EditorSurface, &ToolbarContext) -> Result<Vec<ToolbarItem>, ExtensionError>>;
pub type CommandHandler = Rc<dyn Fn(&mut dyn EditorSurface) -> Result<(), ExtensionError>>;
pub type ReferenceParser = Rc<dyn Fn(&str) -> Result<Vec<String>, ExtensionError>>;
pub type DefinitionParser = Rc<dyn Fn(&str) -> Result<Vec<ParsedToken>, ExtensionError>>;
/// Receives every candidate name and the typed query; returns the ordering.
pub type NameSuggester = Rc<dyn Fn(&[String], &str) -> Result<Vec<String>, ExtensionError>>;

/// Variable-related hooks.
#[derive(Clone)]
pub struct VariableHooks {
    /// Names the format keeps for itself; never offered after `@`.
    pub reserved_words: Vec<String>,
    /// Pattern a typed `@name` must match; `^\w+$` when absent.
    pub valid_name_pattern: Option<Regex>,
    pub suggest_variable_name: Option<NameSuggester>,
    pub parse_definitions: DefinitionParser,
}

impl VariableHooks {
    pub fn new(parse_definitions: DefinitionParser) -> Self {
        Self {
            reserved_words: Vec::new(),
            valid_name_pattern: None,
            suggest_variable_name: None,
            parse_definitions,
        }
    }
}

/// Everything a loaded format contributes to the editor.
#[derive(Clone, Default)]
pub struct FormatExtensions {
    pub mode: Option<ModeFactory>,
    pub toolbar: Option<ToolbarFactory>,
    pub commands: BTreeMap<String, CommandHandler>,
    pub references: Option<ReferenceParser>,
    pub variables: Option<VariableHooks>,
}

impl FormatExtensions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mut self, factory: ModeFactory) -> Self {
        self.mode = Some(factory);
        self
    }

    pub fn with_toolbar(mut self, factory: ToolbarFactory) -> Self {
        self.toolbar = Some(factory);
        self
    }

    pub fn with_command(mut self, name: impl Into<String>, handler: CommandHandler) -> Self {
        self.commands.insert(name.into(), handler);
        self
    }

    pub fn with_references(mut self, parser: ReferenceParser) -> Self {
        self.references = Some(parser);
        self
    }

    pub fn with_variables(mut self, hooks: VariableHooks) -> Self {
        self.variables = Some(hooks);
        self
    }

    /// Passage names referenced by `text` outside link syntax.
    ///
    /// Empty when the format has no reference parser or the parser fails.
    pub fn parse_references(&self, guard: &ExtensionGuard, text: &str) -> Vec<String> {
        match &self.references {
            Some(parser) => guard.call_or(HookKind::References, Vec::new(), || parser(text)),
            None => Vec::new(),
        }
    }

    /// Builds the format's syntax mode and defines it on `surface`.
    ///
    /// Returns the mode name, or `None` when the format has no mode or the
    /// factory fails.
    pub fn register_mode(
        &self,
        guard: &ExtensionGuard,
        surface: &mut dyn EditorSurface,
    ) -> Option<String> {
        let factory = self.mode.as_ref()?;
        let mode = guard.call(HookKind::Mode, || factory()).ok()?;
        let name = namespace_for_format(guard.format_name(), guard.format_version());
        surface.define_mode(&name, mode);
        Some(name)
    }
}

impl std::fmt::Debug for FormatExtensions {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormatExtensions")
            .field("mode", &self.mode.is_some())
            .field("toolbar", &self.toolbar.is_some())
            .field("commands", &self.commands.keys().collect::<Vec<_>>())
            .field("references", &self.references.is_some())
            .field("variables", &self.variables.is_some())
            .finish()
    }
}
