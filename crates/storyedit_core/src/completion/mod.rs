//! Prefix-triggered completion.
//!
//! # Responsibility
//! - Detect which completion a keystroke triggers (`[[`, `->`, `/`, `@`).
//! - Build completion lists from the link, command and variable providers.
//! - Apply a picked entry to the surface.
//!
//! # Invariants
//! - Only single-range selections trigger completion.
//! - Exactly one provider answers a trigger: `/` at column 1 → command,
//!   `@` → variable, anything else → link. `/` elsewhere offers nothing.

pub mod command;
pub mod link;
pub mod variable;

use crate::extension::hooks::ToolbarItem;
use crate::model::passage::{PassageId, Story};
use crate::surface::{EditorSurface, TextPosition, TextRange};
use crate::variables::index::VariableIndexError;
use crate::variables::tracker::VariableTracker;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Registered trigger prefixes, in priority order.
pub const PREFIXES: [&str; 4] = ["[[", "->", "/", "@"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionKind {
    Link,
    Command,
    Variable,
}

impl CompletionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Link => "link",
            Self::Command => "command",
            Self::Variable => "variable",
        }
    }
}

/// What picking an entry does beyond replacing `from..to` with its text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionAction {
    /// Replace the query with the entry text.
    Insert,
    /// Replace the query, then close the link with `]] ` unless it already was.
    InsertLink { closed: bool },
    /// Delete the typed command word, then run `command`.
    RunCommand {
        command: String,
        consume_slash: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionItem {
    pub text: String,
    pub action: CompletionAction,
}

/// Completion popup contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionList {
    pub kind: CompletionKind,
    pub from: TextPosition,
    pub to: TextPosition,
    pub items: Vec<CompletionItem>,
}

impl CompletionList {
    pub fn range(&self) -> TextRange {
        TextRange::new(self.from, self.to)
    }

    pub fn labels(&self) -> Vec<String> {
        self.items.iter().map(|item| item.text.clone()).collect()
    }
}

/// Inputs the providers read from.
pub struct CompletionContext<'a> {
    pub story: &'a Story,
    pub passage_id: PassageId,
    pub toolbar: &'a [ToolbarItem],
    /// `None` when the format has no variable support.
    pub variables: Option<&'a VariableTracker>,
    /// Valid-name pattern used when the format does not supply one.
    pub default_name_pattern: &'a Regex,
}

/// Which prefix, if any, ends right before the cursor.
pub fn detect_prefix(surface: &dyn EditorSurface) -> Option<&'static str> {
    let selections = surface.selections();
    let [selection] = selections.as_slice() else {
        return None;
    };
    let cursor = selection.head;
    let line = surface.line(cursor.line)?;
    let preceding: String = line.chars().take(cursor.ch).collect();
    PREFIXES
        .into_iter()
        .find(|prefix| preceding.ends_with(prefix))
}

/// Provider a detected prefix hands off to.
pub fn classify(prefix: &str, cursor: TextPosition) -> Option<CompletionKind> {
    match prefix {
        "/" if cursor.ch == 1 => Some(CompletionKind::Command),
        "/" => None,
        "@" => Some(CompletionKind::Variable),
        _ => Some(CompletionKind::Link),
    }
}

/// Runs the provider for `kind` at the current cursor.
pub fn complete(
    kind: CompletionKind,
    surface: &dyn EditorSurface,
    context: &CompletionContext<'_>,
) -> Result<Option<CompletionList>, CompletionError> {
    match kind {
        CompletionKind::Link => Ok(link::complete(surface, context.story)),
        CompletionKind::Command => Ok(command::complete(surface, context.toolbar)),
        CompletionKind::Variable => {
            let Some(tracker) = context.variables else {
                return Ok(None);
            };
            variable::complete(
                surface,
                tracker,
                context.passage_id,
                context.default_name_pattern,
            )
        }
    }
}

/// Applies entry `index` of `list`. Returns the command to run, if any.
pub fn apply_pick(
    surface: &mut dyn EditorSurface,
    list: &CompletionList,
    index: usize,
) -> Result<Option<String>, CompletionError> {
    let item = list.items.get(index).ok_or(CompletionError::NoSuchItem {
        index,
        len: list.items.len(),
    })?;

    match &item.action {
        CompletionAction::Insert => {
            surface.replace_range(&item.text, list.from, list.to);
            Ok(None)
        }
        CompletionAction::InsertLink { closed } => {
            surface.replace_range(&item.text, list.from, list.to);
            if !closed {
                let end = TextPosition::new(
                    list.from.line,
                    list.from.ch + item.text.chars().count(),
                );
                surface.replace_range("]] ", end, end);
            }
            Ok(None)
        }
        CompletionAction::RunCommand {
            command,
            consume_slash,
        } => {
            let mut from = list.from;
            if *consume_slash {
                from.ch = from.ch.saturating_sub(1);
            }
            surface.replace_range("", from, list.to);
            Ok(Some(command.clone()))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionError {
    Variables(VariableIndexError),
    NoSuchItem { index: usize, len: usize },
}

impl Display for CompletionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Variables(err) => write!(f, "variable completion failed: {err}"),
            Self::NoSuchItem { index, len } => {
                write!(f, "completion item {index} out of range ({len} items)")
            }
        }
    }
}

impl Error for CompletionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Variables(err) => Some(err),
            Self::NoSuchItem { .. } => None,
        }
    }
}

impl From<VariableIndexError> for CompletionError {
    fn from(value: VariableIndexError) -> Self {
        Self::Variables(value)
    }
}

#[cfg(test)]
mod tests {
    use super::{
        apply_pick, classify, detect_prefix, CompletionAction, CompletionItem, CompletionKind,
        CompletionList,
    };
    use crate::surface::memory::MemorySurface;
    use crate::surface::{
        EditorMode, EditorSurface, MarkOptions, MarkerId, MarkerInfo, SelectionRange,
        SurfaceError, TextPosition, TextRange,
    };

    /// Surface whose edits leave the selection where it was.
    struct FixedCursor(MemorySurface);

    impl EditorSurface for FixedCursor {
        fn line_count(&self) -> usize {
            self.0.line_count()
        }
        fn line(&self, index: usize) -> Option<String> {
            self.0.line(index)
        }
        fn text(&self) -> String {
            self.0.text()
        }
        fn set_text(&mut self, text: &str) {
            self.0.set_text(text);
        }
        fn selections(&self) -> Vec<SelectionRange> {
            self.0.selections()
        }
        fn set_selections(&mut self, ranges: Vec<SelectionRange>) {
            self.0.set_selections(ranges);
        }
        fn replace_range(&mut self, text: &str, from: TextPosition, to: TextPosition) {
            let kept = self.0.selections();
            self.0.replace_range(text, from, to);
            self.0.set_selections(kept);
        }
        fn mark_text(&mut self, range: TextRange, options: MarkOptions) -> MarkerId {
            self.0.mark_text(range, options)
        }
        fn find_marker(&self, id: MarkerId) -> Option<MarkerInfo> {
            self.0.find_marker(id)
        }
        fn clear_marker(&mut self, id: MarkerId) -> bool {
            self.0.clear_marker(id)
        }
        fn markers(&self) -> Vec<MarkerInfo> {
            self.0.markers()
        }
        fn define_mode(&mut self, name: &str, mode: EditorMode) {
            self.0.define_mode(name, mode);
        }
        fn exec_command(&mut self, name: &str) -> Result<(), SurfaceError> {
            self.0.exec_command(name)
        }
        fn show_hints(&mut self, range: TextRange, labels: &[String]) {
            self.0.show_hints(range, labels);
        }
        fn close_hints(&mut self) {
            self.0.close_hints();
        }
    }

    fn surface_at(text: &str, ch: usize) -> MemorySurface {
        let mut surface = MemorySurface::new(text);
        surface.set_cursor(TextPosition::new(0, ch));
        surface
    }

    #[test]
    fn detects_prefixes_before_cursor() {
        assert_eq!(detect_prefix(&surface_at("Go [[", 5)), Some("[["));
        assert_eq!(detect_prefix(&surface_at("[[a->", 5)), Some("->"));
        assert_eq!(detect_prefix(&surface_at("/", 1)), Some("/"));
        assert_eq!(detect_prefix(&surface_at("set @", 5)), Some("@"));
        assert_eq!(detect_prefix(&surface_at("plain", 5)), None);
    }

    #[test]
    fn multi_range_selection_never_triggers() {
        let mut surface = surface_at("[[ [[", 2);
        surface.set_selections(vec![
            SelectionRange::cursor(TextPosition::new(0, 2)),
            SelectionRange::cursor(TextPosition::new(0, 5)),
        ]);
        assert_eq!(detect_prefix(&surface), None);
    }

    #[test]
    fn slash_only_triggers_at_line_start() {
        assert_eq!(
            classify("/", TextPosition::new(3, 1)),
            Some(CompletionKind::Command)
        );
        assert_eq!(classify("/", TextPosition::new(0, 4)), None);
        assert_eq!(
            classify("@", TextPosition::new(0, 4)),
            Some(CompletionKind::Variable)
        );
        assert_eq!(
            classify("->", TextPosition::new(0, 4)),
            Some(CompletionKind::Link)
        );
    }

    #[test]
    fn open_link_pick_closes_after_inserted_name() {
        let mut surface = FixedCursor(surface_at("Go [[Sta", 8));
        surface.set_selection(TextPosition::new(0, 0), TextPosition::new(0, 0));
        let list = CompletionList {
            kind: CompletionKind::Link,
            from: TextPosition::new(0, 5),
            to: TextPosition::new(0, 8),
            items: vec![CompletionItem {
                text: "Start".to_string(),
                action: CompletionAction::InsertLink { closed: false },
            }],
        };

        apply_pick(&mut surface, &list, 0).expect("pick");
        assert_eq!(surface.text(), "Go [[Start]] ");
    }
}
