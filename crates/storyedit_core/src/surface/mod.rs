//! Editing-surface contract consumed by the core.
//!
//! # Responsibility
//! - Define positions, ranges and marker records in `(line, ch)` space.
//! - Define the `EditorSurface` capabilities the core relies on; the text
//!   widget itself (rendering, keystrokes, history) lives outside the crate.
//!
//! # Invariants
//! - `ch` counts chars within a line, never bytes.
//! - Marker ranges are half-open: `from` inclusive, `to` exclusive.
//! - `markers()` lists live markers in document order.

pub mod events;
pub mod memory;

use crate::model::passage::PassageId;
use crate::surface::events::Widget;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::rc::Rc;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct TextPosition {
    pub line: usize,
    pub ch: usize,
}

impl TextPosition {
    pub const fn new(line: usize, ch: usize) -> Self {
        Self { line, ch }
    }
}

/// Half-open range between two positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextRange {
    pub from: TextPosition,
    pub to: TextPosition,
}

impl TextRange {
    pub const fn new(from: TextPosition, to: TextPosition) -> Self {
        Self { from, to }
    }

    /// Range covering `len` chars of one line starting at `ch`.
    pub const fn on_line(line: usize, ch: usize, len: usize) -> Self {
        Self {
            from: TextPosition::new(line, ch),
            to: TextPosition::new(line, ch + len),
        }
    }
}

/// One selection range; `head` is where the cursor sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SelectionRange {
    pub anchor: TextPosition,
    pub head: TextPosition,
}

impl SelectionRange {
    pub const fn cursor(at: TextPosition) -> Self {
        Self {
            anchor: at,
            head: at,
        }
    }

    pub const fn new(anchor: TextPosition, head: TextPosition) -> Self {
        Self { anchor, head }
    }

    pub fn is_empty(&self) -> bool {
        self.anchor == self.head
    }

    pub fn from(&self) -> TextPosition {
        self.anchor.min(self.head)
    }

    pub fn to(&self) -> TextPosition {
        self.anchor.max(self.head)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MarkerId(pub u64);

/// Style class of a marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerClass {
    Placeholder,
    PassageLink,
}

impl MarkerClass {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Placeholder => "placeholder",
            Self::PassageLink => "passage-link",
        }
    }
}

/// Options for `EditorSurface::mark_text`.
#[derive(Debug, Clone)]
pub struct MarkOptions {
    pub class: MarkerClass,
    /// Element bound to the marked range; receives pointer events.
    pub widget: Option<Rc<Widget>>,
    /// Whether `widget` is rendered in place of the marked text.
    pub replace_text: bool,
    /// Exposed as the `data-passage-id` attribute of link markers.
    pub passage_id: Option<PassageId>,
}

/// Live marker as reported by the surface.
#[derive(Debug, Clone)]
pub struct MarkerInfo {
    pub id: MarkerId,
    pub class: MarkerClass,
    pub range: TextRange,
    pub passage_id: Option<PassageId>,
    pub widget: Option<Rc<Widget>>,
}

/// Opaque syntax mode produced by a story format.
pub type EditorMode = Rc<dyn Any>;

/// Surface-level errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    UnknownCommand(String),
}

impl Display for SurfaceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownCommand(name) => write!(f, "unknown editor command: {name}"),
        }
    }
}

impl Error for SurfaceError {}

/// Capabilities of the text-editing widget.
pub trait EditorSurface {
    fn line_count(&self) -> usize;

    fn line(&self, index: usize) -> Option<String>;

    /// Full buffer text, lines joined with `\n`.
    fn text(&self) -> String;

    /// Replaces the buffer text; markers outside the changed span survive.
    fn set_text(&mut self, text: &str);

    fn selections(&self) -> Vec<SelectionRange>;

    fn set_selections(&mut self, ranges: Vec<SelectionRange>);

    /// Replaces `from..to` with `text`. Where the cursor lands afterwards is
    /// up to the surface.
    fn replace_range(&mut self, text: &str, from: TextPosition, to: TextPosition);

    fn mark_text(&mut self, range: TextRange, options: MarkOptions) -> MarkerId;

    /// Current range of a live marker; `None` once cleared.
    fn find_marker(&self, id: MarkerId) -> Option<MarkerInfo>;

    /// Returns `false` when the marker was already gone.
    fn clear_marker(&mut self, id: MarkerId) -> bool;

    fn markers(&self) -> Vec<MarkerInfo>;

    fn define_mode(&mut self, name: &str, mode: EditorMode);

    /// Runs a built-in editing command such as `bold`.
    fn exec_command(&mut self, name: &str) -> Result<(), SurfaceError>;

    fn show_hints(&mut self, range: TextRange, labels: &[String]);

    fn close_hints(&mut self);

    /// Head of the primary selection.
    fn cursor(&self) -> TextPosition {
        self.selections()
            .first()
            .map(|range| range.head)
            .unwrap_or_default()
    }

    fn set_selection(&mut self, anchor: TextPosition, head: TextPosition) {
        self.set_selections(vec![SelectionRange::new(anchor, head)]);
    }

    fn lines(&self) -> Vec<String> {
        (0..self.line_count())
            .filter_map(|index| self.line(index))
            .collect()
    }

    /// Text between two positions on one line; empty when out of range.
    fn line_range(&self, line: usize, from_ch: usize, to_ch: usize) -> String {
        self.line(line)
            .map(|text| {
                text.chars()
                    .skip(from_ch)
                    .take(to_ch.saturating_sub(from_ch))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Converts a byte offset within `line` to a char column.
pub fn char_column(line: &str, byte_offset: usize) -> usize {
    line[..byte_offset.min(line.len())].chars().count()
}

/// Converts a char column within `line` to a byte offset, clamped to the end.
pub fn byte_offset(line: &str, column: usize) -> usize {
    line.char_indices()
        .nth(column)
        .map_or(line.len(), |(offset, _)| offset)
}
