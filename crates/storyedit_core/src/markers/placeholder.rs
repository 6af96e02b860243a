//! Tab-stop placeholder scanning, rendering and cycling.
//!
//! # Responsibility
//! - Find `${N:label}` tab stops in buffer lines.
//! - Render each as a widget showing `label` that selects its range when
//!   clicked and highlights while the selection sits on it.
//! - Pick the next placeholder for Tab / Shift-Tab navigation.

use crate::markers::handle::MarkerHandle;
use crate::surface::events::{Effect, EventHub, EventKind, UiEvent};
use crate::surface::{
    char_column, EditorSurface, MarkOptions, MarkerClass, SelectionRange, TextPosition, TextRange,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::rc::Rc;

static PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{(\d+):([^}]+)\}").expect("valid placeholder regex"));

/// One `${N:label}` occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderMatch {
    pub range: TextRange,
    pub index: String,
    pub label: String,
}

/// Scans every line for placeholders, in document order.
pub fn scan_placeholders(lines: &[String]) -> Vec<PlaceholderMatch> {
    let mut found = Vec::new();
    for (line_number, line) in lines.iter().enumerate() {
        for caps in PLACEHOLDER_RE.captures_iter(line) {
            let (Some(whole), Some(index), Some(label)) = (caps.get(0), caps.get(1), caps.get(2))
            else {
                continue;
            };
            let ch = char_column(line, whole.start());
            let len = whole.as_str().chars().count();
            found.push(PlaceholderMatch {
                range: TextRange::on_line(line_number, ch, len),
                index: index.as_str().to_string(),
                label: label.as_str().to_string(),
            });
        }
    }
    found
}

/// Whether a selection change lands on the placeholder at `range`.
///
/// Only single-range selections anchored at the placeholder start count,
/// either as a bare cursor or spanning exactly the placeholder.
pub fn selection_hits(ranges: &[SelectionRange], range: TextRange) -> bool {
    match ranges {
        [only] => only.anchor == range.from && (only.head == range.from || only.head == range.to),
        _ => false,
    }
}

/// Renders one placeholder marker and wires its listeners.
pub fn create_placeholder_marker(
    surface: &mut dyn EditorSurface,
    hub: &Rc<EventHub>,
    placeholder: &PlaceholderMatch,
) -> MarkerHandle {
    let range = placeholder.range;
    let widget = hub.create_widget(MarkerClass::Placeholder.as_str(), &placeholder.label, None);
    let id = surface.mark_text(
        range,
        MarkOptions {
            class: MarkerClass::Placeholder,
            widget: Some(Rc::clone(&widget)),
            replace_text: true,
            passage_id: None,
        },
    );
    let mut handle = MarkerHandle::new(id, MarkerClass::Placeholder, None, Rc::clone(&widget));

    let click_target = widget.id;
    handle.listen(
        hub,
        EventKind::Click,
        Rc::new(move |event: &UiEvent| match event {
            UiEvent::Click { target, .. } if *target == click_target => {
                vec![Effect::SetSelection(range)]
            }
            _ => Vec::new(),
        }),
    );

    let selection_widget = Rc::clone(&widget);
    handle.listen(
        hub,
        EventKind::BeforeSelectionChange,
        Rc::new(move |event: &UiEvent| {
            if let UiEvent::BeforeSelectionChange { ranges } = event {
                selection_widget.set_selected(selection_hits(ranges, range));
            }
            Vec::new()
        }),
    );

    handle
}

/// Picks the placeholder Tab (or Shift-Tab when `reverse`) moves to.
///
/// Forward: the first placeholder starting at or after the cursor, wrapping
/// to the first. Reverse: the last placeholder ending strictly before the
/// cursor, wrapping to the last. `ranges` must be in document order.
pub fn next_placeholder(
    ranges: &[TextRange],
    cursor: TextPosition,
    reverse: bool,
) -> Option<TextRange> {
    if reverse {
        ranges
            .iter()
            .rev()
            .find(|range| range.to < cursor)
            .or_else(|| ranges.last())
            .copied()
    } else {
        ranges
            .iter()
            .find(|range| range.from >= cursor)
            .or_else(|| ranges.first())
            .copied()
    }
}
