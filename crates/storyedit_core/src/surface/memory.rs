//! Headless in-memory editing surface.
//!
//! # Responsibility
//! - Implement `EditorSurface` without a UI for embedding hosts that drive
//!   the core programmatically, and for tests.
//! - Move markers with edits the way a text widget does.
//!
//! # Invariants
//! - The buffer always holds at least one (possibly empty) line.
//! - A deletion that overlaps a marker clears that marker; markers entirely
//!   before an edit stay put and markers after it shift.
//! - An insertion exactly at a marker's start pushes the marker right.

use crate::model::passage::PassageId;
use crate::surface::events::Widget;
use crate::surface::{
    EditorMode, EditorSurface, MarkOptions, MarkerClass, MarkerId, MarkerInfo, SelectionRange,
    SurfaceError, TextPosition, TextRange,
};
use std::collections::BTreeMap;
use std::rc::Rc;

const BUILTIN_COMMANDS: &[&str] = &["selectAll", "goDocStart", "goDocEnd"];

#[derive(Debug, Clone)]
struct MarkEntry {
    class: MarkerClass,
    range: TextRange,
    passage_id: Option<PassageId>,
    widget: Option<Rc<Widget>>,
}

/// In-memory `EditorSurface`.
pub struct MemorySurface {
    lines: Vec<String>,
    selections: Vec<SelectionRange>,
    marks: BTreeMap<MarkerId, MarkEntry>,
    next_marker: u64,
    modes: BTreeMap<String, EditorMode>,
    hints: Option<(TextRange, Vec<String>)>,
    executed: Vec<String>,
}

impl MemorySurface {
    pub fn new(text: &str) -> Self {
        Self {
            lines: split_lines(text),
            selections: vec![SelectionRange::cursor(TextPosition::default())],
            marks: BTreeMap::new(),
            next_marker: 0,
            modes: BTreeMap::new(),
            hints: None,
            executed: Vec::new(),
        }
    }

    /// Places a single cursor.
    pub fn set_cursor(&mut self, at: TextPosition) {
        self.selections = vec![SelectionRange::cursor(at)];
    }

    /// Inserts `text` at the cursor, as typing would.
    pub fn type_text(&mut self, text: &str) {
        let cursor = self.cursor();
        self.replace_range(text, cursor, cursor);
    }

    /// Currently displayed completion popup.
    pub fn hints(&self) -> Option<&(TextRange, Vec<String>)> {
        self.hints.as_ref()
    }

    /// Built-in commands executed so far, in order.
    pub fn executed_commands(&self) -> &[String] {
        &self.executed
    }

    pub fn has_mode(&self, name: &str) -> bool {
        self.modes.contains_key(name)
    }

    fn end_position(&self) -> TextPosition {
        let line = self.lines.len().saturating_sub(1);
        let ch = self.lines.get(line).map_or(0, |text| text.chars().count());
        TextPosition::new(line, ch)
    }

    fn clamp(&self, pos: TextPosition) -> TextPosition {
        let end = self.end_position();
        if pos.line > end.line {
            return end;
        }
        let len = self.lines[pos.line].chars().count();
        TextPosition::new(pos.line, pos.ch.min(len))
    }

    fn offset_to_position(&self, offset: usize) -> TextPosition {
        let mut remaining = offset;
        for (line, text) in self.lines.iter().enumerate() {
            let len = text.chars().count();
            if remaining <= len {
                return TextPosition::new(line, remaining);
            }
            remaining -= len + 1;
        }
        self.end_position()
    }
}

impl EditorSurface for MemorySurface {
    fn line_count(&self) -> usize {
        self.lines.len()
    }

    fn line(&self, index: usize) -> Option<String> {
        self.lines.get(index).cloned()
    }

    fn text(&self) -> String {
        self.lines.join("\n")
    }

    fn set_text(&mut self, text: &str) {
        let old: Vec<char> = self.text().chars().collect();
        let new: Vec<char> = text.chars().collect();
        if old == new {
            return;
        }

        let prefix = old
            .iter()
            .zip(new.iter())
            .take_while(|(a, b)| a == b)
            .count();
        let max_suffix = old.len().min(new.len()) - prefix;
        let suffix = old
            .iter()
            .rev()
            .zip(new.iter().rev())
            .take(max_suffix)
            .take_while(|(a, b)| a == b)
            .count();

        let from = self.offset_to_position(prefix);
        let to = self.offset_to_position(old.len() - suffix);
        let inserted: String = new[prefix..new.len() - suffix].iter().collect();
        self.replace_range(&inserted, from, to);
    }

    fn selections(&self) -> Vec<SelectionRange> {
        self.selections.clone()
    }

    fn set_selections(&mut self, ranges: Vec<SelectionRange>) {
        let ranges: Vec<SelectionRange> = ranges
            .into_iter()
            .map(|range| SelectionRange::new(self.clamp(range.anchor), self.clamp(range.head)))
            .collect();
        if !ranges.is_empty() {
            self.selections = ranges;
        }
    }

    fn replace_range(&mut self, text: &str, from: TextPosition, to: TextPosition) {
        let from = self.clamp(from);
        let to = self.clamp(to.max(from));

        let head: String = self.lines[from.line].chars().take(from.ch).collect();
        let tail: String = self.lines[to.line].chars().skip(to.ch).collect();
        let mut inserted = split_lines(text);
        let inserted_count = inserted.len();
        let last_len = inserted[inserted_count - 1].chars().count();
        let new_to = if inserted_count == 1 {
            TextPosition::new(from.line, from.ch + last_len)
        } else {
            TextPosition::new(from.line + inserted_count - 1, last_len)
        };

        inserted[0] = format!("{head}{}", inserted[0]);
        inserted[inserted_count - 1].push_str(&tail);
        self.lines.splice(from.line..=to.line, inserted);

        let deletion = from < to;
        let shift = |pos: TextPosition| -> TextPosition {
            if pos.line == to.line {
                TextPosition::new(new_to.line, new_to.ch + (pos.ch - to.ch))
            } else {
                TextPosition::new(pos.line - to.line + new_to.line, pos.ch)
            }
        };

        self.marks.retain(|_, mark| {
            let range = mark.range;
            if deletion && range.from < to && range.to > from {
                return false;
            }
            let start = if range.from < from {
                range.from
            } else {
                shift(range.from)
            };
            let end = if range.to <= from {
                range.to
            } else {
                shift(range.to)
            };
            mark.range = TextRange::new(start, end);
            true
        });

        self.selections = vec![SelectionRange::cursor(new_to)];
    }

    fn mark_text(&mut self, range: TextRange, options: MarkOptions) -> MarkerId {
        let id = MarkerId(self.next_marker);
        self.next_marker += 1;
        self.marks.insert(
            id,
            MarkEntry {
                class: options.class,
                range,
                passage_id: options.passage_id,
                widget: options.widget,
            },
        );
        id
    }

    fn find_marker(&self, id: MarkerId) -> Option<MarkerInfo> {
        self.marks.get(&id).map(|mark| MarkerInfo {
            id,
            class: mark.class,
            range: mark.range,
            passage_id: mark.passage_id,
            widget: mark.widget.clone(),
        })
    }

    fn clear_marker(&mut self, id: MarkerId) -> bool {
        self.marks.remove(&id).is_some()
    }

    fn markers(&self) -> Vec<MarkerInfo> {
        let mut markers: Vec<MarkerInfo> = self
            .marks
            .keys()
            .filter_map(|id| self.find_marker(*id))
            .collect();
        markers.sort_by_key(|marker| (marker.range.from, marker.id));
        markers
    }

    fn define_mode(&mut self, name: &str, mode: EditorMode) {
        self.modes.insert(name.to_string(), mode);
    }

    fn exec_command(&mut self, name: &str) -> Result<(), SurfaceError> {
        if !BUILTIN_COMMANDS.contains(&name) {
            return Err(SurfaceError::UnknownCommand(name.to_string()));
        }
        match name {
            "selectAll" => {
                let end = self.end_position();
                self.selections = vec![SelectionRange::new(TextPosition::default(), end)];
            }
            "goDocStart" => self.set_cursor(TextPosition::default()),
            _ => {
                let end = self.end_position();
                self.set_cursor(end);
            }
        }
        self.executed.push(name.to_string());
        Ok(())
    }

    fn show_hints(&mut self, range: TextRange, labels: &[String]) {
        self.hints = Some((range, labels.to_vec()));
    }

    fn close_hints(&mut self) {
        self.hints = None;
    }
}

fn split_lines(text: &str) -> Vec<String> {
    text.split('\n').map(str::to_string).collect()
}
