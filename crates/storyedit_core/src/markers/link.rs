//! Passage-link scanning and interactive link markers.
//!
//! # Responsibility
//! - Find `[[target]]` / `[[display->target]]` links and resolve targets by
//!   exact passage name.
//! - Render resolved links as markers that open their passage on a
//!   modifier-click.
//!
//! # Invariants
//! - Unresolved targets produce no match and no error.
//! - A link widget is `clickable` only while hovered AND the link modifier
//!   is held.
//! - A click with any modifier other than the link modifier has no effect.

use crate::markers::handle::MarkerHandle;
use crate::model::passage::{PassageId, Story};
use crate::surface::events::{
    Effect, EventHub, EventKind, Modifier, MouseButton, UiEvent, Widget,
};
use crate::surface::{char_column, EditorSurface, MarkOptions, MarkerClass, TextRange};
use once_cell::sync::Lazy;
use regex::Regex;
use std::cell::Cell;
use std::rc::Rc;

static LINK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[\[(?:([^\]]+)->)?([^\]]+)\]\]").expect("valid passage link regex")
});

/// Reconciliation key of a link marker: target plus start position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LinkKey {
    pub passage_id: PassageId,
    pub line: usize,
    pub ch: usize,
}

/// One link whose target resolved to a passage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkMatch {
    pub key: LinkKey,
    pub range: TextRange,
}

/// Scans every line for links whose target names a passage of `story`.
pub fn scan_links(lines: &[String], story: &Story) -> Vec<LinkMatch> {
    let mut found = Vec::new();
    for (line_number, line) in lines.iter().enumerate() {
        for caps in LINK_RE.captures_iter(line) {
            let (Some(whole), Some(target)) = (caps.get(0), caps.get(2)) else {
                continue;
            };
            let Some(passage) = story.passage_with_name(target.as_str()) else {
                continue;
            };
            let ch = char_column(line, whole.start());
            found.push(LinkMatch {
                key: LinkKey {
                    passage_id: passage.id,
                    line: line_number,
                    ch,
                },
                range: TextRange::on_line(line_number, ch, whole.as_str().chars().count()),
            });
        }
    }
    found
}

#[derive(Default)]
struct HoverState {
    hovered: Cell<bool>,
    modifier_down: Cell<bool>,
}

impl HoverState {
    fn refresh(&self, widget: &Widget) {
        widget.set_clickable(self.hovered.get() && self.modifier_down.get());
    }
}

/// Renders one link marker and wires its hover, key and click listeners.
pub fn create_link_marker(
    surface: &mut dyn EditorSurface,
    hub: &Rc<EventHub>,
    link: &LinkMatch,
    modifier: Modifier,
) -> MarkerHandle {
    let passage_id = link.key.passage_id;
    let widget = hub.create_widget(MarkerClass::PassageLink.as_str(), "", Some(passage_id));
    let id = surface.mark_text(
        link.range,
        MarkOptions {
            class: MarkerClass::PassageLink,
            widget: Some(Rc::clone(&widget)),
            replace_text: false,
            passage_id: Some(passage_id),
        },
    );
    let mut handle = MarkerHandle::new(
        id,
        MarkerClass::PassageLink,
        Some(passage_id),
        Rc::clone(&widget),
    );
    let state = Rc::new(HoverState::default());
    let target_id = widget.id;

    let (enter_state, enter_widget) = (Rc::clone(&state), Rc::clone(&widget));
    handle.listen(
        hub,
        EventKind::MouseEnter,
        Rc::new(move |event: &UiEvent| {
            if matches!(event, UiEvent::MouseEnter { target } if *target == target_id) {
                enter_state.hovered.set(true);
                enter_state.refresh(&enter_widget);
            }
            Vec::new()
        }),
    );

    let (leave_state, leave_widget) = (Rc::clone(&state), Rc::clone(&widget));
    handle.listen(
        hub,
        EventKind::MouseLeave,
        Rc::new(move |event: &UiEvent| {
            if matches!(event, UiEvent::MouseLeave { target } if *target == target_id) {
                leave_state.hovered.set(false);
                leave_state.refresh(&leave_widget);
            }
            Vec::new()
        }),
    );

    let (down_state, down_widget) = (Rc::clone(&state), Rc::clone(&widget));
    handle.listen(
        hub,
        EventKind::KeyDown,
        Rc::new(move |event: &UiEvent| {
            if matches!(event, UiEvent::KeyDown { key } if key == modifier.key_name()) {
                down_state.modifier_down.set(true);
                down_state.refresh(&down_widget);
            }
            Vec::new()
        }),
    );

    let (up_state, up_widget) = (Rc::clone(&state), Rc::clone(&widget));
    handle.listen(
        hub,
        EventKind::KeyUp,
        Rc::new(move |event: &UiEvent| {
            if matches!(event, UiEvent::KeyUp { key } if key == modifier.key_name()) {
                up_state.modifier_down.set(false);
                up_state.refresh(&up_widget);
            }
            Vec::new()
        }),
    );

    handle.listen(
        hub,
        EventKind::Click,
        Rc::new(move |event: &UiEvent| match event {
            UiEvent::Click {
                target,
                button,
                modifiers,
            } if *target == target_id => {
                if modifiers.conflicts_with(modifier)
                    || *button != MouseButton::Primary
                    || !modifiers.holds(modifier)
                {
                    return Vec::new();
                }
                vec![Effect::PreventDefault, Effect::OpenPassage(passage_id)]
            }
            _ => Vec::new(),
        }),
    );

    handle
}
