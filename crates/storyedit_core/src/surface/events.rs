//! Document-level event hub and overlay widgets.
//!
//! # Responsibility
//! - Hold the listener registry markers attach to (mouse, key and
//!   selection-change events).
//! - Describe replacement widgets whose visual state listeners toggle.
//!
//! # Invariants
//! - Listener IDs are never reused within one hub.
//! - `dispatch` snapshots the listener set first, so a listener removed
//!   during dispatch still sees the current event, and one added does not.
//! - Listeners never mutate the surface directly; they return `Effect`s the
//!   session applies afterwards.

use crate::model::passage::PassageId;
use crate::surface::{SelectionRange, TextRange};
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

/// Keyboard modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modifier {
    Alt,
    Ctrl,
    Meta,
    Shift,
}

impl Modifier {
    /// DOM `KeyboardEvent.key` value for this modifier.
    pub fn key_name(self) -> &'static str {
        match self {
            Self::Alt => "Alt",
            Self::Ctrl => "Control",
            Self::Meta => "Meta",
            Self::Shift => "Shift",
        }
    }
}

/// Modifier state carried by pointer events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub alt: bool,
    pub ctrl: bool,
    pub meta: bool,
    pub shift: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        alt: false,
        ctrl: false,
        meta: false,
        shift: false,
    };

    pub fn only(modifier: Modifier) -> Self {
        let mut value = Self::NONE;
        match modifier {
            Modifier::Alt => value.alt = true,
            Modifier::Ctrl => value.ctrl = true,
            Modifier::Meta => value.meta = true,
            Modifier::Shift => value.shift = true,
        }
        value
    }

    pub fn holds(self, modifier: Modifier) -> bool {
        match modifier {
            Modifier::Alt => self.alt,
            Modifier::Ctrl => self.ctrl,
            Modifier::Meta => self.meta,
            Modifier::Shift => self.shift,
        }
    }

    /// Whether any modifier other than `designated` is held.
    pub fn conflicts_with(self, designated: Modifier) -> bool {
        [Modifier::Alt, Modifier::Ctrl, Modifier::Meta, Modifier::Shift]
            .into_iter()
            .any(|modifier| modifier != designated && self.holds(modifier))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Primary,
    Middle,
    Secondary,
}

/// Stable widget identifier, allocated by the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WidgetId(pub u64);

/// Overlay element rendered in place of (or on top of) a marked range.
#[derive(Debug)]
pub struct Widget {
    pub id: WidgetId,
    pub class_name: &'static str,
    pub text: String,
    pub passage_id: Option<PassageId>,
    selected: Cell<bool>,
    clickable: Cell<bool>,
}

impl Widget {
    pub fn is_selected(&self) -> bool {
        self.selected.get()
    }

    pub fn set_selected(&self, selected: bool) {
        self.selected.set(selected);
    }

    pub fn is_clickable(&self) -> bool {
        self.clickable.get()
    }

    pub fn set_clickable(&self, clickable: bool) {
        self.clickable.set(clickable);
    }
}

/// Events routed through the hub.
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    MouseEnter {
        target: WidgetId,
    },
    MouseLeave {
        target: WidgetId,
    },
    Click {
        target: WidgetId,
        button: MouseButton,
        modifiers: Modifiers,
    },
    KeyDown {
        key: String,
    },
    KeyUp {
        key: String,
    },
    /// Fired before the surface applies a new selection.
    BeforeSelectionChange {
        ranges: Vec<SelectionRange>,
    },
}

impl UiEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::MouseEnter { .. } => EventKind::MouseEnter,
            Self::MouseLeave { .. } => EventKind::MouseLeave,
            Self::Click { .. } => EventKind::Click,
            Self::KeyDown { .. } => EventKind::KeyDown,
            Self::KeyUp { .. } => EventKind::KeyUp,
            Self::BeforeSelectionChange { .. } => EventKind::BeforeSelectionChange,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    MouseEnter,
    MouseLeave,
    Click,
    KeyDown,
    KeyUp,
    BeforeSelectionChange,
}

/// Side effect requested by a listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Select `range` on the surface.
    SetSelection(TextRange),
    /// Ask the host to open a passage for editing.
    OpenPassage(PassageId),
    /// Suppress the event's default action.
    PreventDefault,
}

pub type Listener = Rc<dyn Fn(&UiEvent) -> Vec<Effect>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(pub u64);

/// Listener registry shared by markers and the session.
#[derive(Default)]
pub struct EventHub {
    listeners: RefCell<BTreeMap<ListenerId, (EventKind, Listener)>>,
    next_listener: Cell<u64>,
    next_widget: Cell<u64>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, kind: EventKind, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_listener.get());
        self.next_listener.set(id.0 + 1);
        self.listeners.borrow_mut().insert(id, (kind, listener));
        id
    }

    /// Returns `false` when the listener was already removed.
    pub fn remove(&self, id: ListenerId) -> bool {
        self.listeners.borrow_mut().remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.listeners.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.borrow().is_empty()
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.listeners
            .borrow()
            .values()
            .filter(|(listener_kind, _)| *listener_kind == kind)
            .count()
    }

    /// Runs every listener registered for the event's kind, in registration
    /// order, and collects their effects.
    pub fn dispatch(&self, event: &UiEvent) -> Vec<Effect> {
        let kind = event.kind();
        let snapshot: Vec<Listener> = self
            .listeners
            .borrow()
            .values()
            .filter(|(listener_kind, _)| *listener_kind == kind)
            .map(|(_, listener)| Rc::clone(listener))
            .collect();

        snapshot
            .iter()
            .flat_map(|listener| listener(event))
            .collect()
    }

    pub fn create_widget(
        &self,
        class_name: &'static str,
        text: impl Into<String>,
        passage_id: Option<PassageId>,
    ) -> Rc<Widget> {
        let id = WidgetId(self.next_widget.get());
        self.next_widget.set(id.0 + 1);
        Rc::new(Widget {
            id,
            class_name,
            text: text.into(),
            passage_id,
            selected: Cell::new(false),
            clickable: Cell::new(false),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{Effect, EventHub, EventKind, Modifier, Modifiers, UiEvent};
    use std::rc::Rc;

    #[test]
    fn dispatch_only_reaches_matching_kind() {
        let hub = EventHub::new();
        hub.add(
            EventKind::KeyDown,
            Rc::new(|_event: &UiEvent| vec![Effect::PreventDefault]),
        );
        hub.add(EventKind::KeyUp, Rc::new(|_event: &UiEvent| Vec::new()));

        let effects = hub.dispatch(&UiEvent::KeyDown {
            key: "Alt".to_string(),
        });
        assert_eq!(effects, vec![Effect::PreventDefault]);
        assert_eq!(hub.count(EventKind::KeyDown), 1);
    }

    #[test]
    fn removed_listener_is_not_called_and_remove_is_idempotent() {
        let hub = EventHub::new();
        let id = hub.add(
            EventKind::KeyUp,
            Rc::new(|_event: &UiEvent| vec![Effect::PreventDefault]),
        );
        assert!(hub.remove(id));
        assert!(!hub.remove(id));
        assert!(hub
            .dispatch(&UiEvent::KeyUp {
                key: "Alt".to_string()
            })
            .is_empty());
        assert!(hub.is_empty());
    }

    #[test]
    fn conflicting_modifiers_exclude_the_designated_one() {
        assert!(!Modifiers::only(Modifier::Alt).conflicts_with(Modifier::Alt));
        let mut both = Modifiers::only(Modifier::Alt);
        both.shift = true;
        assert!(both.conflicts_with(Modifier::Alt));
    }
}
