//! Marker handle owning its listener lifetimes.
//!
//! # Invariants
//! - Every listener attached through a handle is removed exactly once: on
//!   `clear`, or on drop if the handle is discarded without clearing.

use crate::model::passage::PassageId;
use crate::surface::events::{EventHub, EventKind, Listener, Widget};
use crate::surface::{EditorSurface, MarkerClass, MarkerId};
use std::rc::Rc;

/// Owned record of one rendered marker.
pub struct MarkerHandle {
    id: MarkerId,
    class: MarkerClass,
    passage_id: Option<PassageId>,
    widget: Rc<Widget>,
    cleanups: Vec<Box<dyn FnOnce()>>,
}

impl MarkerHandle {
    pub fn new(
        id: MarkerId,
        class: MarkerClass,
        passage_id: Option<PassageId>,
        widget: Rc<Widget>,
    ) -> Self {
        Self {
            id,
            class,
            passage_id,
            widget,
            cleanups: Vec::new(),
        }
    }

    pub fn id(&self) -> MarkerId {
        self.id
    }

    pub fn class(&self) -> MarkerClass {
        self.class
    }

    pub fn passage_id(&self) -> Option<PassageId> {
        self.passage_id
    }

    pub fn widget(&self) -> &Rc<Widget> {
        &self.widget
    }

    /// Registers `listener` on `hub` for the lifetime of this marker.
    pub fn listen(&mut self, hub: &Rc<EventHub>, kind: EventKind, listener: Listener) {
        let listener_id = hub.add(kind, listener);
        let hub = Rc::clone(hub);
        self.cleanups.push(Box::new(move || {
            hub.remove(listener_id);
        }));
    }

    /// Clears the surface marker and detaches every listener.
    pub fn clear(mut self, surface: &mut dyn EditorSurface) {
        surface.clear_marker(self.id);
        self.release();
    }

    fn release(&mut self) {
        for cleanup in self.cleanups.drain(..) {
            cleanup();
        }
    }
}

impl Drop for MarkerHandle {
    fn drop(&mut self) {
        self.release();
    }
}
