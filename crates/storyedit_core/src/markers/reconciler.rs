//! Minimal-churn marker reconciliation.
//!
//! # Responsibility
//! - Keep rendered link and placeholder markers in step with buffer text and
//!   the story's passage set.
//! - Own every marker handle, so teardown can clear them all.
//!
//! # Invariants
//! - Link markers are keyed by `(passage id, start line, start column)`
//!   measured at their current surface position; an unchanged key keeps its
//!   marker, listeners and widget.
//! - Placeholders are recreated only when the buffer text differs from the
//!   text they were rendered from, or when a render is forced.
//! - Two passes with no intervening change report zero created/cleared.

use crate::markers::handle::MarkerHandle;
use crate::markers::link::{create_link_marker, scan_links, LinkKey, LinkMatch};
use crate::markers::placeholder::{create_placeholder_marker, scan_placeholders};
use crate::model::passage::Story;
use crate::surface::events::{EventHub, Modifier, WidgetId};
use crate::surface::{EditorSurface, TextRange};
use log::debug;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

/// Marker churn produced by one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub created: usize,
    pub cleared: usize,
}

impl ReconcileReport {
    pub fn is_noop(&self) -> bool {
        self.created == 0 && self.cleared == 0
    }

    fn absorb(&mut self, other: ReconcileReport) {
        self.created += other.created;
        self.cleared += other.cleared;
    }
}

/// Owner of the marker set rendered on one surface.
pub struct MarkerReconciler {
    hub: Rc<EventHub>,
    link_modifier: Modifier,
    placeholders: Vec<MarkerHandle>,
    placeholder_source: Option<String>,
    links: BTreeMap<LinkKey, MarkerHandle>,
}

impl MarkerReconciler {
    pub fn new(hub: Rc<EventHub>, link_modifier: Modifier) -> Self {
        Self {
            hub,
            link_modifier,
            placeholders: Vec::new(),
            placeholder_source: None,
            links: BTreeMap::new(),
        }
    }

    /// Runs both scans against the current buffer.
    pub fn reconcile(
        &mut self,
        surface: &mut dyn EditorSurface,
        story: &Story,
        force_placeholders: bool,
    ) -> ReconcileReport {
        let mut report = self.render_placeholders(surface, force_placeholders);
        report.absorb(self.render_links(surface, story));
        if !report.is_noop() {
            debug!(
                "event=markers_reconciled module=markers status=ok created={} cleared={} links={} placeholders={}",
                report.created,
                report.cleared,
                self.links.len(),
                self.placeholders.len()
            );
        }
        report
    }

    /// Recreates placeholder markers when the text changed or `force` is set.
    pub fn render_placeholders(
        &mut self,
        surface: &mut dyn EditorSurface,
        force: bool,
    ) -> ReconcileReport {
        let text = surface.text();
        if !force && self.placeholder_source.as_deref() == Some(text.as_str()) {
            return ReconcileReport::default();
        }

        let mut report = ReconcileReport {
            cleared: self.placeholders.len(),
            ..ReconcileReport::default()
        };
        for handle in self.placeholders.drain(..) {
            handle.clear(surface);
        }

        for placeholder in scan_placeholders(&surface.lines()) {
            let handle = create_placeholder_marker(surface, &self.hub, &placeholder);
            self.placeholders.push(handle);
            report.created += 1;
        }
        self.placeholder_source = Some(text);
        report
    }

    /// Brings link markers in line with the resolvable links in the buffer.
    pub fn render_links(&mut self, surface: &mut dyn EditorSurface, story: &Story) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        // Markers move with edits, so re-key them by where they sit now.
        let mut current: BTreeMap<LinkKey, MarkerHandle> = BTreeMap::new();
        for (_, handle) in std::mem::take(&mut self.links) {
            let (Some(info), Some(passage_id)) = (surface.find_marker(handle.id()), handle.passage_id())
            else {
                // Swallowed by an overlapping edit; dropping detaches listeners.
                report.cleared += 1;
                continue;
            };
            let key = LinkKey {
                passage_id,
                line: info.range.from.line,
                ch: info.range.from.ch,
            };
            if let Some(duplicate) = current.insert(key, handle) {
                duplicate.clear(surface);
                report.cleared += 1;
            }
        }

        let wanted: Vec<LinkMatch> = scan_links(&surface.lines(), story);
        let wanted_keys: BTreeSet<LinkKey> = wanted.iter().map(|link| link.key).collect();

        let stale: Vec<LinkKey> = current
            .keys()
            .filter(|key| !wanted_keys.contains(key))
            .copied()
            .collect();
        for key in stale {
            if let Some(handle) = current.remove(&key) {
                handle.clear(surface);
                report.cleared += 1;
            }
        }

        for link in wanted {
            if current.contains_key(&link.key) {
                continue;
            }
            let handle = create_link_marker(surface, &self.hub, &link, self.link_modifier);
            current.insert(link.key, handle);
            report.created += 1;
        }

        self.links = current;
        report
    }

    /// Clears every marker this reconciler rendered.
    pub fn teardown(&mut self, surface: &mut dyn EditorSurface) -> usize {
        let cleared = self.placeholders.len() + self.links.len();
        for handle in self.placeholders.drain(..) {
            handle.clear(surface);
        }
        for (_, handle) in std::mem::take(&mut self.links) {
            handle.clear(surface);
        }
        self.placeholder_source = None;
        cleared
    }

    /// Live placeholder ranges with their widgets, in document order.
    pub fn placeholders(&self, surface: &dyn EditorSurface) -> Vec<(TextRange, WidgetId)> {
        let mut live: Vec<(TextRange, WidgetId)> = self
            .placeholders
            .iter()
            .filter_map(|handle| {
                surface
                    .find_marker(handle.id())
                    .map(|info| (info.range, handle.widget().id))
            })
            .collect();
        live.sort_by_key(|(range, _)| range.from);
        live
    }

    pub fn first_placeholder(&self, surface: &dyn EditorSurface) -> Option<(TextRange, WidgetId)> {
        self.placeholders(surface).into_iter().next()
    }

    pub fn link_keys(&self) -> Vec<LinkKey> {
        self.links.keys().copied().collect()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn placeholder_count(&self) -> usize {
        self.placeholders.len()
    }

    pub fn link_modifier(&self) -> Modifier {
        self.link_modifier
    }
}

#[cfg(test)]
mod tests {
    use super::MarkerReconciler;
    use crate::model::passage::{Passage, Story};
    use crate::surface::events::{EventHub, Modifier};
    use crate::surface::memory::MemorySurface;
    use crate::surface::{EditorSurface, TextPosition, TextRange};
    use std::rc::Rc;

    fn story_with(names: &[&str]) -> Story {
        let mut story = Story::new("Test", "Harlowe", "3.3.8");
        story.passages = names
            .iter()
            .map(|name| Rc::new(Passage::new(*name, "")))
            .collect();
        story
    }

    #[test]
    fn second_pass_without_changes_is_a_noop() {
        let story = story_with(&["Start"]);
        let hub = Rc::new(EventHub::new());
        let mut surface = MemorySurface::new("[[Start]] ${1:name}");
        let mut reconciler = MarkerReconciler::new(Rc::clone(&hub), Modifier::Alt);

        let first = reconciler.reconcile(&mut surface, &story, false);
        assert_eq!(first.created, 2);
        let listeners = hub.len();

        let second = reconciler.reconcile(&mut surface, &story, false);
        assert!(second.is_noop());
        assert_eq!(hub.len(), listeners);
    }

    #[test]
    fn links_keep_identity_when_text_before_them_changes() {
        let story = story_with(&["Start"]);
        let hub = Rc::new(EventHub::new());
        let mut surface = MemorySurface::new("Go [[Start]]");
        let mut reconciler = MarkerReconciler::new(Rc::clone(&hub), Modifier::Alt);
        reconciler.reconcile(&mut surface, &story, false);
        let before = surface.markers()[0].id;

        surface.replace_range("Now ", TextPosition::new(0, 0), TextPosition::new(0, 0));
        let report = reconciler.render_links(&mut surface, &story);

        assert!(report.is_noop());
        assert_eq!(surface.markers()[0].id, before);
        assert_eq!(reconciler.link_keys()[0].ch, 7);
    }

    #[test]
    fn same_target_links_get_distinct_markers() {
        let story = story_with(&["Start"]);
        let hub = Rc::new(EventHub::new());
        let mut surface = MemorySurface::new("[[Start]] and [[Start]]");
        let mut reconciler = MarkerReconciler::new(Rc::clone(&hub), Modifier::Alt);
        reconciler.reconcile(&mut surface, &story, false);

        let markers = surface.markers();
        assert_eq!(markers.len(), 2);
        assert_ne!(markers[0].id, markers[1].id);

        surface.replace_range("", TextPosition::new(0, 0), TextPosition::new(0, 9));
        let report = reconciler.render_links(&mut surface, &story);
        assert_eq!(report.cleared, 1);
        assert_eq!(report.created, 0);
        assert_eq!(surface.markers()[0].id, markers[1].id);
    }

    #[test]
    fn forced_render_recreates_placeholders() {
        let story = story_with(&[]);
        let hub = Rc::new(EventHub::new());
        let mut surface = MemorySurface::new("${1:name} and ${2:age}");
        let mut reconciler = MarkerReconciler::new(Rc::clone(&hub), Modifier::Alt);
        reconciler.reconcile(&mut surface, &story, false);

        let report = reconciler.reconcile(&mut surface, &story, true);
        assert_eq!(report.created, 2);
        assert_eq!(report.cleared, 2);
        assert_eq!(
            reconciler.first_placeholder(&surface).map(|(range, _)| range),
            Some(TextRange::on_line(0, 0, 9))
        );
    }

    #[test]
    fn teardown_leaves_no_markers_or_listeners() {
        let story = story_with(&["Start"]);
        let hub = Rc::new(EventHub::new());
        let mut surface = MemorySurface::new("[[Start]] ${1:x}");
        let mut reconciler = MarkerReconciler::new(Rc::clone(&hub), Modifier::Alt);
        reconciler.reconcile(&mut surface, &story, false);

        assert_eq!(reconciler.teardown(&mut surface), 2);
        assert!(surface.markers().is_empty());
        assert!(hub.is_empty());
    }
}
