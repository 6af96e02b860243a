//! Incremental variable scanning for one story.
//!
//! # Invariants
//! - A passage is re-scanned iff its `Rc` differs from the one last scanned.
//! - A parser failure scans the passage as if it defined nothing.
//! - Passages that left the story are removed from the index.

use crate::extension::guard::{ExtensionGuard, HookKind};
use crate::extension::hooks::VariableHooks;
use crate::model::passage::{Passage, PassageId, Story};
use crate::variables::index::VariableIndex;
use log::debug;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

/// Work done by one `sync`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub rescanned: usize,
    pub removed: usize,
    pub faults: usize,
}

/// Keeps a `VariableIndex` in step with a story's passages.
pub struct VariableTracker {
    index: VariableIndex,
    scanned: BTreeMap<PassageId, Rc<Passage>>,
    hooks: VariableHooks,
    guard: ExtensionGuard,
}

impl VariableTracker {
    pub fn new(hooks: VariableHooks, guard: ExtensionGuard) -> Self {
        Self {
            index: VariableIndex::new(),
            scanned: BTreeMap::new(),
            hooks,
            guard,
        }
    }

    pub fn sync(&mut self, story: &Story) -> SyncReport {
        let mut report = SyncReport::default();

        for passage in &story.passages {
            if self
                .scanned
                .get(&passage.id)
                .is_some_and(|seen| Rc::ptr_eq(seen, passage))
            {
                continue;
            }
            let parser = &self.hooks.parse_definitions;
            let tokens = match self
                .guard
                .call(HookKind::ParseDefinitions, || parser(&passage.text))
            {
                Ok(tokens) => tokens,
                Err(_) => {
                    report.faults += 1;
                    Vec::new()
                }
            };
            self.index.reset_passage(passage, &tokens);
            self.scanned.insert(passage.id, Rc::clone(passage));
            report.rescanned += 1;
        }

        let present: BTreeSet<PassageId> = story.passages.iter().map(|p| p.id).collect();
        let departed: Vec<PassageId> = self
            .scanned
            .keys()
            .filter(|id| !present.contains(id))
            .copied()
            .collect();
        for id in departed {
            if let Some(passage) = self.scanned.remove(&id) {
                self.index.remove_passage(&passage);
                report.removed += 1;
            }
        }

        if report != SyncReport::default() {
            debug!(
                "event=variables_synced module=variables status=ok rescanned={} removed={} faults={}",
                report.rescanned, report.removed, report.faults
            );
        }
        report
    }

    pub fn index(&self) -> &VariableIndex {
        &self.index
    }

    pub fn hooks(&self) -> &VariableHooks {
        &self.hooks
    }

    pub fn guard(&self) -> &ExtensionGuard {
        &self.guard
    }
}

#[cfg(test)]
mod tests {
    use super::VariableTracker;
    use crate::extension::guard::ExtensionGuard;
    use crate::extension::hooks::{ExtensionError, VariableHooks};
    use crate::model::passage::{Passage, PassageUpdate, Story};
    use crate::surface::TextPosition;
    use crate::variables::index::{ParsedToken, VariableToken};
    use std::cell::Cell;
    use std::rc::Rc;

    /// Treats every `$name=value` word as a global definition.
    fn assignment_parser(calls: Rc<Cell<usize>>) -> VariableHooks {
        VariableHooks::new(Rc::new(move |text: &str| {
            calls.set(calls.get() + 1);
            if text.contains("!crash") {
                return Err(ExtensionError::failed("parser rejected input"));
            }
            Ok(text
                .split_whitespace()
                .filter_map(|word| word.strip_prefix('$'))
                .filter_map(|word| word.split_once('='))
                .map(|(name, value)| {
                    ParsedToken::Token(VariableToken {
                        name: name.to_string(),
                        position: TextPosition::new(0, 0),
                        expression: Some(value.to_string()),
                        local: false,
                    })
                })
                .collect())
        }))
    }

    fn story(passages: Vec<Passage>) -> Story {
        let mut story = Story::new("Test", "Harlowe", "3.3.8");
        story.passages = passages.into_iter().map(Rc::new).collect();
        story
    }

    #[test]
    fn rescans_only_changed_passages() {
        let calls = Rc::new(Cell::new(0));
        let mut tracker = VariableTracker::new(
            assignment_parser(Rc::clone(&calls)),
            ExtensionGuard::new("Harlowe", "3.3.8"),
        );
        let mut story = story(vec![
            Passage::new("First", "$gold=5"),
            Passage::new("Second", "$hp=10"),
        ]);

        assert_eq!(tracker.sync(&story).rescanned, 2);
        assert_eq!(tracker.sync(&story).rescanned, 0);
        assert_eq!(calls.get(), 2);

        story.passages[1] = Rc::new(story.passages[1].updated(&PassageUpdate::text("$mp=3")));
        assert_eq!(tracker.sync(&story).rescanned, 1);
        assert!(tracker.index().global("hp").is_none());
        assert!(tracker.index().global("mp").is_some());
    }

    #[test]
    fn removed_passages_leave_the_index() {
        let mut tracker = VariableTracker::new(
            assignment_parser(Rc::new(Cell::new(0))),
            ExtensionGuard::new("Harlowe", "3.3.8"),
        );
        let mut story = story(vec![Passage::new("First", "$gold=5")]);
        tracker.sync(&story);
        story.passages.clear();

        let report = tracker.sync(&story);
        assert_eq!(report.removed, 1);
        assert!(tracker.index().global("gold").is_none());
    }

    #[test]
    fn parser_failure_scans_passage_as_empty() {
        let mut tracker = VariableTracker::new(
            assignment_parser(Rc::new(Cell::new(0))),
            ExtensionGuard::new("Harlowe", "3.3.8"),
        );
        let story = story(vec![Passage::new("Broken", "$gold=5 !crash")]);

        let report = tracker.sync(&story);
        assert_eq!(report.faults, 1);
        let names = tracker
            .index()
            .variable_names_for_passage(story.passages[0].id)
            .expect("scanned even though the parser failed");
        assert!(names.is_empty());
    }
}
