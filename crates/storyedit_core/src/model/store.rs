//! Story store contract and in-memory implementation.
//!
//! # Responsibility
//! - Define the collaborator contract the editor core resolves stories and
//!   passages through, and the fire-and-forget passage mutation it emits.
//! - Provide a headless in-memory store for embedding hosts and tests.
//!
//! # Invariants
//! - `update_passage` replaces the passage `Rc` (new revision) and keeps
//!   the passage `id` and its position in the story.
//! - Updates to unknown stories or passages are dropped with a warning; the
//!   store is assumed eventually consistent, never a source of errors.

use crate::model::passage::{Passage, PassageId, PassageUpdate, Story, StoryId};
use log::warn;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

/// Read/mutate contract over the application's story state.
pub trait StoryStore {
    /// Resolves a story snapshot by ID.
    fn story(&self, story_id: StoryId) -> Option<Story>;

    /// Applies a partial passage update. Fire-and-forget.
    fn update_passage(&self, story_id: StoryId, passage_id: PassageId, update: PassageUpdate);

    /// Resolves one passage revision by ID.
    fn passage(&self, story_id: StoryId, passage_id: PassageId) -> Option<Rc<Passage>> {
        self.story(story_id)
            .and_then(|story| story.passage_with_id(passage_id).cloned())
    }
}

/// In-memory story store.
#[derive(Debug, Default)]
pub struct MemoryStoryStore {
    stories: RefCell<BTreeMap<StoryId, Story>>,
    update_count: Cell<usize>,
}

impl MemoryStoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces one story.
    pub fn insert_story(&self, story: Story) {
        self.stories.borrow_mut().insert(story.id, story);
    }

    /// Appends a passage to a story, returning its new revision.
    pub fn create_passage(&self, story_id: StoryId, passage: Passage) -> Option<Rc<Passage>> {
        let mut stories = self.stories.borrow_mut();
        let story = stories.get_mut(&story_id)?;
        let passage = Rc::new(passage);
        story.passages.push(Rc::clone(&passage));
        Some(passage)
    }

    /// Removes a passage from a story.
    pub fn delete_passage(&self, story_id: StoryId, passage_id: PassageId) -> bool {
        let mut stories = self.stories.borrow_mut();
        let Some(story) = stories.get_mut(&story_id) else {
            return false;
        };
        let before = story.passages.len();
        story.passages.retain(|passage| passage.id != passage_id);
        story.passages.len() != before
    }

    /// Number of `update_passage` calls that changed a passage.
    pub fn update_count(&self) -> usize {
        self.update_count.get()
    }
}

impl StoryStore for MemoryStoryStore {
    fn story(&self, story_id: StoryId) -> Option<Story> {
        self.stories.borrow().get(&story_id).cloned()
    }

    fn update_passage(&self, story_id: StoryId, passage_id: PassageId, update: PassageUpdate) {
        let mut stories = self.stories.borrow_mut();
        let Some(story) = stories.get_mut(&story_id) else {
            warn!("event=passage_update module=store status=skipped reason=story_missing story_id={story_id}");
            return;
        };
        let Some(slot) = story
            .passages
            .iter_mut()
            .find(|passage| passage.id == passage_id)
        else {
            warn!(
                "event=passage_update module=store status=skipped reason=passage_missing passage_id={passage_id}"
            );
            return;
        };

        *slot = Rc::new(slot.updated(&update));
        self.update_count.set(self.update_count.get() + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::{MemoryStoryStore, StoryStore};
    use crate::model::passage::{Passage, PassageId, PassageUpdate, Story};
    use std::rc::Rc;

    #[test]
    fn update_replaces_revision_but_keeps_id() {
        let store = MemoryStoryStore::new();
        let story = Story::new("Demo", "Harlowe", "3.3.8");
        let story_id = story.id;
        store.insert_story(story);
        let created = store
            .create_passage(story_id, Passage::new("Start", "one"))
            .expect("story exists");

        store.update_passage(story_id, created.id, PassageUpdate::text("two"));

        let current = store.passage(story_id, created.id).expect("passage exists");
        assert_eq!(current.text, "two");
        assert_eq!(current.id, created.id);
        assert!(!Rc::ptr_eq(&current, &created));
        assert_eq!(store.update_count(), 1);
    }

    #[test]
    fn update_for_unknown_passage_is_dropped() {
        let store = MemoryStoryStore::new();
        let story = Story::new("Demo", "Harlowe", "3.3.8");
        let story_id = story.id;
        store.insert_story(story);

        store.update_passage(story_id, PassageId::new(), PassageUpdate::text("x"));
        assert_eq!(store.update_count(), 0);
    }
}
