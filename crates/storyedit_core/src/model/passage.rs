//! Passage and story domain model.
//!
//! # Responsibility
//! - Define the records the editor core reads from the story store.
//! - Provide immutable-update helpers that mint a new revision per edit.
//!
//! # Invariants
//! - `Passage::id` is stable for the passage lifetime and never reused.
//! - Every edit yields a new `Rc<Passage>`; the pointer is the revision
//!   identity used by staleness detection, the `id` is the passage identity.
//! - Passage names are unique within a story (link resolution relies on it).

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::rc::Rc;
use uuid::Uuid;

/// Stable passage identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PassageId(pub Uuid);

impl PassageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PassageId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for PassageId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable story identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoryId(pub Uuid);

impl StoryId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for StoryId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for StoryId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Position of a passage card on the story map.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MapPoint {
    pub left: f64,
    pub top: f64,
}

/// Size of a passage card on the story map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapSize {
    pub width: f64,
    pub height: f64,
}

impl Default for MapSize {
    fn default() -> Self {
        Self {
            width: 100.0,
            height: 100.0,
        }
    }
}

/// One passage of a story.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    pub id: PassageId,
    pub name: String,
    /// Source text in the story format's scripting language.
    pub text: String,
    pub tags: Vec<String>,
    /// Format binding of the owning story; empty until the passage joins one.
    #[serde(default)]
    pub story_format: String,
    #[serde(default)]
    pub story_format_version: String,
    pub position: MapPoint,
    pub size: MapSize,
}

impl Passage {
    /// Creates a passage with a generated stable ID.
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: PassageId::new(),
            name: name.into(),
            text: text.into(),
            tags: Vec::new(),
            story_format: String::new(),
            story_format_version: String::new(),
            position: MapPoint::default(),
            size: MapSize::default(),
        }
    }

    /// Returns a new revision of this passage with `update` applied.
    pub fn updated(&self, update: &PassageUpdate) -> Self {
        let mut next = self.clone();
        if let Some(name) = &update.name {
            next.name = name.clone();
        }
        if let Some(text) = &update.text {
            next.text = text.clone();
        }
        if let Some(tags) = &update.tags {
            next.tags = tags.clone();
        }
        next
    }
}

/// Partial passage fields for `StoryStore::update_passage`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassageUpdate {
    pub name: Option<String>,
    pub text: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl PassageUpdate {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }
}

/// Ordered passage collection plus story format binding.
#[derive(Debug, Clone)]
pub struct Story {
    pub id: StoryId,
    pub name: String,
    pub story_format: String,
    pub story_format_version: String,
    pub passages: Vec<Rc<Passage>>,
}

impl Story {
    pub fn new(
        name: impl Into<String>,
        story_format: impl Into<String>,
        story_format_version: impl Into<String>,
    ) -> Self {
        Self {
            id: StoryId::new(),
            name: name.into(),
            story_format: story_format.into(),
            story_format_version: story_format_version.into(),
            passages: Vec::new(),
        }
    }

    /// Appends `passage` stamped with this story's format binding.
    pub fn add_passage(&mut self, mut passage: Passage) -> Rc<Passage> {
        passage.story_format = self.story_format.clone();
        passage.story_format_version = self.story_format_version.clone();
        let passage = Rc::new(passage);
        self.passages.push(Rc::clone(&passage));
        passage
    }

    pub fn passage_with_id(&self, id: PassageId) -> Option<&Rc<Passage>> {
        self.passages.iter().find(|passage| passage.id == id)
    }

    pub fn passage_with_name(&self, name: &str) -> Option<&Rc<Passage>> {
        self.passages.iter().find(|passage| passage.name == name)
    }

    /// Returns whether both stories hold the same passage revisions, in order.
    pub fn same_passages(&self, other: &Story) -> bool {
        self.passages.len() == other.passages.len()
            && self
                .passages
                .iter()
                .zip(other.passages.iter())
                .all(|(left, right)| Rc::ptr_eq(left, right))
    }
}

#[cfg(test)]
mod tests {
    use super::{Passage, PassageUpdate, Story};
    use std::rc::Rc;

    #[test]
    fn update_keeps_identity_and_changes_fields() {
        let passage = Passage::new("Start", "Hello");
        let next = passage.updated(&PassageUpdate::text("Hello again"));
        assert_eq!(next.id, passage.id);
        assert_eq!(next.name, "Start");
        assert_eq!(next.text, "Hello again");
    }

    #[test]
    fn same_passages_compares_revisions_not_values() {
        let mut story = Story::new("Demo", "Harlowe", "3.3.8");
        story.passages.push(Rc::new(Passage::new("Start", "")));
        let copy = story.clone();
        assert!(story.same_passages(&copy));

        let mut edited = story.clone();
        edited.passages[0] = Rc::new((*story.passages[0]).clone());
        assert!(!story.same_passages(&edited));
    }

    #[test]
    fn added_passage_carries_story_format() {
        let mut story = Story::new("Demo", "Harlowe", "3.3.8");
        let added = story.add_passage(Passage::new("Start", ""));
        assert_eq!(added.story_format, "Harlowe");
        assert_eq!(added.story_format_version, "3.3.8");
        assert!(Rc::ptr_eq(&added, &story.passages[0]));

        let renamed = added.updated(&PassageUpdate::name("Begin"));
        assert_eq!(renamed.story_format, "Harlowe");
    }
}
