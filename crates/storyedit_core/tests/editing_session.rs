use std::rc::Rc;
use storyedit_core::surface::MarkerClass;
use storyedit_core::{
    EditorConfig, EditorSurface, FormatRegistry, MemoryStoryStore, MemorySurface, Passage,
    PassageEditSession, PassageId, PassageUpdate, SelectionRange, Story, StoryId, StoryStore,
    TextPosition, TextRange,
};

struct Harness {
    store: Rc<MemoryStoryStore>,
    story_id: StoryId,
    passage_id: PassageId,
    session: PassageEditSession<MemorySurface>,
}

impl Harness {
    /// Opens the first of `passages` for editing, with no format loaded.
    fn open(passages: &[(&str, &str)]) -> Self {
        let store = Rc::new(MemoryStoryStore::new());
        let mut story = Story::new("Journey", "Harlowe", "3.3.8");
        story.passages = passages
            .iter()
            .map(|(name, text)| Rc::new(Passage::new(*name, *text)))
            .collect();
        let story_id = story.id;
        let passage_id = story.passages[0].id;
        store.insert_story(story);

        let mut formats = FormatRegistry::new();
        formats.register("Harlowe", "3.3.8").unwrap();
        let dyn_store: Rc<dyn StoryStore> = store.clone();
        let mut session = PassageEditSession::open(
            dyn_store,
            &formats,
            story_id,
            passage_id,
            EditorConfig::default(),
        )
        .unwrap();
        session.attach_surface(MemorySurface::new("")).unwrap();

        Self {
            store,
            story_id,
            passage_id,
            session,
        }
    }

    fn type_at(&mut self, text: &str, now_ms: u64) {
        self.session.surface_mut().unwrap().type_text(text);
        self.session.handle_local_change(now_ms).unwrap();
    }

    fn stored_text(&self) -> String {
        self.store
            .passage(self.story_id, self.passage_id)
            .unwrap()
            .text
            .clone()
    }

    fn surface(&self) -> &MemorySurface {
        self.session.surface().unwrap()
    }

    fn link_ranges(&self) -> Vec<TextRange> {
        self.surface()
            .markers()
            .into_iter()
            .filter(|marker| marker.class == MarkerClass::PassageLink)
            .map(|marker| marker.range)
            .collect()
    }
}

#[test]
fn rapid_typing_commits_once_with_final_text() {
    let mut harness = Harness::open(&[("Intro", "")]);
    harness.type_at("a", 0);
    harness.type_at("b", 300);
    harness.type_at("c", 600);

    assert!(!harness.session.advance_to(1_599));
    assert_eq!(harness.store.update_count(), 0);
    assert!(harness.session.advance_to(1_600));
    assert_eq!(harness.store.update_count(), 1);
    assert_eq!(harness.stored_text(), "abc");
    assert!(!harness.session.advance_to(5_000));
}

#[test]
fn quiet_period_commits_intermediate_text() {
    let mut harness = Harness::open(&[("Intro", "")]);
    harness.type_at("a", 0);
    harness.type_at("b", 100);
    assert!(harness.session.advance_to(1_100));
    assert_eq!(harness.stored_text(), "ab");

    harness.session.sync_from_store(1_150).unwrap();
    harness.type_at("c", 1_200);
    assert!(harness.session.advance_to(2_200));
    assert_eq!(harness.stored_text(), "abc");
    assert_eq!(harness.store.update_count(), 2);
}

#[test]
fn overdue_commit_fires_before_next_keystroke() {
    let mut harness = Harness::open(&[("Intro", "")]);
    harness.type_at("a", 0);
    harness.type_at("b", 100);

    harness.type_at("c", 1_500);
    assert_eq!(harness.store.update_count(), 1);
    assert_eq!(harness.stored_text(), "ab");
    assert_eq!(harness.session.next_deadline(), Some(2_500));

    assert!(harness.session.advance_to(2_500));
    assert_eq!(harness.stored_text(), "abc");
    assert_eq!(harness.store.update_count(), 2);
}

#[test]
fn overdue_commit_fires_before_store_sync() {
    let mut harness = Harness::open(&[("Intro", ""), ("Elsewhere", "")]);
    harness.type_at("a", 0);

    let other_id = harness.store.story(harness.story_id).unwrap().passages[1].id;
    harness
        .store
        .update_passage(harness.story_id, other_id, PassageUpdate::text("moved on"));
    harness.session.sync_from_store(1_500).unwrap();

    assert_eq!(harness.stored_text(), "a");
    assert_eq!(harness.session.next_deadline(), None);
    assert!(!harness.session.advance_to(1_500));
    assert_eq!(harness.surface().text(), "a");
}

#[test]
fn overdue_commit_wins_over_stale_snapshot() {
    let mut harness = Harness::open(&[("Intro", ""), ("Elsewhere", "")]);
    harness.type_at("a", 0);

    let mut stale = harness.store.story(harness.story_id).unwrap();
    stale.passages[1] = Rc::new(Passage::new("Elsewhere", "moved on"));
    harness.session.handle_story_change(stale, 1_500).unwrap();

    assert_eq!(harness.stored_text(), "a");
    assert_eq!(harness.surface().text(), "a");
    assert_eq!(harness.session.local_text(), "a");
    assert!(!harness.session.is_commit_pending());
}

#[test]
fn external_text_never_overrides_pending_edit() {
    let mut harness = Harness::open(&[("Intro", "draft")]);
    harness.session.surface_mut().unwrap().set_cursor(TextPosition::new(0, 5));
    harness.type_at("!", 0);

    harness.store.update_passage(
        harness.story_id,
        harness.passage_id,
        PassageUpdate::text("from elsewhere"),
    );
    harness.session.sync_from_store(200).unwrap();
    assert_eq!(harness.surface().text(), "draft!");
    assert_eq!(harness.session.local_text(), "draft!");

    let deadline = harness.session.next_deadline().unwrap();
    assert!(harness.session.advance_to(deadline));
    assert_eq!(harness.stored_text(), "draft!");
}

#[test]
fn external_text_is_adopted_when_idle() {
    let mut harness = Harness::open(&[("Intro", "old")]);
    harness.store.update_passage(
        harness.story_id,
        harness.passage_id,
        PassageUpdate::text("new text"),
    );
    harness.session.sync_from_store(10).unwrap();
    assert_eq!(harness.surface().text(), "new text");
    assert!(!harness.session.is_commit_pending());
}

#[test]
fn creating_link_target_adds_exactly_one_marker() {
    let mut harness = Harness::open(&[("Intro", "Go to [[Start]]")]);
    assert!(harness.link_ranges().is_empty());

    harness
        .store
        .create_passage(harness.story_id, Passage::new("Start", ""))
        .unwrap();
    harness.session.sync_from_store(10).unwrap();

    assert_eq!(harness.link_ranges(), vec![TextRange::on_line(0, 6, 9)]);
    assert_eq!(harness.session.markers().link_count(), 1);
}

#[test]
fn renaming_link_target_removes_marker() {
    let mut harness = Harness::open(&[("Intro", "Enter the [[Cave]]"), ("Cave", "dark")]);
    assert_eq!(harness.link_ranges().len(), 1);

    let cave_id = harness.session.story().passages[1].id;
    harness
        .store
        .update_passage(harness.story_id, cave_id, PassageUpdate::name("Grotto"));
    harness.session.sync_from_store(10).unwrap();

    assert!(harness.link_ranges().is_empty());
    assert_eq!(harness.session.markers().link_count(), 0);
}

#[test]
fn same_target_links_are_cleared_independently() {
    let mut harness = Harness::open(&[("Intro", "[[Cave]] or [[Cave]]"), ("Cave", "")]);
    let markers = harness.surface().markers();
    assert_eq!(markers.len(), 2);
    assert_ne!(markers[0].id, markers[1].id);
    let second = markers[1].id;

    harness
        .session
        .surface_mut()
        .unwrap()
        .replace_range("", TextPosition::new(0, 0), TextPosition::new(0, 12));
    harness.session.handle_local_change(10).unwrap();

    let remaining = harness.surface().markers();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, second);
    assert_eq!(remaining[0].range, TextRange::on_line(0, 0, 8));
    assert_eq!(harness.session.markers().link_count(), 1);
}

#[test]
fn unrelated_story_change_keeps_markers() {
    let mut harness = Harness::open(&[
        ("Intro", "${1:hero} meets [[Cave]]"),
        ("Cave", ""),
        ("Other", ""),
    ]);
    let before: Vec<_> = harness
        .surface()
        .markers()
        .into_iter()
        .map(|marker| marker.id)
        .collect();
    let listeners = harness.session.listener_count();

    let other_id = harness.session.story().passages[2].id;
    harness
        .store
        .update_passage(harness.story_id, other_id, PassageUpdate::text("changed"));
    harness.session.sync_from_store(10).unwrap();

    let after: Vec<_> = harness
        .surface()
        .markers()
        .into_iter()
        .map(|marker| marker.id)
        .collect();
    assert_eq!(before, after);
    assert_eq!(harness.session.listener_count(), listeners);
}

#[test]
fn tab_cycles_placeholders_and_wraps() {
    let mut harness = Harness::open(&[("Intro", "${1:name} and ${2:age}")]);
    harness
        .session
        .surface_mut()
        .unwrap()
        .set_cursor(TextPosition::new(0, 0));

    let first = SelectionRange::new(TextPosition::new(0, 0), TextPosition::new(0, 9));
    let second = SelectionRange::new(TextPosition::new(0, 14), TextPosition::new(0, 22));

    assert!(harness.session.handle_key("Tab").unwrap());
    assert_eq!(harness.surface().selections(), vec![first]);
    assert!(harness.session.handle_key("Tab").unwrap());
    assert_eq!(harness.surface().selections(), vec![second]);
    assert!(harness.session.handle_key("Tab").unwrap());
    assert_eq!(harness.surface().selections(), vec![first]);

    assert!(harness.session.handle_key("Shift-Tab").unwrap());
    assert_eq!(harness.surface().selections(), vec![second]);
}

#[test]
fn tab_without_placeholders_is_not_consumed() {
    let mut harness = Harness::open(&[("Intro", "plain text")]);
    assert!(!harness.session.handle_key("Tab").unwrap());
    assert!(!harness.session.handle_key("Enter").unwrap());
}

#[test]
fn selected_placeholder_widget_tracks_selection() {
    let mut harness = Harness::open(&[("Intro", "${1:name} and ${2:age}")]);
    harness
        .session
        .surface_mut()
        .unwrap()
        .set_cursor(TextPosition::new(0, 10));
    harness.session.handle_key("Tab").unwrap();

    let widgets: Vec<_> = harness
        .surface()
        .markers()
        .into_iter()
        .filter_map(|marker| marker.widget)
        .collect();
    assert_eq!(widgets.len(), 2);
    assert!(!widgets[0].is_selected());
    assert!(widgets[1].is_selected());
}

#[test]
fn detach_leaves_no_listener_behind() {
    let mut harness = Harness::open(&[("Intro", "${1:a} [[Cave]] [[Cave]]"), ("Cave", "")]);
    assert!(harness.session.listener_count() > 0);

    let surface = harness.session.detach_surface().unwrap();
    assert!(surface.markers().is_empty());
    assert_eq!(harness.session.listener_count(), 0);
    assert!(harness.session.detach_surface().is_none());
}
