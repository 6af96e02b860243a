//! Editing session for one passage.
//!
//! # Responsibility
//! - Own the surface, marker set, change pipeline and variable tracker of
//!   one open passage editor.
//! - Route host input (text changes, keys, pointer events, completion
//!   picks, toolbar commands) to those components and apply their effects.
//!
//! # Invariants
//! - Deferred work runs only from `run_microtasks`, in FIFO order.
//! - Format extensions are consulted only while health is `Full`.
//! - After `detach_surface` no marker listener of this session survives.
//! - A `Crashed` session refuses editor operations; pending commits still
//!   flush through `advance_to`.

use crate::completion::link::cursor_in_link;
use crate::completion::{
    self, apply_pick, classify, detect_prefix, CompletionContext, CompletionError, CompletionKind,
    CompletionList,
};
use crate::config::{ConfigError, EditorConfig};
use crate::extension::guard::{ExtensionFault, ExtensionGuard, HookKind};
use crate::extension::hooks::{FormatExtensions, ToolbarContext, ToolbarItem};
use crate::extension::registry::FormatRegistry;
use crate::logging::{panic_payload_summary, sanitize_message, MAX_PANIC_PAYLOAD_CHARS};
use crate::markers::placeholder::next_placeholder;
use crate::markers::reconciler::MarkerReconciler;
use crate::model::passage::{Passage, PassageId, PassageUpdate, Story, StoryId};
use crate::model::store::StoryStore;
use crate::pipeline::debounce::{CommitTarget, DebouncedText};
use crate::session::health::{EditorHealth, RenderState};
use crate::surface::events::{Effect, EventHub, Modifiers, MouseButton, UiEvent, WidgetId};
use crate::surface::{EditorSurface, SelectionRange, SurfaceError, TextRange};
use crate::variables::tracker::VariableTracker;
use log::{debug, info, warn};
use regex::Regex;
use std::collections::VecDeque;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

/// Mode name reported when no format mode is active.
pub const PLAIN_TEXT_MODE: &str = "text";

/// Work queued behind the current handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Microtask {
    RestoreSelections(Vec<SelectionRange>),
    RenderPlaceholders { focus_first: bool },
    RefreshToolbar,
    /// Simulated click on a placeholder widget.
    ActivatePlaceholder(WidgetId),
}

/// Notifications for the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    OpenPassage(PassageId),
}

#[derive(Debug)]
pub enum SessionError {
    Config(ConfigError),
    StoryNotFound(StoryId),
    PassageNotFound(PassageId),
    NoEditorAttached,
    NoActiveCompletion,
    Surface(SurfaceError),
    Extension(ExtensionFault),
    Completion(CompletionError),
    SurfacePanicked(String),
    Crashed,
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{err}"),
            Self::StoryNotFound(id) => write!(f, "story not found: {id}"),
            Self::PassageNotFound(id) => write!(f, "passage not found: {id}"),
            Self::NoEditorAttached => write!(f, "no editor attached"),
            Self::NoActiveCompletion => write!(f, "no completion is open"),
            Self::Surface(err) => write!(f, "{err}"),
            Self::Extension(err) => write!(f, "{err}"),
            Self::Completion(err) => write!(f, "{err}"),
            Self::SurfacePanicked(message) => write!(f, "editor crashed: {message}"),
            Self::Crashed => write!(f, "editor is in a crashed state"),
        }
    }
}

impl Error for SessionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Surface(err) => Some(err),
            Self::Extension(err) => Some(err),
            Self::Completion(err) => Some(err),
            Self::StoryNotFound(_)
            | Self::PassageNotFound(_)
            | Self::NoEditorAttached
            | Self::NoActiveCompletion
            | Self::SurfacePanicked(_)
            | Self::Crashed => None,
        }
    }
}

impl From<ConfigError> for SessionError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<SurfaceError> for SessionError {
    fn from(value: SurfaceError) -> Self {
        Self::Surface(value)
    }
}

impl From<ExtensionFault> for SessionError {
    fn from(value: ExtensionFault) -> Self {
        Self::Extension(value)
    }
}

impl From<CompletionError> for SessionError {
    fn from(value: CompletionError) -> Self {
        Self::Completion(value)
    }
}

fn commit_target(
    store: &Rc<dyn StoryStore>,
    story_id: StoryId,
    passage_id: PassageId,
) -> CommitTarget {
    let store = Rc::clone(store);
    Rc::new(move |text: &str| {
        store.update_passage(story_id, passage_id, PassageUpdate::text(text));
    })
}

/// Controller for one open passage editor.
pub struct PassageEditSession<S: EditorSurface> {
    store: Rc<dyn StoryStore>,
    story: Story,
    passage: Rc<Passage>,
    config: EditorConfig,
    default_name_pattern: Regex,
    hub: Rc<EventHub>,
    surface: Option<S>,
    reconciler: MarkerReconciler,
    pipeline: DebouncedText,
    extensions: Option<Rc<FormatExtensions>>,
    guard: ExtensionGuard,
    variables: Option<VariableTracker>,
    health: EditorHealth,
    crash_message: Option<String>,
    mode_name: Option<String>,
    toolbar: Vec<ToolbarItem>,
    completion: Option<CompletionList>,
    microtasks: VecDeque<Microtask>,
    events: Vec<SessionEvent>,
    now_ms: u64,
}

impl<S: EditorSurface> PassageEditSession<S> {
    /// Opens a session on `passage_id`, resolving the story's format
    /// extensions from `formats`.
    pub fn open(
        store: Rc<dyn StoryStore>,
        formats: &FormatRegistry,
        story_id: StoryId,
        passage_id: PassageId,
        config: EditorConfig,
    ) -> Result<Self, SessionError> {
        config.validate()?;
        let default_name_pattern = config.variable_name_regex()?;
        let story = store
            .story(story_id)
            .ok_or(SessionError::StoryNotFound(story_id))?;
        let passage = story
            .passage_with_id(passage_id)
            .cloned()
            .ok_or(SessionError::PassageNotFound(passage_id))?;

        let extensions = formats.editor_extensions(
            &story.story_format,
            &story.story_format_version,
            &config,
        );
        let guard = ExtensionGuard::new(
            story.story_format.clone(),
            story.story_format_version.clone(),
        );
        let pipeline = DebouncedText::new(
            passage.text.clone(),
            commit_target(&store, story_id, passage_id),
            config.debounce_ms,
        );
        let hub = Rc::new(EventHub::new());
        let reconciler = MarkerReconciler::new(Rc::clone(&hub), config.link_modifier);

        let mut session = Self {
            store,
            story,
            passage,
            config,
            default_name_pattern,
            hub,
            surface: None,
            reconciler,
            pipeline,
            extensions,
            guard,
            variables: None,
            health: EditorHealth::Full,
            crash_message: None,
            mode_name: None,
            toolbar: Vec::new(),
            completion: None,
            microtasks: VecDeque::new(),
            events: Vec::new(),
            now_ms: 0,
        };
        session.rebuild_variables();
        info!(
            "event=session_open module=session status=ok story_id={} passage_id={} extensions={} variables={}",
            story_id,
            passage_id,
            session.extensions.is_some(),
            session.variables.is_some()
        );
        Ok(session)
    }

    /// Binds `surface`, loading the local text and rendering markers.
    pub fn attach_surface(&mut self, mut surface: S) -> Result<(), SessionError> {
        self.ensure_live()?;
        if let Some(mut previous) = self.surface.take() {
            self.reconciler.teardown(&mut previous);
        }
        surface.set_text(self.pipeline.local_text());
        self.reconciler.reconcile(&mut surface, &self.story, false);
        self.surface = Some(surface);
        self.register_mode();
        self.refresh_toolbar();
        info!(
            "event=surface_attach module=session status=ok mode={} links={} placeholders={}",
            self.mode_name(),
            self.reconciler.link_count(),
            self.reconciler.placeholder_count()
        );
        Ok(())
    }

    /// Tears the editor down: markers cleared, any pending commit dropped.
    pub fn detach_surface(&mut self) -> Option<S> {
        let mut surface = self.surface.take()?;
        let cleared = self.reconciler.teardown(&mut surface);
        if self.completion.take().is_some() {
            surface.close_hints();
        }
        let dropped = self.pipeline.teardown();
        self.microtasks.clear();
        info!(
            "event=surface_detach module=session status=ok markers_cleared={cleared} pending_dropped={dropped}"
        );
        Some(surface)
    }

    /// Reacts to a user edit already applied to the surface.
    pub fn handle_local_change(&mut self, now_ms: u64) -> Result<(), SessionError> {
        self.ensure_live()?;
        self.tick(now_ms);
        self.buffer_changed()?;
        if self.completion.is_some() {
            self.refresh_completion()?;
        } else {
            self.trigger_completion()?;
        }
        Ok(())
    }

    /// Adopts a new story snapshot: renames, external text, new passages.
    pub fn handle_story_change(&mut self, story: Story, now_ms: u64) -> Result<(), SessionError> {
        // A commit that fired on this tick makes `story` stale.
        let story = if self.tick(now_ms) {
            self.store.story(story.id).unwrap_or(story)
        } else {
            story
        };
        let passage = story
            .passage_with_id(self.passage.id)
            .cloned()
            .ok_or(SessionError::PassageNotFound(self.passage.id))?;
        let passage_changed = !Rc::ptr_eq(&passage, &self.passage);
        if !passage_changed && story.same_passages(&self.story) {
            return Ok(());
        }

        self.pipeline.retarget(
            commit_target(&self.store, story.id, passage.id),
            self.now_ms,
        );
        self.story = story;
        self.passage = passage;

        if self.pipeline.external_change(&self.passage.text) {
            if let Some(surface) = self.surface.as_mut() {
                surface.set_text(&self.passage.text);
            }
        }
        if let Some(tracker) = self.variables.as_mut() {
            tracker.sync(&self.story);
        }
        if self.health != EditorHealth::Crashed {
            if let Some(surface) = self.surface.as_mut() {
                self.reconciler.reconcile(surface, &self.story, false);
            }
        }
        Ok(())
    }

    /// Re-reads the story from the store and adopts it.
    pub fn sync_from_store(&mut self, now_ms: u64) -> Result<(), SessionError> {
        self.tick(now_ms);
        let story_id = self.story.id;
        let story = self
            .store
            .story(story_id)
            .ok_or(SessionError::StoryNotFound(story_id))?;
        self.handle_story_change(story, now_ms)
    }

    /// Moves the session clock forward. Returns whether a commit fired.
    pub fn advance_to(&mut self, now_ms: u64) -> bool {
        self.tick(now_ms)
    }

    /// Drains the microtask queue, including tasks queued while draining.
    pub fn run_microtasks(&mut self) -> usize {
        let mut ran = 0;
        while let Some(task) = self.microtasks.pop_front() {
            self.run_microtask(task);
            ran += 1;
        }
        ran
    }

    /// Routes a pointer or key event to marker listeners and applies the
    /// effects they request. The effects are returned for the host, which
    /// owns default actions.
    pub fn dispatch_event(&mut self, event: &UiEvent) -> Vec<Effect> {
        let effects = self.hub.dispatch(event);
        for effect in &effects {
            match effect {
                Effect::SetSelection(range) => {
                    self.select(vec![SelectionRange::new(range.from, range.to)]);
                }
                Effect::OpenPassage(passage_id) => {
                    info!(
                        "event=open_passage module=session status=ok passage_id={passage_id}"
                    );
                    self.events.push(SessionEvent::OpenPassage(*passage_id));
                }
                Effect::PreventDefault => {}
            }
        }
        effects
    }

    /// Applies a user selection change.
    ///
    /// Moving an empty cursor into a closed link reopens passage completion.
    pub fn handle_selection_change(
        &mut self,
        ranges: Vec<SelectionRange>,
    ) -> Result<(), SessionError> {
        self.ensure_live()?;
        if self.surface.is_none() {
            return Err(SessionError::NoEditorAttached);
        }
        self.select(ranges);
        if self.completion.is_some() {
            self.refresh_completion()?;
            return Ok(());
        }

        let Some(surface) = self.surface.as_ref() else {
            return Ok(());
        };
        let selections = surface.selections();
        let [selection] = selections.as_slice() else {
            return Ok(());
        };
        let cursor = selection.head;
        let in_link = selection.is_empty()
            && surface
                .line(cursor.line)
                .is_some_and(|line| cursor_in_link(&line, cursor.ch));
        if in_link {
            self.open_completion(CompletionKind::Link)?;
        }
        Ok(())
    }

    /// Tab / Shift-Tab placeholder cycling. Returns whether the key was
    /// consumed.
    pub fn handle_key(&mut self, key: &str) -> Result<bool, SessionError> {
        let reverse = match key {
            "Tab" => false,
            "Shift-Tab" => true,
            _ => return Ok(false),
        };
        self.ensure_live()?;
        let surface = self
            .surface
            .as_ref()
            .ok_or(SessionError::NoEditorAttached)?;

        let placeholders = self.reconciler.placeholders(surface);
        let ranges: Vec<TextRange> = placeholders.iter().map(|(range, _)| *range).collect();
        let Some(target) = next_placeholder(&ranges, surface.cursor(), reverse) else {
            return Ok(false);
        };
        let widget = placeholders
            .iter()
            .find(|(range, _)| *range == target)
            .map(|(_, widget)| *widget);
        if let Some(widget) = widget {
            self.activate_placeholder(widget);
        }
        Ok(true)
    }

    /// Opens completion for the prefix right before the cursor, if any.
    pub fn trigger_completion(&mut self) -> Result<Option<&CompletionList>, SessionError> {
        self.ensure_live()?;
        let surface = self
            .surface
            .as_ref()
            .ok_or(SessionError::NoEditorAttached)?;
        let Some(kind) = detect_prefix(surface).and_then(|prefix| classify(prefix, surface.cursor()))
        else {
            return Ok(None);
        };
        self.open_completion(kind)
    }

    /// Recomputes the open completion for the current cursor, closing it
    /// once the cursor leaves the completed span.
    pub fn refresh_completion(&mut self) -> Result<Option<&CompletionList>, SessionError> {
        self.ensure_live()?;
        let Some((kind, from)) = self.completion.as_ref().map(|list| (list.kind, list.from)) else {
            return Ok(None);
        };
        let surface = self
            .surface
            .as_ref()
            .ok_or(SessionError::NoEditorAttached)?;
        let cursor = surface.cursor();
        if cursor.line != from.line || cursor < from {
            self.close_completion();
            return Ok(None);
        }
        self.open_completion(kind)
    }

    /// Applies entry `index` of the open completion. Returns the command it
    /// ran, if any.
    pub fn pick_completion(&mut self, index: usize) -> Result<Option<String>, SessionError> {
        self.ensure_live()?;
        let list = self
            .completion
            .clone()
            .ok_or(SessionError::NoActiveCompletion)?;
        let surface = self
            .surface
            .as_mut()
            .ok_or(SessionError::NoEditorAttached)?;
        let command = apply_pick(surface, &list, index)?;
        surface.close_hints();
        self.completion = None;
        debug!(
            "event=completion_pick module=session status=ok kind={} index={index}",
            list.kind.as_str()
        );

        self.buffer_changed()?;
        if let Some(command) = &command {
            self.exec_command(command)?;
        }
        Ok(command)
    }

    pub fn close_completion(&mut self) {
        if self.completion.take().is_some() {
            if let Some(surface) = self.surface.as_mut() {
                surface.close_hints();
            }
        }
    }

    /// Runs a toolbar command: the format's command table first, then the
    /// surface built-ins.
    ///
    /// The selection snapshot is restored in a microtask, followed by a
    /// forced placeholder render that focuses the first placeholder and a
    /// toolbar refresh.
    pub fn exec_command(&mut self, name: &str) -> Result<(), SessionError> {
        self.ensure_live()?;
        let handler = self
            .active_extensions()
            .and_then(|extensions| extensions.commands.get(name))
            .cloned();
        let surface = self
            .surface
            .as_mut()
            .ok_or(SessionError::NoEditorAttached)?;

        let source = match handler {
            Some(handler) => {
                let target: &mut dyn EditorSurface = &mut *surface;
                self.guard.call(HookKind::Command, || handler(target))?;
                "format"
            }
            None => {
                surface.exec_command(name)?;
                "builtin"
            }
        };
        let snapshot = surface.selections();
        info!("event=command_exec module=session status=ok command={name} source={source}");

        self.buffer_changed()?;
        self.microtasks
            .push_back(Microtask::RestoreSelections(snapshot));
        self.microtasks
            .push_back(Microtask::RenderPlaceholders { focus_first: true });
        self.microtasks.push_back(Microtask::RefreshToolbar);
        Ok(())
    }

    pub fn toolbar_items(&self) -> &[ToolbarItem] {
        &self.toolbar
    }

    /// Records a crash of the editing surface.
    ///
    /// The first crash re-renders with format extensions disabled; the
    /// second replaces the editor with a terminal error state.
    pub fn report_surface_crash(&mut self, message: &str) -> RenderState {
        self.health = self.health.after_crash();
        match self.health {
            EditorHealth::Full => {}
            EditorHealth::ExtensionsDisabled => {
                self.close_completion();
                self.variables = None;
                self.mode_name = None;
                self.toolbar.clear();
                self.microtasks.clear();
                if let Some(surface) = self.surface.as_mut() {
                    self.reconciler.teardown(surface);
                    self.reconciler.reconcile(surface, &self.story, true);
                }
            }
            EditorHealth::Crashed => {
                self.close_completion();
                self.crash_message = Some(sanitize_message(message, MAX_PANIC_PAYLOAD_CHARS));
                self.microtasks.clear();
                if let Some(surface) = self.surface.as_mut() {
                    self.reconciler.teardown(surface);
                }
            }
        }
        self.render_state()
    }

    /// Runs `action`, treating a panic as a surface crash.
    pub fn run_guarded<T>(
        &mut self,
        action: impl FnOnce(&mut Self) -> Result<T, SessionError>,
    ) -> Result<T, SessionError> {
        match catch_unwind(AssertUnwindSafe(|| action(self))) {
            Ok(result) => result,
            Err(payload) => {
                let message = panic_payload_summary(payload.as_ref());
                self.report_surface_crash(&message);
                Err(SessionError::SurfacePanicked(message))
            }
        }
    }

    pub fn render_state(&self) -> RenderState {
        match self.health {
            EditorHealth::Crashed => RenderState::Crashed {
                message: self.crash_message.clone().unwrap_or_default(),
            },
            health => RenderState::Editor {
                extensions_enabled: health.extensions_enabled(),
                mode_name: self.mode_name().to_string(),
            },
        }
    }

    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    /// Picks up format extensions that finished loading (or were switched
    /// off) after the session opened. Returns whether anything changed.
    pub fn refresh_format(&mut self, formats: &FormatRegistry) -> bool {
        let next = formats.editor_extensions(
            &self.story.story_format,
            &self.story.story_format_version,
            &self.config,
        );
        let unchanged = match (&self.extensions, &next) {
            (Some(current), Some(next)) => Rc::ptr_eq(current, next),
            (None, None) => true,
            _ => false,
        };
        if unchanged {
            return false;
        }

        self.extensions = next;
        self.rebuild_variables();
        self.register_mode();
        self.refresh_toolbar();
        info!(
            "event=format_refresh module=session status=ok extensions={} mode={}",
            self.extensions.is_some(),
            self.mode_name()
        );
        true
    }

    /// Passage names the format finds referenced in the local text.
    pub fn referenced_passages(&self) -> Vec<String> {
        self.active_extensions()
            .map(|extensions| extensions.parse_references(&self.guard, self.pipeline.local_text()))
            .unwrap_or_default()
    }

    pub fn mode_name(&self) -> &str {
        match self.mode_name.as_deref() {
            Some(name) if self.health.extensions_enabled() => name,
            _ => PLAIN_TEXT_MODE,
        }
    }

    pub fn health(&self) -> EditorHealth {
        self.health
    }

    pub fn surface(&self) -> Option<&S> {
        self.surface.as_ref()
    }

    pub fn surface_mut(&mut self) -> Option<&mut S> {
        self.surface.as_mut()
    }

    pub fn passage(&self) -> &Rc<Passage> {
        &self.passage
    }

    pub fn story(&self) -> &Story {
        &self.story
    }

    pub fn markers(&self) -> &MarkerReconciler {
        &self.reconciler
    }

    pub fn variables(&self) -> Option<&VariableTracker> {
        self.variables.as_ref()
    }

    pub fn completion(&self) -> Option<&CompletionList> {
        self.completion.as_ref()
    }

    pub fn local_text(&self) -> &str {
        self.pipeline.local_text()
    }

    pub fn is_commit_pending(&self) -> bool {
        self.pipeline.is_pending()
    }

    pub fn next_deadline(&self) -> Option<u64> {
        self.pipeline.next_deadline()
    }

    pub fn pending_microtasks(&self) -> usize {
        self.microtasks.len()
    }

    /// Number of live listeners on the session's event hub.
    pub fn listener_count(&self) -> usize {
        self.hub.len()
    }

    /// Moves the clock forward and fires a commit that fell due on the way,
    /// before the caller applies its own event.
    fn tick(&mut self, now_ms: u64) -> bool {
        self.now_ms = self.now_ms.max(now_ms);
        self.pipeline.poll(self.now_ms)
    }

    fn ensure_live(&self) -> Result<(), SessionError> {
        if self.health == EditorHealth::Crashed {
            return Err(SessionError::Crashed);
        }
        Ok(())
    }

    fn active_extensions(&self) -> Option<&Rc<FormatExtensions>> {
        if self.health.extensions_enabled() {
            self.extensions.as_ref()
        } else {
            None
        }
    }

    fn rebuild_variables(&mut self) {
        let hooks = self
            .active_extensions()
            .and_then(|extensions| extensions.variables.clone());
        self.variables = hooks.map(|hooks| {
            let mut tracker = VariableTracker::new(hooks, self.guard.clone());
            tracker.sync(&self.story);
            tracker
        });
    }

    fn register_mode(&mut self) {
        let extensions = self.active_extensions().cloned();
        self.mode_name = match (extensions, self.surface.as_mut()) {
            (Some(extensions), Some(surface)) => extensions.register_mode(&self.guard, surface),
            _ => None,
        };
    }

    fn refresh_toolbar(&mut self) {
        let factory = self
            .active_extensions()
            .and_then(|extensions| extensions.toolbar.clone());
        self.toolbar = match (factory, self.surface.as_ref()) {
            (Some(factory), Some(surface)) => {
                let context = ToolbarContext {
                    app_theme: self.config.app_theme.as_str().to_string(),
                    foreground_color: self.config.foreground_color.clone(),
                    locale: self.config.locale.clone(),
                };
                self.guard
                    .call_or(HookKind::Toolbar, Vec::new(), || factory(surface, &context))
            }
            _ => Vec::new(),
        };
    }

    /// Feeds the surface text into the pipeline and re-renders markers.
    fn buffer_changed(&mut self) -> Result<(), SessionError> {
        let surface = self
            .surface
            .as_mut()
            .ok_or(SessionError::NoEditorAttached)?;
        let text = surface.text();
        self.pipeline.local_change(&text, self.now_ms);
        self.reconciler.reconcile(surface, &self.story, false);
        Ok(())
    }

    fn open_completion(
        &mut self,
        kind: CompletionKind,
    ) -> Result<Option<&CompletionList>, SessionError> {
        let surface = self
            .surface
            .as_ref()
            .ok_or(SessionError::NoEditorAttached)?;
        let context = CompletionContext {
            story: &self.story,
            passage_id: self.passage.id,
            toolbar: &self.toolbar,
            variables: self.variables.as_ref(),
            default_name_pattern: &self.default_name_pattern,
        };
        let list = completion::complete(kind, surface, &context)?;

        match list {
            Some(list) if !list.items.is_empty() => {
                if let Some(surface) = self.surface.as_mut() {
                    surface.show_hints(list.range(), &list.labels());
                }
                self.completion = Some(list);
            }
            _ => self.close_completion(),
        }
        Ok(self.completion.as_ref())
    }

    /// Notifies selection listeners, then moves the selection.
    fn select(&mut self, ranges: Vec<SelectionRange>) {
        self.hub.dispatch(&UiEvent::BeforeSelectionChange {
            ranges: ranges.clone(),
        });
        if let Some(surface) = self.surface.as_mut() {
            surface.set_selections(ranges);
        }
    }

    fn activate_placeholder(&mut self, widget: WidgetId) {
        self.dispatch_event(&UiEvent::Click {
            target: widget,
            button: MouseButton::Primary,
            modifiers: Modifiers::NONE,
        });
    }

    fn run_microtask(&mut self, task: Microtask) {
        if self.surface.is_none() || self.health == EditorHealth::Crashed {
            warn!("event=microtask module=session status=skipped reason=no_editor");
            return;
        }
        match task {
            Microtask::RestoreSelections(ranges) => self.select(ranges),
            Microtask::RenderPlaceholders { focus_first } => {
                let Some(surface) = self.surface.as_mut() else {
                    return;
                };
                self.reconciler.render_placeholders(surface, true);
                if focus_first {
                    if let Some((_, widget)) = self.reconciler.first_placeholder(&*surface) {
                        self.microtasks
                            .push_back(Microtask::ActivatePlaceholder(widget));
                    }
                }
            }
            Microtask::RefreshToolbar => self.refresh_toolbar(),
            Microtask::ActivatePlaceholder(widget) => self.activate_placeholder(widget),
        }
    }
}
