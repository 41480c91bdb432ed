//! Composition root: wires the click arbiter, the session manager and the save queue to
//! one host document.

mod listeners;
mod runtime;

pub use listeners::ListenerSet;
pub use runtime::UiEvent;

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::time::Instant;

use crate::arbiter::{ClickArbiter, ClickDecision, ReplayClick};
use crate::config::AppConfig;
use crate::dom::{AttributeNames, Document, ElementId};
use crate::error::ConfigError;
use crate::event::{ClickEvent, ControllerEvent, Disposition, EditObserver, EVENT_DETAIL};
use crate::notify::{Notifier, TracingNotifier};
use crate::queue::{
    KeyLookup, SaveKey, SaveQueue, SaveRequest, SaveResponse, SaveStatus, SaveValue,
};
use crate::session::{
    AdapterFactory, AdapterInput, ClosedSession, Commit, EditOutcome, SessionInfo,
    SessionManager,
};
use crate::transport::Transport;

/// Returned by the navigation guard while saves are outstanding.
pub const NAVIGATION_WARNING: &str =
    "Changes are still being saved. Are you sure you want to navigate away ( changes will be lost )?";

const EVENT_CHANNEL_CAPACITY: usize = 1000;

pub struct Controller {
    names: AttributeNames,
    document: Box<dyn Document>,
    container: ElementId,
    arbiter: ClickArbiter,
    sessions: SessionManager,
    queue: SaveQueue,
    listeners: ListenerSet,
    events: broadcast::Sender<ControllerEvent>,
}

impl Controller {
    /// Builds an enabled controller over `document`, scoped to `container`.
    pub fn new(
        config: &AppConfig,
        document: Box<dyn Document>,
        container: ElementId,
        transport: Arc<dyn Transport>,
        adapters: Box<dyn AdapterFactory>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let names = config.attribute_names();
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let notifier: Arc<dyn Notifier> = Arc::new(TracingNotifier);

        let mut controller = Self {
            arbiter: ClickArbiter::new(names.clone(), config.double_click_delay()),
            sessions: SessionManager::new(names.clone(), adapters)
                .honor_veto(config.honor_edit_veto),
            queue: SaveQueue::new(transport, notifier).with_events(events.clone()),
            names,
            document,
            container,
            listeners: ListenerSet::default(),
            events,
        };
        controller.enable();
        Ok(controller)
    }

    pub fn set_notifier(&mut self, notifier: Arc<dyn Notifier>) {
        self.queue.set_notifier(notifier);
    }

    pub fn add_observer(&mut self, observer: Box<dyn EditObserver>) {
        self.sessions.add_observer(observer);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ControllerEvent> {
        self.events.subscribe()
    }

    pub fn document(&self) -> &dyn Document {
        self.document.as_ref()
    }

    pub fn document_mut(&mut self) -> &mut dyn Document {
        self.document.as_mut()
    }

    pub fn attribute_names(&self) -> &AttributeNames {
        &self.names
    }

    pub fn is_enabled(&self) -> bool {
        self.listeners.is_attached()
    }

    pub fn listeners(&self) -> &ListenerSet {
        &self.listeners
    }

    pub fn enable(&mut self) -> &mut Self {
        if self
            .listeners
            .attach(self.document.as_ref(), &self.names, self.container)
        {
            self.emit(ControllerEvent::Enabled);
        }
        self
    }

    /// Detaches every listener and closes the open session. Clicks still withheld by an
    /// armed timer are handed back to the page immediately. Work already queued keeps
    /// draining.
    pub fn disable(&mut self) -> &mut Self {
        if self.listeners.is_attached() {
            let released = self.arbiter.flush();
            let flushed = released.len();
            self.replay_clicks(released);
            self.close();
            self.listeners.detach();
            tracing::debug!(
                target: "dytomate.controller",
                stage = "controller.disabled",
                flushed_timers = flushed
            );
            self.emit(ControllerEvent::Disabled);
        }
        self
    }

    pub fn active_session(&self) -> Option<&SessionInfo> {
        self.sessions.active()
    }

    pub fn session_listeners(&self) -> usize {
        self.sessions.installed_listeners()
    }

    pub fn armed_timers(&self) -> usize {
        self.arbiter.armed_count()
    }

    pub fn next_timer_deadline(&self) -> Option<Instant> {
        self.arbiter.next_deadline()
    }

    pub fn handle_click(&mut self, event: ClickEvent, now: Instant) -> Disposition {
        if !self.listeners.hears(self.document.as_ref(), event.target) {
            return Disposition::Default;
        }
        self.fire_due_timers(now);

        let decision = self.arbiter.on_click(
            self.document.as_ref(),
            self.container,
            &event,
            self.sessions.editing(),
            now,
        );
        match decision {
            ClickDecision::PassThrough => Disposition::Default,
            ClickDecision::Armed { element, .. } => {
                self.emit(ControllerEvent::TimerArmed { element });
                Disposition::Suppress
            }
            ClickDecision::BeginEdit { element } => {
                self.edit(element);
                Disposition::Suppress
            }
        }
    }

    /// Replays every withheld click whose window elapsed by `now`.
    pub fn fire_due_timers(&mut self, now: Instant) -> usize {
        let replays = self.arbiter.expire(now);
        let n = replays.len();
        self.replay_clicks(replays);
        n
    }

    fn replay_clicks(&mut self, replays: Vec<ReplayClick>) {
        for replay in replays {
            tracing::debug!(
                target: "dytomate.controller",
                stage = "click.replayed",
                element = %replay.element,
                click_target = %replay.target
            );
            self.document.dispatch_click(replay.target, EVENT_DETAIL);
            self.emit(ControllerEvent::ClickReplayed {
                element: replay.element,
                target: replay.target,
            });
        }
    }

    pub fn handle_mouse_down(&mut self, target: ElementId) {
        self.sessions.on_mouse_down(self.document.as_ref(), target);
    }

    /// Returns true when the release closed the open session.
    pub fn handle_mouse_up(&mut self, target: ElementId) -> bool {
        match self.sessions.on_mouse_up(self.document.as_mut(), target) {
            Some(closed) => {
                self.finish_session(closed);
                true
            }
            None => false,
        }
    }

    pub fn edit(&mut self, element: ElementId) -> bool {
        self.arbiter.cancel(element);
        match self.sessions.edit(self.document.as_mut(), element) {
            EditOutcome::Opened { session, replaced } => {
                if let Some(closed) = replaced {
                    self.finish_session(closed);
                }
                self.emit(ControllerEvent::SessionOpened {
                    element,
                    kind: session.kind,
                    session_id: session.id,
                });
                true
            }
            EditOutcome::Vetoed => {
                self.emit(ControllerEvent::EditVetoed { element });
                false
            }
        }
    }

    /// Closes the open session, persisting whatever it had pending. Safe to call anytime.
    pub fn close(&mut self) -> bool {
        match self.sessions.close(self.document.as_mut()) {
            Some(closed) => {
                self.finish_session(closed);
                true
            }
            None => false,
        }
    }

    pub fn input(&mut self, input: AdapterInput) -> bool {
        self.sessions.input(self.document.as_mut(), input)
    }

    /// Persists the open editor's pending change without closing a text session.
    pub fn commit(&mut self) -> Option<SaveStatus> {
        let committed = self.sessions.commit(self.document.as_mut())?;
        let element = committed.info.element;
        if self.sessions.editing() != Some(element) {
            self.emit(ControllerEvent::SessionClosed {
                element,
                session_id: committed.info.id.clone(),
            });
        }
        committed.commit.map(|commit| self.persist(element, commit))
    }

    fn finish_session(&mut self, closed: ClosedSession) {
        self.emit(ControllerEvent::SessionClosed {
            element: closed.info.element,
            session_id: closed.info.id,
        });
        if let Some(commit) = closed.commit {
            self.persist(closed.info.element, commit);
        }
    }

    fn persist(&mut self, element: ElementId, commit: Commit) -> SaveStatus {
        let request =
            SaveRequest::new(SaveKey::Element(element), commit.value).with_attributes(commit.attributes);
        self.save(request)
    }

    pub fn save(&mut self, request: SaveRequest) -> SaveStatus {
        let keys = KeyLookup::new(self.document.as_ref(), &self.names);
        self.queue.save(keys, request)
    }

    pub fn save_text<F>(
        &mut self,
        key: impl Into<SaveKey>,
        value: impl Into<String>,
        attributes: BTreeMap<String, String>,
        on_done: F,
    ) -> SaveStatus
    where
        F: FnOnce(Option<SaveResponse>) + Send + 'static,
    {
        self.save(
            SaveRequest::new(key, SaveValue::Text(value.into()))
                .with_attributes(attributes)
                .on_done(on_done),
        )
    }

    /// Base64-encodes `bytes` and queues them for the upload endpoint.
    pub fn save_file<F>(
        &mut self,
        key: impl Into<SaveKey>,
        name: impl Into<String>,
        bytes: &[u8],
        attributes: BTreeMap<String, String>,
        on_done: F,
    ) -> SaveStatus
    where
        F: FnOnce(Option<SaveResponse>) + Send + 'static,
    {
        self.save(
            SaveRequest::file(key, name, bytes)
                .with_attributes(attributes)
                .on_done(on_done),
        )
    }

    pub fn has_pending_saves(&self) -> bool {
        self.queue.is_busy()
    }

    pub fn save_queue(&self) -> &SaveQueue {
        &self.queue
    }

    /// The before-navigation guard: a warning while saves are queued or in flight.
    pub fn before_unload(&self) -> Option<&'static str> {
        (self.listeners.guards_unload() && self.queue.is_busy()).then_some(NAVIGATION_WARNING)
    }

    fn finish_save(&mut self, result: anyhow::Result<String>) {
        let keys = KeyLookup::new(self.document.as_ref(), &self.names);
        let completions = self.queue.complete(keys, result);
        tracing::trace!(
            target: "dytomate.controller",
            stage = "save.settled",
            completed = completions.len(),
            pending = self.queue.pending_len()
        );
    }

    /// Drives outstanding saves until the queue is empty.
    pub async fn settle(&mut self) {
        while self.queue.in_flight_key().is_some() {
            let result = self.queue.next_response().await;
            self.finish_save(result);
        }
    }

    fn emit(&self, event: ControllerEvent) {
        let _ = self.events.send(event);
    }
}
