use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::adapter::{AdapterFactory, AdapterInput, AdapterKind, Commit, EditAdapter, Regions};
use crate::dom::{AttributeNames, Document, ElementId};
use crate::event::{EditObserver, PreEditEvent};

/// Public view of the open session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionInfo {
    pub id: String,
    pub element: ElementId,
    pub kind: AdapterKind,
    pub opened_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct ClosedSession {
    pub info: SessionInfo,
    pub commit: Option<Commit>,
}

#[derive(Debug)]
pub enum EditOutcome {
    Opened {
        session: SessionInfo,
        /// The session that had to make room for this one.
        replaced: Option<ClosedSession>,
    },
    Vetoed,
}

struct Session {
    info: SessionInfo,
    adapter: Box<dyn EditAdapter>,
    regions: Regions,
    /// Text sessions install a press listener on the editor and a global release listener.
    listens_outside: bool,
    pressed_inside: bool,
}

/// Owns zero or one open editor.
pub struct SessionManager {
    names: AttributeNames,
    factory: Box<dyn AdapterFactory>,
    observers: Vec<Box<dyn EditObserver>>,
    honor_veto: bool,
    active: Option<Session>,
}

impl SessionManager {
    pub fn new(names: AttributeNames, factory: Box<dyn AdapterFactory>) -> Self {
        Self {
            names,
            factory,
            observers: Vec::new(),
            honor_veto: false,
            active: None,
        }
    }

    /// Makes a cancelled [`PreEditEvent`] abort the edit instead of being advisory.
    pub fn honor_veto(mut self, honor: bool) -> Self {
        self.honor_veto = honor;
        self
    }

    pub fn add_observer(&mut self, observer: Box<dyn EditObserver>) {
        self.observers.push(observer);
    }

    pub fn active(&self) -> Option<&SessionInfo> {
        self.active.as_ref().map(|s| &s.info)
    }

    /// The element currently in edit, if any.
    pub fn editing(&self) -> Option<ElementId> {
        self.active.as_ref().map(|s| s.info.element)
    }

    /// Number of interaction listeners the open session has installed.
    pub fn installed_listeners(&self) -> usize {
        match &self.active {
            Some(s) if s.listens_outside => 2,
            _ => 0,
        }
    }

    pub fn edit(&mut self, doc: &mut dyn Document, element: ElementId) -> EditOutcome {
        let kind = AdapterKind::for_element(doc, element);

        let mut event = PreEditEvent::new(element, kind);
        for observer in &self.observers {
            observer.before_edit(&mut event);
        }
        if event.is_cancelled() {
            tracing::info!(
                target: "dytomate.session",
                stage = "session.vetoed",
                element = %element,
                honored = self.honor_veto
            );
            if self.honor_veto {
                return EditOutcome::Vetoed;
            }
        }

        let replaced = self.close(doc);

        let mut adapter = self.factory.open(kind, element, doc);
        let mut regions = adapter.enable(doc);
        if kind == AdapterKind::Text {
            regions.editor.insert(element);
        }
        doc.set_attribute(element, self.names.in_edit(), "true");

        let info = SessionInfo {
            id: Uuid::new_v4().to_string(),
            element,
            kind,
            opened_at: Utc::now(),
        };
        tracing::info!(
            target: "dytomate.session",
            stage = "session.opened",
            session_id = %info.id,
            element = %element,
            kind = kind.as_str()
        );
        self.active = Some(Session {
            info: info.clone(),
            adapter,
            regions,
            listens_outside: kind == AdapterKind::Text,
            pressed_inside: false,
        });

        EditOutcome::Opened {
            session: info,
            replaced,
        }
    }

    /// Tears down the open session, if any. Calling it again is a no-op.
    pub fn close(&mut self, doc: &mut dyn Document) -> Option<ClosedSession> {
        let mut session = self.active.take()?;
        let commit = session.adapter.commit(doc);
        let has_commit = commit.is_some();
        let info = self.teardown(doc, session, has_commit);
        Some(ClosedSession { info, commit })
    }

    fn teardown(
        &self,
        doc: &mut dyn Document,
        mut session: Session,
        has_commit: bool,
    ) -> SessionInfo {
        session.adapter.disable(doc);
        doc.remove_attribute(session.info.element, self.names.in_edit());
        tracing::info!(
            target: "dytomate.session",
            stage = "session.closed",
            session_id = %session.info.id,
            element = %session.info.element,
            has_commit
        );
        session.info
    }

    pub fn input(&mut self, doc: &mut dyn Document, input: AdapterInput) -> bool {
        match self.active.as_mut() {
            Some(session) => {
                session.adapter.input(doc, input);
                true
            }
            None => false,
        }
    }

    /// Asks the open editor for its pending change. Media sessions end once committed.
    pub fn commit(&mut self, doc: &mut dyn Document) -> Option<ClosedSession> {
        let session = self.active.as_mut()?;
        let commit = session.adapter.commit(doc);
        let info = session.info.clone();
        if info.kind == AdapterKind::Media && commit.is_some() {
            if let Some(session) = self.active.take() {
                self.teardown(doc, session, true);
            }
        }
        Some(ClosedSession { info, commit })
    }

    pub fn on_mouse_down(&mut self, doc: &dyn Document, target: ElementId) {
        if let Some(session) = self.active.as_mut() {
            if session.listens_outside && session.regions.is_editor(doc, target) {
                session.pressed_inside = true;
            }
        }
    }

    /// Closes a text session when a release lands outside of it.
    pub fn on_mouse_up(
        &mut self,
        doc: &mut dyn Document,
        target: ElementId,
    ) -> Option<ClosedSession> {
        let session = self.active.as_mut()?;
        if !session.listens_outside {
            return None;
        }
        if session.pressed_inside {
            // Drag-to-select that started inside the editor.
            session.pressed_inside = false;
            return None;
        }
        if session.regions.is_inside(doc, target) {
            return None;
        }
        self.close(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{MemoryDocument, PageNode};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Log {
        enabled: Vec<ElementId>,
        disabled: Vec<ElementId>,
        commits: usize,
    }

    struct FakeAdapter {
        kind: AdapterKind,
        element: ElementId,
        draft: Option<String>,
        toolbar: Option<ElementId>,
        log: Arc<Mutex<Log>>,
    }

    impl EditAdapter for FakeAdapter {
        fn kind(&self) -> AdapterKind {
            self.kind
        }

        fn enable(&mut self, doc: &mut dyn Document) -> Regions {
            self.log.lock().unwrap().enabled.push(self.element);
            let mut regions = Regions::default();
            if self.kind == AdapterKind::Text {
                let root = doc.parent(self.element).unwrap_or(self.element);
                let bar = doc.append_child(root, "div");
                regions.toolbar.insert(bar);
                self.toolbar = Some(bar);
            }
            regions
        }

        fn input(&mut self, _doc: &mut dyn Document, input: AdapterInput) {
            if let AdapterInput::Text(text) = input {
                self.draft = Some(text);
            }
        }

        fn commit(&mut self, _doc: &mut dyn Document) -> Option<Commit> {
            self.log.lock().unwrap().commits += 1;
            self.draft.take().map(Commit::text)
        }

        fn disable(&mut self, doc: &mut dyn Document) {
            if let Some(bar) = self.toolbar.take() {
                doc.remove(bar);
            }
            self.log.lock().unwrap().disabled.push(self.element);
        }
    }

    struct FakeFactory(Arc<Mutex<Log>>);

    impl AdapterFactory for FakeFactory {
        fn open(
            &mut self,
            kind: AdapterKind,
            element: ElementId,
            _doc: &dyn Document,
        ) -> Box<dyn EditAdapter> {
            Box::new(FakeAdapter {
                kind,
                element,
                draft: None,
                toolbar: None,
                log: self.0.clone(),
            })
        }
    }

    fn fixture() -> (MemoryDocument, SessionManager, Arc<Mutex<Log>>) {
        let page: PageNode = serde_json::from_value(serde_json::json!({
            "tag": "body",
            "children": [
                {"tag": "article", "id": "article", "attributes": {"data-dytomate": "article"}, "children": [
                    {"tag": "em", "id": "emphasis"}
                ]},
                {"tag": "h2", "id": "heading", "attributes": {"data-dytomate": "heading"}},
                {"tag": "img", "id": "photo", "attributes": {"data-dytomate": "photo"}},
                {"tag": "footer", "id": "footer"}
            ]
        }))
        .unwrap();
        let log = Arc::new(Mutex::new(Log::default()));
        let manager =
            SessionManager::new(AttributeNames::default(), Box::new(FakeFactory(log.clone())));
        (MemoryDocument::from_page(&page).unwrap(), manager, log)
    }

    #[test]
    fn edit_selects_adapter_by_tag_and_marks_in_edit() {
        let (mut doc, mut sessions, _) = fixture();
        let photo = doc.by_id("photo").unwrap();
        let article = doc.by_id("article").unwrap();

        match sessions.edit(&mut doc, photo) {
            EditOutcome::Opened { session, replaced } => {
                assert_eq!(session.kind, AdapterKind::Media);
                assert!(replaced.is_none());
            }
            EditOutcome::Vetoed => panic!("unexpected veto"),
        }
        assert_eq!(sessions.installed_listeners(), 0);

        match sessions.edit(&mut doc, article) {
            EditOutcome::Opened { session, replaced } => {
                assert_eq!(session.kind, AdapterKind::Text);
                assert_eq!(replaced.unwrap().info.element, photo);
            }
            EditOutcome::Vetoed => panic!("unexpected veto"),
        }
        assert_eq!(sessions.editing(), Some(article));
        assert_eq!(sessions.installed_listeners(), 2);
        assert_eq!(
            doc.attribute(article, "data-dytomate-in-edit").as_deref(),
            Some("true")
        );
        assert_eq!(doc.attribute(photo, "data-dytomate-in-edit"), None);
    }

    #[test]
    fn at_most_one_element_is_in_edit() {
        let (mut doc, mut sessions, log) = fixture();
        let article = doc.by_id("article").unwrap();
        let heading = doc.by_id("heading").unwrap();

        sessions.edit(&mut doc, article);
        sessions.edit(&mut doc, heading);

        assert_eq!(
            doc.elements_with_attribute("data-dytomate-in-edit"),
            vec![heading]
        );
        assert_eq!(log.lock().unwrap().disabled, vec![article]);
    }

    #[test]
    fn veto_is_advisory_by_default() {
        let (mut doc, mut sessions, log) = fixture();
        let heading = doc.by_id("heading").unwrap();
        sessions.add_observer(Box::new(|event: &mut PreEditEvent| event.cancel()));

        assert!(matches!(
            sessions.edit(&mut doc, heading),
            EditOutcome::Opened { .. }
        ));
        assert_eq!(sessions.editing(), Some(heading));
        assert_eq!(log.lock().unwrap().enabled, vec![heading]);
    }

    #[test]
    fn honored_veto_keeps_current_session() {
        let (mut doc, sessions, log) = fixture();
        let mut sessions = sessions.honor_veto(true);
        let article = doc.by_id("article").unwrap();
        let heading = doc.by_id("heading").unwrap();

        sessions.edit(&mut doc, article);
        sessions.add_observer(Box::new(move |event: &mut PreEditEvent| {
            assert_eq!(event.detail(), "dytomate");
            if event.element() == heading {
                event.cancel();
            }
        }));

        assert!(matches!(
            sessions.edit(&mut doc, heading),
            EditOutcome::Vetoed
        ));
        assert_eq!(sessions.editing(), Some(article));
        assert_eq!(log.lock().unwrap().enabled, vec![article]);
    }

    #[test]
    fn close_is_idempotent_and_returns_pending_commit() {
        let (mut doc, mut sessions, log) = fixture();
        let heading = doc.by_id("heading").unwrap();

        assert!(sessions.close(&mut doc).is_none());

        sessions.edit(&mut doc, heading);
        sessions.input(&mut doc, AdapterInput::Text("New heading".to_string()));
        let closed = sessions.close(&mut doc).unwrap();
        assert_eq!(closed.commit, Some(Commit::text("New heading")));
        assert_eq!(sessions.installed_listeners(), 0);

        assert!(sessions.close(&mut doc).is_none());
        assert_eq!(log.lock().unwrap().disabled, vec![heading]);
    }

    #[test]
    fn release_outside_closes_exactly_once() {
        let (mut doc, mut sessions, log) = fixture();
        let article = doc.by_id("article").unwrap();
        let footer = doc.by_id("footer").unwrap();

        sessions.edit(&mut doc, article);
        sessions.on_mouse_down(&doc, footer);
        assert!(sessions.on_mouse_up(&mut doc, footer).is_some());
        assert!(sessions.on_mouse_up(&mut doc, footer).is_none());
        assert_eq!(log.lock().unwrap().disabled.len(), 1);
        assert_eq!(sessions.installed_listeners(), 0);
    }

    #[test]
    fn drag_from_inside_and_clicks_inside_keep_session() {
        let (mut doc, mut sessions, _) = fixture();
        let article = doc.by_id("article").unwrap();
        let emphasis = doc.by_id("emphasis").unwrap();
        let footer = doc.by_id("footer").unwrap();

        sessions.edit(&mut doc, article);

        // Select text by dragging out of the editor.
        sessions.on_mouse_down(&doc, emphasis);
        assert!(sessions.on_mouse_up(&mut doc, footer).is_none());

        // Release on a descendant of the element in edit.
        sessions.on_mouse_down(&doc, footer);
        assert!(sessions.on_mouse_up(&mut doc, emphasis).is_none());

        assert_eq!(sessions.editing(), Some(article));
    }

    #[test]
    fn content_added_while_editing_counts_as_inside() {
        let (mut doc, mut sessions, _) = fixture();
        let article = doc.by_id("article").unwrap();
        let footer = doc.by_id("footer").unwrap();

        sessions.edit(&mut doc, article);
        let bold = doc.append_child(article, "b");
        let nested = doc.append_child(bold, "i");

        sessions.on_mouse_down(&doc, bold);
        assert!(sessions.on_mouse_up(&mut doc, bold).is_none());
        sessions.on_mouse_down(&doc, footer);
        assert!(sessions.on_mouse_up(&mut doc, nested).is_none());
        assert_eq!(sessions.editing(), Some(article));

        assert!(sessions.on_mouse_up(&mut doc, footer).is_some());
    }

    #[test]
    fn toolbar_release_keeps_session() {
        let (mut doc, mut sessions, _) = fixture();
        let article = doc.by_id("article").unwrap();

        sessions.edit(&mut doc, article);
        let bar = *doc.children(doc.root()).last().unwrap();
        assert!(sessions.on_mouse_up(&mut doc, bar).is_none());
        assert_eq!(sessions.editing(), Some(article));
    }

    #[test]
    fn media_sessions_ignore_outside_clicks_and_end_on_commit() {
        let (mut doc, mut sessions, log) = fixture();
        let photo = doc.by_id("photo").unwrap();
        let footer = doc.by_id("footer").unwrap();

        sessions.edit(&mut doc, photo);
        assert!(sessions.on_mouse_up(&mut doc, footer).is_none());
        assert_eq!(sessions.editing(), Some(photo));

        // Nothing to commit yet: the session stays open.
        let committed = sessions.commit(&mut doc).unwrap();
        assert!(committed.commit.is_none());
        assert_eq!(sessions.editing(), Some(photo));

        sessions.input(&mut doc, AdapterInput::Text("ignored".into()));
        let committed = sessions.commit(&mut doc).unwrap();
        assert!(committed.commit.is_some());
        assert_eq!(sessions.editing(), None);
        assert_eq!(doc.attribute(photo, "data-dytomate-in-edit"), None);
        assert_eq!(log.lock().unwrap().commits, 2);
        assert_eq!(log.lock().unwrap().disabled, vec![photo]);
    }
}
