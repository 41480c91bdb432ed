#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use dytomate_core::api::{
    AdapterFactory, AdapterInput, AdapterKind, AppConfig, ClickEvent, Commit, Controller,
    ControllerEvent, Disposition, Document, EditAdapter, ElementId, Endpoint, MemoryDocument,
    PageNode, Regions, SavePayload, SaveValue, Transport, UiEvent,
};
use dytomate_core::queue::FileUpload;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;

/// Succeeds every request after `latency`, echoing the key back.
pub struct RecordingTransport {
    pub latency: Duration,
    pub sent: Mutex<Vec<(Endpoint, SavePayload)>>,
    active: AtomicUsize,
    pub peak: AtomicUsize,
}

impl RecordingTransport {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            sent: Mutex::new(Vec::new()),
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    pub fn keys(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(_, p)| p.key.clone())
            .collect()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    fn name(&self) -> &str {
        "recording"
    }

    async fn send(&self, endpoint: Endpoint, payload: &SavePayload) -> anyhow::Result<String> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.sent.lock().unwrap().push((endpoint, payload.clone()));
        tokio::time::sleep(self.latency).await;
        self.active.fetch_sub(1, Ordering::SeqCst);
        Ok(serde_json::json!({"success": true, "key": payload.key}).to_string())
    }
}

/// Text editor that keeps the last typed value as its draft.
struct Notepad {
    draft: Option<String>,
}

impl EditAdapter for Notepad {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Text
    }

    fn enable(&mut self, _doc: &mut dyn Document) -> Regions {
        Regions::default()
    }

    fn input(&mut self, _doc: &mut dyn Document, input: AdapterInput) {
        if let AdapterInput::Text(text) = input {
            self.draft = Some(text);
        }
    }

    fn commit(&mut self, _doc: &mut dyn Document) -> Option<Commit> {
        self.draft.take().map(Commit::text)
    }

    fn disable(&mut self, _doc: &mut dyn Document) {}
}

/// Image picker that commits the chosen file once.
struct Picker {
    file: Option<FileUpload>,
}

impl EditAdapter for Picker {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Media
    }

    fn enable(&mut self, _doc: &mut dyn Document) -> Regions {
        Regions::default()
    }

    fn input(&mut self, _doc: &mut dyn Document, input: AdapterInput) {
        if let AdapterInput::File { name, bytes } = input {
            self.file = Some(FileUpload::from_bytes(name, &bytes));
        }
    }

    fn commit(&mut self, _doc: &mut dyn Document) -> Option<Commit> {
        self.file.take().map(|file| Commit {
            value: SaveValue::File(file),
            attributes: Default::default(),
        })
    }

    fn disable(&mut self, _doc: &mut dyn Document) {}
}

pub struct TestAdapters;

impl AdapterFactory for TestAdapters {
    fn open(
        &mut self,
        kind: AdapterKind,
        _element: ElementId,
        _doc: &dyn Document,
    ) -> Box<dyn EditAdapter> {
        match kind {
            AdapterKind::Text => Box::new(Notepad { draft: None }),
            AdapterKind::Media => Box::new(Picker { file: None }),
        }
    }
}

pub struct Page {
    pub doc: MemoryDocument,
    pub main: ElementId,
    pub title: ElementId,
    pub link: ElementId,
    pub logo: ElementId,
    pub plain: ElementId,
    pub outside: ElementId,
}

pub fn page() -> Page {
    let page: PageNode = serde_json::from_value(serde_json::json!({
        "tag": "body",
        "children": [
            {"tag": "main", "id": "main", "children": [
                {"tag": "h1", "id": "title", "attributes": {"data-dytomate": "home.title"}, "children": [
                    {"tag": "a", "id": "link", "attributes": {"href": "/about"}}
                ]},
                {"tag": "IMG", "id": "logo", "attributes": {"data-dytomate": "home.logo"}},
                {"tag": "p", "id": "plain"}
            ]},
            {"tag": "footer", "id": "outside", "attributes": {"data-dytomate": "footer"}}
        ]
    }))
    .unwrap();
    let doc = MemoryDocument::from_page(&page).unwrap();
    let id = |name: &str| doc.by_id(name).unwrap();
    Page {
        main: id("main"),
        title: id("title"),
        link: id("link"),
        logo: id("logo"),
        plain: id("plain"),
        outside: id("outside"),
        doc,
    }
}

pub struct Running {
    pub tx: mpsc::Sender<UiEvent>,
    pub events: broadcast::Receiver<ControllerEvent>,
    pub handle: JoinHandle<Controller>,
}

impl Running {
    /// Closes the event channel and waits for the loop to drain.
    pub async fn finish(self) -> (Controller, Vec<ControllerEvent>) {
        let Running {
            tx,
            mut events,
            handle,
        } = self;
        drop(tx);
        let controller = handle.await.unwrap();
        let mut seen = Vec::new();
        while let Ok(event) = events.try_recv() {
            seen.push(event);
        }
        (controller, seen)
    }
}

pub fn spawn(page: Page, transport: Arc<RecordingTransport>) -> Running {
    let mut controller = Controller::new(
        &AppConfig::default(),
        Box::new(page.doc),
        page.main,
        transport,
        Box::new(TestAdapters),
    )
    .unwrap();
    let events = controller.subscribe();
    let (tx, rx) = mpsc::channel(64);
    let handle = tokio::spawn(async move {
        controller.run(rx).await;
        controller
    });
    Running { tx, events, handle }
}

pub async fn click(tx: &mpsc::Sender<UiEvent>, target: ElementId) -> Disposition {
    let (reply, rx) = oneshot::channel();
    tx.send(UiEvent::Click {
        event: ClickEvent::new(target),
        reply: Some(reply),
    })
    .await
    .unwrap();
    rx.await.unwrap()
}

pub async fn before_unload(tx: &mpsc::Sender<UiEvent>) -> Option<String> {
    let (reply, rx) = oneshot::channel();
    tx.send(UiEvent::BeforeUnload(reply)).await.unwrap();
    rx.await.unwrap()
}

pub fn replays(events: &[ControllerEvent]) -> Vec<(ElementId, ElementId)> {
    events
        .iter()
        .filter_map(|e| match e {
            ControllerEvent::ClickReplayed { element, target } => Some((*element, *target)),
            _ => None,
        })
        .collect()
}
