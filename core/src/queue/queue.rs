use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::broadcast;

use super::request::{KeyLookup, OnDone, SavePayload, SaveRequest};
use super::response::SaveResponse;
use crate::error::SaveError;
use crate::event::ControllerEvent;
use crate::notify::Notifier;
use crate::transport::{Endpoint, Transport};

type ResponseFuture = Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send>>;

struct InFlight {
    key: String,
    on_done: Option<OnDone>,
    response: ResponseFuture,
}

/// Where a save ended up when it was submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveStatus {
    /// Sent right away.
    Started,
    /// Buffered behind `ahead` other requests (the in-flight one included).
    Queued { ahead: usize },
    /// Could not be sent at all; its callback already ran with no value.
    Failed,
}

/// Outcome of one finished request, in completion order.
#[derive(Debug)]
pub struct SaveCompletion {
    pub key: String,
    pub outcome: Result<SaveResponse, SaveError>,
}

type Finished = Vec<(Option<OnDone>, Option<SaveResponse>)>;

/// FIFO of pending saves with at most one request in flight.
pub struct SaveQueue {
    transport: Arc<dyn Transport>,
    notifier: Arc<dyn Notifier>,
    events: Option<broadcast::Sender<ControllerEvent>>,
    pending: VecDeque<SaveRequest>,
    in_flight: Option<InFlight>,
    issued: u64,
}

impl SaveQueue {
    pub fn new(transport: Arc<dyn Transport>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            transport,
            notifier,
            events: None,
            pending: VecDeque::new(),
            in_flight: None,
            issued: 0,
        }
    }

    pub fn with_events(mut self, events: broadcast::Sender<ControllerEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn set_notifier(&mut self, notifier: Arc<dyn Notifier>) {
        self.notifier = notifier;
    }

    /// True while anything is queued or in flight.
    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some() || !self.pending.is_empty()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn in_flight_key(&self) -> Option<&str> {
        self.in_flight.as_ref().map(|f| f.key.as_str())
    }

    /// Requests handed to the transport so far.
    pub fn issued(&self) -> u64 {
        self.issued
    }

    pub fn save(&mut self, keys: KeyLookup<'_>, request: SaveRequest) -> SaveStatus {
        if self.is_busy() {
            let ahead = self.pending.len() + usize::from(self.in_flight.is_some());
            tracing::debug!(
                target: "dytomate.queue",
                stage = "queue.enqueued",
                key = %request.key.describe(),
                ahead = ahead
            );
            self.pending.push_back(request);
            self.emit(ControllerEvent::SaveQueued {
                pending: self.pending.len(),
            });
            return SaveStatus::Queued { ahead };
        }

        let mut finished = Finished::new();
        let status = match self.start(keys, request, &mut finished) {
            Ok(()) => SaveStatus::Started,
            Err(_) => SaveStatus::Failed,
        };
        run_callbacks(finished);
        status
    }

    /// Waits for the in-flight response. Never resolves while idle.
    ///
    /// Cancel safe: dropping the returned future leaves the request in flight. After it
    /// resolves, [`SaveQueue::complete`] must be called before polling again.
    pub async fn next_response(&mut self) -> anyhow::Result<String> {
        match self.in_flight.as_mut() {
            Some(in_flight) => (&mut in_flight.response).await,
            None => std::future::pending::<anyhow::Result<String>>().await,
        }
    }

    /// Settles the in-flight request with `result`, starts the next queued one and then
    /// runs completion callbacks in submission order.
    pub fn complete(
        &mut self,
        keys: KeyLookup<'_>,
        result: anyhow::Result<String>,
    ) -> Vec<SaveCompletion> {
        let Some(done) = self.in_flight.take() else {
            return Vec::new();
        };

        let outcome = result
            .map_err(|e| SaveError::Transport(format!("{e:#}")))
            .and_then(|body| SaveResponse::parse(&body));
        self.report(&done.key, &outcome);

        let mut completions = vec![SaveCompletion {
            key: done.key,
            outcome,
        }];
        let mut finished: Finished = vec![(
            done.on_done,
            completions[0].outcome.as_ref().ok().cloned(),
        )];

        while self.in_flight.is_none() {
            let Some(next) = self.pending.pop_front() else {
                break;
            };
            if let Err(failed) = self.start(keys, next, &mut finished) {
                completions.push(failed);
            }
        }

        run_callbacks(finished);
        completions
    }

    /// Sends `request` now. A request whose key cannot be resolved fails without being sent.
    fn start(
        &mut self,
        keys: KeyLookup<'_>,
        request: SaveRequest,
        finished: &mut Finished,
    ) -> Result<(), SaveCompletion> {
        let SaveRequest {
            key,
            value,
            attributes,
            on_done,
        } = request;

        let resolved = match keys.resolve(&key) {
            Ok(k) => k,
            Err(err) => {
                let failed = SaveCompletion {
                    key: key.describe(),
                    outcome: Err(err),
                };
                self.report(&failed.key, &failed.outcome);
                finished.push((on_done, None));
                return Err(failed);
            }
        };

        let endpoint = value.endpoint();
        let payload = SavePayload {
            key: resolved.clone(),
            value,
            attributes,
        };
        let transport = self.transport.clone();
        let response: ResponseFuture =
            Box::pin(async move { transport.send(endpoint, &payload).await });

        self.issued += 1;
        tracing::info!(
            target: "dytomate.queue",
            stage = "queue.send",
            key = %resolved,
            endpoint = endpoint.as_str(),
            transport = self.transport.name(),
            remaining = self.pending.len()
        );
        self.emit(ControllerEvent::SaveStarted {
            key: resolved.clone(),
            upload: endpoint == Endpoint::Upload,
        });
        self.in_flight = Some(InFlight {
            key: resolved,
            on_done,
            response,
        });
        Ok(())
    }

    fn report(&self, key: &str, outcome: &Result<SaveResponse, SaveError>) {
        match outcome {
            Ok(_) => tracing::info!(
                target: "dytomate.queue",
                stage = "queue.saved",
                key = %key
            ),
            Err(err) => self.notifier.save_failed(key, err),
        }
        self.emit(ControllerEvent::SaveCompleted {
            key: key.to_string(),
            success: outcome.is_ok(),
        });
    }

    fn emit(&self, event: ControllerEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }
}

fn run_callbacks(finished: Finished) {
    for (on_done, response) in finished {
        if let Some(cb) = on_done {
            cb(response);
        }
    }
}
