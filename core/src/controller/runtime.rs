use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

use super::Controller;
use crate::dom::ElementId;
use crate::event::{ClickEvent, Disposition};
use crate::queue::SaveRequest;
use crate::session::AdapterInput;

/// Host interaction forwarded into [`Controller::run`].
#[derive(Debug)]
pub enum UiEvent {
    Click {
        event: ClickEvent,
        reply: Option<oneshot::Sender<Disposition>>,
    },
    MouseDown(ElementId),
    MouseUp(ElementId),
    Input(AdapterInput),
    Commit,
    Close,
    Save(SaveRequest),
    BeforeUnload(oneshot::Sender<Option<String>>),
    Enable,
    Disable,
}

impl Controller {
    /// Event loop: host events, click timers and save responses on one task.
    ///
    /// Returns once `events` is closed, no timer is armed and the save queue is drained.
    pub async fn run(&mut self, mut events: mpsc::Receiver<UiEvent>) {
        let mut open = true;
        tracing::debug!(target: "dytomate.controller", stage = "run.start");

        loop {
            if !open && self.arbiter.next_deadline().is_none() && !self.queue.is_busy() {
                break;
            }

            tokio::select! {
                biased;

                result = self.queue.next_response() => {
                    self.finish_save(result);
                }
                _ = sleep_until_opt(self.arbiter.next_deadline()) => {
                    self.fire_due_timers(Instant::now());
                }
                received = events.recv(), if open => match received {
                    Some(event) => self.dispatch(event),
                    None => {
                        tracing::debug!(
                            target: "dytomate.controller",
                            stage = "run.draining",
                            timers = self.arbiter.armed_count(),
                            pending = self.queue.pending_len()
                        );
                        open = false;
                    }
                },
            }
        }

        tracing::debug!(target: "dytomate.controller", stage = "run.stop");
    }

    fn dispatch(&mut self, event: UiEvent) {
        match event {
            UiEvent::Click { event, reply } => {
                let disposition = self.handle_click(event, Instant::now());
                if let Some(reply) = reply {
                    let _ = reply.send(disposition);
                }
            }
            UiEvent::MouseDown(target) => self.handle_mouse_down(target),
            UiEvent::MouseUp(target) => {
                self.handle_mouse_up(target);
            }
            UiEvent::Input(input) => {
                if !self.input(input) {
                    tracing::debug!(
                        target: "dytomate.controller",
                        stage = "input.ignored",
                        "no open session"
                    );
                }
            }
            UiEvent::Commit => {
                self.commit();
            }
            UiEvent::Close => {
                self.close();
            }
            UiEvent::Save(request) => {
                self.save(request);
            }
            UiEvent::BeforeUnload(reply) => {
                let _ = reply.send(self.before_unload().map(str::to_string));
            }
            UiEvent::Enable => {
                self.enable();
            }
            UiEvent::Disable => {
                self.disable();
            }
        }
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}
