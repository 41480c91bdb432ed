//! Double-click arbitration without native double-click events.
//!
//! The first click on an editable element is withheld and a timer is armed. A second click
//! on the same element before the timer fires promotes to an edit; otherwise the timer
//! expires and the withheld click is handed back to the host for replay.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;

use crate::dom::{AttributeNames, Document, ElementId};
use crate::event::ClickEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClickTimer {
    pub deadline: Instant,
    /// The element that was actually clicked, which may be a descendant of the marked one.
    pub target: ElementId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickDecision {
    /// Not ours: let the click behave normally.
    PassThrough,
    /// First click withheld; the host must suppress it.
    Armed { element: ElementId, deadline: Instant },
    /// Second click within the window: open an editor on `element`.
    BeginEdit { element: ElementId },
}

/// A withheld click to hand back to the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayClick {
    pub element: ElementId,
    pub target: ElementId,
}

#[derive(Debug)]
pub struct ClickArbiter {
    names: AttributeNames,
    delay: Duration,
    timers: HashMap<ElementId, ClickTimer>,
}

impl ClickArbiter {
    pub fn new(names: AttributeNames, delay: Duration) -> Self {
        Self {
            names,
            delay,
            timers: HashMap::new(),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Nearest marked ancestor-or-self of `target` inside `container`.
    pub fn locate(
        &self,
        doc: &dyn Document,
        container: ElementId,
        target: ElementId,
    ) -> Option<ElementId> {
        if !doc.contains(container, target) {
            return None;
        }
        let mut current = Some(target);
        while let Some(el) = current {
            if self.names.key_of(doc, el).is_some() {
                return Some(el);
            }
            if el == container {
                break;
            }
            current = doc.parent(el);
        }
        None
    }

    /// Feeds one click through the state machine.
    ///
    /// Timers whose deadline has passed must be expired with [`ClickArbiter::expire`]
    /// before calling this, otherwise a late click still counts as the second one.
    pub fn on_click(
        &mut self,
        doc: &dyn Document,
        container: ElementId,
        event: &ClickEvent,
        editing: Option<ElementId>,
        now: Instant,
    ) -> ClickDecision {
        if event.replayed {
            return ClickDecision::PassThrough;
        }
        let Some(element) = self.locate(doc, container, event.target) else {
            return ClickDecision::PassThrough;
        };
        if editing == Some(element) || self.names.is_read_only(doc, element) {
            return ClickDecision::PassThrough;
        }

        if self.timers.remove(&element).is_some() {
            tracing::debug!(
                target: "dytomate.arbiter",
                stage = "arbiter.double_click",
                element = %element
            );
            return ClickDecision::BeginEdit { element };
        }

        let deadline = now + self.delay;
        self.timers.insert(
            element,
            ClickTimer {
                deadline,
                target: event.target,
            },
        );
        tracing::trace!(
            target: "dytomate.arbiter",
            stage = "arbiter.armed",
            element = %element,
            click_target = %event.target
        );
        ClickDecision::Armed { element, deadline }
    }

    pub fn is_armed(&self, element: ElementId) -> bool {
        self.timers.contains_key(&element)
    }

    pub fn armed_count(&self) -> usize {
        self.timers.len()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.values().map(|t| t.deadline).min()
    }

    /// Removes every timer due at `now`, oldest deadline first.
    pub fn expire(&mut self, now: Instant) -> Vec<ReplayClick> {
        self.take(|t| t.deadline <= now)
    }

    /// Drops a timer without replaying its click.
    pub fn cancel(&mut self, element: ElementId) -> bool {
        self.timers.remove(&element).is_some()
    }

    /// Removes every armed timer regardless of deadline, oldest first. The caller
    /// replays the withheld clicks.
    pub fn flush(&mut self) -> Vec<ReplayClick> {
        self.take(|_| true)
    }

    fn take(&mut self, due: impl Fn(&ClickTimer) -> bool) -> Vec<ReplayClick> {
        let mut taken: Vec<(Instant, ReplayClick)> = self
            .timers
            .iter()
            .filter(|(_, t)| due(*t))
            .map(|(element, t)| {
                (
                    t.deadline,
                    ReplayClick {
                        element: *element,
                        target: t.target,
                    },
                )
            })
            .collect();
        taken.sort_by_key(|(deadline, replay)| (*deadline, replay.element));
        for (_, replay) in &taken {
            self.timers.remove(&replay.element);
        }
        taken.into_iter().map(|(_, replay)| replay).collect()
    }
}
