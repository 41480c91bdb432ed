use serde::Serialize;

use crate::dom::ElementId;
use crate::session::AdapterKind;

/// Detail marker carried by every event the controller synthesises.
pub const EVENT_DETAIL: &str = "dytomate";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClickEvent {
    pub target: ElementId,
    /// Set on clicks the controller re-dispatched after a withheld single click.
    pub replayed: bool,
}

impl ClickEvent {
    pub fn new(target: ElementId) -> Self {
        Self {
            target,
            replayed: false,
        }
    }

    pub fn replayed(target: ElementId) -> Self {
        Self {
            target,
            replayed: true,
        }
    }

    /// Builds a click from a host event detail, recognising our own replays.
    pub fn from_detail(target: ElementId, detail: Option<&str>) -> Self {
        Self {
            target,
            replayed: detail == Some(EVENT_DETAIL),
        }
    }
}

/// What the host should do with a click after the controller saw it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Let the default action and propagation happen.
    Default,
    /// Prevent the default action and stop propagation.
    Suppress,
}

/// Cancelable notification sent to observers before a session opens.
#[derive(Debug, Clone)]
pub struct PreEditEvent {
    element: ElementId,
    kind: AdapterKind,
    cancelled: bool,
}

impl PreEditEvent {
    pub(crate) fn new(element: ElementId, kind: AdapterKind) -> Self {
        Self {
            element,
            kind,
            cancelled: false,
        }
    }

    pub fn element(&self) -> ElementId {
        self.element
    }

    pub fn kind(&self) -> AdapterKind {
        self.kind
    }

    pub fn detail(&self) -> &'static str {
        EVENT_DETAIL
    }

    /// Vetoes the edit. The session is not opened.
    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}

pub trait EditObserver: Send {
    fn before_edit(&self, event: &mut PreEditEvent);
}

impl<F> EditObserver for F
where
    F: Fn(&mut PreEditEvent) + Send,
{
    fn before_edit(&self, event: &mut PreEditEvent) {
        self(event)
    }
}

/// Broadcast by the controller as interaction and persistence progress.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControllerEvent {
    Enabled,
    Disabled,
    TimerArmed {
        element: ElementId,
    },
    ClickReplayed {
        element: ElementId,
        target: ElementId,
    },
    EditVetoed {
        element: ElementId,
    },
    SessionOpened {
        element: ElementId,
        kind: AdapterKind,
        session_id: String,
    },
    SessionClosed {
        element: ElementId,
        session_id: String,
    },
    SaveQueued {
        pending: usize,
    },
    SaveStarted {
        key: String,
        upload: bool,
    },
    SaveCompleted {
        key: String,
        success: bool,
    },
}
