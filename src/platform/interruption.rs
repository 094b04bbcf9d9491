// Audio interruption notifications
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Another process took (or gave back) audio focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterruptionEvent {
    Began,
    Ended,
    Other,
}

impl InterruptionEvent {
    /// Map the platform's raw interruption type (1 = began, 0 = ended).
    pub fn from_type_value(raw: u64) -> Self {
        match raw {
            1 => Self::Began,
            0 => Self::Ended,
            _ => Self::Other,
        }
    }
}

impl FromStr for InterruptionEvent {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "began" | "begin" => Self::Began,
            "ended" | "end" => Self::Ended,
            _ => Self::Other,
        })
    }
}

impl fmt::Display for InterruptionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Began => "began",
            Self::Ended => "ended",
            Self::Other => "other",
        };
        f.write_str(name)
    }
}

pub type InterruptionHandler = Arc<dyn Fn(InterruptionEvent) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Publish/subscribe channel for interruption events.
pub trait InterruptionCenter: Send + Sync {
    fn subscribe(&self, handler: InterruptionHandler) -> SubscriptionId;

    fn unsubscribe(&self, id: SubscriptionId);
}

/// Observer registry the host posts platform interruptions into.
#[derive(Default)]
pub struct InterruptionBus {
    next_id: AtomicU64,
    handlers: Mutex<Vec<(SubscriptionId, InterruptionHandler)>>,
}

impl InterruptionBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `event` to every current subscriber, returning how many saw it.
    ///
    /// Handlers run outside the registry lock, so they may subscribe or
    /// unsubscribe while being notified.
    pub fn post(&self, event: InterruptionEvent) -> usize {
        let handlers: Vec<InterruptionHandler> = self
            .handlers
            .lock()
            .iter()
            .map(|(_, handler)| Arc::clone(handler))
            .collect();

        tracing::trace!(%event, subscribers = handlers.len(), "posting interruption");
        for handler in &handlers {
            handler(event);
        }
        handlers.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.handlers.lock().len()
    }
}

impl InterruptionCenter for InterruptionBus {
    fn subscribe(&self, handler: InterruptionHandler) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers.lock().push((id, handler));
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.handlers.lock().retain(|(existing, _)| *existing != id);
    }
}
