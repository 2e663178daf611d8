use serde::Serialize;
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 32;

/// Platform events that should pull fresh data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// The dashboard window or terminal regained focus.
    FocusRegained,
    /// Network connectivity came back after an outage.
    ConnectivityRestored,
}

impl LifecycleEvent {
    pub fn label(&self) -> &'static str {
        match self {
            LifecycleEvent::FocusRegained => "focus",
            LifecycleEvent::ConnectivityRestored => "online",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "focus" | "focus_regained" => Some(LifecycleEvent::FocusRegained),
            "online" | "connectivity_restored" => Some(LifecycleEvent::ConnectivityRestored),
            _ => None,
        }
    }
}

/// Broadcast bus the front ends emit lifecycle events into.
///
/// Clone-able; every clone publishes to the same listeners.
#[derive(Clone)]
pub struct LifecycleSignals {
    tx: broadcast::Sender<LifecycleEvent>,
}

impl LifecycleSignals {
    pub fn new() -> Self {
        Self {
            tx: broadcast::channel(CHANNEL_CAPACITY).0,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.tx.subscribe()
    }

    /// Publish an event and return how many listeners received it.
    pub fn emit(&self, event: LifecycleEvent) -> usize {
        let delivered = self.tx.send(event).unwrap_or(0);
        tracing::debug!(event = event.label(), listeners = delivered, "lifecycle event");
        delivered
    }

    pub fn listener_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for LifecycleSignals {
    fn default() -> Self {
        Self::new()
    }
}
