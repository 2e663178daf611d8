use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;

use crate::lifecycle::{LifecycleEvent, LifecycleSignals};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Connectivity {
    Unknown,
    Online,
    Offline,
}

/// Turns a stream of reachability probes into `ConnectivityRestored` events.
///
/// Only an Offline → Online transition restores connectivity; the first
/// successful probe after start-up does not.
#[derive(Debug)]
pub struct ConnectivityTracker {
    state: Connectivity,
    outages: u64,
}

impl ConnectivityTracker {
    pub fn new() -> Self {
        Self {
            state: Connectivity::Unknown,
            outages: 0,
        }
    }

    pub fn state(&self) -> Connectivity {
        self.state
    }

    pub fn outages(&self) -> u64 {
        self.outages
    }

    pub fn observe(&mut self, reachable: bool) -> Option<LifecycleEvent> {
        let next = if reachable { Connectivity::Online } else { Connectivity::Offline };
        let prev = std::mem::replace(&mut self.state, next);
        match (prev, next) {
            (Connectivity::Offline, Connectivity::Online) => Some(LifecycleEvent::ConnectivityRestored),
            (Connectivity::Online | Connectivity::Unknown, Connectivity::Offline) => {
                self.outages += 1;
                None
            }
            _ => None,
        }
    }
}

impl Default for ConnectivityTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Background task: probe `url` every `period` and emit
/// `ConnectivityRestored` into `signals` when the network comes back.
///
/// Any HTTP response counts as reachable; only transport errors count as offline.
pub fn spawn_probe(
    client: reqwest::Client,
    url: String,
    period: Duration,
    signals: LifecycleSignals,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut tracker = ConnectivityTracker::new();
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            let reachable = match client.head(&url).send().await {
                Ok(_) => true,
                Err(e) => {
                    tracing::debug!(error = %e, "connectivity probe failed");
                    false
                }
            };
            let before = tracker.state();
            if let Some(event) = tracker.observe(reachable) {
                tracing::info!("connection restored, refreshing data");
                signals.emit(event);
            } else if before != Connectivity::Offline && tracker.state() == Connectivity::Offline {
                tracing::warn!(url = %url, "data source unreachable");
            }
        }
    })
}
