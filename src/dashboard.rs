use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::cache::DocumentCache;
use crate::config::DashConfig;
use crate::connectivity::spawn_probe;
use crate::coordinator::{ListenerHandle, RefreshCoordinator, RefreshReport};
use crate::error::DashError;
use crate::fetch::{Fetcher, HttpFetcher};
use crate::generator::{MarketGenerator, SyntheticFetcher};
use crate::lifecycle::LifecycleSignals;

/// Everything one front end needs: the cache, the coordinator driving it and
/// the lifecycle bus the front end reports focus and connectivity into.
pub struct Dashboard {
    pub cache: DocumentCache,
    pub coordinator: RefreshCoordinator,
    pub signals: LifecycleSignals,
    http: Option<HttpFetcher>,
    listeners: Vec<ListenerHandle>,
    probe: Option<JoinHandle<()>>,
}

impl Dashboard {
    /// Build against the remote buckets, or the random-walk market when
    /// `synthetic` is set.
    pub fn from_config(config: &DashConfig, synthetic: bool) -> Result<Self, DashError> {
        config.validate()?;
        if synthetic {
            let fetcher = SyntheticFetcher::new(MarketGenerator::new());
            return Ok(Self::with_fetcher(Arc::new(fetcher), config));
        }
        let http = HttpFetcher::new(config.endpoints.clone(), config.request_timeout)?;
        let mut dash = Self::with_fetcher(Arc::new(http.clone()), config);
        dash.http = Some(http);
        Ok(dash)
    }

    pub fn with_fetcher(fetcher: Arc<dyn Fetcher>, config: &DashConfig) -> Self {
        let cache = DocumentCache::new(fetcher, config.dedup_window);
        let coordinator = RefreshCoordinator::new(Arc::new(cache.clone()));
        Self {
            cache,
            coordinator,
            signals: LifecycleSignals::new(),
            http: None,
            listeners: Vec::new(),
            probe: None,
        }
    }

    /// Initial load, recurring timer, lifecycle listeners and, for remote
    /// sources, the connectivity probe.
    pub async fn launch(&mut self, config: &DashConfig) -> Result<RefreshReport, DashError> {
        let report = self.coordinator.refresh_all().await;
        self.coordinator.start(config.refresh_interval)?;

        self.listeners.push(self.coordinator.on_focus_regained(&self.signals));
        self.listeners.push(self.coordinator.on_connectivity_restored(&self.signals));

        if let Some(http) = &self.http {
            self.probe = Some(spawn_probe(
                http.client().clone(),
                http.endpoints().coins_url(),
                config.probe_interval,
                self.signals.clone(),
            ));
        }
        Ok(report)
    }

    pub fn shutdown(&mut self) {
        self.coordinator.stop();
        for listener in self.listeners.drain(..) {
            listener.cancel();
        }
        if let Some(probe) = self.probe.take() {
            probe.abort();
        }
    }
}

impl Drop for Dashboard {
    fn drop(&mut self) {
        self.shutdown();
    }
}
