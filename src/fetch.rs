use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CACHE_CONTROL};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use crate::config::{
    Endpoints, SMC_ALARM_2H, SMC_ALARM_4H, SMC_ENTRY_LONG, SMC_ENTRY_SHORT, SMC_SUMMARY,
};
use crate::error::DashError;
use crate::resource::ResourceKind;
use crate::types::*;

/// Source of documents for the cache.
///
/// Implementations must be cheap to call concurrently for different kinds;
/// the cache never calls `fetch` twice concurrently for the same kind.
pub trait Fetcher: Send + Sync {
    fn fetch(&self, kind: ResourceKind) -> BoxFuture<'_, Result<Document, DashError>>;
}

impl<F: Fetcher + ?Sized> Fetcher for Arc<F> {
    fn fetch(&self, kind: ResourceKind) -> BoxFuture<'_, Result<Document, DashError>> {
        (**self).fetch(kind)
    }
}

/// Fetches the published JSON documents over HTTPS.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    endpoints: Endpoints,
}

impl HttpFetcher {
    pub fn new(endpoints: Endpoints, timeout: Duration) -> Result<Self, DashError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        // Documents are overwritten in place upstream; never serve a stale copy.
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| DashError::Config(format!("http client: {e}")))?;

        Ok(Self { client, endpoints })
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, DashError> {
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(DashError::AuthRequired);
        }
        if !status.is_success() {
            return Err(DashError::Fetch(format!("{url} returned {status}")));
        }
        let body = resp.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Try each candidate URL in turn. `Ok(None)` means every location
    /// answered 404 (or 400, which storage gateways use for missing objects).
    async fn get_optional<T: DeserializeOwned>(&self, urls: &[String]) -> Result<Option<T>, DashError> {
        let mut first_err = None;
        for url in urls {
            let resp = match self.client.get(url).send().await {
                Ok(resp) => resp,
                Err(e) => {
                    first_err.get_or_insert(DashError::from(e));
                    continue;
                }
            };
            let status = resp.status();
            if status == StatusCode::NOT_FOUND || status == StatusCode::BAD_REQUEST {
                continue;
            }
            if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                first_err.get_or_insert(DashError::AuthRequired);
                continue;
            }
            if !status.is_success() {
                first_err.get_or_insert(DashError::Fetch(format!("{url} returned {status}")));
                continue;
            }
            let body = resp.bytes().await?;
            return Ok(Some(serde_json::from_slice(&body)?));
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(None),
        }
    }

    /// Download the five SMC-PA files concurrently. A file that fails is
    /// treated as absent unless every file failed.
    pub async fn fetch_smc(&self) -> Result<SmcPaData, DashError> {
        let ep = &self.endpoints;
        let urls_a2 = ep.smc_urls(SMC_ALARM_2H);
        let urls_a4 = ep.smc_urls(SMC_ALARM_4H);
        let urls_long = ep.smc_urls(SMC_ENTRY_LONG);
        let urls_short = ep.smc_urls(SMC_ENTRY_SHORT);
        let urls_summary = ep.smc_urls(SMC_SUMMARY);
        let (a2, a4, long, short, summary) = futures::join!(
            self.get_optional::<AlarmScan>(&urls_a2),
            self.get_optional::<AlarmScan>(&urls_a4),
            self.get_optional::<EntryLongDoc>(&urls_long),
            self.get_optional::<EntryShortDoc>(&urls_short),
            self.get_optional::<SummaryDoc>(&urls_summary),
        );

        let errors: Vec<&DashError> = [
            a2.as_ref().err(),
            a4.as_ref().err(),
            long.as_ref().err(),
            short.as_ref().err(),
            summary.as_ref().err(),
        ]
        .into_iter()
        .flatten()
        .collect();

        if errors.len() == 5 {
            return Err(errors[0].clone());
        }
        for e in &errors {
            tracing::warn!(error = %e, "smc-pa file unavailable");
        }

        Ok(SmcPaData::assemble(
            a2.ok().flatten(),
            a4.ok().flatten(),
            long.ok().flatten(),
            short.ok().flatten(),
            summary.ok().flatten(),
        ))
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, kind: ResourceKind) -> BoxFuture<'_, Result<Document, DashError>> {
        Box::pin(async move {
            let ep = &self.endpoints;
            match kind {
                ResourceKind::Coins => self.get_json(&ep.coins_url()).await.map(Document::Coins),
                ResourceKind::Signals => self.get_json(&ep.signals_url()).await.map(Document::Signals),
                ResourceKind::Alarms => self.get_json(&ep.alarms_url()).await.map(Document::Alarms),
                ResourceKind::Ohlcv => self.get_json(&ep.ohlcv_url()).await.map(Document::Ohlcv),
                ResourceKind::SmcPa => self.fetch_smc().await.map(Document::SmcPa),
            }
        })
    }
}
