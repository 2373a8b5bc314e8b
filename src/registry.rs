//! PyPI JSON API client.
//!
//! All fetches pass through a shared admission gate: at most
//! [`MAX_CONCURRENT_REQUESTS`](crate::config::MAX_CONCURRENT_REQUESTS)
//! requests run at once and waiters are admitted in arrival order.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use reqwest::header::ACCEPT;
use serde::Deserialize;
use tracing::debug;

use crate::config::{DEFAULT_REGISTRY_URL, FETCH_TIMEOUT, MAX_CONCURRENT_REQUESTS, USER_AGENT};
use crate::error::FetchError;
use crate::types::PackageVersions;

/// Shared admission gate over all in-flight fetches.
///
/// `tokio::sync::Semaphore` is fair, so waiters are released in the
/// order they arrived. The gauges are advisory and only used for
/// observability.
#[derive(Debug)]
pub struct FetchSlots {
    permits: tokio::sync::Semaphore,
    in_flight: AtomicUsize,
    queued: AtomicUsize,
}

impl FetchSlots {
    pub fn new(limit: usize) -> Self {
        Self {
            permits: tokio::sync::Semaphore::new(limit),
            in_flight: AtomicUsize::new(0),
            queued: AtomicUsize::new(0),
        }
    }

    /// Wait for a slot. The returned guard frees the slot on drop, on
    /// every exit path including panics and cancellation points after
    /// admission.
    pub async fn acquire(self: &Arc<Self>) -> SlotGuard {
        self.queued.fetch_add(1, Ordering::SeqCst);
        // The semaphore is never closed while the slots are alive; the
        // permit is forgotten here and restored by the guard on drop.
        if let Ok(permit) = self.permits.acquire().await {
            permit.forget();
        }
        self.queued.fetch_sub(1, Ordering::SeqCst);
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        SlotGuard {
            slots: Arc::clone(self),
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn queued(&self) -> usize {
        self.queued.load(Ordering::SeqCst)
    }
}

/// RAII token for one admitted fetch.
#[derive(Debug)]
pub struct SlotGuard {
    slots: Arc<FetchSlots>,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.slots.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.slots.permits.add_permits(1);
    }
}

#[derive(Debug, Deserialize)]
struct PyPiResponse {
    info: Option<PyPiInfo>,
    releases: HashMap<String, Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct PyPiInfo {
    summary: Option<String>,
}

/// Client for the `/pypi/{package}/json` endpoint.
#[derive(Debug, Clone)]
pub struct PyPiClient {
    client: reqwest::Client,
    base_url: String,
    slots: Arc<FetchSlots>,
}

impl Default for PyPiClient {
    fn default() -> Self {
        Self::new(DEFAULT_REGISTRY_URL)
    }
}

impl PyPiClient {
    pub fn new(base_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(FETCH_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            slots: Arc::new(FetchSlots::new(MAX_CONCURRENT_REQUESTS)),
        }
    }

    /// Fetch all published versions of a package.
    ///
    /// Blocks on the admission gate first; timeouts and transport
    /// failures surface as [`FetchError::Network`], a 404 as
    /// [`FetchError::NotFound`], and a payload without the expected
    /// shape as [`FetchError::Parse`].
    pub async fn fetch_versions(&self, package_name: &str) -> Result<PackageVersions, FetchError> {
        let _slot = self.slots.acquire().await;

        let url = format!(
            "{}/pypi/{}/json",
            self.base_url,
            urlencoding::encode(package_name)
        );
        debug!(package = package_name, %url, "fetching package metadata");

        let response = self
            .client
            .get(&url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound(package_name.to_string()));
        }
        if !response.status().is_success() {
            return Err(FetchError::Network(format!(
                "registry answered {} for {package_name}",
                response.status()
            )));
        }

        let payload: PyPiResponse = response
            .json()
            .await
            .map_err(|e| FetchError::Parse(e.to_string()))?;

        Ok(PackageVersions {
            package_name: package_name.to_string(),
            versions: payload.releases.into_keys().collect(),
            summary: payload.info.and_then(|info| info.summary),
            fetched_at: crate::cache::current_timestamp_ms(),
        })
    }

    /// Requests currently running against the registry.
    pub fn in_flight(&self) -> usize {
        self.slots.in_flight()
    }

    /// Requests waiting for a slot.
    pub fn queued(&self) -> usize {
        self.slots.queued()
    }
}
