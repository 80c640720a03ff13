//! # Backend Selection
//!
//! The single fallback decision point: probe the remote mirror's health
//! endpoint once at construction and commit to either the remote store
//! or the local JSON-file store. Callers never retry per operation.

use crate::file::JsonFileStore;
use crate::remote::RemoteStore;
use deposit_core::error::DepositResult;
use deposit_core::store::{SharedPaymentStore, SharedRequestStore};
use reqwest::Client;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Which backend the selector committed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Remote,
    Local,
}

/// Stores bound to one backend for the life of the session
pub struct Backend {
    pub payments: SharedPaymentStore,
    pub requests: SharedRequestStore,
    pub kind: BackendKind,
}

/// Probe `base_url` once and connect to it, or fall back to the local
/// JSON-file store under `data_dir`. `None` for `base_url` skips the
/// probe entirely.
pub async fn connect_backend(
    base_url: Option<&str>,
    data_dir: impl AsRef<Path>,
) -> DepositResult<Backend> {
    if let Some(url) = base_url {
        if probe_health(url).await {
            info!(url, "using remote store");
            let store = Arc::new(RemoteStore::new(url));
            return Ok(Backend {
                payments: store.clone(),
                requests: store,
                kind: BackendKind::Remote,
            });
        }
        warn!(url, "remote store unavailable, falling back to local files");
    }

    let store = Arc::new(JsonFileStore::open(data_dir.as_ref())?);
    Ok(Backend {
        payments: store.clone(),
        requests: store,
        kind: BackendKind::Local,
    })
}

/// One opportunistic health check, no retry
async fn probe_health(base_url: &str) -> bool {
    let client = match Client::builder().timeout(PROBE_TIMEOUT).build() {
        Ok(client) => client,
        Err(_) => return false,
    };
    let url = format!("{}/api/health", base_url.trim_end_matches('/'));
    match client.get(&url).send().await {
        Ok(response) => response.status().is_success(),
        Err(_) => false,
    }
}
