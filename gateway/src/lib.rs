// SPDX-License-Identifier: Apache-2.0 OR MIT
pub mod config;
pub mod routes;
pub mod startup;
pub mod store;
pub mod verify;

use std::sync::Arc;

use crate::store::CacheStore;
use crate::verify::OracleClient;

/// Shared per-process state, built once at startup and handed to every
/// request task through the router.
#[derive(Clone)]
pub struct AppState {
    /// Expiring key-value store for verified batches
    pub store: Arc<dyn CacheStore>,
    /// STI-VS client (one reqwest client, reused across requests)
    pub oracle: OracleClient,
    /// Freshness window in seconds; verified batches older than this are
    /// not cached
    pub freshness_sec: i64,
}
