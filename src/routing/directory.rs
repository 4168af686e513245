//! Credential-to-backend routing directory
//!
//! Resolution walks three tiers in order: the process-local table, the
//! distributed route store, then the control plane. Every non-empty hit
//! from a lower tier backfills the local table. The local table has no
//! eviction; entries live until an update event removes them.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use serde::Deserialize;

use crate::error::{ProxyError, Result};

use super::control_plane::ControlPlaneClient;
use super::store::RouteStore;

/// Route table update delivered over the distributed store's pub/sub channel.
///
/// `old_key` (if non-empty) names an entry to drop; `new_key`/`backend_url`
/// (if non-empty) name an entry to insert.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RouteUpdate {
    #[serde(default)]
    pub old_key: String,
    #[serde(default)]
    pub new_key: String,
    #[serde(default)]
    pub backend_url: String,
}

/// Multi-tier credential router. Constructed once at startup and shared
/// across every connection task.
pub struct RoutingDirectory {
    /// Local tier: `username:password` -> backend address. Reads are
    /// shared, any mutation is exclusive.
    table: RwLock<HashMap<String, String>>,
    store: Arc<dyn RouteStore>,
    control_plane: ControlPlaneClient,
}

impl RoutingDirectory {
    pub fn new(store: Arc<dyn RouteStore>, control_plane: ControlPlaneClient) -> Self {
        Self {
            table: RwLock::new(HashMap::new()),
            store,
            control_plane,
        }
    }

    /// Resolve credentials to a backend address.
    ///
    /// Tier order: local table, distributed store, control plane. A store
    /// transport error or a control-plane failure is a resolution error;
    /// a store miss falls through. All tiers empty is a resolution error.
    pub async fn resolve(&self, username: &str, password: &str) -> Result<String> {
        let key = format!("{username}:{password}");

        if let Some(addr) = self.lookup_local(&key) {
            trace!("route {} served from local table", username);
            return Ok(addr);
        }

        if let Some(addr) = self.store.get(&key).await? {
            debug!("route for {} served from distributed store", username);
            self.insert_local(key, addr.clone());
            return Ok(addr);
        }

        let addr = self.control_plane.lookup(username, password).await?;
        if addr.is_empty() {
            return Err(ProxyError::Resolution(format!(
                "no backend registered for user {username}"
            )));
        }
        debug!("route for {} served from control plane", username);
        self.insert_local(key, addr.clone());
        Ok(addr)
    }

    /// Apply an out-of-band route update: drop `old_key`, insert `new_key`.
    pub fn apply_update(&self, update: &RouteUpdate) {
        if update.old_key.is_empty() && update.new_key.is_empty() {
            return;
        }
        let mut table = self.table.write().unwrap_or_else(PoisonError::into_inner);
        if !update.old_key.is_empty() && table.remove(&update.old_key).is_some() {
            debug!("dropped route for key {}", update.old_key);
        }
        if !update.new_key.is_empty() {
            info!("updated route {} -> {}", update.new_key, update.backend_url);
            table.insert(update.new_key.clone(), update.backend_url.clone());
        }
    }

    fn lookup_local(&self, key: &str) -> Option<String> {
        let table = self.table.read().unwrap_or_else(PoisonError::into_inner);
        table.get(key).cloned()
    }

    fn insert_local(&self, key: String, addr: String) {
        let mut table = self.table.write().unwrap_or_else(PoisonError::into_inner);
        table.insert(key, addr);
    }
}
