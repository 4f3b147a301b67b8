//! Application context wiring the cache, gateway and UI-gating primitives.

use serde_json::Value;
use std::sync::Arc;
use yolp_sync::{CacheConfig, KeyedCache};

use crate::api_client::HttpGateway;
use crate::commands::Commands;
use crate::config::ClientConfig;
use crate::confirm::ConfirmationGate;
use crate::error::AppResult;
use crate::guard::AuthGuard;
use crate::notifications::Notifications;
use crate::queries::Queries;
use crate::session::SessionJar;
use crate::SharedGateway;

/// Everything a frontend needs, built around one shared cache.
///
/// Components receive clones of the handles held here; nothing is global.
#[derive(Clone)]
pub struct App {
    pub store: KeyedCache<Value>,
    pub gate: ConfirmationGate,
    pub notifications: Notifications,
    pub queries: Queries,
    pub commands: Commands,
    pub guard: AuthGuard,
}

impl App {
    pub fn new(gateway: SharedGateway, cache: CacheConfig) -> Self {
        let store = KeyedCache::new(cache);
        let gate = ConfirmationGate::new();
        let notifications = Notifications::new();
        let queries = Queries::new(store.clone(), Arc::clone(&gateway));
        let commands = Commands::new(gateway, store.clone(), gate.clone(), notifications.clone());
        let guard = AuthGuard::new(queries.clone());
        Self {
            store,
            gate,
            notifications,
            queries,
            commands,
            guard,
        }
    }

    /// Build the app against the HTTP API described by `config`, resuming
    /// the session saved by a previous run when a session file is configured.
    pub fn from_config(config: &ClientConfig) -> AppResult<Self> {
        let session = match config.session_path() {
            Some(path) => SessionJar::load(&path)?,
            None => SessionJar::in_memory(),
        };
        let gateway = HttpGateway::new(config, Arc::new(session))?;
        tracing::debug!(
            base_url = gateway.base_url(),
            session_file = ?gateway.session().path(),
            "HTTP gateway ready"
        );
        Ok(Self::new(Arc::new(gateway), config.cache_config()))
    }

    /// Cancel any pending confirmation and drop all cached data.
    pub fn dispose(&self) {
        self.gate.teardown();
        self.store.dispose();
    }
}
