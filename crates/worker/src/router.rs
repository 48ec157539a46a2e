//! Cache router: the worker's request routing and cache lifecycle.
//!
//! Every intercepted same-origin GET goes network-first while the page says
//! it is online, refreshing the cache on success, and falls back to the cache
//! (then to a synthetic 404) otherwise. Cross-origin and non-GET requests
//! pass straight through to the network.
//!
//! The router also owns cache versioning: activation deletes stale caches of
//! the same family, force-refreshes the URL manifest and claims open pages.

use std::sync::{Arc, Mutex, PoisonError};

use futures_util::future::join_all;
use swcache_client::fetch::{cache_key, resolve, same_origin};
use swcache_client::{CacheMode, Network};
use swcache_core::cache::hash::body_digest;
use swcache_core::{
    Cache, CacheName, CacheStorage, ConnectivityFlag, Error, Message, MessagePort, Request, Response, WorkerConfig,
};
use url::Url;

use crate::lifecycle::WorkerState;
use crate::scope::WorkerScope;

/// Outcome of populating the URL manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestReport {
    pub refreshed: Vec<String>,
    /// Refreshed paths whose body differs from what was stored before.
    pub changed: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<String>,
}

enum ManifestOutcome {
    Refreshed { changed: bool },
    Skipped,
    Failed,
}

/// Worker-side request router and cache owner.
pub struct CacheRouter {
    storage: CacheStorage,
    network: Arc<dyn Network>,
    scope: Arc<dyn WorkerScope>,
    cache_name: CacheName,
    origin: Url,
    manifest: Vec<String>,
    connectivity: ConnectivityFlag,
    state: Mutex<WorkerState>,
    activation: tokio::sync::Mutex<()>,
    reply_port: Option<Arc<dyn MessagePort>>,
}

impl CacheRouter {
    pub fn new(
        storage: CacheStorage, network: Arc<dyn Network>, scope: Arc<dyn WorkerScope>, cache_name: CacheName,
        origin: Url, manifest: Vec<String>,
    ) -> Self {
        Self {
            storage,
            network,
            scope,
            cache_name,
            origin,
            manifest,
            connectivity: ConnectivityFlag::default(),
            state: Mutex::new(WorkerState::default()),
            activation: tokio::sync::Mutex::new(()),
            reply_port: None,
        }
    }

    /// Build a router from validated configuration.
    pub fn from_config(
        config: &WorkerConfig, storage: CacheStorage, network: Arc<dyn Network>, scope: Arc<dyn WorkerScope>,
    ) -> Result<Self, Error> {
        let origin = config
            .origin_url()
            .map_err(|e| Error::InvalidUrl(e.to_string()))?;
        Ok(Self::new(storage, network, scope, config.cache_name(), origin, config.manifest.clone()))
    }

    /// Port handed to pages with each broadcast so they can reply directly.
    pub fn with_reply_port(mut self, port: Arc<dyn MessagePort>) -> Self {
        self.reply_port = Some(port);
        self
    }

    pub fn cache_name(&self) -> &CacheName {
        &self.cache_name
    }

    pub fn state(&self) -> WorkerState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_online(&self) -> bool {
        self.connectivity.is_online()
    }

    fn advance(&self, next: WorkerState) -> Result<WorkerState, Error> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        *state = state.transition(next)?;
        Ok(*state)
    }

    async fn live_cache(&self) -> Result<Cache, Error> {
        self.storage.open_cache(&self.cache_name.to_string()).await
    }

    /// Worker script start: ask every page for its status and fill in any
    /// manifest entries that are missing.
    pub async fn start(&self) {
        tracing::info!(cache = %self.cache_name, version = self.cache_name.version(), "worker is starting");

        self.broadcast(Message::RequestStatusUpdate).await;

        if let Err(e) = self.cache_files(false).await {
            tracing::error!("initial manifest population failed: {}", e);
        }
    }

    /// Install event: mark installed and take over without waiting.
    pub async fn on_install(&self) -> Result<(), Error> {
        self.advance(WorkerState::Installed)?;
        tracing::info!(cache = %self.cache_name, "worker is installed");
        self.scope.skip_waiting().await
    }

    /// Activate event: clear stale caches, force-refresh the manifest, claim
    /// open pages. Runs as one unit; concurrent activations queue up.
    pub async fn on_activate(&self) -> Result<(), Error> {
        let _guard = self.activation.lock().await;
        self.advance(WorkerState::Activating)?;

        let deleted = self.clear_caches().await?;
        let report = self.cache_files(true).await?;
        self.scope.claim().await?;

        self.advance(WorkerState::Active)?;
        tracing::info!(
            cache = %self.cache_name,
            deleted = deleted.len(),
            refreshed = report.refreshed.len(),
            changed = report.changed.len(),
            failed = report.failed.len(),
            "worker is activated"
        );
        Ok(())
    }

    /// Message event. Only status updates change anything.
    pub fn on_message(&self, message: Message) {
        match message {
            Message::StatusUpdate(update) => {
                self.connectivity.set(update.is_online);
                tracing::info!(is_online = update.is_online, "status update");
            }
            other => tracing::debug!(?other, "ignoring message"),
        }
    }

    /// Fetch event.
    ///
    /// # Errors
    ///
    /// Only pass-through requests can fail, with whatever the network
    /// rejected with. Routed requests always resolve to a response.
    pub async fn on_fetch(&self, request: &Request) -> Result<Response, Error> {
        if !same_origin(&request.url, &self.origin) || !request.is_get() {
            tracing::debug!("pass-through {} {}", request.method, request.url);
            return self.network.fetch(request, CacheMode::Default).await;
        }

        let key = cache_key(&request.url);
        Ok(self.route(request, &key).await)
    }

    async fn route(&self, request: &Request, key: &str) -> Response {
        let cache = match self.live_cache().await {
            Ok(cache) => Some(cache),
            Err(e) => {
                tracing::warn!("cache unavailable for {}: {}", key, e);
                None
            }
        };

        if self.connectivity.is_online() {
            match self.network.fetch(request, CacheMode::NoStore).await {
                Ok(response) if response.is_ok() => {
                    if let Some(cache) = &cache
                        && let Err(e) = cache.put(key, &response).await
                    {
                        tracing::warn!("failed to store {}: {}", key, e);
                    }
                    return response;
                }
                Ok(response) => tracing::debug!(status = response.status, "network answered {} not ok", key),
                Err(e) => tracing::warn!("network failed for {}: {}", key, e),
            }
        } else {
            tracing::debug!("offline, serving {} from cache", key);
        }

        if let Some(cache) = &cache {
            match cache.match_path(key).await {
                Ok(Some(response)) => return response,
                Ok(None) => {}
                Err(e) => tracing::warn!("cache lookup failed for {}: {}", key, e),
            }
        }

        tracing::debug!("{} not found in network or cache", key);
        Response::not_found()
    }

    /// Delete every cache of this family whose version isn't the current one.
    ///
    /// Returns the names that were deleted.
    pub async fn clear_caches(&self) -> Result<Vec<String>, Error> {
        let stale = self
            .storage
            .keys()
            .await?
            .into_iter()
            .filter(|name| self.cache_name.is_stale(name))
            .collect::<Vec<_>>();

        let results = join_all(stale.iter().map(|name| self.storage.delete(name))).await;

        let mut deleted = Vec::with_capacity(stale.len());
        for (name, result) in stale.into_iter().zip(results) {
            if result? {
                tracing::info!(cache = %name, "deleted stale cache");
                deleted.push(name);
            }
        }
        Ok(deleted)
    }

    /// Populate the live cache with the URL manifest.
    ///
    /// With `force_reload` every entry is fetched again and overwritten;
    /// otherwise paths already cached are left alone. Each path is fetched
    /// independently and a failure is logged without stopping the others.
    pub async fn cache_files(&self, force_reload: bool) -> Result<ManifestReport, Error> {
        let cache = self.live_cache().await?;

        let outcomes = join_all(
            self.manifest
                .iter()
                .map(|path| self.cache_file(&cache, path, force_reload)),
        )
        .await;

        let mut report = ManifestReport::default();
        for (path, outcome) in self.manifest.iter().cloned().zip(outcomes) {
            match outcome {
                ManifestOutcome::Refreshed { changed } => {
                    if changed {
                        report.changed.push(path.clone());
                    }
                    report.refreshed.push(path);
                }
                ManifestOutcome::Skipped => report.skipped.push(path),
                ManifestOutcome::Failed => report.failed.push(path),
            }
        }
        Ok(report)
    }

    async fn cache_file(&self, cache: &Cache, path: &str, force_reload: bool) -> ManifestOutcome {
        if !force_reload {
            match cache.match_path(path).await {
                Ok(Some(_)) => return ManifestOutcome::Skipped,
                Ok(None) => {}
                Err(e) => {
                    tracing::error!("failed to cache {} file: {}", path, e);
                    return ManifestOutcome::Failed;
                }
            }
        }

        let request = match resolve(&self.origin, path) {
            Ok(url) => Request::new("GET", url),
            Err(e) => {
                tracing::error!("failed to cache {} file: {}", path, e);
                return ManifestOutcome::Failed;
            }
        };

        match self.network.fetch(&request, CacheMode::NoCache).await {
            Ok(response) if response.is_ok() => {
                let previous = match cache.entry(path).await {
                    Ok(entry) => entry,
                    Err(e) => {
                        tracing::warn!("could not read stored {} file: {}", path, e);
                        None
                    }
                };
                match cache.put(path, &response).await {
                    Ok(()) => {
                        let changed =
                            previous.is_none_or(|entry| entry.body_sha256 != body_digest(&response.body));
                        tracing::debug!(changed, "cached {} file", path);
                        ManifestOutcome::Refreshed { changed }
                    }
                    Err(e) => {
                        tracing::error!("failed to cache {} file: {}", path, e);
                        ManifestOutcome::Failed
                    }
                }
            }
            Ok(response) => {
                tracing::warn!(status = response.status, "failed to cache {} file", path);
                ManifestOutcome::Failed
            }
            Err(e) => {
                tracing::error!("failed to cache {} file: {}", path, e);
                ManifestOutcome::Failed
            }
        }
    }

    /// Post `message` to every reachable page, uncontrolled ones included.
    ///
    /// Each post is independent; failures are logged per page. Returns how
    /// many pages the message reached.
    pub async fn broadcast(&self, message: Message) -> usize {
        let clients = match self.scope.match_all(true).await {
            Ok(clients) => clients,
            Err(e) => {
                tracing::error!("failed to list clients: {}", e);
                return 0;
            }
        };

        tracing::debug!(?message, clients = clients.len(), "broadcasting");

        let results = join_all(
            clients
                .iter()
                .map(|client| client.post_message(message.clone(), self.reply_port.clone())),
        )
        .await;

        results
            .into_iter()
            .zip(&clients)
            .filter(|(result, client)| match result {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!(?client, "failed to post message: {}", e);
                    false
                }
            })
            .count()
    }
}
