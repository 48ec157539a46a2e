//! Host runtime surface exposed to the worker.

use std::sync::Arc;

use async_trait::async_trait;
use swcache_core::{Error, MessagePort};

/// What the host runtime lets a worker do besides fetching.
#[async_trait]
pub trait WorkerScope: Send + Sync {
    /// Activate without waiting for older instances to release their pages.
    async fn skip_waiting(&self) -> Result<(), Error>;

    /// Take control of every open page now rather than on next navigation.
    async fn claim(&self) -> Result<(), Error>;

    /// Ports of the pages this worker can reach.
    async fn match_all(&self, include_uncontrolled: bool) -> Result<Vec<Arc<dyn MessagePort>>, Error>;
}
