//! swcache worker entry point.
//!
//! Reads host events from stdin and writes responses and page messages to
//! stdout. Logging goes to stderr to keep the protocol stream clean.

use std::sync::Arc;

use anyhow::Result;
use swcache_client::{FetchClient, FetchConfig};
use swcache_core::{CacheStorage, ChannelPort, WorkerConfig};
use swcache_worker::{CacheRouter, Output, StdioScope, WorkerHost, stdio};
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = WorkerConfig::load()?;
    tracing::info!(cache = %config.cache_name(), origin = %config.origin, "Starting swcache worker on stdio transport");

    let storage = CacheStorage::open(&config.db_path).await?;
    let network = Arc::new(FetchClient::new(FetchConfig::from(&config))?);
    let output = Output::stdout();
    let scope = Arc::new(StdioScope::new(output.clone()));
    let (reply_port, replies) = ChannelPort::channel("worker-replies");

    let router = Arc::new(CacheRouter::from_config(&config, storage, network, scope)?.with_reply_port(Arc::new(reply_port)));
    let (host, outcomes) = WorkerHost::new(Arc::clone(&router));
    host.forward_replies(replies);

    tokio::spawn(async move { router.start().await });

    stdio::serve(BufReader::new(tokio::io::stdin()), host, outcomes, output).await?;

    Ok(())
}
