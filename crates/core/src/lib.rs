//! Core types and shared functionality for swcache.
//!
//! This crate provides:
//! - Versioned cache store with SQLite backend
//! - Unified error types
//! - Configuration structures
//! - The page/worker message protocol and ports
//! - Request/response model and the connectivity flag

pub mod cache;
pub mod config;
pub mod connectivity;
pub mod error;
pub mod http;
pub mod message;
pub mod port;

pub use cache::{Cache, CacheName, CacheStorage};
pub use config::{ConfigError, WorkerConfig};
pub use connectivity::ConnectivityFlag;
pub use error::Error;
pub use http::{Request, Response};
pub use message::{Message, StatusUpdate};
pub use port::{ChannelPort, MessagePort, PortMessage};
