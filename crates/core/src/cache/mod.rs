//! SQLite-backed, versioned cache store.
//!
//! This module provides the durable key→response store the worker serves
//! from when the network is unavailable. It supports:
//!
//! - Named cache stores identified by `<prefix>-v<version>`
//! - Path-keyed entries with UPSERT (last write wins)
//! - Whole-store deletion when a version goes stale
//! - Automatic schema migrations and WAL mode for concurrent access

pub mod connection;
pub mod hash;
pub mod migrations;
pub mod name;
pub mod store;

pub use crate::Error;

pub use connection::CacheStorage;
pub use name::CacheName;
pub use store::{Cache, CachedEntry};
