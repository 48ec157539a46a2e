//! Client code for swcache.
//!
//! This crate provides the network seam used by the worker (and its
//! reqwest-backed implementation), URL helpers for origin checks and cache
//! keys, and the page-side worker controller that keeps the worker's
//! connectivity flag in sync.

pub mod controller;
pub mod fetch;

pub use controller::{PageEvent, Registration, WorkerController, WorkerSlot};
pub use fetch::{CacheMode, FetchClient, FetchConfig, Network};
