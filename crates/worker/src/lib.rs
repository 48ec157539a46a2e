//! Offline cache worker: lifecycle, cache routing and the host event loop.
//!
//! The [`CacheRouter`] owns all worker behavior. A [`WorkerHost`] feeds it
//! host runtime events, and [`stdio`] drives a host over newline-delimited
//! JSON.

pub mod error;
pub mod host;
pub mod lifecycle;
pub mod router;
pub mod scope;
pub mod stdio;

#[cfg(test)]
mod testing;

pub use error::ErrorReply;
pub use host::{EventKind, Handler, Outcome, WorkerEvent, WorkerHost, handler};
pub use lifecycle::WorkerState;
pub use router::{CacheRouter, ManifestReport};
pub use scope::WorkerScope;
pub use stdio::{Output, StdioPage, StdioScope};
