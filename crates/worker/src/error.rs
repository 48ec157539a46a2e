//! Structured error payloads for the stdio host protocol.

use serde::Serialize;
use swcache_core::Error;

/// Error as written on a protocol output line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorReply {
    pub code: &'static str,
    pub message: String,
}

impl From<&Error> for ErrorReply {
    fn from(err: &Error) -> Self {
        Self { code: err.code(), message: err.to_string() }
    }
}
