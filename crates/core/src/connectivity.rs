//! Advisory connectivity flag.

use std::sync::atomic::{AtomicBool, Ordering};

/// Whether the owning component believes the network is reachable.
///
/// Each component owns its own flag. The value is never persisted and a
/// fresh flag starts online until the first status message says otherwise.
#[derive(Debug)]
pub struct ConnectivityFlag {
    online: AtomicBool,
}

impl ConnectivityFlag {
    pub fn new(is_online: bool) -> Self {
        Self { online: AtomicBool::new(is_online) }
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::Acquire)
    }

    /// Store a new value, returning the previous one.
    pub fn set(&self, is_online: bool) -> bool {
        self.online.swap(is_online, Ordering::AcqRel)
    }
}

impl Default for ConnectivityFlag {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_online() {
        assert!(ConnectivityFlag::default().is_online());
    }

    #[test]
    fn test_set_returns_previous() {
        let flag = ConnectivityFlag::default();
        assert!(flag.set(false));
        assert!(!flag.is_online());
        assert!(!flag.set(false));
    }
}
