//! Worker instances known to a registration, and which one a page talks to.

use std::sync::Arc;

use swcache_core::MessagePort;

/// A worker instance in one lifecycle slot of a registration.
#[derive(Debug, Clone)]
pub enum WorkerSlot {
    Installing(Arc<dyn MessagePort>),
    Waiting(Arc<dyn MessagePort>),
    Active(Arc<dyn MessagePort>),
}

impl WorkerSlot {
    /// Lower is preferred.
    fn rank(&self) -> u8 {
        match self {
            WorkerSlot::Installing(_) => 0,
            WorkerSlot::Waiting(_) => 1,
            WorkerSlot::Active(_) => 2,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            WorkerSlot::Installing(_) => "installing",
            WorkerSlot::Waiting(_) => "waiting",
            WorkerSlot::Active(_) => "active",
        }
    }

    pub fn port(&self) -> &Arc<dyn MessagePort> {
        match self {
            WorkerSlot::Installing(port) | WorkerSlot::Waiting(port) | WorkerSlot::Active(port) => port,
        }
    }
}

/// Result of a successful worker registration.
#[derive(Debug, Clone, Default)]
pub struct Registration {
    slots: Vec<WorkerSlot>,
}

impl Registration {
    pub fn new(slots: impl IntoIterator<Item = WorkerSlot>) -> Self {
        Self { slots: slots.into_iter().collect() }
    }

    /// The instance a page should talk to: installing, else waiting, else active.
    pub fn current(&self) -> Option<&WorkerSlot> {
        resolve_current(&self.slots)
    }
}

/// Priority-ordered lookup over the occupied slots.
fn resolve_current(slots: &[WorkerSlot]) -> Option<&WorkerSlot> {
    slots.iter().min_by_key(|slot| slot.rank())
}

#[cfg(test)]
mod tests {
    use super::*;
    use swcache_core::ChannelPort;

    fn port(label: &str) -> Arc<dyn MessagePort> {
        let (port, _rx) = ChannelPort::channel(label);
        Arc::new(port)
    }

    #[test]
    fn test_installing_preferred() {
        let registration = Registration::new([
            WorkerSlot::Active(port("active")),
            WorkerSlot::Installing(port("installing")),
            WorkerSlot::Waiting(port("waiting")),
        ]);
        assert_eq!(registration.current().map(WorkerSlot::label), Some("installing"));
    }

    #[test]
    fn test_waiting_before_active() {
        let registration =
            Registration::new([WorkerSlot::Active(port("active")), WorkerSlot::Waiting(port("waiting"))]);
        assert_eq!(registration.current().map(WorkerSlot::label), Some("waiting"));
    }

    #[test]
    fn test_active_only() {
        let registration = Registration::new([WorkerSlot::Active(port("active"))]);
        assert_eq!(registration.current().map(WorkerSlot::label), Some("active"));
    }

    #[test]
    fn test_empty_registration() {
        assert!(Registration::default().current().is_none());
    }
}
