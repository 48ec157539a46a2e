//! Worker instance lifecycle.

use std::fmt;

use swcache_core::Error;

/// Lifecycle state of one worker instance.
///
/// `installing → installed → activating → active`. A replacement worker is a
/// new instance and starts over; nothing ever leaves `active` except a
/// re-run of activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkerState {
    #[default]
    Installing,
    Installed,
    Activating,
    Active,
}

impl WorkerState {
    /// Whether `self → next` is a legal move.
    pub fn can_transition(self, next: WorkerState) -> bool {
        use WorkerState::*;
        matches!(
            (self, next),
            (Installing, Installed) | (Installed | Activating | Active, Activating) | (Activating, Active)
        )
    }

    /// Move to `next`, or fail with `Error::InvalidState`.
    pub fn transition(self, next: WorkerState) -> Result<WorkerState, Error> {
        if self.can_transition(next) {
            Ok(next)
        } else {
            Err(Error::InvalidState { expected: format!("a state that can become {next}"), actual: self.to_string() })
        }
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerState::Installing => write!(f, "installing"),
            WorkerState::Installed => write!(f, "installed"),
            WorkerState::Activating => write!(f, "activating"),
            WorkerState::Active => write!(f, "active"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let state = WorkerState::default()
            .transition(WorkerState::Installed)
            .and_then(|s| s.transition(WorkerState::Activating))
            .and_then(|s| s.transition(WorkerState::Active))
            .unwrap();
        assert_eq!(state, WorkerState::Active);
    }

    #[test]
    fn test_reactivation_allowed() {
        assert!(WorkerState::Active.can_transition(WorkerState::Activating));
        assert!(WorkerState::Activating.can_transition(WorkerState::Activating));
    }

    #[test]
    fn test_activate_before_install_rejected() {
        let result = WorkerState::Installing.transition(WorkerState::Activating);
        assert!(matches!(result, Err(Error::InvalidState { actual, .. }) if actual == "installing"));
    }

    #[test]
    fn test_no_backwards_moves() {
        assert!(!WorkerState::Active.can_transition(WorkerState::Installing));
        assert!(!WorkerState::Installed.can_transition(WorkerState::Installed));
        assert!(!WorkerState::Installed.can_transition(WorkerState::Active));
    }
}
