use parking_lot::Mutex;

/// Task status codes reported by the OpenDroneMap node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Queued,
    Running,
    Failed,
    Completed,
    Canceled,
    Other(i64),
}

impl TaskStatus {
    pub fn from_code(code: i64) -> Self {
        match code {
            10 => TaskStatus::Queued,
            20 => TaskStatus::Running,
            30 => TaskStatus::Failed,
            40 => TaskStatus::Completed,
            50 => TaskStatus::Canceled,
            other => TaskStatus::Other(other),
        }
    }

    /// Terminal states end monitoring: success, failure and cancellation.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Failed | TaskStatus::Completed | TaskStatus::Canceled
        )
    }
}

/// Guarded terminal transition for one job. The webhook and the poller race
/// toward the same job id; only the first terminal status wins, the other
/// path becomes a no-op.
#[derive(Default)]
pub struct JobState {
    terminal: Mutex<Option<TaskStatus>>,
}

impl JobState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempt the terminal transition. Returns `true` for the path that won.
    pub fn try_finish(&self, status: TaskStatus) -> bool {
        if !status.is_terminal() {
            return false;
        }
        let mut guard = self.terminal.lock();
        if guard.is_some() {
            return false;
        }
        *guard = Some(status);
        true
    }

    pub fn finished(&self) -> Option<TaskStatus> {
        *self.terminal.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_mapping_and_terminality() {
        assert_eq!(TaskStatus::from_code(20), TaskStatus::Running);
        assert!(!TaskStatus::from_code(20).is_terminal());
        for code in [30, 40, 50] {
            assert!(TaskStatus::from_code(code).is_terminal());
        }
        assert!(!TaskStatus::from_code(99).is_terminal());
    }

    #[test]
    fn terminal_transition_fires_once() {
        let state = JobState::new();
        assert!(!state.try_finish(TaskStatus::Running), "non-terminal ignored");
        assert!(state.try_finish(TaskStatus::Completed));
        assert!(!state.try_finish(TaskStatus::Failed), "second path loses");
        assert_eq!(state.finished(), Some(TaskStatus::Completed));
    }
}
