//! Inspection Task
//!
//! Client-side view of a server-tracked unit of work (frame extraction, damage
//! detection). A `Task` only moves forward and is frozen once terminal.

use crate::consts::messages::TASK_FAILED;
use crate::consts::polling::MAX_PROGRESS;
use serde_json::Value;
use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TaskState {
    Pending,
    Running,
    Success,
    Failure,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Success | TaskState::Failure)
    }

    /// Position in the forward-only lifecycle. Both terminal states share a rank.
    fn rank(self) -> u8 {
        match self {
            TaskState::Pending => 0,
            TaskState::Running => 1,
            TaskState::Success | TaskState::Failure => 2,
        }
    }

    /// Map a state string reported by the status endpoint.
    ///
    /// The worker reports intermediate progress as `PROGRESS`; `STARTED` and
    /// `RETRY` are also in flight, `REVOKED` counts as a failure.
    pub fn from_wire(state: &str) -> Option<Self> {
        match state.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Some(TaskState::Pending),
            "STARTED" | "PROGRESS" | "RUNNING" | "RETRY" => Some(TaskState::Running),
            "SUCCESS" => Some(TaskState::Success),
            "FAILURE" | "REVOKED" => Some(TaskState::Failure),
            _ => None,
        }
    }
}

impl Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TaskState::Pending => "PENDING",
            TaskState::Running => "RUNNING",
            TaskState::Success => "SUCCESS",
            TaskState::Failure => "FAILURE",
        };
        f.write_str(s)
    }
}

/// Result of a single status poll.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskSnapshot {
    pub state: TaskState,
    pub progress: u8,
    pub message: String,
    pub result: Option<Value>,
}

/// What a poll changed, in the order the observer should hear about it.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskEvent {
    Update { progress: u8, message: String },
    Success(Value),
    Failure(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    /// Server-assigned task ID
    pub task_id: String,
    pub state: TaskState,
    pub progress: u8,
    pub message: String,
    /// Only present once the task succeeded.
    pub result: Option<Value>,
}

impl Task {
    /// A freshly accepted task.
    pub fn new(task_id: impl Into<String>) -> Self {
        Task {
            task_id: task_id.into(),
            state: TaskState::Pending,
            progress: 0,
            message: String::new(),
            result: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Fold a poll response into the task.
    ///
    /// Returns `None` once the task is terminal: nothing changes after that.
    /// A snapshot behind the current state or progress never moves the task
    /// backwards.
    pub fn apply(&mut self, snapshot: TaskSnapshot) -> Option<TaskEvent> {
        if self.is_terminal() {
            return None;
        }

        if snapshot.state.rank() > self.state.rank() {
            self.state = snapshot.state;
        }
        if !snapshot.message.is_empty() {
            self.message = snapshot.message;
        }

        match self.state {
            TaskState::Pending | TaskState::Running => {
                self.progress = self.progress.max(snapshot.progress.min(MAX_PROGRESS));
                Some(TaskEvent::Update {
                    progress: self.progress,
                    message: self.message.clone(),
                })
            }
            TaskState::Success => {
                self.progress = MAX_PROGRESS;
                let result = snapshot.result.unwrap_or(Value::Null);
                self.result = Some(result.clone());
                Some(TaskEvent::Success(result))
            }
            TaskState::Failure => {
                if self.message.is_empty() {
                    self.message = TASK_FAILED.to_string();
                }
                Some(TaskEvent::Failure(self.message.clone()))
            }
        }
    }
}

impl Display for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Task ID: {}, State: {}, Progress: {}%",
            self.task_id, self.state, self.progress
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot(state: TaskState, progress: u8, message: &str) -> TaskSnapshot {
        TaskSnapshot {
            state,
            progress,
            message: message.to_string(),
            result: None,
        }
    }

    #[test]
    fn test_wire_state_mapping() {
        assert_eq!(TaskState::from_wire("PENDING"), Some(TaskState::Pending));
        assert_eq!(TaskState::from_wire("progress"), Some(TaskState::Running));
        assert_eq!(TaskState::from_wire("STARTED"), Some(TaskState::Running));
        assert_eq!(TaskState::from_wire("SUCCESS"), Some(TaskState::Success));
        assert_eq!(TaskState::from_wire("REVOKED"), Some(TaskState::Failure));
        assert_eq!(TaskState::from_wire("bogus"), None);
    }

    #[test]
    // Progress never drops and is capped at 100.
    fn test_progress_is_monotonic() {
        let mut task = Task::new("abc");
        task.apply(snapshot(TaskState::Running, 60, "Detecting wagons"));
        let event = task.apply(snapshot(TaskState::Running, 30, "")).unwrap();
        assert_eq!(
            event,
            TaskEvent::Update { progress: 60, message: "Detecting wagons".to_string() }
        );

        task.apply(snapshot(TaskState::Running, 250, ""));
        assert_eq!(task.progress, 100);
    }

    #[test]
    // A PENDING report after RUNNING keeps the task RUNNING.
    fn test_state_never_regresses() {
        let mut task = Task::new("abc");
        task.apply(snapshot(TaskState::Running, 10, "Processing started..."));
        task.apply(snapshot(TaskState::Pending, 0, ""));
        assert_eq!(task.state, TaskState::Running);
        assert_eq!(task.progress, 10);
    }

    #[test]
    fn test_terminal_state_is_frozen() {
        let mut task = Task::new("abc");
        let event = task.apply(TaskSnapshot {
            state: TaskState::Success,
            progress: 0,
            message: "Completed".to_string(),
            result: Some(json!({"count": 3})),
        });
        assert_eq!(event, Some(TaskEvent::Success(json!({"count": 3}))));
        assert_eq!(task.progress, 100);

        assert_eq!(task.apply(snapshot(TaskState::Failure, 0, "late")), None);
        assert_eq!(task.state, TaskState::Success);
        assert_eq!(task.message, "Completed");
    }

    #[test]
    fn test_failure_without_reason_uses_generic_message() {
        let mut task = Task::new("abc");
        let event = task.apply(snapshot(TaskState::Failure, 0, ""));
        assert_eq!(event, Some(TaskEvent::Failure(TASK_FAILED.to_string())));
    }

    #[test]
    fn test_success_without_result_is_null() {
        let mut task = Task::new("abc");
        let event = task.apply(snapshot(TaskState::Success, 100, ""));
        assert_eq!(event, Some(TaskEvent::Success(Value::Null)));
    }
}
