use serde::{Deserialize, Serialize};

/// Lifecycle state of a report generation task.
///
/// `Stopping` is transient: a cancel was requested and the task has not yet
/// reached its next interrupt check.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Running,
    Stopping,
    Completed,
    Stopped,
    Error,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Stopping => "stopping",
            TaskStatus::Completed => "completed",
            TaskStatus::Stopped => "stopped",
            TaskStatus::Error => "error",
        }
    }

    pub fn full_name(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "Pending",
            TaskStatus::Running => "Running",
            TaskStatus::Stopping => "Stopping",
            TaskStatus::Completed => "Completed",
            TaskStatus::Stopped => "Stopped",
            TaskStatus::Error => "Error",
        }
    }

    pub fn from_string(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" | "P" => Some(TaskStatus::Pending),
            "RUNNING" | "R" => Some(TaskStatus::Running),
            "STOPPING" | "ST" => Some(TaskStatus::Stopping),
            "COMPLETED" | "C" => Some(TaskStatus::Completed),
            "STOPPED" | "S" => Some(TaskStatus::Stopped),
            "ERROR" | "E" => Some(TaskStatus::Error),
            _ => None,
        }
    }

    /// Returns true if this is a terminal status (task is done)
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Stopped | TaskStatus::Error
        )
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.full_name())
    }
}
