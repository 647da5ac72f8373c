use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::task_status::TaskStatus;

/// Progress bar state as reported to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskProgressBar {
    /// Percentage complete (0-100)
    pub percentage: u32,
    /// Pre-formatted message to display below the progress bar
    pub message: String,
}

/// Point-in-time view of a task's progress
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskProgressState {
    pub task_id: u64,
    pub action: String,
    pub target: String,
    pub status: TaskStatus,
    pub error_message: Option<String>,
    pub phase: Option<String>,
    pub breadcrumbs: Option<Vec<String>>,
    pub progress_bar: Option<TaskProgressBar>,
}

struct TaskProgressInternalState {
    task_id: u64,
    action: String,
    target: String,

    status: TaskStatus,
    error_message: Option<String>,

    phase: Option<String>,
    breadcrumbs: Vec<String>,

    progress_completed: u64,
    progress_total: u64,
    progress_unit: Option<String>,
    progress_bar: Option<TaskProgressBar>,
}

impl TaskProgressInternalState {
    fn update_counter_progress_bar(&mut self) {
        let completed = self.progress_completed.min(self.progress_total);
        let percentage = if self.progress_total > 0 {
            ((completed * 100) / self.progress_total) as u32
        } else {
            0
        };
        let message = match &self.progress_unit {
            Some(unit) => format!("{} / {} {}", completed, self.progress_total, unit),
            None => format!("{} / {}", completed, self.progress_total),
        };
        self.progress_bar = Some(TaskProgressBar {
            percentage,
            message,
        });
    }
}

/// Progress reporter shared between a running task and whoever polls it
pub struct TaskProgress {
    state: Mutex<TaskProgressInternalState>,
}

impl TaskProgress {
    /// New reporter in the `Pending` state
    pub fn new(task_id: u64, action: &str, target: &str) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(TaskProgressInternalState {
                task_id,
                action: action.to_string(),
                target: target.to_string(),
                status: TaskStatus::Pending,
                error_message: None,
                phase: None,
                breadcrumbs: Vec::new(),
                progress_completed: 0,
                progress_total: 0,
                progress_unit: None,
                progress_bar: None,
            }),
        })
    }

    // A panicking task must not make its progress unreadable
    fn state(&self) -> MutexGuard<'_, TaskProgressInternalState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_phase(&self, phase: &str) {
        self.state().phase = Some(phase.to_string());
    }

    /// Add a breadcrumb for a completed phase
    pub fn add_breadcrumb(&self, text: &str) {
        self.state().breadcrumbs.push(text.to_string());
    }

    /// Set up counter-based progress tracking
    pub fn set_progress_total(&self, total: u64, unit: Option<&str>) {
        let mut state = self.state();
        state.progress_total = total;
        state.progress_completed = 0;
        state.progress_unit = unit.map(|s| s.to_string());
        state.update_counter_progress_bar();
    }

    pub fn increment_progress(&self) {
        let mut state = self.state();
        state.progress_completed += 1;
        state.update_counter_progress_bar();
    }

    pub fn set_status(&self, status: TaskStatus) {
        let mut state = self.state();
        state.status = status;
        if status != TaskStatus::Error {
            state.error_message = None;
        }
    }

    pub fn set_error(&self, message: &str) {
        let mut state = self.state();
        state.status = TaskStatus::Error;
        state.error_message = Some(message.to_string());
    }

    pub fn get_status(&self) -> TaskStatus {
        self.state().status
    }

    pub fn get_snapshot(&self) -> TaskProgressState {
        let state = self.state();

        TaskProgressState {
            task_id: state.task_id,
            action: state.action.clone(),
            target: state.target.clone(),
            status: state.status,
            error_message: state.error_message.clone(),
            phase: state.phase.clone(),
            breadcrumbs: if state.breadcrumbs.is_empty() {
                None
            } else {
                Some(state.breadcrumbs.clone())
            },
            progress_bar: state.progress_bar.clone(),
        }
    }
}
