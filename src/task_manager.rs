use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use log::{debug, error, info};
use serde::Serialize;
use tokio::task::JoinHandle;

use crate::assessments::AssessmentStore;
use crate::audits::AuditRegistry;
use crate::catalog::Catalog;
use crate::error::EnsGuardError;
use crate::reports::{Report, ReportRequest};
use crate::task::{ReportTask, Task, TaskProgress, TaskProgressState, TaskStatus};

/// Finished reports kept for polling before the oldest are dropped
const DEFAULT_HISTORY: usize = 32;

/// Tracks report generation tasks by id.
///
/// Each task runs on tokio's blocking pool. Cloning the manager yields a
/// handle onto the same set of tasks. Unfinished tasks are always kept;
/// finished ones are bounded by `history`, oldest evicted first.
#[derive(Clone)]
pub struct ReportManager {
    inner: Arc<Mutex<ManagerState>>,
    step_delay: Duration,
    history: usize,
}

struct ManagerState {
    next_id: u64,
    reports: HashMap<u64, ReportEntry>,
}

struct ReportEntry {
    interrupt_token: Arc<AtomicBool>,
    task_progress: Arc<TaskProgress>,
    report: Option<Report>,
    task_handle: Option<JoinHandle<()>>,
}

/// Progress of one report plus the report itself once completed
#[derive(Debug, Clone, Serialize)]
pub struct ReportStatusView {
    #[serde(flatten)]
    pub progress: TaskProgressState,
    pub report: Option<Report>,
}

impl ReportManager {
    pub fn new(step_delay: Duration) -> Self {
        ReportManager {
            inner: Arc::new(Mutex::new(ManagerState {
                next_id: 1,
                reports: HashMap::new(),
            })),
            step_delay,
            history: DEFAULT_HISTORY,
        }
    }

    /// Keeps at most `history` finished reports
    pub fn with_history(mut self, history: usize) -> Self {
        self.history = history;
        self
    }

    fn state(&self) -> MutexGuard<'_, ManagerState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Validates `request` and starts generating it in the background.
    /// `store` should be a copy taken at request time. Must be called from
    /// within a tokio runtime.
    pub fn start(
        &self,
        request: ReportRequest,
        catalog: Arc<Catalog>,
        store: AssessmentStore,
        audits: AuditRegistry,
    ) -> Result<u64, EnsGuardError> {
        let mut state = self.state();
        let report_id = state.next_id;

        let mut task = ReportTask::new(report_id, request, catalog, store, audits, self.step_delay)?;
        state.next_id += 1;
        self.evict_finished(&mut state);

        let task_progress = TaskProgress::new(report_id, task.action(), &task.display_target());
        let interrupt_token = Arc::new(AtomicBool::new(false));

        let interrupt_token_for_task = Arc::clone(&interrupt_token);
        let task_progress_for_task = Arc::clone(&task_progress);
        let manager = self.clone();

        let task_handle = tokio::task::spawn_blocking(move || {
            let progress = task_progress_for_task;
            // A cancel may already have arrived while the task was queued
            if progress.get_status() == TaskStatus::Pending {
                progress.set_status(TaskStatus::Running);
            }

            match task.run(Arc::clone(&progress), interrupt_token_for_task) {
                Ok(()) => {
                    manager.store_report(report_id, task.take_report());
                    progress.set_status(TaskStatus::Completed);
                }
                Err(EnsGuardError::Interrupted) => {
                    info!("Report {} was stopped", report_id);
                    if let Err(stop_err) = task.on_stopped() {
                        error!("Failed to stop report {}: {}", report_id, stop_err);
                        progress.set_error(&format!("Failed to stop report: {}", stop_err));
                    } else {
                        progress.set_status(TaskStatus::Stopped);
                    }
                }
                Err(e) => {
                    error!("Report {} failed: {}", report_id, e);
                    let error_msg = e.to_string();
                    if let Err(stop_err) = task.on_error(&error_msg) {
                        error!("Failed to clean up report {}: {}", report_id, stop_err);
                    }
                    progress.set_error(&error_msg);
                }
            }
        });

        state.reports.insert(
            report_id,
            ReportEntry {
                interrupt_token,
                task_progress,
                report: None,
                task_handle: Some(task_handle),
            },
        );

        info!("Report {} queued", report_id);
        Ok(report_id)
    }

    fn evict_finished(&self, state: &mut ManagerState) {
        let mut finished: Vec<u64> = state
            .reports
            .iter()
            .filter(|(_, entry)| entry.task_progress.get_status().is_terminal())
            .map(|(id, _)| *id)
            .collect();
        if finished.len() <= self.history {
            return;
        }

        finished.sort_unstable();
        let excess = finished.len() - self.history;
        for report_id in &finished[..excess] {
            state.reports.remove(report_id);
            debug!("Report {} evicted from history", report_id);
        }
    }

    fn store_report(&self, report_id: u64, report: Option<Report>) {
        if let Some(entry) = self.state().reports.get_mut(&report_id) {
            entry.report = report;
        }
    }

    pub fn progress(&self, report_id: u64) -> Result<ReportStatusView, EnsGuardError> {
        let state = self.state();
        let entry = state
            .reports
            .get(&report_id)
            .ok_or(EnsGuardError::UnknownReport(report_id))?;

        Ok(ReportStatusView {
            progress: entry.task_progress.get_snapshot(),
            report: entry.report.clone(),
        })
    }

    /// Requests a stop. The task observes it at its next interrupt check.
    /// Cancelling a task that is already stopping is a no-op.
    pub fn cancel(&self, report_id: u64) -> Result<TaskStatus, EnsGuardError> {
        let state = self.state();
        let entry = state
            .reports
            .get(&report_id)
            .ok_or(EnsGuardError::UnknownReport(report_id))?;

        match entry.task_progress.get_status() {
            TaskStatus::Pending | TaskStatus::Running => {
                entry.task_progress.set_status(TaskStatus::Stopping);
                entry.interrupt_token.store(true, Ordering::Release);
                info!("Stop requested for report {}", report_id);
                Ok(TaskStatus::Stopping)
            }
            TaskStatus::Stopping => Ok(TaskStatus::Stopping),
            TaskStatus::Completed | TaskStatus::Stopped | TaskStatus::Error => {
                Err(EnsGuardError::ReportFinished(report_id))
            }
        }
    }

    /// Waits for a task to finish and returns its final status
    pub async fn wait(&self, report_id: u64) -> Result<TaskStatus, EnsGuardError> {
        let handle = {
            let mut state = self.state();
            let entry = state
                .reports
                .get_mut(&report_id)
                .ok_or(EnsGuardError::UnknownReport(report_id))?;
            entry.task_handle.take()
        };

        if let Some(handle) = handle {
            handle
                .await
                .map_err(|e| EnsGuardError::Error(format!("Report task panicked: {}", e)))?;
        }

        Ok(self.progress(report_id)?.progress.status)
    }

    /// Interrupts every unfinished task. Used on shutdown.
    pub fn interrupt_all(&self) {
        let state = self.state();
        for (report_id, entry) in &state.reports {
            if !entry.task_progress.get_status().is_terminal() {
                info!("Interrupting report {} for shutdown", report_id);
                entry.interrupt_token.store(true, Ordering::Release);
            }
        }
    }
}
