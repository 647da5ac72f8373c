use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::error::EnsGuardError;

use super::progress::TaskProgress;

/// A long-running, stoppable unit of work driven by the report manager.
///
/// `run` executes on a blocking thread and must poll `interrupt_token`
/// between steps, returning `EnsGuardError::Interrupted` once it is set.
/// The cleanup hooks are called by the manager after `run` returns.
pub trait Task: Send {
    fn run(
        &mut self,
        progress: Arc<TaskProgress>,
        interrupt_token: Arc<AtomicBool>,
    ) -> Result<(), EnsGuardError>;

    fn task_id(&self) -> u64;

    /// Human-readable action name for progress display (e.g., "Generating report")
    fn action(&self) -> &str;

    /// Human-readable target for progress display (e.g., the audit name)
    fn display_target(&self) -> String;

    /// Discard partial output after a stop
    fn on_stopped(&mut self) -> Result<(), EnsGuardError>;

    /// Discard partial output after a failure
    fn on_error(&mut self, error_msg: &str) -> Result<(), EnsGuardError>;
}
