use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info};

use crate::assessments::AssessmentStore;
use crate::audits::{Audit, AuditRegistry};
use crate::catalog::Catalog;
use crate::error::EnsGuardError;
use crate::reports::{build_section, Report, ReportRequest};

use super::progress::TaskProgress;
use super::traits::Task;

const INTERRUPT_POLL: Duration = Duration::from_millis(20);

/// Generates one report section by section.
///
/// The task owns a copy of the assessments taken when it was created, so a
/// report reflects a single consistent point in time even while the store
/// keeps changing.
pub struct ReportTask {
    report_id: u64,
    request: ReportRequest,
    audit: Audit,
    catalog: Arc<Catalog>,
    store: AssessmentStore,
    audits: AuditRegistry,
    step_delay: Duration,
    report: Option<Report>,
}

impl ReportTask {
    pub fn new(
        report_id: u64,
        request: ReportRequest,
        catalog: Arc<Catalog>,
        store: AssessmentStore,
        audits: AuditRegistry,
        step_delay: Duration,
    ) -> Result<Self, EnsGuardError> {
        let audit = request.validate(&audits)?.clone();
        Ok(ReportTask {
            report_id,
            request,
            audit,
            catalog,
            store,
            audits,
            step_delay,
            report: None,
        })
    }

    /// The finished report. `None` until `run` has succeeded.
    pub fn take_report(&mut self) -> Option<Report> {
        self.report.take()
    }

    fn check_interrupt(interrupt_token: &AtomicBool) -> Result<(), EnsGuardError> {
        if interrupt_token.load(Ordering::Acquire) {
            Err(EnsGuardError::Interrupted)
        } else {
            Ok(())
        }
    }

    /// Sleeps for the configured step delay, waking early on interrupt
    fn pace(&self, interrupt_token: &AtomicBool) -> Result<(), EnsGuardError> {
        let deadline = Instant::now() + self.step_delay;
        loop {
            Self::check_interrupt(interrupt_token)?;
            let now = Instant::now();
            if now >= deadline {
                return Ok(());
            }
            std::thread::sleep(INTERRUPT_POLL.min(deadline - now));
        }
    }
}

impl Task for ReportTask {
    fn run(
        &mut self,
        progress: Arc<TaskProgress>,
        interrupt_token: Arc<AtomicBool>,
    ) -> Result<(), EnsGuardError> {
        let sections = self.request.ordered_sections();
        progress.set_progress_total(sections.len() as u64, Some("sections"));

        let mut report = Report::new(&self.audit, self.request.kind, self.request.format);

        for section in sections {
            Self::check_interrupt(&interrupt_token)?;
            progress.set_phase(section.label());
            self.pace(&interrupt_token)?;

            report.sections.push(build_section(
                section,
                &self.audit,
                &self.catalog,
                &self.store,
                &self.audits,
            ));

            debug!(
                "Report {}: built section '{}'",
                self.report_id,
                section.as_str()
            );
            progress.add_breadcrumb(section.label());
            progress.increment_progress();
        }

        info!(
            "Report {} ({}) generated for audit '{}' with {} sections",
            self.report_id,
            self.request.kind.as_str(),
            self.audit.id,
            report.sections.len()
        );
        self.report = Some(report);
        Ok(())
    }

    fn task_id(&self) -> u64 {
        self.report_id
    }

    fn action(&self) -> &str {
        "Generating report"
    }

    fn display_target(&self) -> String {
        self.audit.name.clone()
    }

    fn on_stopped(&mut self) -> Result<(), EnsGuardError> {
        self.report = None;
        Ok(())
    }

    fn on_error(&mut self, _error_msg: &str) -> Result<(), EnsGuardError> {
        self.report = None;
        Ok(())
    }
}
