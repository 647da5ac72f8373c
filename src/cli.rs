use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use log::info;

use crate::assessments::AssessmentUpdate;
use crate::audits::{parse_status_filter, AuditRegistry};
use crate::config::Config;
use crate::context::AppContext;
use crate::dashboard::DashboardSummary;
use crate::error::EnsGuardError;
use crate::filter::{filter, MeasureQuery};
use crate::reports::{ReportRequest, ReportSection};
use crate::snapshot::write_json_atomic;
use crate::stats::compute_all_rollups;
use crate::task::{ReportTask, Task, TaskProgress};

#[derive(Parser)]
#[command(
    name = "ensguard",
    version,
    about = "ENSGuard: Esquema Nacional de Seguridad compliance tracking"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the server (default if no command specified)
    Serve,

    /// Show global compliance figures
    Stats,

    /// Show completion and compliance per category
    Categories,

    /// List catalog measures, optionally filtered
    Measures {
        /// Case-insensitive text to match
        #[arg(long, short = 't')]
        text: Option<String>,

        /// Category id, or "all"
        #[arg(long, short = 'c')]
        category: Option<String>,

        /// Compliance status, or "all"
        #[arg(long, short = 's')]
        status: Option<String>,

        /// Fields the text is matched against: "name-code" or "all"
        #[arg(long)]
        scope: Option<String>,
    },

    /// Show one measure with its requirements and assessment
    Show {
        /// Measure id (e.g. "org.1")
        id: String,
    },

    /// Create or update the assessment of a measure
    Assess {
        /// Measure id (e.g. "org.1")
        id: String,

        #[arg(long, short = 's')]
        status: Option<String>,

        #[arg(long, short = 'n')]
        notes: Option<String>,

        /// Evidence reference; repeat to give several (replaces the current list)
        #[arg(long = "evidence", short = 'e')]
        evidence: Vec<String>,

        #[arg(long, short = 'r')]
        reviewer: Option<String>,

        /// RFC 3339 timestamp or YYYY-MM-DD
        #[arg(long = "reviewed-at")]
        reviewed_at: Option<String>,
    },

    /// List audits, optionally filtered
    Audits {
        #[arg(long, short = 't')]
        text: Option<String>,

        /// Audit status, or "all"
        #[arg(long, short = 's')]
        status: Option<String>,
    },

    /// Show the most recent assessment changes
    Activity {
        #[arg(long, short = 'n', default_value_t = 10)]
        count: usize,
    },

    /// Generate a report for an audit as JSON
    Report {
        #[arg(long = "audit", short = 'a')]
        audit: String,

        /// compliance, detailed, executive or action_plan
        #[arg(long, default_value = "compliance")]
        kind: String,

        /// pdf, docx or html
        #[arg(long, default_value = "pdf")]
        format: String,

        /// Section to include; repeat for several (default: all but appendices)
        #[arg(long = "section")]
        sections: Vec<String>,

        /// Write the report to this file instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },
}

impl Cli {
    pub fn handle_command_line() -> Result<(), EnsGuardError> {
        let args = Cli::parse();
        let config = Config::get();
        let project_dirs = Config::project_dirs()?;

        // Default to Serve if no command specified
        let command = args.command.unwrap_or(Command::Serve);
        let mut stdout = std::io::stdout().lock();
        command.execute(&config, project_dirs.data_local_dir(), &mut stdout)
    }
}

impl Command {
    pub fn execute(
        self,
        config: &Config,
        data_dir: &Path,
        out: &mut dyn Write,
    ) -> Result<(), EnsGuardError> {
        let mut context = AppContext::load(config, data_dir)?;

        match self {
            Command::Serve => start_server(config, context),
            Command::Stats => print_stats(&context, out),
            Command::Categories => print_categories(&context, out),
            Command::Measures {
                text,
                category,
                status,
                scope,
            } => {
                let query = MeasureQuery::parse(
                    text.as_deref(),
                    category.as_deref(),
                    status.as_deref(),
                    scope.as_deref(),
                )?;
                print_measures(&context, &query, out)
            }
            Command::Show { id } => print_measure(&context, &id, out),
            Command::Assess {
                id,
                status,
                notes,
                evidence,
                reviewer,
                reviewed_at,
            } => {
                let evidence = (!evidence.is_empty()).then_some(evidence);
                let update = AssessmentUpdate::from_text(
                    status.as_deref(),
                    notes,
                    evidence,
                    reviewed_at.as_deref(),
                    reviewer,
                )?;
                let assessment = context.store.upsert(&id, update)?.clone();
                context.save()?;
                info!("Assessment for '{}' set to {}", id, assessment.status);
                writeln!(out, "{} -> {}", id, assessment.status.label())?;
                Ok(())
            }
            Command::Audits { text, status } => {
                let status = parse_status_filter(status.as_deref())?;
                print_audits(&context, text.as_deref(), status, out)
            }
            Command::Activity { count } => {
                for event in context.store.activity().recent(count) {
                    writeln!(
                        out,
                        "{}  {}",
                        event.at.format("%Y-%m-%d %H:%M"),
                        event.describe()
                    )?;
                }
                Ok(())
            }
            Command::Report {
                audit,
                kind,
                format,
                sections,
                output,
            } => {
                let mut request = ReportRequest::new(&audit);
                request.kind = kind.parse()?;
                request.format = format.parse()?;
                if !sections.is_empty() {
                    request.sections = sections
                        .iter()
                        .map(|s| s.parse::<ReportSection>())
                        .collect::<Result<_, _>>()?;
                }
                generate_report(context, request, output.as_deref(), out)
            }
        }
    }
}

fn start_server(config: &Config, context: AppContext) -> Result<(), EnsGuardError> {
    let host = config.server.host.clone();
    let port = config.server.port;
    let step_delay = Duration::from_millis(config.reports.step_delay_ms);

    info!("Starting server on {}:{}", host, port);

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| EnsGuardError::Error(format!("Failed to create runtime: {}", e)))?;

    rt.block_on(async {
        let web_server = crate::server::WebServer::new(host, port, step_delay);
        web_server.start(context).await
    })
}

fn print_stats(context: &AppContext, out: &mut dyn Write) -> Result<(), EnsGuardError> {
    let summary = DashboardSummary::compute(&context.catalog, &context.store, &context.audits);
    let stats = &summary.stats;

    writeln!(out, "Cumplimiento global: {}% ({:?})", stats.percentage, summary.health)?;
    writeln!(out, "Medidas evaluadas:   {}/{}", summary.evaluated, stats.total)?;
    writeln!(out, "Requieren atención:  {}", summary.needs_attention)?;
    writeln!(out, "Auditorías activas:  {}", summary.active_audits)?;
    writeln!(out)?;
    writeln!(out, "  Cumple     {:>4}", stats.compliant)?;
    writeln!(out, "  Parcial    {:>4}", stats.partial)?;
    writeln!(out, "  No Cumple  {:>4}", stats.non_compliant)?;
    writeln!(out, "  No Aplica  {:>4}", stats.not_applicable)?;
    writeln!(out, "  Pendiente  {:>4}", stats.pending)?;
    Ok(())
}

fn print_categories(context: &AppContext, out: &mut dyn Write) -> Result<(), EnsGuardError> {
    for rollup in compute_all_rollups(&context.catalog, &context.store) {
        writeln!(
            out,
            "{:<4} {:<28} {:>2}/{:<2} evaluadas {:>3}%  cumplimiento {:>3}%",
            rollup.code.map(|c| c.as_str()).unwrap_or("-"),
            rollup.name.as_deref().unwrap_or("-"),
            rollup.evaluated_measures,
            rollup.total_measures,
            rollup.completion_percentage,
            rollup.compliance_percentage,
        )?;
    }
    Ok(())
}

fn print_measures(
    context: &AppContext,
    query: &MeasureQuery,
    out: &mut dyn Write,
) -> Result<(), EnsGuardError> {
    let measures = filter(&context.catalog, &context.store, query);
    for measure in &measures {
        writeln!(
            out,
            "{:<10} {:<12} {}",
            measure.code,
            context.store.effective_status(&measure.id).label(),
            measure.name
        )?;
    }
    writeln!(out, "{} of {} measures", measures.len(), context.catalog.measures().len())?;
    Ok(())
}

fn print_measure(context: &AppContext, id: &str, out: &mut dyn Write) -> Result<(), EnsGuardError> {
    let measure = context
        .catalog
        .measure(id)
        .ok_or_else(|| EnsGuardError::UnknownMeasure(id.to_owned()))?;

    writeln!(out, "{} - {}", measure.code, measure.name)?;
    writeln!(out, "{}", measure.description)?;
    writeln!(out)?;
    writeln!(out, "BÁSICO: {}", measure.basic_requirement)?;
    writeln!(out, "MEDIO:  {}", measure.medium_requirement)?;
    writeln!(out, "ALTO:   {}", measure.high_requirement)?;
    writeln!(out)?;
    writeln!(
        out,
        "Estado: {}",
        context.store.effective_status(&measure.id).label()
    )?;

    if let Some(assessment) = context.store.get(&measure.id)? {
        if let Some(notes) = &assessment.notes {
            writeln!(out, "Notas: {}", notes)?;
        }
        if let Some(reviewer) = &assessment.reviewer {
            writeln!(out, "Revisor: {}", reviewer)?;
        }
        if let Some(reviewed_at) = &assessment.reviewed_at {
            writeln!(out, "Revisado: {}", reviewed_at.format("%Y-%m-%d"))?;
        }
        for evidence in &assessment.evidence {
            writeln!(out, "Evidencia: {}", evidence)?;
        }
    }
    Ok(())
}

fn print_audits(
    context: &AppContext,
    text: Option<&str>,
    status: Option<crate::audits::AuditStatus>,
    out: &mut dyn Write,
) -> Result<(), EnsGuardError> {
    let audits = context.audits.filter(text, status);
    for summary in AuditRegistry::summaries(&audits, &context.catalog, &context.store) {
        let audit = summary.audit;
        writeln!(
            out,
            "{:<3} {:<24} {:<14} {:<12} {} .. {}  {:>3}%",
            audit.id,
            audit.name,
            audit.organization,
            audit.status.label(),
            audit.start_date,
            audit.end_date,
            summary.completion_percentage
        )?;
    }
    Ok(())
}

/// Runs the report task on the current thread with no pacing
fn generate_report(
    context: AppContext,
    request: ReportRequest,
    output: Option<&Path>,
    out: &mut dyn Write,
) -> Result<(), EnsGuardError> {
    let mut task = ReportTask::new(
        1,
        request,
        Arc::new(context.catalog),
        context.store,
        context.audits,
        Duration::ZERO,
    )?;
    let progress = TaskProgress::new(task.task_id(), task.action(), &task.display_target());
    task.run(progress, Arc::new(AtomicBool::new(false)))?;

    let report = task
        .take_report()
        .ok_or_else(|| EnsGuardError::Error("Report task produced no report".into()))?;

    match output {
        Some(path) => {
            write_json_atomic(path, &report)?;
            writeln!(out, "Report written to {}", path.display())?;
        }
        None => writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?,
    }
    Ok(())
}
