use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EnsGuardError {
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error), // Converts io::Error into EnsGuardError automatically

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Logger error: {0}")]
    LoggerError(#[from] flexi_logger::FlexiLoggerError),

    #[error("Unknown measure: '{0}'")]
    UnknownMeasure(String),

    #[error("Unknown category: '{0}'")]
    UnknownCategory(String),

    #[error("Unknown audit: '{0}'")]
    UnknownAudit(String),

    #[error("Unknown report: {0}")]
    UnknownReport(u64),

    #[error("Invalid compliance status: '{0}'")]
    InvalidStatus(String),

    #[error("Invalid timestamp: '{0}'")]
    InvalidTimestamp(String),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Catalog integrity error: {0}")]
    CatalogIntegrity(String),

    #[error("Report {0} has already finished")]
    ReportFinished(u64),

    #[error("A report needs at least one section")]
    NoSectionsSelected,

    #[error("Interrupted")]
    Interrupted,

    #[error("Error: {0}")]
    Error(String), // Allows custom application errors
}
