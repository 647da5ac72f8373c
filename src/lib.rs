pub mod activity;
pub mod api;
pub mod assessments;
pub mod audits;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod context;
pub mod dashboard;
pub mod error;
pub mod filter;
pub mod logging;
pub mod reports;
pub mod server;
pub mod snapshot;
pub mod stats;
pub mod status;
pub mod task;
pub mod task_manager;
