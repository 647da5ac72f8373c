use axum::{
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Notify;

use crate::api::{self, AppState};
use crate::context::AppContext;
use crate::error::EnsGuardError;
use crate::task_manager::ReportManager;

pub struct WebServer {
    host: String,
    port: u16,
    report_step_delay: Duration,
}

impl WebServer {
    pub fn new(host: String, port: u16, report_step_delay: Duration) -> Self {
        Self {
            host,
            port,
            report_step_delay,
        }
    }

    pub async fn start(&self, context: AppContext) -> Result<(), EnsGuardError> {
        let shutdown_notify = Arc::new(Notify::new());
        let reports = ReportManager::new(self.report_step_delay);
        let app_state = AppState::new(context, reports.clone(), Arc::clone(&shutdown_notify));
        let app = create_router(app_state);

        let addr: SocketAddr = format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| EnsGuardError::Error(format!("Invalid address: {}", e)))?;

        println!("ENSGuard server starting on http://{}", addr);

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| EnsGuardError::Error(format!("Failed to bind to {}: {}", addr, e)))?;

        log::info!("Server ready to handle requests");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                tokio::select! {
                    _ = shutdown_signal() => {}
                    _ = shutdown_notify.notified() => {}
                }
                log::info!("Shutdown signal received, stopping report tasks...");
                println!("\nShutdown signal received - stopping server gracefully...");

                reports.interrupt_all();

                // Give report tasks a moment to observe the interrupt
                tokio::time::sleep(Duration::from_millis(500)).await;

                log::info!("Server shutdown complete");
                println!("   Server stopped");
            })
            .await
            .map_err(|e| EnsGuardError::Error(format!("Server error: {}", e)))?;

        Ok(())
    }
}

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))

        // Compliance figures
        .route("/api/stats", get(api::compliance::get_stats))
        .route("/api/dashboard", get(api::compliance::get_dashboard))
        .route("/api/categories", get(api::compliance::list_categories))
        .route("/api/categories/rollups", get(api::compliance::get_rollups))
        .route(
            "/api/categories/{category_id}/rollup",
            get(api::compliance::get_category_rollup),
        )

        // Measures and assessments
        .route("/api/measures", get(api::measures::list_measures))
        .route("/api/measures/{measure_id}", get(api::measures::get_measure))
        .route(
            "/api/assessments/{measure_id}",
            get(api::measures::get_assessment).put(api::measures::update_assessment),
        )

        // Audits
        .route("/api/audits", get(api::audits::list_audits))
        .route("/api/audits/{audit_id}", get(api::audits::get_audit))

        // Activity feed
        .route("/api/activity", get(api::activity::get_activity))

        // Report generation
        .route("/api/reports", post(api::reports::create_report))
        .route("/api/reports/{report_id}", get(api::reports::get_report))
        .route("/api/reports/{report_id}/cancel", post(api::reports::cancel_report))

        // Server control
        .route("/api/server/shutdown", post(api::server::shutdown))

        .with_state(app_state)
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub name: &'static str,
    pub version: &'static str,
}

async fn health_check() -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok",
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
        }),
    )
}

/// Waits for a shutdown signal (SIGTERM or SIGINT)
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                log::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            log::info!("Received SIGINT (Ctrl+C)");
        },
        _ = terminate => {
            log::info!("Received SIGTERM");
        },
    }
}
