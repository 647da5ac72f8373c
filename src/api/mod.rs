pub mod routes;

// Re-export route handlers for convenience
pub use routes::activity;
pub use routes::audits;
pub use routes::compliance;
pub use routes::measures;
pub use routes::reports;
pub use routes::server;
pub use routes::state::AppState;
