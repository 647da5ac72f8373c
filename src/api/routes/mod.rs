pub mod activity;
pub mod audits;
pub mod compliance;
pub mod measures;
pub mod reports;
pub mod server;
pub mod state;

use axum::{http::StatusCode, Json};
use log::{debug, error};
use serde::Serialize;

use crate::error::EnsGuardError;

/// Error response structure
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

/// Maps a domain error to its HTTP status and JSON body
pub fn api_error(err: EnsGuardError) -> ApiError {
    let status = match &err {
        EnsGuardError::InvalidStatus(_)
        | EnsGuardError::InvalidFilter(_)
        | EnsGuardError::InvalidTimestamp(_)
        | EnsGuardError::NoSectionsSelected => StatusCode::BAD_REQUEST,
        EnsGuardError::UnknownMeasure(_)
        | EnsGuardError::UnknownCategory(_)
        | EnsGuardError::UnknownAudit(_)
        | EnsGuardError::UnknownReport(_) => StatusCode::NOT_FOUND,
        EnsGuardError::ReportFinished(_) => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status == StatusCode::INTERNAL_SERVER_ERROR {
        error!("Request failed: {}", err);
    } else {
        debug!("Request rejected ({}): {}", status, err);
    }

    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(
            api_error(EnsGuardError::InvalidStatus("x".into())).0,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            api_error(EnsGuardError::NoSectionsSelected).0,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            api_error(EnsGuardError::UnknownMeasure("x".into())).0,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            api_error(EnsGuardError::UnknownReport(3)).0,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            api_error(EnsGuardError::ReportFinished(3)).0,
            StatusCode::CONFLICT
        );
        assert_eq!(
            api_error(EnsGuardError::Error("x".into())).0,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_body() {
        let (_, Json(body)) = api_error(EnsGuardError::UnknownAudit("9".into()));
        assert_eq!(body.error, "Unknown audit: '9'");
    }
}
