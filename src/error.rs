use actix_web::{HttpResponse, http::StatusCode};
use serde_json::json;

use crate::model::attendance::EventKind;

/// Outcomes the engine reports to callers. Storage failures collapse into
/// one variant after the enclosing transaction has rolled back.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("an {0} event already exists for this employee today")]
    DuplicateEventKind(EventKind),

    #[error("check-out attempted with no check-in recorded today")]
    OutBeforeIn,

    #[error("attendance already complete for today, only one IN and one OUT are allowed")]
    AttendanceAlreadyComplete,

    #[error("employee {0} not found")]
    EmployeeNotFound(u64),

    #[error("no gallery entry matched the captured sample")]
    NoIdentityMatch,

    #[error("storage failure")]
    Storage(#[from] sqlx::Error),
}

impl AppError {
    fn code(&self) -> &'static str {
        match self {
            AppError::DuplicateEventKind(_) => "duplicate_event_kind",
            AppError::OutBeforeIn => "out_before_in",
            AppError::AttendanceAlreadyComplete => "attendance_already_complete",
            AppError::EmployeeNotFound(_) => "employee_not_found",
            AppError::NoIdentityMatch => "no_identity_match",
            AppError::Storage(_) => "storage_failure",
        }
    }
}

impl actix_web::ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::DuplicateEventKind(_) | AppError::AttendanceAlreadyComplete => {
                StatusCode::CONFLICT
            }
            AppError::OutBeforeIn => StatusCode::BAD_REQUEST,
            AppError::EmployeeNotFound(_) | AppError::NoIdentityMatch => StatusCode::NOT_FOUND,
            AppError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let AppError::Storage(e) = self {
            tracing::error!(error = %e, "Storage failure");
        }
        HttpResponse::build(self.status_code()).json(json!({
            "error": self.code(),
            "message": self.to_string(),
        }))
    }
}
