use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use derive_more::{Display, Error};

/// Typed failures raised by the lifecycle engine and the stores.
///
/// All variants are raised synchronously and propagated unchanged to the HTTP
/// layer, which alone decides status codes. A failed precondition always
/// aborts before any write.
#[derive(Debug, Display, Error)]
pub enum LeaveError {
    #[display(fmt = "{} not found", resource)]
    NotFound { resource: &'static str },

    #[display(fmt = "{}", reason)]
    InvalidState { reason: String },

    #[display(
        fmt = "Insufficient leave balance: {} days remaining, {} requested",
        remaining,
        requested
    )]
    InsufficientBalance { remaining: i64, requested: i64 },

    #[display(fmt = "{}", reason)]
    Forbidden { reason: &'static str },

    #[display(fmt = "{}", reason)]
    InvalidInput { reason: String },

    #[display(fmt = "Internal Server Error")]
    Storage { message: String },
}

impl LeaveError {
    pub fn not_found(resource: &'static str) -> Self {
        LeaveError::NotFound { resource }
    }

    pub fn invalid_state(reason: impl Into<String>) -> Self {
        LeaveError::InvalidState { reason: reason.into() }
    }

    pub fn forbidden(reason: &'static str) -> Self {
        LeaveError::Forbidden { reason }
    }

    pub fn invalid_input(reason: impl Into<String>) -> Self {
        LeaveError::InvalidInput { reason: reason.into() }
    }
}

impl From<sqlx::Error> for LeaveError {
    fn from(err: sqlx::Error) -> Self {
        LeaveError::Storage { message: err.to_string() }
    }
}

impl ResponseError for LeaveError {
    fn status_code(&self) -> StatusCode {
        match self {
            LeaveError::NotFound { .. } => StatusCode::NOT_FOUND,
            LeaveError::Forbidden { .. } => StatusCode::FORBIDDEN,
            LeaveError::InvalidState { .. }
            | LeaveError::InsufficientBalance { .. }
            | LeaveError::InvalidInput { .. } => StatusCode::BAD_REQUEST,
            LeaveError::Storage { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let LeaveError::Storage { message } = self {
            tracing::error!(error = %message, "storage failure");
        }
        HttpResponse::build(self.status_code())
            .json(serde_json::json!({ "error": self.to_string() }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_error_kind() {
        assert_eq!(
            LeaveError::not_found("leave request").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            LeaveError::forbidden("not yours").status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            LeaveError::InsufficientBalance { remaining: 2, requested: 3 }.status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn storage_errors_stay_opaque() {
        let err = LeaveError::Storage { message: "connection reset".into() };
        assert_eq!(err.to_string(), "Internal Server Error");
    }
}
