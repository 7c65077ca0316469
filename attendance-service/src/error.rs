use attendance_utils::error::Error as AttendanceError;
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{1}")]
    Server(StatusCode, String),
    // Froms
    #[error(transparent)]
    Attendance(#[from] AttendanceError),
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = StatusCode::from(&self);
        let message = match &self {
            // The connection failure reason stays in the logs
            Error::Attendance(AttendanceError::StoreUnavailable(_)) => {
                "Database connection failed.".to_string()
            }
            e => e.to_string(),
        };

        (status, Json(json!({"success": false, "message": message}))).into_response()
    }
}

impl From<&Error> for StatusCode {
    fn from(error: &Error) -> Self {
        match error {
            Error::Server(c, _) => *c,
            Error::Attendance(e) => {
                StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }
}

/// Malformed or missing JSON bodies are client errors
impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Error::Attendance(AttendanceError::Validation(rejection.body_text()))
    }
}

pub trait ResponseContext<T> {
    /// Logs a failed store operation and replaces the message the client sees
    fn response_context(self, message: &str) -> Result<T, Error>;
}

impl<T> ResponseContext<T> for Result<T, AttendanceError> {
    fn response_context(self, message: &str) -> Result<T, Error> {
        self.map_err(|e| match e {
            AttendanceError::Store(_) => {
                tracing::error!(error = %e, "{message}");
                Error::Server(StatusCode::INTERNAL_SERVER_ERROR, message.to_string())
            }
            AttendanceError::StoreUnavailable(_) => {
                tracing::error!(error = %e, "event store unavailable");
                e.into()
            }
            e => e.into(),
        })
    }
}
