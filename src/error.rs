//! Error types and HTTP error response handling.
//!
//! This module defines all application errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Application-wide error type.
///
/// This enum represents all possible errors that can occur in the application.
/// Each variant maps to a specific HTTP status code and error message.
///
/// # Error Categories
///
/// - **Database Errors**: Any sqlx::Error from database operations
/// - **Authentication Errors**: Invalid or missing API keys, insufficient role
/// - **Resource Errors**: Requested events or check-ins not found
/// - **Conflict Errors**: Duplicate check-in from the same device, or a slug
///   already taken by another event
/// - **Validation Errors**: Invalid request data
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Database operation failed (e.g., connection error, query error).
    ///
    /// This wraps any sqlx::Error using the `#[from]` attribute, which
    /// automatically implements `From<sqlx::Error> for AppError`.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// API key is missing, invalid, or inactive.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("Invalid API key")]
    InvalidApiKey,

    /// Authenticated key lacks the role required for this operation.
    ///
    /// Returns HTTP 403 Forbidden.
    #[error("Admin access required")]
    Forbidden,

    /// No active event matches the requested slug or id.
    ///
    /// Returns HTTP 404 Not Found.
    #[error("Event not found")]
    EventNotFound,

    /// Requested check-in record does not exist.
    ///
    /// Returns HTTP 404 Not Found.
    #[error("Check-in not found")]
    CheckinNotFound,

    /// This device already produced a check-in for the event.
    ///
    /// Raised either by the guard's pre-check or by the store's unique
    /// constraint when two submissions race. Carries the masked name of the
    /// earlier submitter when it is known, so the client can show context.
    ///
    /// Returns HTTP 409 Conflict.
    #[error("Already checked in for this event")]
    AlreadyCheckedIn { previous: Option<String> },

    /// An event with the same generated slug already exists.
    ///
    /// Slugs are a pure function of (name, date), so creating two events with
    /// the same name on the same date collides. Creation is rejected.
    ///
    /// Returns HTTP 409 Conflict.
    #[error("An event with this name and date already exists")]
    SlugTaken,

    /// Submitted form data failed validation.
    ///
    /// Returns HTTP 422 Unprocessable Entity.
    #[error("Validation failed")]
    Validation(String),

    /// Field encryption or decryption failed.
    ///
    /// Returns HTTP 500 Internal Server Error (details hidden from client).
    #[error("Encryption error")]
    Encryption,
}

impl AppError {
    /// Whether a sqlx error is a unique-constraint violation on the given
    /// constraint or index name.
    ///
    /// Used to translate racing duplicate inserts into [`AppError::AlreadyCheckedIn`]
    /// and duplicate slugs into [`AppError::SlugTaken`].
    pub fn is_unique_violation(err: &sqlx::Error, constraint: &str) -> bool {
        match err {
            sqlx::Error::Database(db_err) => {
                db_err.is_unique_violation() && db_err.constraint() == Some(constraint)
            }
            _ => false,
        }
    }
}

/// Convert AppError into an HTTP response.
///
/// This implementation allows Axum handlers to return `Result<T, AppError>`
/// and have errors automatically converted to proper HTTP responses.
///
/// # Response Format
///
/// All errors return JSON in this format:
/// ```json
/// {
///   "error": {
///     "code": "error_type",
///     "message": "Human-readable error message"
///   }
/// }
/// ```
///
/// The duplicate check-in conflict additionally carries a `previous` field
/// with the masked name of the earlier submitter when it is known.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // The duplicate conflict has extra context, so it builds its own body
        if let AppError::AlreadyCheckedIn { ref previous } = self {
            let body = Json(json!({
                "error": {
                    "code": "already_checked_in",
                    "message": self.to_string(),
                    "previous": previous,
                }
            }));
            return (StatusCode::CONFLICT, body).into_response();
        }

        // Map each error variant to (HTTP status, error code, message)
        let (status, code, message) = match self {
            AppError::InvalidApiKey => (
                StatusCode::UNAUTHORIZED,
                "invalid_api_key",
                self.to_string(),
            ),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "forbidden", self.to_string()),
            AppError::EventNotFound => {
                (StatusCode::NOT_FOUND, "event_not_found", self.to_string())
            }
            AppError::CheckinNotFound => {
                (StatusCode::NOT_FOUND, "checkin_not_found", self.to_string())
            }
            AppError::SlugTaken => (StatusCode::CONFLICT, "slug_taken", self.to_string()),
            AppError::Validation(ref msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_failed",
                msg.clone(),
            ),
            AppError::AlreadyCheckedIn { .. } => unreachable!("handled above"),
            AppError::Database(_) | AppError::Encryption => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "An internal error occurred".to_string(),
            ),
        };

        // Build JSON response body
        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        // Return the response with status code and JSON body
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal database error reporting a unique violation on a named
    /// constraint, shaped like what the PostgreSQL driver returns.
    #[derive(Debug)]
    struct ConstraintError {
        constraint: &'static str,
        unique: bool,
    }

    impl std::fmt::Display for ConstraintError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "constraint \"{}\" violated", self.constraint)
        }
    }

    impl std::error::Error for ConstraintError {}

    impl sqlx::error::DatabaseError for ConstraintError {
        fn message(&self) -> &str {
            "constraint violated"
        }

        fn kind(&self) -> sqlx::error::ErrorKind {
            if self.unique {
                sqlx::error::ErrorKind::UniqueViolation
            } else {
                sqlx::error::ErrorKind::ForeignKeyViolation
            }
        }

        fn constraint(&self) -> Option<&str> {
            Some(self.constraint)
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }
    }

    fn db_error(constraint: &'static str, unique: bool) -> sqlx::Error {
        sqlx::Error::Database(Box::new(ConstraintError { constraint, unique }))
    }

    #[test]
    fn unique_violation_matches_on_constraint_name() {
        let err = db_error("events_slug_key", true);
        assert!(AppError::is_unique_violation(&err, "events_slug_key"));
    }

    #[test]
    fn unique_violation_on_another_constraint_does_not_match() {
        let err = db_error("events_slug_key", true);
        assert!(!AppError::is_unique_violation(
            &err,
            "event_checkins_event_ip_key"
        ));
    }

    #[test]
    fn other_constraint_kinds_do_not_match() {
        let err = db_error("events_slug_key", false);
        assert!(!AppError::is_unique_violation(&err, "events_slug_key"));
    }

    #[test]
    fn non_database_errors_do_not_match() {
        assert!(!AppError::is_unique_violation(
            &sqlx::Error::PoolClosed,
            "events_slug_key"
        ));
    }
}
