//! Error types for the clinical API server

use std::sync::atomic::{AtomicBool, Ordering};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::auth::AuthError;

pub type Result<T> = std::result::Result<T, Error>;

/// When enabled (development-style configurations), 500 bodies include the
/// underlying store error instead of only the generic message.
static EXPOSE_ERRORS: AtomicBool = AtomicBool::new(false);

pub fn set_expose_errors(enabled: bool) {
    EXPOSE_ERRORS.store(enabled, Ordering::Relaxed);
}

#[derive(Error, Debug)]
pub enum Error {
    /// Malformed or missing request fields. Always resolved before any
    /// store call; the individual messages go into the `errors` array.
    #[error("Validation failed")]
    Validation(Vec<String>),

    #[error(transparent)]
    Authentication(#[from] AuthError),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    /// An update patch with zero recognized mutable fields. Rejected
    /// before reaching the store.
    #[error("No valid fields provided for update")]
    InvalidUpdate,

    /// A store failure wrapped with the operation that hit it, so the
    /// boundary can log which repository call failed without parsing
    /// message strings.
    #[error("{op}: {source}")]
    Store {
        op: &'static str,
        #[source]
        source: sqlx::Error,
    },

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation(vec![message.into()])
    }

    pub fn store(op: &'static str, source: sqlx::Error) -> Self {
        Error::Store { op, source }
    }

    /// Login failures use one shared constructor so unknown-email and
    /// wrong-password paths cannot drift apart (no account enumeration).
    pub fn invalid_credentials() -> Self {
        Error::Authentication(AuthError::InvalidCredentials)
    }

    fn status(&self) -> StatusCode {
        match self {
            Error::Validation(_) | Error::InvalidUpdate => StatusCode::BAD_REQUEST,
            Error::Authentication(_) => StatusCode::UNAUTHORIZED,
            Error::Forbidden(_) => StatusCode::FORBIDDEN,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Conflict(_) => StatusCode::CONFLICT,
            Error::Store { .. } | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match &self {
            Error::Validation(errors) => json!({
                "success": false,
                "message": "Validation failed",
                "errors": errors,
            }),
            Error::Store { .. } | Error::Internal(_) => {
                // Detail goes to the log; clients get a generic body unless
                // error exposure is switched on.
                tracing::error!(error = %self, "Internal error");
                if EXPOSE_ERRORS.load(Ordering::Relaxed) {
                    json!({
                        "success": false,
                        "message": "Internal server error",
                        "error": self.to_string(),
                    })
                } else {
                    json!({
                        "success": false,
                        "message": "Internal server error",
                    })
                }
            }
            other => json!({
                "success": false,
                "message": other.to_string(),
            }),
        };

        (status, Json(body)).into_response()
    }
}

/// Postgres unique-constraint violation (SQLSTATE 23505). Used by the
/// repositories to translate duplicate email / duplicate profile inserts
/// into `Error::Conflict`.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.code().as_deref() == Some("23505"),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(response: Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), 4096).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn validation_returns_400_with_errors_array() {
        let err = Error::Validation(vec!["date_of_birth is required".into()]);
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["errors"][0], "date_of_birth is required");
    }

    #[tokio::test]
    async fn forbidden_returns_403() {
        let response =
            Error::Forbidden("You can only view your own profile".into()).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn not_found_returns_404() {
        let response = Error::NotFound("Patient not found".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = body_json(response).await;
        assert_eq!(json["message"], "Patient not found");
    }

    #[tokio::test]
    async fn conflict_returns_409() {
        let response =
            Error::Conflict("User with this email already exists".into()).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn invalid_update_returns_400() {
        let response = Error::InvalidUpdate.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["message"], "No valid fields provided for update");
    }

    #[tokio::test]
    async fn store_error_hides_detail_from_client() {
        let err = Error::store("fetch patient", sqlx::Error::PoolTimedOut);
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["message"], "Internal server error");
        assert!(json.get("errors").is_none());
    }

    #[tokio::test]
    async fn invalid_credentials_is_identical_for_both_login_paths() {
        // Unknown email and wrong password construct through the same
        // helper; the rendered message and status must not differ.
        let a = Error::invalid_credentials().into_response();
        let b = Error::invalid_credentials().into_response();
        assert_eq!(a.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(a.status(), b.status());
        let ja = body_json(a).await;
        let jb = body_json(b).await;
        assert_eq!(ja, jb);
        assert_eq!(ja["message"], "Invalid email or password");
    }

    #[test]
    fn unique_violation_detects_sqlstate() {
        assert!(!is_unique_violation(&sqlx::Error::PoolTimedOut));
        assert!(!is_unique_violation(&sqlx::Error::RowNotFound));
    }
}
