use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use derive_more::Display;
use serde_json::json;

/// Service-wide error taxonomy. Every handler returns `Result<_, ApiError>`
/// and the variants map onto the HTTP statuses in `status_code`.
#[derive(Debug, Display)]
pub enum ApiError {
    /// Missing or malformed request evidence (image, location, dates).
    #[display(fmt = "{}", _0)]
    Validation(String),

    /// Missing/invalid credentials.
    #[display(fmt = "{}", _0)]
    Auth(String),

    /// Authenticated but not allowed (blocked account, non-admin).
    #[display(fmt = "{}", _0)]
    Forbidden(String),

    /// A record for the same (user, day) already exists.
    #[display(fmt = "{}", _0)]
    Conflict(String),

    /// Operation not valid in the record's current lifecycle state.
    #[display(fmt = "{}", _0)]
    State(String),

    #[display(fmt = "{}", _0)]
    NotFound(String),

    /// Image storage temporarily unavailable.
    #[display(fmt = "Storage temporarily unavailable")]
    TransientIo,

    /// Database unreachable while serving the request.
    #[display(fmt = "Database unavailable")]
    Connection,

    #[display(fmt = "Internal Server Error")]
    Internal,
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ApiError::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        ApiError::Conflict(msg.into())
    }

    pub fn state(msg: impl Into<String>) -> Self {
        ApiError::State(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        ApiError::Forbidden(msg.into())
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "validation",
            ApiError::Auth(_) => "auth",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::Conflict(_) => "conflict",
            ApiError::State(_) => "state",
            ApiError::NotFound(_) => "not_found",
            ApiError::TransientIo => "transient_io",
            ApiError::Connection => "connection",
            ApiError::Internal => "internal",
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Auth(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Conflict(_) | ApiError::State(_) => StatusCode::CONFLICT,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::TransientIo | ApiError::Connection => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "error": self.code(),
            "message": self.to_string(),
        }))
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                tracing::warn!(error = %e, "Database unavailable");
                ApiError::Connection
            }
            _ => {
                tracing::error!(error = %e, "Database query failed");
                ApiError::Internal
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_taxonomy() {
        assert_eq!(
            ApiError::validation("x").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Auth("x".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ApiError::forbidden("x").status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::conflict("x").status_code(), StatusCode::CONFLICT);
        assert_eq!(ApiError::state("x").status_code(), StatusCode::CONFLICT);
        assert_eq!(
            ApiError::Connection.status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn pool_errors_surface_as_connection() {
        let err: ApiError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(err, ApiError::Connection));

        let err: ApiError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, ApiError::Internal));
    }
}
