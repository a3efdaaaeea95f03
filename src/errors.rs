use astra::Response;
use thiserror::Error;

/// Errors originating from request handling (routing, validation, auth)
/// or downstream layers (remote record store, local sqlite).
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Not found")]
    NotFound,

    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Missing required payload fields. Rendered as
    /// `{"error": "Missing required fields", "details": "Required: a, b"}`.
    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Too many requests: {0}")]
    TooManyRequests(String),

    /// A remote store call failed. `context` is the caller-facing message
    /// ("Failed to create pipeline entry"), `details` the upstream error.
    #[error("{context}: {details}")]
    Upstream { context: String, details: String },

    #[error("Database error: {0}")]
    DbError(String),

    #[error("Internal server error")]
    InternalError,
}

// Type alias commonly used by route handlers.
pub type ResultResp = Result<Response, ServerError>;

impl ServerError {
    pub fn upstream(context: impl Into<String>, details: impl std::fmt::Display) -> Self {
        ServerError::Upstream {
            context: context.into(),
            details: details.to_string(),
        }
    }
}
