use crate::errors::ServerError;
use astra::{Body, Response, ResponseBuilder};
use serde_json::json;

/// Map the error taxonomy onto HTTP statuses and the `{error, details?}`
/// JSON shape the UI expects.
pub fn error_to_response(err: ServerError) -> Response {
    let (status, body) = match err {
        ServerError::NotFound => (404, json!({ "error": "Not found" })),
        ServerError::BadRequest(msg) => (400, json!({ "error": msg })),
        ServerError::MissingFields(missing) => (
            400,
            json!({
                "error": "Missing required fields",
                "details": format!("Required: {}", missing.join(", ")),
            }),
        ),
        ServerError::Unauthorized(msg) => (401, json!({ "error": msg })),
        ServerError::Forbidden(msg) => (403, json!({ "error": msg })),
        ServerError::TooManyRequests(msg) => (429, json!({ "error": msg })),
        ServerError::Upstream { context, details } => {
            (500, json!({ "error": context, "details": details }))
        }
        ServerError::DbError(msg) => (500, json!({ "error": msg })),
        ServerError::InternalError => (500, json!({ "error": "Internal server error" })),
    };

    ResponseBuilder::new()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap_or_else(|_| Response::new(Body::from("{\"error\":\"Internal server error\"}")))
}
