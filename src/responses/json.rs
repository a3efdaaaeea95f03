use crate::errors::ResultResp;
use astra::{Body, ResponseBuilder};
use serde_json::Value;

pub fn json_response(status: u16, body: &Value) -> ResultResp {
    let resp = ResponseBuilder::new()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .map_err(|_| crate::errors::ServerError::InternalError)?;
    Ok(resp)
}

/// JSON response that also sets (or clears) the session cookie.
pub fn json_response_with_cookie(status: u16, body: &Value, cookie: &str) -> ResultResp {
    let resp = ResponseBuilder::new()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Set-Cookie", cookie)
        .body(Body::from(body.to_string()))
        .map_err(|_| crate::errors::ServerError::InternalError)?;
    Ok(resp)
}
