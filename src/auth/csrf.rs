//! Cross-site request forgery defenses.
//!
//! Two layers, applied to every mutating request:
//! - Origin/Referer gating against an explicit allow-list. This also covers
//!   pre-authentication endpoints (login and friends), which cannot carry a
//!   session CSRF token yet.
//! - A per-session token, minted lazily on `GET /api/csrf-token` and echoed
//!   back via the `X-CSRF-Token` header or a `_csrf` body field once a
//!   logged-in session exists.

use crate::auth::sessions::SessionData;
use crate::auth::token;
use crate::errors::ServerError;
use serde_json::Value;

/// Paths exempt from the session-token check (no session exists before
/// authentication). Origin gating still applies to them.
pub const PRE_AUTH_PATHS: [&str; 3] = [
    "/api/auth/login",
    "/api/auth/check-email",
    "/api/auth/create-password",
];

pub fn is_mutating(method: &str) -> bool {
    !matches!(method, "GET" | "HEAD" | "OPTIONS")
}

/// Reject requests whose Origin (or, failing that, Referer) falls outside
/// the allow-list. Requests carrying neither header pass; browsers always
/// send Origin on cross-site mutations, and server-to-server callers are
/// gated by auth instead.
pub fn check_origin(
    origin: Option<&str>,
    referer: Option<&str>,
    allowed: &[String],
) -> Result<(), ServerError> {
    if let Some(origin) = origin {
        if allowed.iter().any(|a| a == origin.trim_end_matches('/')) {
            return Ok(());
        }
        return Err(ServerError::Forbidden("Invalid origin".into()));
    }
    if let Some(referer) = referer {
        if allowed.iter().any(|a| referer.starts_with(a.as_str())) {
            return Ok(());
        }
        return Err(ServerError::Forbidden("Invalid origin".into()));
    }
    Ok(())
}

/// For an authenticated session, the provided token (header first, then
/// `_csrf` in the body) must match the session's token.
pub fn check_session_token(
    session: &SessionData,
    header_token: Option<&str>,
    body: &Value,
) -> Result<(), ServerError> {
    if session.user.is_none() {
        return Ok(());
    }
    let provided = header_token.or_else(|| body.get("_csrf").and_then(Value::as_str));
    match (&session.csrf_token, provided) {
        (Some(expected), Some(provided)) if token::tokens_match(expected, provided) => Ok(()),
        _ => Err(ServerError::Forbidden("Invalid CSRF token".into())),
    }
}
