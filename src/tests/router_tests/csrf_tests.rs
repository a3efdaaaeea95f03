use crate::errors::ServerError;
use crate::tests::utils::{body_json, test_app, TEST_ORIGIN};
use astra::Body;
use serde_json::json;

#[test]
fn foreign_origin_is_rejected_on_mutations() {
    let app = test_app();
    let session = app.logged_in_session("employee");
    let (raw, csrf) = &session;

    let req = http::Request::builder()
        .method("POST")
        .uri("/api/databases/actions")
        .header("Origin", "https://evil.example")
        .header("Cookie", format!("sid={raw}"))
        .header("X-CSRF-Token", csrf.as_str())
        .body(Body::from(
            json!({ "action": "log-activity", "logAction": "x" }).to_string(),
        ))
        .unwrap();

    let err = app.handle(req).unwrap_err();
    assert!(matches!(err, ServerError::Forbidden(ref m) if m == "Invalid origin"));
}

#[test]
fn logged_in_mutation_without_csrf_token_is_rejected() {
    let app = test_app();
    let (raw, _) = app.logged_in_session("employee");

    let req = http::Request::builder()
        .method("POST")
        .uri("/api/databases/actions")
        .header("Origin", TEST_ORIGIN)
        .header("Cookie", format!("sid={raw}"))
        .body(Body::from(
            json!({ "action": "log-activity", "logAction": "x" }).to_string(),
        ))
        .unwrap();

    let err = app.handle(req).unwrap_err();
    assert!(matches!(err, ServerError::Forbidden(ref m) if m == "Invalid CSRF token"));
}

#[test]
fn csrf_token_in_body_is_accepted() -> Result<(), Box<dyn std::error::Error>> {
    let app = test_app();
    let (raw, csrf) = app.logged_in_session("employee");

    let req = http::Request::builder()
        .method("POST")
        .uri("/api/databases/actions")
        .header("Origin", TEST_ORIGIN)
        .header("Cookie", format!("sid={raw}"))
        .body(Body::from(
            json!({ "action": "log-activity", "logAction": "Viewed dashboard", "_csrf": csrf })
                .to_string(),
        ))
        .unwrap();

    let resp = app.handle(req)?;
    assert_eq!(resp.status(), 200);
    assert_eq!(body_json(resp)["success"], true);
    Ok(())
}

#[test]
fn csrf_endpoint_mints_a_session_and_sticks_to_it() -> Result<(), Box<dyn std::error::Error>> {
    let app = test_app();

    // First contact: a session cookie comes back with the token.
    let req = http::Request::builder()
        .method("GET")
        .uri("/api/csrf-token")
        .header("Origin", TEST_ORIGIN)
        .body(Body::empty())
        .unwrap();
    let resp = app.handle(req)?;
    assert_eq!(resp.status(), 200);
    let cookie = resp
        .headers()
        .get("Set-Cookie")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    assert!(cookie.starts_with("sid="));
    let sid = cookie
        .split(';')
        .next()
        .and_then(|p| p.strip_prefix("sid="))
        .unwrap_or("")
        .to_string();
    let first = body_json(resp)["csrfToken"].as_str().unwrap_or("").to_string();
    assert!(!first.is_empty());

    // Same session: same token, no new cookie.
    let req = http::Request::builder()
        .method("GET")
        .uri("/api/csrf-token")
        .header("Origin", TEST_ORIGIN)
        .header("Cookie", format!("sid={sid}"))
        .body(Body::empty())
        .unwrap();
    let resp = app.handle(req)?;
    assert!(resp.headers().get("Set-Cookie").is_none());
    assert_eq!(body_json(resp)["csrfToken"], first.as_str());
    Ok(())
}

#[test]
fn unknown_session_cookie_never_becomes_a_session_key() -> Result<(), Box<dyn std::error::Error>>
{
    let app = test_app();

    // A cookie the server never issued must be replaced, not adopted.
    let req = http::Request::builder()
        .method("GET")
        .uri("/api/csrf-token")
        .header("Origin", TEST_ORIGIN)
        .header("Cookie", "sid=client-chosen-value")
        .body(Body::empty())
        .unwrap();
    let resp = app.handle(req)?;
    assert_eq!(resp.status(), 200);

    let cookie = resp
        .headers()
        .get("Set-Cookie")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    assert!(cookie.starts_with("sid="), "expected a fresh cookie, got: {cookie}");
    assert!(!cookie.contains("client-chosen-value"));

    // Nothing was stored under the client-chosen token.
    use crate::auth::token::hash_token;
    let now = chrono::Utc::now().timestamp();
    assert!(app
        .state
        .sessions
        .load(&hash_token("client-chosen-value"), now)
        .unwrap()
        .is_none());
    Ok(())
}

#[test]
fn get_requests_skip_csrf_checks() -> Result<(), Box<dyn std::error::Error>> {
    let app = test_app();
    let session = app.logged_in_session("employee");
    // No CSRF token needed on reads.
    let (raw, _) = &session;
    let req = http::Request::builder()
        .method("GET")
        .uri("/api/databases/properties")
        .header("Cookie", format!("sid={raw}"))
        .body(Body::empty())
        .unwrap();
    let resp = app.handle(req)?;
    assert_eq!(resp.status(), 200);
    Ok(())
}
