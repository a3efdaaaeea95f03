use crate::errors::ServerError;
use crate::tests::utils::{body_json, request, test_app};
use serde_json::json;

#[test]
fn login_returns_user_and_session_cookie() -> Result<(), Box<dyn std::error::Error>> {
    let app = test_app();
    app.seed_member("Jane Admin", "jane@example.com", "hunter2", "Admin");

    let resp = app.handle(request(
        "POST",
        "/api/auth/login",
        Some(json!({ "email": "jane@example.com", "password": "hunter2" })),
    ))?;

    assert_eq!(resp.status(), 200);
    let cookie = resp
        .headers()
        .get("Set-Cookie")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    assert!(cookie.starts_with("sid="), "got cookie: {cookie}");
    assert!(cookie.contains("HttpOnly"));

    let body = body_json(resp);
    assert_eq!(body["user"]["email"], "jane@example.com");
    assert_eq!(body["user"]["role"], "admin");
    assert_eq!(body["user"]["fullName"], "Jane Admin");
    Ok(())
}

#[test]
fn login_email_lookup_is_case_insensitive() -> Result<(), Box<dyn std::error::Error>> {
    let app = test_app();
    app.seed_member("Jane Admin", "Jane@Example.com", "hunter2", "Admin");

    let resp = app.handle(request(
        "POST",
        "/api/auth/login",
        Some(json!({ "email": "JANE@example.COM", "password": "hunter2" })),
    ))?;
    assert_eq!(resp.status(), 200);
    Ok(())
}

#[test]
fn login_rejects_wrong_password() {
    let app = test_app();
    app.seed_member("Jane Admin", "jane@example.com", "hunter2", "Admin");

    let err = app
        .handle(request(
            "POST",
            "/api/auth/login",
            Some(json!({ "email": "jane@example.com", "password": "nope" })),
        ))
        .unwrap_err();
    assert!(matches!(err, ServerError::Unauthorized(ref m) if m == "Invalid password"));
}

#[test]
fn login_rejects_unknown_account() {
    let app = test_app();
    let err = app
        .handle(request(
            "POST",
            "/api/auth/login",
            Some(json!({ "email": "ghost@example.com", "password": "x" })),
        ))
        .unwrap_err();
    assert!(matches!(err, ServerError::Unauthorized(ref m) if m == "Account not found"));
}

#[test]
fn pending_account_must_create_password_first() {
    let app = test_app();
    use crate::store::{format, Collection};
    app.store.seed(
        Collection::TeamMembers,
        json!({
            "Name": format::title("New Hire"),
            "Email Work": format::email("new@example.com"),
            "Status": format::select("Pending"),
            "Role": format::select("Employee"),
        }),
    );

    let err = app
        .handle(request(
            "POST",
            "/api/auth/login",
            Some(json!({ "email": "new@example.com", "password": "x" })),
        ))
        .unwrap_err();
    assert!(
        matches!(err, ServerError::Unauthorized(ref m) if m == "Please create a password first")
    );
}

fn seed_member_with_status(app: &crate::tests::utils::TestApp, email: &str, status: &str) {
    use crate::store::{format, Collection};
    app.store.seed(
        Collection::TeamMembers,
        json!({
            "Name": format::title("New Hire"),
            "Email Work": format::email(email),
            "Status": format::select(status),
            "Role": format::select("Employee"),
        }),
    );
}

#[test]
fn check_email_reports_account_status() -> Result<(), Box<dyn std::error::Error>> {
    let app = test_app();
    app.seed_member("Jane Admin", "jane@example.com", "hunter2", "Admin");

    let resp = app.handle(request(
        "POST",
        "/api/auth/check-email",
        Some(json!({ "email": "jane@example.com" })),
    ))?;
    assert_eq!(resp.status(), 200);
    let body = body_json(resp);
    assert_eq!(body["status"], "active");
    assert_eq!(body["message"], "Please enter your password");
    assert_eq!(body["hasPassword"], true);

    let resp = app.handle(request(
        "POST",
        "/api/auth/check-email",
        Some(json!({ "email": "ghost@example.com" })),
    ))?;
    let body = body_json(resp);
    assert_eq!(body["status"], "not_found");
    assert_eq!(body["message"], "Please contact admin to create an account");
    assert!(body.get("hasPassword").is_none());
    Ok(())
}

#[test]
fn check_email_flags_pending_and_terminated_accounts(
) -> Result<(), Box<dyn std::error::Error>> {
    let app = test_app();
    seed_member_with_status(&app, "new@example.com", "Pending");
    seed_member_with_status(&app, "gone@example.com", "Terminated");

    let body = body_json(app.handle(request(
        "POST",
        "/api/auth/check-email",
        Some(json!({ "email": "new@example.com" })),
    ))?);
    assert_eq!(body["status"], "pending");
    assert_eq!(body["message"], "Please create a password to activate your account");

    let body = body_json(app.handle(request(
        "POST",
        "/api/auth/check-email",
        Some(json!({ "email": "gone@example.com" })),
    ))?);
    assert_eq!(body["status"], "terminated");
    assert_eq!(body["message"], "You do not have access. Please contact admin.");
    Ok(())
}

#[test]
fn check_email_requires_email() {
    let app = test_app();
    let err = app
        .handle(request("POST", "/api/auth/check-email", Some(json!({}))))
        .unwrap_err();
    assert!(matches!(err, ServerError::BadRequest(ref m) if m == "Email is required"));
}

#[test]
fn create_password_activates_pending_account() -> Result<(), Box<dyn std::error::Error>> {
    let app = test_app();
    seed_member_with_status(&app, "new@example.com", "Pending");

    let resp = app.handle(request(
        "POST",
        "/api/auth/create-password",
        Some(json!({
            "email": "new@example.com",
            "password": "secret1",
            "confirmPassword": "secret1",
        })),
    ))?;
    assert_eq!(resp.status(), 200);
    // No session is issued; the client logs in with the new password.
    assert!(resp.headers().get("Set-Cookie").is_none());
    let body = body_json(resp);
    assert_eq!(body["message"], "Password created successfully");
    assert_eq!(body["user"]["role"], "employee");
    assert_eq!(body["user"]["fullName"], "New Hire");

    // The account is now active and the new password works.
    let resp = app.handle(request(
        "POST",
        "/api/auth/login",
        Some(json!({ "email": "new@example.com", "password": "secret1" })),
    ))?;
    assert_eq!(resp.status(), 200);
    Ok(())
}

#[test]
fn create_password_rejects_mismatch_and_short_passwords() {
    let app = test_app();
    seed_member_with_status(&app, "new@example.com", "Pending");

    let err = app
        .handle(request(
            "POST",
            "/api/auth/create-password",
            Some(json!({
                "email": "new@example.com",
                "password": "secret1",
                "confirmPassword": "different",
            })),
        ))
        .unwrap_err();
    assert!(matches!(err, ServerError::BadRequest(ref m) if m == "Passwords do not match"));

    let err = app
        .handle(request(
            "POST",
            "/api/auth/create-password",
            Some(json!({
                "email": "new@example.com",
                "password": "abc",
                "confirmPassword": "abc",
            })),
        ))
        .unwrap_err();
    assert!(matches!(
        err,
        ServerError::BadRequest(ref m) if m == "Password must be at least 6 characters"
    ));
}

#[test]
fn create_password_only_for_pending_accounts() {
    let app = test_app();
    app.seed_member("Jane Admin", "jane@example.com", "hunter2", "Admin");

    let err = app
        .handle(request(
            "POST",
            "/api/auth/create-password",
            Some(json!({
                "email": "jane@example.com",
                "password": "secret1",
                "confirmPassword": "secret1",
            })),
        ))
        .unwrap_err();
    assert!(matches!(
        err,
        ServerError::BadRequest(ref m) if m == "Account already active. Please login."
    ));

    let err = app
        .handle(request(
            "POST",
            "/api/auth/create-password",
            Some(json!({
                "email": "ghost@example.com",
                "password": "secret1",
                "confirmPassword": "secret1",
            })),
        ))
        .unwrap_err();
    assert!(matches!(err, ServerError::Unauthorized(ref m) if m == "Account not found"));
}

#[test]
fn login_requires_email_and_password() {
    let app = test_app();
    let err = app
        .handle(request(
            "POST",
            "/api/auth/login",
            Some(json!({ "email": "jane@example.com" })),
        ))
        .unwrap_err();
    assert!(matches!(err, ServerError::BadRequest(ref m) if m == "Email and password required"));
}

#[test]
fn eleventh_failed_login_is_rate_limited() {
    let app = test_app();
    app.seed_member("Jane Admin", "jane@example.com", "hunter2", "Admin");

    for _ in 0..10 {
        let err = app
            .handle(request(
                "POST",
                "/api/auth/login",
                Some(json!({ "email": "jane@example.com", "password": "nope" })),
            ))
            .unwrap_err();
        assert!(matches!(err, ServerError::Unauthorized(_)));
    }

    let err = app
        .handle(request(
            "POST",
            "/api/auth/login",
            Some(json!({ "email": "jane@example.com", "password": "nope" })),
        ))
        .unwrap_err();
    assert!(matches!(
        err,
        ServerError::TooManyRequests(ref m) if m == "Too many login attempts, please try again later"
    ));
}

#[test]
fn successful_logins_do_not_count_against_the_limit() {
    let app = test_app();
    app.seed_member("Jane Admin", "jane@example.com", "hunter2", "Admin");

    for _ in 0..9 {
        let _ = app.handle(request(
            "POST",
            "/api/auth/login",
            Some(json!({ "email": "jane@example.com", "password": "nope" })),
        ));
    }
    // Attempt 10 succeeds and is refunded.
    let resp = app
        .handle(request(
            "POST",
            "/api/auth/login",
            Some(json!({ "email": "jane@example.com", "password": "hunter2" })),
        ))
        .unwrap();
    assert_eq!(resp.status(), 200);

    // So one more failed attempt is still a password error, not a 429.
    let err = app
        .handle(request(
            "POST",
            "/api/auth/login",
            Some(json!({ "email": "jane@example.com", "password": "nope" })),
        ))
        .unwrap_err();
    assert!(matches!(err, ServerError::Unauthorized(_)));
}

#[test]
fn check_reports_session_state() -> Result<(), Box<dyn std::error::Error>> {
    let app = test_app();

    let err = app.handle(request("GET", "/api/auth/check", None)).unwrap_err();
    assert!(matches!(err, ServerError::Unauthorized(ref m) if m == "Not authenticated"));

    let session = app.logged_in_session("employee");
    let resp = app.handle(crate::tests::utils::authed_request(
        "GET",
        "/api/auth/check",
        None,
        &session,
    ))?;
    assert_eq!(resp.status(), 200);
    let body = body_json(resp);
    assert_eq!(body["user"]["role"], "employee");
    Ok(())
}

#[test]
fn logout_destroys_the_session() -> Result<(), Box<dyn std::error::Error>> {
    let app = test_app();
    let session = app.logged_in_session("employee");

    let resp = app.handle(crate::tests::utils::authed_request(
        "POST",
        "/api/auth/logout",
        None,
        &session,
    ))?;
    assert_eq!(resp.status(), 200);
    let cookie = resp
        .headers()
        .get("Set-Cookie")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    assert!(cookie.contains("Max-Age=0"));

    let err = app
        .handle(crate::tests::utils::authed_request(
            "GET",
            "/api/auth/check",
            None,
            &session,
        ))
        .unwrap_err();
    assert!(matches!(err, ServerError::Unauthorized(_)));
    Ok(())
}
