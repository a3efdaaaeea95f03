use crate::errors::ServerError;
use crate::store::{format, Collection};
use crate::tests::utils::{authed_request, body_json, request, test_app, TestApp};
use serde_json::json;

fn seed_property(app: &TestApp, address: &str) -> String {
    app.store.seed(
        Collection::Properties,
        json!({
            "Address": format::title(address),
            "Status": format::select("Available"),
            "Price": format::number(425000.0),
        }),
    )
}

#[test]
fn listing_requires_authentication() {
    let app = test_app();
    let err = app
        .handle(request("GET", "/api/databases/properties", None))
        .unwrap_err();
    assert!(matches!(err, ServerError::Unauthorized(ref m) if m == "Authentication required"));
}

#[test]
fn listing_returns_flattened_records() -> Result<(), Box<dyn std::error::Error>> {
    let app = test_app();
    let session = app.logged_in_session("employee");
    seed_property(&app, "12 Oak St");
    seed_property(&app, "14 Oak St");

    let resp = app.handle(authed_request("GET", "/api/databases/properties", None, &session))?;
    assert_eq!(resp.status(), 200);
    let body = body_json(resp);
    let records = body.as_array().expect("array response");
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["Address"], "12 Oak St");
    assert_eq!(records[0]["Status"], "Available");
    assert_eq!(records[0]["Price"], 425000.0);
    Ok(())
}

#[test]
fn listing_canonicalizes_legacy_field_names() -> Result<(), Box<dyn std::error::Error>> {
    let app = test_app();
    let session = app.logged_in_session("employee");
    app.store.seed(
        Collection::Properties,
        json!({
            "Property Address": format::title("12 Oak St"),
            "Sales Price": format::number(425000.0),
        }),
    );

    let resp = app.handle(authed_request("GET", "/api/databases/properties", None, &session))?;
    let body = body_json(resp);
    assert_eq!(body[0]["Address"], "12 Oak St");
    assert_eq!(body[0]["Price"], 425000.0);
    assert!(body[0].get("Property Address").is_none());
    Ok(())
}

#[test]
fn unknown_database_key_is_404() {
    let app = test_app();
    let session = app.logged_in_session("employee");
    let err = app
        .handle(authed_request("GET", "/api/databases/banana", None, &session))
        .unwrap_err();
    assert!(matches!(err, ServerError::NotFound));
}

#[test]
fn updates_require_admin() {
    let app = test_app();
    let session = app.logged_in_session("employee");
    let id = seed_property(&app, "12 Oak St");

    let err = app
        .handle(authed_request(
            "PUT",
            &format!("/api/databases/properties/{id}"),
            Some(json!({ "properties": { "Price": format::number(1.0) } })),
            &session,
        ))
        .unwrap_err();
    assert!(matches!(err, ServerError::Forbidden(ref m) if m == "Admin access required"));
}

#[test]
fn update_applies_whitelisted_fields_and_strips_the_rest(
) -> Result<(), Box<dyn std::error::Error>> {
    let app = test_app();
    let session = app.logged_in_session("admin");
    let id = seed_property(&app, "12 Oak St");

    let resp = app.handle(authed_request(
        "PUT",
        &format!("/api/databases/properties/{id}"),
        Some(json!({
            "properties": {
                "Price": format::number(399000.0),
                "Linked Deal": format::rich_text("sneaky"),
            }
        })),
        &session,
    ))?;

    assert_eq!(resp.status(), 200);
    let body = body_json(resp);
    assert_eq!(body["data"]["Price"], 399000.0);
    assert!(body["data"].get("Linked Deal").is_none());
    Ok(())
}

#[test]
fn update_with_only_blocked_fields_is_rejected() {
    let app = test_app();
    let session = app.logged_in_session("admin");
    let id = seed_property(&app, "12 Oak St");

    let err = app
        .handle(authed_request(
            "PUT",
            &format!("/api/databases/properties/{id}"),
            Some(json!({ "properties": { "Linked Deal": format::rich_text("x") } })),
            &session,
        ))
        .unwrap_err();
    assert!(matches!(err, ServerError::BadRequest(ref m) if m == "No valid fields to update"));
}

#[test]
fn activity_log_is_never_editable() {
    let app = test_app();
    let session = app.logged_in_session("admin");
    let id = "7".repeat(32);

    let err = app
        .handle(authed_request(
            "PUT",
            &format!("/api/databases/activity_log/{id}"),
            Some(json!({ "properties": { "Action": format::title("rewrite history") } })),
            &session,
        ))
        .unwrap_err();
    assert!(
        matches!(err, ServerError::Forbidden(ref m) if m == "Editing not allowed for this database")
    );
}

#[test]
fn create_and_archive_roundtrip() -> Result<(), Box<dyn std::error::Error>> {
    let app = test_app();
    let session = app.logged_in_session("admin");

    let resp = app.handle(authed_request(
        "POST",
        "/api/databases/properties",
        Some(json!({
            "properties": {
                "Address": format::title("16 Oak St"),
                "Status": format::select("Available"),
            }
        })),
        &session,
    ))?;
    assert_eq!(resp.status(), 200);
    let body = body_json(resp);
    assert_eq!(body["success"], true);
    let id = body["data"]["id"].as_str().unwrap_or("").to_string();
    assert!(!id.is_empty());

    let resp = app.handle(authed_request(
        "DELETE",
        &format!("/api/databases/properties/{id}"),
        None,
        &session,
    ))?;
    assert_eq!(resp.status(), 200);
    assert_eq!(body_json(resp)["message"], "Record archived");
    assert!(app.store.is_archived(&id));
    Ok(())
}

#[test]
fn create_without_properties_is_rejected() {
    let app = test_app();
    let session = app.logged_in_session("admin");
    let err = app
        .handle(authed_request(
            "POST",
            "/api/databases/properties",
            Some(json!({})),
            &session,
        ))
        .unwrap_err();
    assert!(matches!(err, ServerError::BadRequest(ref m) if m == "Properties required"));
}

#[test]
fn malformed_record_id_is_rejected() {
    let app = test_app();
    let session = app.logged_in_session("admin");
    let err = app
        .handle(authed_request(
            "DELETE",
            "/api/databases/properties/not-hex",
            None,
            &session,
        ))
        .unwrap_err();
    assert!(matches!(err, ServerError::BadRequest(ref m) if m == "Invalid pageId format"));
}
