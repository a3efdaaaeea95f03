use crate::errors::ServerError;
use crate::store::{format, Collection};
use crate::tests::utils::{authed_request, body_json, test_app};
use serde_json::json;
use std::sync::atomic::Ordering;

#[test]
fn reconcile_requires_admin() {
    let app = test_app();
    let session = app.logged_in_session("employee");
    let err = app
        .handle(authed_request(
            "POST",
            "/api/databases/reconcile",
            None,
            &session,
        ))
        .unwrap_err();
    assert!(matches!(err, ServerError::Forbidden(ref m) if m == "Admin access required"));
}

#[test]
fn reconcile_archives_orphaned_sources() -> Result<(), Box<dyn std::error::Error>> {
    let app = test_app();
    let employee = app.logged_in_session("employee");
    let admin = app.logged_in_session("admin");

    let deal_id = app.store.seed(
        Collection::Pipeline,
        json!({
            "Address": format::title("12 Oak St"),
            "Loan Status": format::select("Clear to Close"),
        }),
    );

    // A close whose archive step fails leaves an orphaned deal behind.
    app.store.fail_archive.store(true, Ordering::SeqCst);
    let resp = app.handle(authed_request(
        "POST",
        "/api/databases/actions",
        Some(json!({
            "action": "move-to-closed",
            "dealId": deal_id,
            "address": "12 Oak St",
        })),
        &employee,
    ))?;
    assert_eq!(body_json(resp)["requiresManualCleanup"], true);
    assert_eq!(app.state.intents.list_incomplete().unwrap().len(), 1);

    // Once the store recovers, reconcile retries the archive.
    app.store.fail_archive.store(false, Ordering::SeqCst);
    let resp = app.handle(authed_request(
        "POST",
        "/api/databases/reconcile",
        None,
        &admin,
    ))?;
    assert_eq!(resp.status(), 200);
    let body = body_json(resp);
    assert_eq!(body["success"], true);
    assert_eq!(body["scanned"], 1);
    assert_eq!(body["archived"], 1);
    assert_eq!(body["failed"], 0);

    assert!(app.store.is_archived(&deal_id));
    assert!(app.state.intents.list_incomplete().unwrap().is_empty());
    Ok(())
}

#[test]
fn reconcile_with_empty_journal_is_a_noop() -> Result<(), Box<dyn std::error::Error>> {
    let app = test_app();
    let admin = app.logged_in_session("admin");
    let resp = app.handle(authed_request(
        "POST",
        "/api/databases/reconcile",
        None,
        &admin,
    ))?;
    let body = body_json(resp);
    assert_eq!(body["scanned"], 0);
    assert_eq!(body["archived"], 0);
    Ok(())
}
