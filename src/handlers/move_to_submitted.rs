//! Properties -> Submitted (first pipeline stage).
//!
//! Creates the Pipeline record with a live back-reference to the Property.
//! The Property is NOT archived here; it stays visible and editable until
//! the deal moves to Pending.

use crate::activity::ActivityEntry;
use crate::errors::ServerError;
use crate::handlers::{flat_json, opt_number, SUBMITTED_STAGE};
use crate::state::AppState;
use crate::store::{format, Collection};
use crate::validation::{require_fields, str_field, validate_id};
use serde_json::{json, Map, Value};

pub fn run(state: &AppState, actor: &str, body: &Value) -> Result<Value, ServerError> {
    let property_id = validate_id(str_field(body, "propertyId"), "propertyId")?;
    require_fields(body, &["address", "buyerName"])?;
    let address = str_field(body, "address").unwrap_or_default();
    let buyer_name = str_field(body, "buyerName").unwrap_or_default();

    // The back-reference must point at a live Property.
    let property = state.store.retrieve(property_id.as_str()).map_err(|_| {
        ServerError::BadRequest("propertyId does not reference an existing property".into())
    })?;
    if property
        .get("archived")
        .and_then(Value::as_bool)
        .unwrap_or(false)
    {
        return Err(ServerError::BadRequest(
            "propertyId references an archived property".into(),
        ));
    }

    let mut props = Map::new();
    props.insert("Address".into(), format::title(address));
    props.insert("Loan Status".into(), format::select(SUBMITTED_STAGE));
    props.insert("Buyer Name".into(), format::rich_text(buyer_name));
    if let Some(price) = opt_number(body, "salesPrice") {
        props.insert("Sales Price".into(), format::number(price));
    }
    for (key, field) in [
        ("foreman", "Foreman"),
        ("subdivision", "Subdivision"),
        ("agentAssist", "Agent Assist"),
    ] {
        if let Some(v) = str_field(body, key) {
            props.insert(field.into(), format::rich_text(v));
        }
    }
    // Live back-reference; cleared (and the address locked) at move-to-pending.
    props.insert(
        "Linked Property".into(),
        format::rich_text(property_id.as_str()),
    );
    props.insert("Address Locked".into(), format::checkbox(false));

    let created = state
        .store
        .create(Collection::Pipeline, Value::Object(props))
        .map_err(|e| ServerError::upstream("Failed to create pipeline entry", e))?;

    state.activity.record(&ActivityEntry {
        action: &format!("Moved {address} to Submitted"),
        actor,
        deal_address: Some(address),
        new_status: Some(SUBMITTED_STAGE),
        entity_type: Some("Pipeline"),
        action_type: Some("Move to Submitted"),
        ..Default::default()
    });

    Ok(json!({
        "success": true,
        "data": flat_json(Collection::Pipeline, &created),
    }))
}
