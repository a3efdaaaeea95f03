//! Submitted -> Pending.
//!
//! The full-form transition: writes all buyer/loan/contact fields onto the
//! deal, moves it to the first pending stage, locks the address and clears
//! the property back-reference. The linked Property is then archived
//! best-effort: once the deal update has landed, a failed archive is logged
//! and swallowed rather than failing the transition.

use crate::activity::ActivityEntry;
use crate::errors::ServerError;
use crate::handlers::{flat_json, opt_number, FIRST_PENDING_STAGE};
use crate::state::AppState;
use crate::store::{format, Collection};
use crate::validation::{
    is_valid_email, is_valid_phone, require_fields, str_field, validate_id, RecordId,
};
use serde_json::{json, Map, Value};

const REQUIRED: [&str; 10] = [
    "agent",
    "buyerName",
    "buyerEmail",
    "buyerPhone",
    "streetAddress",
    "city",
    "state",
    "zipCode",
    "subdivision",
    "floorPlan",
];

pub fn run(state: &AppState, actor: &str, body: &Value) -> Result<Value, ServerError> {
    let deal_id = validate_id(str_field(body, "dealId"), "dealId")?;

    // The property back-reference is optional here, but must be well-formed
    // when present.
    let property_id: Option<RecordId> = match str_field(body, "propertyId") {
        Some(raw) => Some(validate_id(Some(raw), "propertyId")?),
        None => None,
    };

    require_fields(body, &REQUIRED)?;
    let street_address = str_field(body, "streetAddress").unwrap_or_default();
    let buyer_email = str_field(body, "buyerEmail").unwrap_or_default();
    let buyer_phone = str_field(body, "buyerPhone").unwrap_or_default();

    if !is_valid_email(buyer_email) {
        return Err(ServerError::BadRequest("Invalid buyer email format".into()));
    }
    if let Some(lo_email) = str_field(body, "loEmail") {
        if !is_valid_email(lo_email) {
            return Err(ServerError::BadRequest("Invalid LO email format".into()));
        }
    }
    if let Some(realtor_email) = str_field(body, "realtorEmail") {
        if !is_valid_email(realtor_email) {
            return Err(ServerError::BadRequest(
                "Invalid realtor email format".into(),
            ));
        }
    }
    if !is_valid_phone(buyer_phone) {
        return Err(ServerError::BadRequest(
            "Phone must have 10-15 digits".into(),
        ));
    }

    let mut props = Map::new();
    props.insert("Address".into(), format::title(street_address));
    props.insert("Loan Status".into(), format::select(FIRST_PENDING_STAGE));
    props.insert("Buyer Email".into(), format::email(buyer_email));
    props.insert("Buyer Phone".into(), format::phone(buyer_phone));

    for (key, field) in [
        ("agent", "Agent"),
        ("buyerName", "Buyer Name"),
        ("submittedBy", "Submitted By"),
        ("agentRole", "Agent Role"),
        ("zipCode", "ZIP Code"),
        ("lot", "Lot"),
        ("block", "Block"),
        ("subdivision", "Subdivision"),
        ("floorPlan", "Floor Plan"),
        ("assistingAgent", "Assisting Agent"),
        ("brokerName", "Broker Name"),
        ("loName", "LO Name"),
        ("realtorPartner", "Realtor Partner"),
        ("notes", "Notes"),
    ] {
        if let Some(v) = str_field(body, key) {
            props.insert(field.into(), format::rich_text(v));
        }
    }
    for (key, field) in [("city", "City"), ("state", "State"), ("loanType", "Loan Type")] {
        if let Some(v) = str_field(body, key) {
            props.insert(field.into(), format::select(v));
        }
    }
    if let Some(lo_email) = str_field(body, "loEmail") {
        props.insert("LO Email".into(), format::email(lo_email));
    }
    if let Some(lo_phone) = str_field(body, "loPhone") {
        props.insert("LO Phone".into(), format::phone(lo_phone));
    }
    if let Some(realtor_email) = str_field(body, "realtorEmail") {
        props.insert("Realtor Email".into(), format::email(realtor_email));
    }
    if let Some(realtor_phone) = str_field(body, "realtorPhone") {
        props.insert("Realtor Phone".into(), format::phone(realtor_phone));
    }
    if let Some(amount) = opt_number(body, "loanAmount") {
        props.insert("Loan Amount".into(), format::number(amount));
    }

    // Lock the address and drop the property back-reference; from here the
    // deal owns its address.
    props.insert("Address Locked".into(), format::checkbox(true));
    props.insert("Linked Property".into(), format::clear_rich_text());
    props.insert("Executed".into(), format::checkbox(true));

    let updated = state
        .store
        .update(deal_id.as_str(), Value::Object(props))
        .map_err(|e| ServerError::upstream("Failed to update pipeline entry", e))?;

    // Best-effort: the deal update already counts as success.
    if let Some(property_id) = &property_id {
        if let Err(err) = state.store.archive(property_id.as_str()) {
            tracing::warn!(
                property_id = property_id.as_str(),
                deal_id = deal_id.as_str(),
                error = %err,
                "could not archive linked property; continuing"
            );
        }
    }

    state.activity.record(&ActivityEntry {
        action: &format!("Moved {street_address} to Pending"),
        actor,
        deal_address: Some(street_address),
        old_status: Some("Submitted"),
        new_status: Some(FIRST_PENDING_STAGE),
        entity_type: Some("Pipeline"),
        action_type: Some("Move to Pending"),
    });

    Ok(json!({
        "success": true,
        "data": flat_json(Collection::Pipeline, &updated),
    }))
}
