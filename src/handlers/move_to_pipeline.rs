//! Legacy direct path: Properties -> active pipeline in one step, skipping
//! the Submitted stage. Create-then-archive with the manual-cleanup
//! fallback.

use crate::activity::ActivityEntry;
use crate::errors::ServerError;
use crate::handlers::{opt_number, run_two_step, TwoStepMove, FIRST_PENDING_STAGE};
use crate::state::AppState;
use crate::store::{format, Collection};
use crate::validation::{is_valid_email, is_valid_phone, require_fields, str_field, validate_id};
use serde_json::{Map, Value};

const REQUIRED: [&str; 6] = [
    "propertyId",
    "address",
    "agent",
    "buyerName",
    "buyerEmail",
    "buyerPhone",
];

pub fn run(state: &AppState, actor: &str, body: &Value) -> Result<Value, ServerError> {
    require_fields(body, &REQUIRED)?;
    let property_id = validate_id(str_field(body, "propertyId"), "propertyId")?;
    let address = str_field(body, "address").unwrap_or_default();
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
    props.insert("Address".into(), format::title(address));
    props.insert(
        "Sales Price".into(),
        format::number(opt_number(body, "salesPrice").unwrap_or(0.0)),
    );
    props.insert("Loan Status".into(), format::select(FIRST_PENDING_STAGE));
    props.insert("Buyer Email".into(), format::email(buyer_email));
    props.insert("Buyer Phone".into(), format::phone(buyer_phone));
    props.insert("Executed".into(), format::checkbox(true));

    for (key, field) in [
        ("agent", "Agent"),
        ("buyerName", "Buyer Name"),
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
    for (key, field) in [("office", "Office"), ("loanType", "Loan Type")] {
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
    if let Some(closed) = str_field(body, "closedDate") {
        props.insert("Scheduled Closing".into(), format::date(closed));
    }
    if let Some(executed) = str_field(body, "executeDate") {
        props.insert("Execute Date".into(), format::date(executed));
    }

    let result = run_two_step(
        state,
        TwoStepMove {
            kind: "move-to-pipeline",
            source_id: property_id.as_str(),
            address,
            dest: Collection::Pipeline,
            properties: Value::Object(props),
            create_context: "Failed to create pipeline entry",
            warning: "Property was not archived. Please manually remove from Properties to avoid duplicates.",
            orphan_key: "duplicatePropertyId",
        },
    )?;

    state.activity.record(&ActivityEntry {
        action: &format!("Moved {address} to Pipeline"),
        actor,
        deal_address: Some(address),
        new_status: Some(FIRST_PENDING_STAGE),
        entity_type: Some("Pipeline"),
        action_type: Some("Move to Pending"),
        ..Default::default()
    });

    Ok(result)
}
