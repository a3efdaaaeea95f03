//! Pipeline -> Properties: a fallen-through deal re-enters inventory. The
//! Property is recreated first (status defaults to "Available"), then the
//! deal is archived, with the shared manual-cleanup fallback.

use crate::activity::ActivityEntry;
use crate::errors::ServerError;
use crate::handlers::{opt_number, run_two_step, TwoStepMove};
use crate::state::AppState;
use crate::store::{format, Collection};
use crate::validation::{require_fields, str_field, validate_id};
use serde_json::{Map, Value};

pub const DEFAULT_STATUS: &str = "Available";

pub fn run(state: &AppState, actor: &str, body: &Value) -> Result<Value, ServerError> {
    let deal_id = validate_id(str_field(body, "dealId"), "dealId")?;
    require_fields(body, &["address"])?;
    let address = str_field(body, "address").unwrap_or_default();
    let status = str_field(body, "status").unwrap_or(DEFAULT_STATUS);

    let mut props = Map::new();
    props.insert("Address".into(), format::title(address));
    props.insert("Status".into(), format::select(status));
    if let Some(office) = str_field(body, "office") {
        props.insert("Office".into(), format::select(office));
    }
    if let Some(price) = opt_number(body, "salesPrice") {
        props.insert("Price".into(), format::number(price));
    }

    let result = run_two_step(
        state,
        TwoStepMove {
            kind: "send-back-to-properties",
            source_id: deal_id.as_str(),
            address,
            dest: Collection::Properties,
            properties: Value::Object(props),
            create_context: "Failed to create property entry",
            warning: "Deal was not archived from Pipeline. Please manually remove to avoid duplicates.",
            orphan_key: "duplicateDealId",
        },
    )?;

    state.activity.record(&ActivityEntry {
        action: &format!("Sent {address} back to Properties"),
        actor,
        deal_address: Some(address),
        new_status: Some(status),
        entity_type: Some("Property"),
        action_type: Some("Sent Back to Properties"),
        ..Default::default()
    });

    Ok(result)
}
