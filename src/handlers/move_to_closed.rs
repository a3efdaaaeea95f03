//! Pipeline -> ClosedDeals. The closed-deal snapshot is created first; the
//! deal is archived second. A failed archive surfaces the manual-cleanup
//! contract rather than ever rolling back the snapshot.

use crate::activity::ActivityEntry;
use crate::errors::ServerError;
use crate::handlers::{opt_number, run_two_step, TwoStepMove};
use crate::state::AppState;
use crate::store::{format, Collection};
use crate::validation::{require_fields, str_field, validate_id};
use serde_json::{Map, Value};

pub fn run(state: &AppState, actor: &str, body: &Value) -> Result<Value, ServerError> {
    let deal_id = validate_id(str_field(body, "dealId"), "dealId")?;
    require_fields(body, &["address"])?;
    let address = str_field(body, "address").unwrap_or_default();

    let mut props = Map::new();
    props.insert("Property Address".into(), format::title(address));
    if let Some(office) = str_field(body, "office") {
        props.insert("Office".into(), format::select(office));
    }
    if let Some(close_date) = str_field(body, "closeDate") {
        props.insert("Close Date".into(), format::date(close_date));
    }
    if let Some(price) = opt_number(body, "finalSalePrice") {
        props.insert("Final Sale Price".into(), format::number(price));
    }
    if let Some(commission) = opt_number(body, "commission") {
        props.insert("Commission".into(), format::number(commission));
    }
    for (key, field) in [("agent", "Agent"), ("buyerName", "Buyer Name")] {
        if let Some(v) = str_field(body, key) {
            props.insert(field.into(), format::rich_text(v));
        }
    }

    let result = run_two_step(
        state,
        TwoStepMove {
            kind: "move-to-closed",
            source_id: deal_id.as_str(),
            address,
            dest: Collection::ClosedDeals,
            properties: Value::Object(props),
            create_context: "Failed to create closed deal entry",
            warning: "Deal was not archived from Pipeline. Please manually remove to avoid duplicates.",
            orphan_key: "duplicateDealId",
        },
    )?;

    state.activity.record(&ActivityEntry {
        action: &format!("Closed deal {address}"),
        actor,
        deal_address: Some(address),
        new_status: Some("Closed"),
        entity_type: Some("Deal"),
        action_type: Some("Moved Stage"),
        ..Default::default()
    });

    Ok(result)
}
