//! Single-field stage change on a deal. No cross-collection effect, and
//! idempotent: re-sending the current stage is a harmless no-op update.

use crate::activity::ActivityEntry;
use crate::errors::ServerError;
use crate::handlers::flat_json;
use crate::state::AppState;
use crate::store::{format, Collection};
use serde_json::{json, Value};

use crate::validation::{str_field, validate_id};

pub fn run(state: &AppState, actor: &str, body: &Value) -> Result<Value, ServerError> {
    let deal_id = validate_id(str_field(body, "dealId"), "dealId")?;
    let loan_status = str_field(body, "loanStatus")
        .ok_or_else(|| ServerError::BadRequest("loanStatus required".into()))?;

    let updated = state
        .store
        .update(
            deal_id.as_str(),
            json!({ "Loan Status": format::select(loan_status) }),
        )
        .map_err(|e| ServerError::upstream("Failed to update deal status", e))?;

    let flat = flat_json(Collection::Pipeline, &updated);
    let address = flat.get("Address").and_then(Value::as_str).unwrap_or("");

    state.activity.record(&ActivityEntry {
        action: &format!("Updated status to {loan_status}"),
        actor,
        deal_address: if address.is_empty() { None } else { Some(address) },
        new_status: Some(loan_status),
        entity_type: Some("Pipeline"),
        action_type: Some("Moved Stage"),
        ..Default::default()
    });

    Ok(json!({ "success": true, "data": flat }))
}
