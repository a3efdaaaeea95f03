//! Explicit activity-log writes from the UI. Unlike the implicit entries the
//! transitions record, this one IS the primary operation, so store failures
//! surface to the caller.

use crate::activity::{ActivityEntry, ALLOWED_ACTION_TYPES, ALLOWED_ENTITY_TYPES};
use crate::errors::ServerError;
use crate::handlers::flat_json;
use crate::state::AppState;
use crate::store::Collection;
use crate::validation::str_field;
use serde_json::{json, Value};

pub fn run(state: &AppState, actor: &str, body: &Value) -> Result<Value, ServerError> {
    let log_action = str_field(body, "logAction")
        .ok_or_else(|| ServerError::BadRequest("logAction required".into()))?;

    let entity_type = str_field(body, "entityType");
    if let Some(entity) = entity_type {
        if !ALLOWED_ENTITY_TYPES.contains(&entity) {
            return Err(ServerError::BadRequest("Invalid entity type".into()));
        }
    }
    let action_type = str_field(body, "actionType");
    if let Some(action) = action_type {
        if !ALLOWED_ACTION_TYPES.contains(&action) {
            return Err(ServerError::BadRequest("Invalid action type".into()));
        }
    }

    let created = state.activity.append(&ActivityEntry {
        action: log_action,
        actor,
        deal_address: str_field(body, "dealAddress"),
        old_status: str_field(body, "oldStatus"),
        new_status: str_field(body, "newStatus"),
        entity_type,
        action_type,
    })?;

    Ok(json!({
        "success": true,
        "data": flat_json(Collection::ActivityLog, &created),
    }))
}
