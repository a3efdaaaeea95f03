//! Pipeline action handlers, dispatched from `POST /api/databases/actions`
//! by `action` name.

pub mod log_activity;
pub mod move_to_closed;
pub mod move_to_pending;
pub mod move_to_pipeline;
pub mod move_to_submitted;
pub mod reconcile;
pub mod send_back_to_properties;
pub mod update_status;

use crate::errors::ServerError;
use crate::state::AppState;
use crate::store::{flatten_record, format::parse_number, schema, Collection};
use serde_json::{json, Value};

/// First pipeline stage, before the deal is fully executed.
pub const SUBMITTED_STAGE: &str = "Submitted";
/// First pending stage, entered at move-to-pending / move-to-pipeline.
pub const FIRST_PENDING_STAGE: &str = "Loan Application Received";

/// Dispatch an action payload to its handler. Unknown names are a 400: the
/// route exists, the payload is what is wrong.
pub fn dispatch(
    state: &AppState,
    actor: &str,
    action: &str,
    body: &Value,
) -> Result<Value, ServerError> {
    match action {
        "move-to-submitted" => move_to_submitted::run(state, actor, body),
        "move-to-pending" => move_to_pending::run(state, actor, body),
        "move-to-pipeline" => move_to_pipeline::run(state, actor, body),
        "update-status" => update_status::run(state, actor, body),
        "move-to-closed" => move_to_closed::run(state, actor, body),
        "send-back-to-properties" => send_back_to_properties::run(state, actor, body),
        "log-activity" => log_activity::run(state, actor, body),
        other => Err(ServerError::BadRequest(format!("Unknown action: {other}"))),
    }
}

/// Flatten a raw page into the canonical response shape.
pub(crate) fn flat_json(collection: Collection, page: &Value) -> Value {
    let mut flat = flatten_record(page);
    schema::canonicalize(collection, &mut flat);
    Value::Object(flat)
}

pub(crate) fn opt_number(body: &Value, name: &str) -> Option<f64> {
    body.get(name).and_then(parse_number)
}

pub(crate) fn now_unix() -> i64 {
    chrono::Utc::now().timestamp()
}

/// One cross-collection move: create the destination record, then archive
/// the source, journaling each step as a move intent.
pub(crate) struct TwoStepMove<'a> {
    /// Intent kind; by convention the action name.
    pub kind: &'a str,
    pub source_id: &'a str,
    pub address: &'a str,
    pub dest: Collection,
    pub properties: Value,
    /// Caller-facing message when the destination create fails.
    pub create_context: &'a str,
    /// Warning text when the source archive fails after a successful create.
    pub warning: &'a str,
    /// Response key carrying the orphaned source id on archive failure.
    pub orphan_key: &'a str,
}

/// Create-then-archive with the manual-cleanup fallback contract:
/// - create fails -> Err (500), source untouched;
/// - archive fails after create -> Ok with `success:true`, `warning`,
///   `requiresManualCleanup:true` and the orphaned source id. The new
///   destination record is never rolled back.
pub(crate) fn run_two_step(state: &AppState, mv: TwoStepMove<'_>) -> Result<Value, ServerError> {
    let now = now_unix();
    // Journaling is a safety net, not a gate: if the local journal is
    // unavailable the move still proceeds, as warned.
    let intent_id = match state.intents.begin(mv.kind, mv.source_id, mv.address, now) {
        Ok(id) => Some(id),
        Err(err) => {
            tracing::warn!(kind = mv.kind, error = %err, "move-intent journal unavailable");
            None
        }
    };

    let created = match state.store.create(mv.dest, mv.properties) {
        Ok(page) => page,
        Err(err) => {
            tracing::error!(
                kind = mv.kind,
                source_id = mv.source_id,
                address = mv.address,
                error = %err,
                "destination create failed; source left untouched"
            );
            if let Some(id) = intent_id {
                let _ = state.intents.mark_aborted(id, now_unix());
            }
            return Err(ServerError::upstream(mv.create_context, err));
        }
    };

    let dest_id = created.get("id").and_then(Value::as_str).unwrap_or("");
    if let Some(id) = intent_id {
        let _ = state.intents.mark_created(id, dest_id);
    }

    if let Err(err) = state.store.archive(mv.source_id) {
        tracing::error!(
            kind = mv.kind,
            source_id = mv.source_id,
            dest_id,
            address = mv.address,
            error = %err,
            "source archive failed after create; record exists in both collections"
        );
        if let Some(id) = intent_id {
            let _ = state.intents.mark_needs_cleanup(id);
        }
        return Ok(json!({
            "success": true,
            "data": flat_json(mv.dest, &created),
            "warning": mv.warning,
            "requiresManualCleanup": true,
            mv.orphan_key: mv.source_id,
        }));
    }

    if let Some(id) = intent_id {
        let _ = state.intents.mark_complete(id, now_unix());
    }
    Ok(json!({ "success": true, "data": flat_json(mv.dest, &created) }))
}
