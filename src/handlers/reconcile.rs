//! Reconciliation pass over the move-intent journal: retry the source
//! archive for every move whose destination exists but whose source was
//! never removed. Run from `POST /api/databases/reconcile` (admin) instead
//! of an operator grepping warning logs.

use crate::errors::ServerError;
use crate::handlers::now_unix;
use crate::state::AppState;
use serde_json::{json, Value};

pub fn run(state: &AppState) -> Result<Value, ServerError> {
    let incomplete = state.intents.list_incomplete()?;
    let total = incomplete.len();
    let mut archived = 0usize;
    let mut failed = 0usize;

    for intent in incomplete {
        match state.store.archive(&intent.source_id) {
            Ok(_) => {
                state.intents.mark_complete(intent.id, now_unix())?;
                tracing::info!(
                    intent_id = intent.id,
                    kind = intent.kind,
                    source_id = %intent.source_id,
                    "reconciled: source archived"
                );
                archived += 1;
            }
            Err(err) => {
                state.intents.mark_needs_cleanup(intent.id)?;
                tracing::error!(
                    intent_id = intent.id,
                    kind = intent.kind,
                    source_id = %intent.source_id,
                    error = %err,
                    "reconcile attempt failed; intent left for next pass"
                );
                failed += 1;
            }
        }
    }

    Ok(json!({
        "success": true,
        "scanned": total,
        "archived": archived,
        "failed": failed,
    }))
}
