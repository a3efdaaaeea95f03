//! Append-only activity log.
//!
//! Every state-changing action is paired with (at most) one entry. For the
//! pipeline transitions the write is best-effort: an audit failure must never
//! roll back or fail the primary mutation.

use crate::errors::ServerError;
use crate::store::{format, Collection, RecordStore};
use crate::validation::sanitize;
use serde_json::{Map, Value};
use std::sync::Arc;

pub const ALLOWED_ENTITY_TYPES: [&str; 7] = [
    "Team Member",
    "Property",
    "Pipeline",
    "Client",
    "Schedule",
    "System",
    "Deal",
];

pub const ALLOWED_ACTION_TYPES: [&str; 11] = [
    "View",
    "Edit",
    "Create",
    "Delete",
    "Login",
    "Logout",
    "Navigate",
    "Move to Submitted",
    "Move to Pending",
    "Moved Stage",
    "Sent Back to Properties",
];

#[derive(Debug, Default, Clone)]
pub struct ActivityEntry<'a> {
    pub action: &'a str,
    pub actor: &'a str,
    pub deal_address: Option<&'a str>,
    pub old_status: Option<&'a str>,
    pub new_status: Option<&'a str>,
    pub entity_type: Option<&'a str>,
    pub action_type: Option<&'a str>,
}

#[derive(Clone)]
pub struct ActivityLogger {
    store: Arc<dyn RecordStore>,
}

impl ActivityLogger {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Write one entry; free text is sanitized before persisting. Returns
    /// the created raw page. Used directly by the `log-activity` action,
    /// where the entry IS the primary operation.
    pub fn append(&self, entry: &ActivityEntry<'_>) -> Result<Value, ServerError> {
        let mut props = Map::new();
        props.insert("Action".into(), format::title(&sanitize(entry.action)));
        props.insert("User".into(), format::rich_text(&sanitize(entry.actor)));
        if let Some(addr) = entry.deal_address {
            props.insert("Deal Address".into(), format::rich_text(&sanitize(addr)));
        }
        if let Some(old) = entry.old_status {
            props.insert("Old Status".into(), format::rich_text(&sanitize(old)));
        }
        if let Some(new) = entry.new_status {
            props.insert("New Status".into(), format::rich_text(&sanitize(new)));
        }
        if let Some(entity) = entry.entity_type {
            props.insert("Entity Type".into(), format::rich_text(entity));
        }
        if let Some(action_type) = entry.action_type {
            props.insert("Action Type".into(), format::rich_text(action_type));
        }
        props.insert(
            "Date".into(),
            format::date(&chrono::Utc::now().to_rfc3339()),
        );

        self.store
            .create(Collection::ActivityLog, Value::Object(props))
    }

    /// Best-effort variant used by the transition handlers: failures are
    /// logged and swallowed.
    pub fn record(&self, entry: &ActivityEntry<'_>) {
        if let Err(err) = self.append(entry) {
            tracing::warn!(
                action = entry.action,
                actor = entry.actor,
                error = %err,
                "activity log write failed; continuing"
            );
        }
    }
}
