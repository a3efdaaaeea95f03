pub mod client;
pub mod format;
pub mod schema;

pub use client::{NotionStore, RecordStore, DEFAULT_MAX_PAGES};
pub use format::flatten_record;

use crate::errors::ServerError;

/// The business collections held in the remote workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Properties,
    Pipeline,
    ClosedDeals,
    TeamMembers,
    ActivityLog,
    Schedule,
}

impl Collection {
    pub const ALL: [Collection; 6] = [
        Collection::Properties,
        Collection::Pipeline,
        Collection::ClosedDeals,
        Collection::TeamMembers,
        Collection::ActivityLog,
        Collection::Schedule,
    ];

    /// Parse a URL key like `closed-deals` or `CLOSED_DEALS`.
    pub fn from_key(key: &str) -> Result<Self, ServerError> {
        let normalized = key.to_ascii_lowercase().replace('-', "_");
        match normalized.as_str() {
            "properties" => Ok(Collection::Properties),
            "pipeline" => Ok(Collection::Pipeline),
            "closed_deals" => Ok(Collection::ClosedDeals),
            "team_members" => Ok(Collection::TeamMembers),
            "activity_log" => Ok(Collection::ActivityLog),
            "schedule" => Ok(Collection::Schedule),
            _ => Err(ServerError::BadRequest(format!(
                "Database not found: {key}"
            ))),
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            Collection::Properties => "properties",
            Collection::Pipeline => "pipeline",
            Collection::ClosedDeals => "closed_deals",
            Collection::TeamMembers => "team_members",
            Collection::ActivityLog => "activity_log",
            Collection::Schedule => "schedule",
        }
    }
}
