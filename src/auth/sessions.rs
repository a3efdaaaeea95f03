//! Server-side sessions, cookie-referenced.
//!
//! The `sid` cookie carries a raw random token; the store is keyed by its
//! SHA-256 hash. Two backends implement `SessionStore`: an in-memory map
//! (default; sessions die with the process) and a sqlite-backed store for
//! deployments that need sessions to survive restarts.

use crate::db::{sessions as db_sessions, Database};
use crate::errors::ServerError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;

pub const SESSION_COOKIE: &str = "sid";
pub const SESSION_TTL_SECS: i64 = 24 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: String,
    pub email: String,
    /// "admin" or "employee".
    pub role: String,
    #[serde(rename = "fullName")]
    pub full_name: String,
}

impl SessionUser {
    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionData {
    pub user: Option<SessionUser>,
    pub csrf_token: Option<String>,
}

pub trait SessionStore: Send + Sync {
    fn load(&self, token_hash: &[u8; 32], now: i64) -> Result<Option<SessionData>, ServerError>;
    fn save(&self, token_hash: &[u8; 32], data: &SessionData, now: i64)
        -> Result<(), ServerError>;
    fn destroy(&self, token_hash: &[u8; 32]) -> Result<(), ServerError>;
}

#[derive(Default)]
pub struct MemorySessionStore {
    // (data, expires_at) keyed by token hash.
    entries: Mutex<HashMap<[u8; 32], (SessionData, i64)>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self, token_hash: &[u8; 32], now: i64) -> Result<Option<SessionData>, ServerError> {
        let mut entries = self.entries.lock().map_err(|_| ServerError::InternalError)?;
        match entries.get(token_hash) {
            Some((data, expires_at)) if *expires_at > now => Ok(Some(data.clone())),
            Some(_) => {
                entries.remove(token_hash);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn save(
        &self,
        token_hash: &[u8; 32],
        data: &SessionData,
        now: i64,
    ) -> Result<(), ServerError> {
        let mut entries = self.entries.lock().map_err(|_| ServerError::InternalError)?;
        entries.insert(*token_hash, (data.clone(), now + SESSION_TTL_SECS));
        Ok(())
    }

    fn destroy(&self, token_hash: &[u8; 32]) -> Result<(), ServerError> {
        let mut entries = self.entries.lock().map_err(|_| ServerError::InternalError)?;
        entries.remove(token_hash);
        Ok(())
    }
}

/// Durable session store on top of the local sqlite database.
pub struct SqliteSessionStore {
    db: Database,
}

impl SqliteSessionStore {
    pub fn new(path: &str) -> Self {
        let store = Self {
            db: Database::new(path, db_sessions::SCHEMA),
        };
        // Drop stale rows left over from previous runs.
        let now = chrono::Utc::now().timestamp();
        match store
            .db
            .with_conn(|conn| db_sessions::purge_expired(conn, now))
        {
            Ok(purged) if purged > 0 => tracing::info!(purged, "removed expired sessions"),
            Ok(_) => {}
            Err(err) => tracing::warn!(error = %err, "expired-session purge failed"),
        }
        store
    }
}

impl SessionStore for SqliteSessionStore {
    fn load(&self, token_hash: &[u8; 32], now: i64) -> Result<Option<SessionData>, ServerError> {
        let json = self
            .db
            .with_conn(|conn| db_sessions::load_session(conn, token_hash, now))?;
        match json {
            Some(json) => serde_json::from_str(&json)
                .map(Some)
                .map_err(|e| ServerError::DbError(format!("corrupt session payload: {e}"))),
            None => Ok(None),
        }
    }

    fn save(
        &self,
        token_hash: &[u8; 32],
        data: &SessionData,
        now: i64,
    ) -> Result<(), ServerError> {
        let json = serde_json::to_string(data)
            .map_err(|e| ServerError::DbError(format!("serialize session failed: {e}")))?;
        self.db.with_conn(|conn| {
            db_sessions::upsert_session(conn, token_hash, &json, now + SESSION_TTL_SECS)
        })
    }

    fn destroy(&self, token_hash: &[u8; 32]) -> Result<(), ServerError> {
        self.db
            .with_conn(|conn| db_sessions::delete_session(conn, token_hash))
    }
}

/// Build the Set-Cookie value for a fresh session token.
pub fn session_cookie(raw_token: &str) -> String {
    format!(
        "{SESSION_COOKIE}={raw_token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={SESSION_TTL_SECS}"
    )
}

/// Cookie that clears the session on logout.
pub fn clear_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

/// Pull the raw session token out of a Cookie header value.
pub fn token_from_cookie_header(header: &str) -> Option<&str> {
    header.split(';').find_map(|pair| {
        let pair = pair.trim();
        pair.strip_prefix(SESSION_COOKIE)
            .and_then(|rest| rest.strip_prefix('='))
            .filter(|v| !v.is_empty())
    })
}
