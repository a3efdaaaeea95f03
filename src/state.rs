use crate::activity::ActivityLogger;
use crate::auth::credentials::{CredentialVerifier, PlaintextVerifier};
use crate::auth::rate_limit::RateLimiter;
use crate::auth::sessions::{MemorySessionStore, SessionStore, SqliteSessionStore};
use crate::config::AppConfig;
use crate::db::intents::{IntentStore, SCHEMA as INTENT_SCHEMA};
use crate::db::Database;
use crate::store::RecordStore;
use std::sync::Arc;

// Login attempts: 10 per 15 minutes per client, successes refunded.
pub const AUTH_WINDOW_SECS: i64 = 15 * 60;
pub const AUTH_MAX_ATTEMPTS: u32 = 10;
// General API: 100 requests per minute per client.
pub const API_WINDOW_SECS: i64 = 60;
pub const API_MAX_REQUESTS: u32 = 100;

/// Everything a request handler needs, shared across server workers.
pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<dyn RecordStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub activity: ActivityLogger,
    pub intents: IntentStore,
    pub verifier: Arc<dyn CredentialVerifier>,
    pub auth_limiter: RateLimiter,
    pub api_limiter: RateLimiter,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn RecordStore>) -> Self {
        let sessions: Arc<dyn SessionStore> = match &config.session_db_path {
            Some(path) => Arc::new(SqliteSessionStore::new(path)),
            None => {
                tracing::warn!("no SESSION_DB_PATH set; sessions will be lost on restart");
                Arc::new(MemorySessionStore::new())
            }
        };
        let intents = IntentStore::new(Database::new(&config.intent_db_path, INTENT_SCHEMA));
        let activity = ActivityLogger::new(Arc::clone(&store));

        Self {
            config,
            store,
            sessions,
            activity,
            intents,
            verifier: Arc::new(PlaintextVerifier),
            auth_limiter: RateLimiter::in_memory(AUTH_WINDOW_SECS, AUTH_MAX_ATTEMPTS),
            api_limiter: RateLimiter::in_memory(API_WINDOW_SECS, API_MAX_REQUESTS),
        }
    }
}
