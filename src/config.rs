use std::env;

/// Remote database ids for each collection. Overridable per-collection via
/// environment so staging workspaces can point elsewhere.
#[derive(Debug, Clone)]
pub struct DatabaseIds {
    pub properties: String,
    pub pipeline: String,
    pub closed_deals: String,
    pub team_members: String,
    pub activity_log: String,
    pub schedule: String,
}

impl DatabaseIds {
    fn from_env() -> Self {
        let var = |name: &str, default: &str| env::var(name).unwrap_or_else(|_| default.into());
        Self {
            properties: var("NOTION_DB_PROPERTIES", "2b1746b9e0e880b9a2c8c3bc260c87bc"),
            pipeline: var("NOTION_DB_PIPELINE", "2b1746b9e0e8804e8470e355350e7d69"),
            closed_deals: var("NOTION_DB_CLOSED_DEALS", "2b1746b9e0e8800a8666e4f67622b49f"),
            team_members: var("NOTION_DB_TEAM_MEMBERS", "2b1746b9e0e88008a80cc65a1a4b21f9"),
            activity_log: var("NOTION_DB_ACTIVITY_LOG", "2b1746b9e0e8802bb0a5e141f0a9d88b"),
            schedule: var("NOTION_DB_SCHEDULE", "2b1746b9e0e8803a96fcf817797d0fe2"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub notion_api_key: String,
    pub notion_base_url: String,
    pub bind_addr: String,
    /// Origins accepted for mutating requests (Origin/Referer gate).
    pub allowed_origins: Vec<String>,
    /// Path for the durable session store. None = in-memory sessions.
    pub session_db_path: Option<String>,
    /// Path for the local sqlite database holding the move-intent journal.
    pub intent_db_path: String,
    pub database_ids: DatabaseIds,
}

impl AppConfig {
    /// Read configuration from the environment. `NOTION_API_KEY` is the one
    /// hard requirement; everything else has a development default.
    pub fn from_env() -> Result<Self, String> {
        let notion_api_key = env::var("NOTION_API_KEY")
            .map_err(|_| "NOTION_API_KEY is required".to_string())?;

        if env::var("SESSION_SECRET").is_err() {
            tracing::warn!("SESSION_SECRET not set; session tokens are random but unsigned");
        }

        let port = env::var("PORT").unwrap_or_else(|_| "3000".into());
        let bind_addr =
            env::var("BIND_ADDR").unwrap_or_else(|_| format!("127.0.0.1:{port}"));

        // Dev origins are always allowed; FRONTEND_URL extends the list.
        let mut allowed_origins = vec![
            "http://localhost:5173".to_string(),
            "http://localhost:5174".to_string(),
            "http://localhost:5175".to_string(),
        ];
        if let Ok(frontend) = env::var("FRONTEND_URL") {
            if !frontend.is_empty() {
                allowed_origins.push(frontend.trim_end_matches('/').to_string());
            }
        }

        Ok(Self {
            notion_api_key,
            notion_base_url: env::var("NOTION_BASE_URL")
                .unwrap_or_else(|_| "https://api.notion.com/v1".into()),
            bind_addr,
            allowed_origins,
            session_db_path: env::var("SESSION_DB_PATH").ok().filter(|p| !p.is_empty()),
            intent_db_path: env::var("INTENT_DB_PATH")
                .unwrap_or_else(|_| "deal_desk.sqlite3".into()),
            database_ids: DatabaseIds::from_env(),
        })
    }
}
