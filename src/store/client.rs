use crate::config::{AppConfig, DatabaseIds};
use crate::errors::ServerError;
use crate::store::Collection;
use serde_json::{json, Value};
use std::time::Duration;

pub const NOTION_VERSION: &str = "2022-06-28";
pub const PAGE_SIZE: usize = 100;
/// Pagination cap: bounds worst-case latency of a single request, not a
/// completeness guarantee. Callers must tolerate truncated results.
pub const DEFAULT_MAX_PAGES: usize = 10;

/// Seam over the remote document store. Handlers only ever talk to this
/// trait, so tests can swap in an in-memory store with failure injection.
pub trait RecordStore: Send + Sync {
    /// Query a collection, following pagination up to `max_pages` pages of
    /// 100 records. Returns raw page objects (see `format::flatten_record`).
    fn query(
        &self,
        collection: Collection,
        filter: Option<Value>,
        sorts: Option<Value>,
        max_pages: usize,
    ) -> Result<Vec<Value>, ServerError>;

    /// Fetch a single record by id, archived or not.
    fn retrieve(&self, page_id: &str) -> Result<Value, ServerError>;

    fn create(&self, collection: Collection, properties: Value) -> Result<Value, ServerError>;

    fn update(&self, page_id: &str, properties: Value) -> Result<Value, ServerError>;

    /// Soft-delete: the record stays retrievable by id but drops out of
    /// normal queries.
    fn archive(&self, page_id: &str) -> Result<Value, ServerError>;
}

/// Blocking HTTP client for the Notion API.
pub struct NotionStore {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
    ids: DatabaseIds,
}

impl NotionStore {
    pub fn new(config: &AppConfig) -> Result<Self, ServerError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(20))
            .build()
            .map_err(|e| ServerError::upstream("Failed to build store client", e))?;
        Ok(Self {
            client,
            base_url: config.notion_base_url.trim_end_matches('/').to_string(),
            api_key: config.notion_api_key.clone(),
            ids: config.database_ids.clone(),
        })
    }

    pub fn database_id(&self, collection: Collection) -> &str {
        match collection {
            Collection::Properties => &self.ids.properties,
            Collection::Pipeline => &self.ids.pipeline,
            Collection::ClosedDeals => &self.ids.closed_deals,
            Collection::TeamMembers => &self.ids.team_members,
            Collection::ActivityLog => &self.ids.activity_log,
            Collection::Schedule => &self.ids.schedule,
        }
    }

    fn request(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, ServerError> {
        let url = format!("{}{path}", self.base_url);
        let mut req = self
            .client
            .request(method, &url)
            .bearer_auth(&self.api_key)
            .header("Notion-Version", NOTION_VERSION);
        if let Some(body) = body {
            req = req.json(body);
        }

        let resp = req
            .send()
            .map_err(|e| ServerError::upstream("Record store request failed", e))?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().unwrap_or_else(|_| "(no body)".to_string());
            return Err(ServerError::Upstream {
                context: format!("Record store returned {status}"),
                details: text,
            });
        }
        resp.json()
            .map_err(|e| ServerError::upstream("Record store returned invalid JSON", e))
    }
}

impl RecordStore for NotionStore {
    fn query(
        &self,
        collection: Collection,
        filter: Option<Value>,
        sorts: Option<Value>,
        max_pages: usize,
    ) -> Result<Vec<Value>, ServerError> {
        let database_id = self.database_id(collection).to_string();
        let path = format!("/databases/{database_id}/query");

        let mut results = Vec::new();
        let mut cursor: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let mut body = json!({ "page_size": PAGE_SIZE });
            if let Some(f) = &filter {
                body["filter"] = f.clone();
            }
            if let Some(s) = &sorts {
                body["sorts"] = s.clone();
            }
            if let Some(c) = &cursor {
                body["start_cursor"] = json!(c);
            }

            let page = self.request(reqwest::Method::POST, &path, Some(&body))?;
            if let Some(items) = page.get("results").and_then(Value::as_array) {
                results.extend(items.iter().cloned());
            }
            pages += 1;

            let has_more = page.get("has_more").and_then(Value::as_bool).unwrap_or(false);
            if !has_more {
                break;
            }
            if pages >= max_pages {
                tracing::warn!(
                    collection = collection.key(),
                    fetched = results.len(),
                    max_pages,
                    "query truncated at pagination cap; more records remain"
                );
                break;
            }
            cursor = page
                .get("next_cursor")
                .and_then(Value::as_str)
                .map(String::from);
            if cursor.is_none() {
                break;
            }
        }

        Ok(results)
    }

    fn retrieve(&self, page_id: &str) -> Result<Value, ServerError> {
        self.request(reqwest::Method::GET, &format!("/pages/{page_id}"), None)
    }

    fn create(&self, collection: Collection, properties: Value) -> Result<Value, ServerError> {
        let body = json!({
            "parent": { "database_id": self.database_id(collection) },
            "properties": properties,
        });
        self.request(reqwest::Method::POST, "/pages", Some(&body))
    }

    fn update(&self, page_id: &str, properties: Value) -> Result<Value, ServerError> {
        let body = json!({ "properties": properties });
        self.request(reqwest::Method::PATCH, &format!("/pages/{page_id}"), Some(&body))
    }

    fn archive(&self, page_id: &str) -> Result<Value, ServerError> {
        let body = json!({ "archived": true });
        self.request(reqwest::Method::PATCH, &format!("/pages/{page_id}"), Some(&body))
    }
}
