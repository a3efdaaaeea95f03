//! Sqlite persistence for the durable session store. Only token hashes are
//! stored, never raw tokens.

use crate::errors::ServerError;
use rusqlite::{params, Connection, OptionalExtension};

pub const SCHEMA: &str = r#"
create table if not exists sessions (
  token_hash blob primary key,
  data       text not null,
  expires_at integer not null
);

create index if not exists idx_sessions_expiry on sessions(expires_at);
"#;

pub fn upsert_session(
    conn: &Connection,
    token_hash: &[u8],
    data_json: &str,
    expires_at: i64,
) -> Result<(), ServerError> {
    conn.execute(
        "insert into sessions (token_hash, data, expires_at) values (?, ?, ?)
         on conflict(token_hash) do update set data = excluded.data,
                                               expires_at = excluded.expires_at",
        params![token_hash, data_json, expires_at],
    )
    .map_err(|e| ServerError::DbError(format!("save session failed: {e}")))?;
    Ok(())
}

pub fn load_session(
    conn: &Connection,
    token_hash: &[u8],
    now: i64,
) -> Result<Option<String>, ServerError> {
    conn.query_row(
        "select data from sessions where token_hash = ? and expires_at > ?",
        params![token_hash, now],
        |row| row.get(0),
    )
    .optional()
    .map_err(|e| ServerError::DbError(format!("session lookup failed: {e}")))
}

pub fn delete_session(conn: &Connection, token_hash: &[u8]) -> Result<(), ServerError> {
    conn.execute(
        "delete from sessions where token_hash = ?",
        params![token_hash],
    )
    .map_err(|e| ServerError::DbError(format!("delete session failed: {e}")))?;
    Ok(())
}

pub fn purge_expired(conn: &Connection, now: i64) -> Result<usize, ServerError> {
    conn.execute("delete from sessions where expires_at <= ?", params![now])
        .map_err(|e| ServerError::DbError(format!("purge sessions failed: {e}")))
}
