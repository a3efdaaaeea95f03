//! Move-intent journal.
//!
//! Every two-collection move (create destination, then archive source) is
//! journaled locally so a half-completed move is never known only to a log
//! line. The lifecycle is:
//!
//! `pending` -> `created` (destination exists) -> `complete` (source archived)
//!
//! An archive failure parks the intent at `needs_cleanup`; the reconcile pass
//! retries the archive for every `created`/`needs_cleanup` intent. A create
//! failure marks the intent `aborted` (source untouched, nothing to do).

use crate::db::Database;
use crate::errors::ServerError;
use rusqlite::{params, OptionalExtension};

pub const SCHEMA: &str = r#"
create table if not exists move_intents (
  id           integer primary key,
  kind         text not null,
  source_id    text not null,
  dest_id      text,
  address      text not null,
  state        text not null default 'pending',
  created_at   integer not null,
  completed_at integer
);

create index if not exists idx_move_intents_state on move_intents(state);
"#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveIntent {
    pub id: i64,
    pub kind: String,
    pub source_id: String,
    pub dest_id: Option<String>,
    pub address: String,
    pub state: String,
}

#[derive(Clone)]
pub struct IntentStore {
    db: Database,
}

impl IntentStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Journal a move before touching the remote store.
    pub fn begin(
        &self,
        kind: &str,
        source_id: &str,
        address: &str,
        now: i64,
    ) -> Result<i64, ServerError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "insert into move_intents (kind, source_id, address, state, created_at)
                 values (?, ?, ?, 'pending', ?)",
                params![kind, source_id, address, now],
            )
            .map_err(|e| ServerError::DbError(format!("begin intent failed: {e}")))?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Destination record exists; only the source archive remains.
    pub fn mark_created(&self, id: i64, dest_id: &str) -> Result<(), ServerError> {
        self.set_state(id, "created", Some(dest_id), None)
    }

    pub fn mark_complete(&self, id: i64, now: i64) -> Result<(), ServerError> {
        self.set_state(id, "complete", None, Some(now))
    }

    /// Create failed: the move never started as far as the store is concerned.
    pub fn mark_aborted(&self, id: i64, now: i64) -> Result<(), ServerError> {
        self.set_state(id, "aborted", None, Some(now))
    }

    /// Archive failed after a successful create; an operator (or the
    /// reconcile pass) must remove the source record.
    pub fn mark_needs_cleanup(&self, id: i64) -> Result<(), ServerError> {
        self.set_state(id, "needs_cleanup", None, None)
    }

    fn set_state(
        &self,
        id: i64,
        state: &str,
        dest_id: Option<&str>,
        completed_at: Option<i64>,
    ) -> Result<(), ServerError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "update move_intents
                 set state = ?,
                     dest_id = coalesce(?, dest_id),
                     completed_at = coalesce(?, completed_at)
                 where id = ?",
                params![state, dest_id, completed_at, id],
            )
            .map_err(|e| ServerError::DbError(format!("update intent failed: {e}")))?;
            Ok(())
        })
    }

    /// Moves whose destination exists but whose source was never archived.
    pub fn list_incomplete(&self) -> Result<Vec<MoveIntent>, ServerError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "select id, kind, source_id, dest_id, address, state
                     from move_intents
                     where state in ('created', 'needs_cleanup')
                     order by id",
                )
                .map_err(|e| ServerError::DbError(format!("prepare failed: {e}")))?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(MoveIntent {
                        id: row.get(0)?,
                        kind: row.get(1)?,
                        source_id: row.get(2)?,
                        dest_id: row.get(3)?,
                        address: row.get(4)?,
                        state: row.get(5)?,
                    })
                })
                .map_err(|e| ServerError::DbError(format!("query intents failed: {e}")))?;
            rows.collect::<Result<Vec<_>, _>>()
                .map_err(|e| ServerError::DbError(format!("read intent row failed: {e}")))
        })
    }

    pub fn get(&self, id: i64) -> Result<Option<MoveIntent>, ServerError> {
        self.db.with_conn(|conn| {
            conn.query_row(
                "select id, kind, source_id, dest_id, address, state
                 from move_intents where id = ?",
                params![id],
                |row| {
                    Ok(MoveIntent {
                        id: row.get(0)?,
                        kind: row.get(1)?,
                        source_id: row.get(2)?,
                        dest_id: row.get(3)?,
                        address: row.get(4)?,
                        state: row.get(5)?,
                    })
                },
            )
            .optional()
            .map_err(|e| ServerError::DbError(format!("intent lookup failed: {e}")))
        })
    }
}
