use rusqlite::Connection;
use std::cell::RefCell;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

use crate::errors::ServerError;

// Thread-local connection slots, keyed by path. Each server worker opens its
// own connection per database lazily; the schema is applied at open time so
// `:memory:` databases in tests come up ready to use.
thread_local! {
    static DB_CONNS: RefCell<HashMap<String, Connection>> = RefCell::new(HashMap::new());
}

#[derive(Clone)]
pub struct Database {
    path: String,
    schema: &'static str,
}

impl Database {
    pub fn new(path: impl Into<String>, schema: &'static str) -> Self {
        Self {
            path: path.into(),
            schema,
        }
    }

    /// Provides a mutable connection to the closure.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, ServerError>
    where
        F: FnOnce(&mut Connection) -> Result<T, ServerError>,
    {
        let inner_result = DB_CONNS
            .try_with(|cell| {
                let mut slots = cell.borrow_mut();
                let conn = match slots.entry(self.path.clone()) {
                    Entry::Occupied(entry) => entry.into_mut(),
                    Entry::Vacant(entry) => {
                        let conn = Connection::open(&self.path)
                            .map_err(|e| ServerError::DbError(format!("Open DB failed: {e}")))?;
                        conn.execute_batch(self.schema)
                            .map_err(|e| ServerError::DbError(format!("Apply schema failed: {e}")))?;
                        entry.insert(conn)
                    }
                };
                f(conn)
            })
            .map_err(|_| ServerError::InternalError)?;
        inner_result
    }
}
