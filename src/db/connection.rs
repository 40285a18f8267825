use rusqlite::Connection;
use std::cell::RefCell;
use std::fs;
use std::time::Duration;

use crate::errors::ServerError;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

// Thread-local connection slot, remembered together with the path it opened.
thread_local! {
    static DB_CONN: RefCell<Option<(String, Connection)>> = const { RefCell::new(None) };
}

#[derive(Clone, Debug)]
pub struct Database {
    path: String,
}

impl Database {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Provides a mutable connection to the closure.
    ///
    /// Calls must not nest on the same thread; the slot is borrowed for the
    /// duration of `f`.
    pub fn with_conn<F, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Connection) -> Result<T, E>,
        E: From<ServerError>,
    {
        DB_CONN
            .try_with(|cell| {
                let mut slot = cell.try_borrow_mut().map_err(|_| {
                    E::from(ServerError::DbError("nested connection borrow".into()))
                })?;

                let stale = !matches!(slot.as_ref(), Some((path, _)) if *path == self.path);
                if stale {
                    let conn = Connection::open(&self.path).map_err(|e| {
                        E::from(ServerError::DbError(format!("Open DB failed: {e}")))
                    })?;
                    // Workers share one file; wait out another writer's lock.
                    conn.busy_timeout(BUSY_TIMEOUT).map_err(|e| {
                        E::from(ServerError::DbError(format!("Set busy timeout failed: {e}")))
                    })?;
                    conn.execute_batch("PRAGMA foreign_keys = ON;").map_err(|e| {
                        E::from(ServerError::DbError(format!("Enable foreign keys failed: {e}")))
                    })?;
                    *slot = Some((self.path.clone(), conn));
                }

                match slot.as_mut() {
                    Some((_, conn)) => f(conn),
                    None => Err(E::from(ServerError::InternalError)),
                }
            })
            .map_err(|_| E::from(ServerError::InternalError))?
    }
}

/// Initialize database from a SQL schema file
pub fn init_db(db: &Database, schema_path: &str) -> Result<(), ServerError> {
    let schema_sql = fs::read_to_string(schema_path)
        .map_err(|e| ServerError::DbError(format!("Failed to read schema file: {e}")))?;

    db.with_conn(|conn| {
        conn.execute_batch(&schema_sql)
            .map_err(|e| ServerError::DbError(format!("Failed to apply schema: {e}")))?;
        Ok::<_, ServerError>(())
    })?;

    tracing::info!(schema = schema_path, db = db.path(), "database initialized");
    Ok(())
}
