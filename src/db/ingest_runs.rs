use crate::domain::recall::RecallSource;
use crate::errors::ServerError;
use rusqlite::{params, Connection};

#[derive(Debug)]
pub struct IngestRun {
    pub id: i64,
    pub source: String,
    pub started_at: i64,
    pub finished_at: Option<i64>,
    pub records_seen: Option<i64>,
    pub records_stored: Option<i64>,
    pub success: bool,
    pub error_message: Option<String>,
}

pub fn start_ingest_run(
    conn: &Connection,
    source: RecallSource,
    now: i64,
) -> Result<i64, ServerError> {
    conn.execute(
        "INSERT INTO ingest_runs (source, started_at, success) VALUES (?, ?, 0)",
        params![source.as_str(), now],
    )
    .map_err(|e| ServerError::DbError(e.to_string()))?;
    Ok(conn.last_insert_rowid())
}

pub fn end_ingest_run(
    conn: &Connection,
    run_id: i64,
    now: i64,
    seen: usize,
    stored: usize,
    error: Option<String>,
) -> Result<(), ServerError> {
    conn.execute(
        "UPDATE ingest_runs SET finished_at = ?, records_seen = ?, records_stored = ?, success = ?, error_message = ? WHERE id = ?",
        params![now, seen as i64, stored as i64, error.is_none(), error, run_id],
    )
    .map_err(|e| ServerError::DbError(e.to_string()))?;
    Ok(())
}

pub fn get_recent_ingest_runs(conn: &Connection) -> Result<Vec<IngestRun>, ServerError> {
    let mut stmt = conn
        .prepare("SELECT id, source, started_at, finished_at, records_seen, records_stored, success, error_message FROM ingest_runs ORDER BY started_at DESC, id DESC LIMIT 50")
        .map_err(|e| ServerError::DbError(e.to_string()))?;

    let rows = stmt
        .query_map([], |row| {
            Ok(IngestRun {
                id: row.get(0)?,
                source: row.get(1)?,
                started_at: row.get(2)?,
                finished_at: row.get(3)?,
                records_seen: row.get(4)?,
                records_stored: row.get(5)?,
                success: row.get(6)?,
                error_message: row.get(7)?,
            })
        })
        .map_err(|e| ServerError::DbError(e.to_string()))?;

    let mut runs = Vec::new();
    for r in rows {
        runs.push(r.map_err(|e| ServerError::DbError(e.to_string()))?);
    }
    Ok(runs)
}
