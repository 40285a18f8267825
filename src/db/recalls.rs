// src/db/recalls.rs
use crate::db::connection::Database;
use crate::db::documents::{from_document, to_document};
use crate::domain::recall::{AuditedDisplay, RecallSnapshot, RecallSource, StoredRecall};
use crate::domain::NATIONWIDE;
use crate::errors::ServerError;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};

/// Publishes display metadata onto live recalls of one source.
/// `None` removes the override.
pub trait RecallDisplayStore: Send + Sync {
    fn update_recall_display(
        &self,
        recall_id: &str,
        display: Option<&AuditedDisplay>,
    ) -> Result<(), ServerError>;
}

/// SQLite-backed display store scoped to a single source.
pub struct SqliteRecallStore {
    db: Database,
    source: RecallSource,
}

impl SqliteRecallStore {
    pub fn new(db: Database, source: RecallSource) -> Self {
        Self { db, source }
    }
}

impl RecallDisplayStore for SqliteRecallStore {
    fn update_recall_display(
        &self,
        recall_id: &str,
        display: Option<&AuditedDisplay>,
    ) -> Result<(), ServerError> {
        self.db
            .with_conn(|conn| set_display(conn, self.source, recall_id, display, Utc::now()))
    }
}

/// One display store per source; approval dispatches through `for_source`.
pub struct RecallDisplayStores {
    usda: Box<dyn RecallDisplayStore>,
    fda: Box<dyn RecallDisplayStore>,
    temp_fda: Box<dyn RecallDisplayStore>,
}

impl RecallDisplayStores {
    pub fn new(
        usda: Box<dyn RecallDisplayStore>,
        fda: Box<dyn RecallDisplayStore>,
        temp_fda: Box<dyn RecallDisplayStore>,
    ) -> Self {
        Self {
            usda,
            fda,
            temp_fda,
        }
    }

    pub fn sqlite(db: &Database) -> Self {
        Self::new(
            Box::new(SqliteRecallStore::new(db.clone(), RecallSource::Usda)),
            Box::new(SqliteRecallStore::new(db.clone(), RecallSource::Fda)),
            Box::new(SqliteRecallStore::new(db.clone(), RecallSource::TempFda)),
        )
    }

    pub fn for_source(&self, source: RecallSource) -> &dyn RecallDisplayStore {
        match source {
            RecallSource::Usda => self.usda.as_ref(),
            RecallSource::Fda => self.fda.as_ref(),
            RecallSource::TempFda => self.temp_fda.as_ref(),
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct RecallFilter {
    pub source: Option<RecallSource>,
    /// Full state name; nationwide recalls always match.
    pub state: Option<String>,
    pub updated_since: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
}

const SQL_SELECT_RECALL: &str = r#"
    select source, id, title, recall_date, affected_states, payload, display, updated_at
    from recalls
"#;

struct RecallRow {
    source: String,
    id: String,
    title: String,
    recall_date: Option<NaiveDate>,
    affected_states: String,
    payload: String,
    display: Option<String>,
    updated_at: DateTime<Utc>,
}

impl RecallRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(RecallRow {
            source: row.get(0)?,
            id: row.get(1)?,
            title: row.get(2)?,
            recall_date: row.get(3)?,
            affected_states: row.get(4)?,
            payload: row.get(5)?,
            display: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }

    fn into_stored(self) -> Result<StoredRecall, ServerError> {
        let source = self
            .source
            .parse::<RecallSource>()
            .map_err(ServerError::DbError)?;
        let display = match self.display.as_deref() {
            Some(doc) => Some(from_document::<AuditedDisplay>(doc)?),
            None => None,
        };
        Ok(StoredRecall {
            id: self.id,
            source,
            title: self.title,
            recall_date: self.recall_date,
            affected_states: from_document(&self.affected_states)?,
            snapshot: from_document(&self.payload)?,
            display,
            updated_at: self.updated_at,
        })
    }
}

/// Insert or refresh a recall from its feed snapshot. A published display
/// override survives re-ingestion.
pub fn upsert_recall(
    conn: &Connection,
    snapshot: &RecallSnapshot,
    now: DateTime<Utc>,
) -> Result<(), ServerError> {
    let affected = to_document(&snapshot.affected_states())?;
    let payload = to_document(snapshot)?;

    conn.execute(
        r#"
        insert into recalls (source, id, title, recall_date, affected_states, payload, created_at, updated_at)
        values (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
        on conflict(source, id) do update set
            title = excluded.title,
            recall_date = excluded.recall_date,
            affected_states = excluded.affected_states,
            payload = excluded.payload,
            updated_at = excluded.updated_at
        "#,
        params![
            snapshot.source().as_str(),
            snapshot.id(),
            snapshot.title(),
            snapshot.date(),
            affected,
            payload,
            now
        ],
    )
    .map_err(|e| ServerError::DbError(format!("upsert recall failed: {e}")))?;

    Ok(())
}

pub fn get_recall(
    conn: &Connection,
    source: RecallSource,
    id: &str,
) -> Result<Option<StoredRecall>, ServerError> {
    let sql = format!("{SQL_SELECT_RECALL} where source = ?1 and id = ?2");
    let row = conn
        .query_row(&sql, params![source.as_str(), id], RecallRow::from_row)
        .optional()
        .map_err(|e| ServerError::DbError(format!("load recall failed: {e}")))?;

    row.map(RecallRow::into_stored).transpose()
}

pub fn list_recalls(conn: &Connection, filter: &RecallFilter) -> Result<Vec<StoredRecall>, ServerError> {
    let sql = format!(
        r#"{SQL_SELECT_RECALL}
        where (?1 is null or source = ?1)
          and (?2 is null or exists (
                select 1 from json_each(recalls.affected_states) s
                where s.value = ?2 or s.value = ?3))
          and (?4 is null or updated_at >= ?4)
        order by recall_date desc, id
        limit ?5
        "#
    );

    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| ServerError::DbError(format!("prepare recall listing failed: {e}")))?;

    let rows = stmt
        .query_map(
            params![
                filter.source.map(|s| s.as_str()),
                filter.state.as_deref(),
                NATIONWIDE,
                filter.updated_since,
                filter.limit.unwrap_or(-1)
            ],
            RecallRow::from_row,
        )
        .map_err(|e| ServerError::DbError(format!("recall listing failed: {e}")))?;

    let mut out = Vec::new();
    for row in rows {
        let row = row.map_err(|e| ServerError::DbError(e.to_string()))?;
        out.push(row.into_stored()?);
    }
    Ok(out)
}

/// Write (or with `None`, clear) the display override of one recall.
pub fn set_display(
    conn: &Connection,
    source: RecallSource,
    id: &str,
    display: Option<&AuditedDisplay>,
    now: DateTime<Utc>,
) -> Result<(), ServerError> {
    let doc = display.map(to_document).transpose()?;

    let updated = conn
        .execute(
            "update recalls set display = ?1, updated_at = ?2 where source = ?3 and id = ?4",
            params![doc, now, source.as_str(), id],
        )
        .map_err(|e| ServerError::DbError(format!("update recall display failed: {e}")))?;

    if updated == 0 {
        return Err(ServerError::NotFound);
    }
    Ok(())
}
