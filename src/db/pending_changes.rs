// src/db/pending_changes.rs
use crate::db::documents::{from_document, to_document};
use crate::domain::pending::{PendingChange, PendingStatus, ResolvedChange};
use crate::domain::recall::{recall_key, RecallDisplay, RecallSource, UserRef};
use crate::errors::ServerError;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashSet;

const SQL_SELECT_CHANGE: &str = r#"
    select id, recall_id, recall_source,
           proposed_by_uid, proposed_by_username, proposed_by_email,
           proposed_at, status, original_recall, proposed_display
    from pending_changes
"#;

struct ChangeRow {
    id: String,
    recall_id: String,
    recall_source: String,
    uid: String,
    username: String,
    email: String,
    proposed_at: DateTime<Utc>,
    status: String,
    original_recall: String,
    proposed_display: String,
}

impl ChangeRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(ChangeRow {
            id: row.get(0)?,
            recall_id: row.get(1)?,
            recall_source: row.get(2)?,
            uid: row.get(3)?,
            username: row.get(4)?,
            email: row.get(5)?,
            proposed_at: row.get(6)?,
            status: row.get(7)?,
            original_recall: row.get(8)?,
            proposed_display: row.get(9)?,
        })
    }

    fn into_change(self) -> Result<PendingChange, ServerError> {
        Ok(PendingChange {
            id: self.id,
            recall_id: self.recall_id,
            recall_source: self
                .recall_source
                .parse::<RecallSource>()
                .map_err(ServerError::DbError)?,
            proposed_by: UserRef {
                uid: self.uid,
                username: self.username,
                email: self.email,
            },
            proposed_at: self.proposed_at,
            status: self
                .status
                .parse::<PendingStatus>()
                .map_err(ServerError::DbError)?,
            original_recall: from_document(&self.original_recall)?,
            proposed_display: from_document(&self.proposed_display)?,
        })
    }
}

fn query_changes(
    conn: &Connection,
    where_clause: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<PendingChange>, ServerError> {
    let sql = format!("{SQL_SELECT_CHANGE} {where_clause}");
    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| ServerError::DbError(format!("prepare pending query failed: {e}")))?;

    let rows = stmt
        .query_map(params, ChangeRow::from_row)
        .map_err(|e| ServerError::DbError(format!("pending query failed: {e}")))?;

    let mut out = Vec::new();
    for row in rows {
        let row = row.map_err(|e| ServerError::DbError(e.to_string()))?;
        out.push(row.into_change()?);
    }
    Ok(out)
}

pub fn get_change(conn: &Connection, id: &str) -> Result<Option<PendingChange>, ServerError> {
    let sql = format!("{SQL_SELECT_CHANGE} where id = ?1");
    let row = conn
        .query_row(&sql, params![id], ChangeRow::from_row)
        .optional()
        .map_err(|e| ServerError::DbError(format!("load pending change failed: {e}")))?;

    row.map(ChangeRow::into_change).transpose()
}

/// The pending change for a recall, optionally restricted to one proposer.
pub fn find_pending_for_recall(
    conn: &Connection,
    recall_id: &str,
    source: RecallSource,
    proposer_uid: Option<&str>,
) -> Result<Option<PendingChange>, ServerError> {
    let mut found = query_changes(
        conn,
        "where recall_id = ?1 and recall_source = ?2 and status = 'pending'
           and (?3 is null or proposed_by_uid = ?3)
         order by proposed_at desc
         limit 1",
        params![recall_id, source.as_str(), proposer_uid],
    )?;
    Ok(found.pop())
}

pub fn insert_change(conn: &Connection, change: &PendingChange) -> Result<(), ServerError> {
    conn.execute(
        r#"
        insert into pending_changes (
            id, recall_id, recall_source,
            proposed_by_uid, proposed_by_username, proposed_by_email,
            proposed_at, status, original_recall, proposed_display
        ) values (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
        params![
            change.id,
            change.recall_id,
            change.recall_source.as_str(),
            change.proposed_by.uid,
            change.proposed_by.username,
            change.proposed_by.email,
            change.proposed_at,
            change.status.as_str(),
            to_document(&change.original_recall)?,
            to_document(&change.proposed_display)?,
        ],
    )
    .map_err(|e| ServerError::DbError(format!("insert pending change failed: {e}")))?;
    Ok(())
}

/// Overwrite proposer, timestamp and display. The original snapshot is not touched.
pub fn update_proposal(
    conn: &Connection,
    id: &str,
    proposed_by: &UserRef,
    proposed_at: DateTime<Utc>,
    display: &RecallDisplay,
) -> Result<(), ServerError> {
    let updated = conn
        .execute(
            r#"
            update pending_changes set
                proposed_by_uid = ?1,
                proposed_by_username = ?2,
                proposed_by_email = ?3,
                proposed_at = ?4,
                proposed_display = ?5
            where id = ?6
            "#,
            params![
                proposed_by.uid,
                proposed_by.username,
                proposed_by.email,
                proposed_at,
                to_document(display)?,
                id
            ],
        )
        .map_err(|e| ServerError::DbError(format!("update pending change failed: {e}")))?;

    if updated == 0 {
        return Err(ServerError::NotFound);
    }
    Ok(())
}

pub fn delete_change(conn: &Connection, id: &str) -> Result<(), ServerError> {
    let deleted = conn
        .execute("delete from pending_changes where id = ?1", params![id])
        .map_err(|e| ServerError::DbError(format!("delete pending change failed: {e}")))?;

    if deleted == 0 {
        return Err(ServerError::NotFound);
    }
    Ok(())
}

/// Admin queue, newest first.
pub fn list_all_pending(conn: &Connection) -> Result<Vec<PendingChange>, ServerError> {
    query_changes(
        conn,
        "where status = 'pending' order by proposed_at desc",
        [],
    )
}

pub fn list_pending_for_user(
    conn: &Connection,
    uid: &str,
) -> Result<Vec<PendingChange>, ServerError> {
    query_changes(
        conn,
        "where status = 'pending' and proposed_by_uid = ?1 order by proposed_at desc",
        params![uid],
    )
}

pub fn list_pending_for_recall(
    conn: &Connection,
    recall_id: &str,
    source: RecallSource,
) -> Result<Vec<PendingChange>, ServerError> {
    query_changes(
        conn,
        "where status = 'pending' and recall_id = ?1 and recall_source = ?2
         order by proposed_at desc",
        params![recall_id, source.as_str()],
    )
}

/// `<recallId>_<SOURCE>` for every recall with an in-flight edit.
pub fn pending_recall_keys(conn: &Connection) -> Result<HashSet<String>, ServerError> {
    let mut stmt = conn
        .prepare("select recall_id, recall_source from pending_changes where status = 'pending'")
        .map_err(|e| ServerError::DbError(format!("prepare pending keys failed: {e}")))?;

    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))
        .map_err(|e| ServerError::DbError(format!("pending keys query failed: {e}")))?;

    let mut keys = HashSet::new();
    for row in rows {
        let (recall_id, source) = row.map_err(|e| ServerError::DbError(e.to_string()))?;
        let source = source.parse::<RecallSource>().map_err(ServerError::DbError)?;
        keys.insert(recall_key(&recall_id, source));
    }
    Ok(keys)
}

/// Copy a finished change into the audit archive.
pub fn archive_resolved(conn: &Connection, resolved: &ResolvedChange) -> Result<(), ServerError> {
    conn.execute(
        r#"
        insert into resolved_changes (
            id, recall_id, recall_source, resolution, resolved_by, resolved_at, reason, change_json
        ) values (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
        params![
            resolved.change.id,
            resolved.change.recall_id,
            resolved.change.recall_source.as_str(),
            resolved.resolution.as_str(),
            resolved.resolved_by.uid,
            resolved.resolved_at,
            resolved.reason,
            to_document(&resolved.change)?,
        ],
    )
    .map_err(|e| ServerError::DbError(format!("archive resolved change failed: {e}")))?;
    Ok(())
}

#[derive(Debug)]
pub struct ResolvedRow {
    pub id: String,
    pub recall_id: String,
    pub recall_source: String,
    pub resolution: String,
    pub resolved_by: String,
    pub resolved_at: DateTime<Utc>,
    pub reason: Option<String>,
}

pub fn recent_resolved(conn: &Connection, limit: i64) -> Result<Vec<ResolvedRow>, ServerError> {
    let mut stmt = conn
        .prepare(
            "select id, recall_id, recall_source, resolution, resolved_by, resolved_at, reason
             from resolved_changes order by resolved_at desc limit ?1",
        )
        .map_err(|e| ServerError::DbError(e.to_string()))?;

    let rows = stmt
        .query_map(params![limit], |row| {
            Ok(ResolvedRow {
                id: row.get(0)?,
                recall_id: row.get(1)?,
                recall_source: row.get(2)?,
                resolution: row.get(3)?,
                resolved_by: row.get(4)?,
                resolved_at: row.get(5)?,
                reason: row.get(6)?,
            })
        })
        .map_err(|e| ServerError::DbError(e.to_string()))?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r.map_err(|e| ServerError::DbError(e.to_string()))?);
    }
    Ok(out)
}
