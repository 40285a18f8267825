// src/auth/sessions.rs
use crate::auth::token::{generate_session_token, hash_token};
use crate::db::users::{get_actor, Actor};
use crate::errors::ServerError;
use rusqlite::{params, Connection, OptionalExtension};

pub const SESSION_TTL_SECS: i64 = 60 * 60 * 24 * 7;

pub fn create_session(conn: &Connection, user_uid: &str, now: i64) -> Result<String, ServerError> {
    let raw_token = generate_session_token();
    let hash = hash_token(&raw_token);

    conn.execute(
        r#"
        insert into sessions (user_uid, token_hash, created_at, expires_at)
        values (?, ?, ?, ?)
        "#,
        params![user_uid, hash.as_slice(), now, now + SESSION_TTL_SECS],
    )
    .map_err(|e| ServerError::DbError(format!("create session failed: {e}")))?;

    Ok(raw_token)
}

pub fn load_actor_from_session(
    conn: &Connection,
    raw_token: &str,
    now: i64,
) -> Result<Option<Actor>, ServerError> {
    let hash = hash_token(raw_token);

    let uid: Option<String> = conn
        .query_row(
            r#"
            select s.user_uid
            from sessions s
            where s.token_hash = ?
              and s.expires_at > ?
              and s.revoked_at is null
            "#,
            params![hash.as_slice(), now],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| ServerError::DbError(format!("session lookup failed: {e}")))?;

    match uid {
        Some(uid) => get_actor(conn, &uid),
        None => Ok(None),
    }
}

/// Pull `session=<token>` out of a Cookie header value.
pub fn session_token_from_cookie(cookie_header: &str) -> Option<&str> {
    cookie_header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == "session")
        .map(|(_, value)| value)
        .filter(|v| !v.is_empty())
}
