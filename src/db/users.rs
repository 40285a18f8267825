// src/db/users.rs
use crate::auth::token::generate_id;
use crate::domain::recall::UserRef;
use crate::errors::ServerError;
use rusqlite::{params, Connection, OptionalExtension};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Member,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Member => "member",
            Role::Admin => "admin",
        }
    }
}

/// The caller of a request, as resolved from its session.
#[derive(Debug, Clone)]
pub struct Actor {
    pub user: UserRef,
    pub role: Role,
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Insert a user and return its generated uid.
/// Email should already be normalized by caller (trim/lowercase).
pub fn create_user(
    conn: &Connection,
    username: &str,
    email: &str,
    role: Role,
    now: i64,
) -> Result<String, ServerError> {
    let uid = generate_id();
    conn.execute(
        "insert into users (uid, username, email, role, created_at) values (?, ?, ?, ?, ?)",
        params![uid, username, email, role.as_str(), now],
    )
    .map_err(|e| ServerError::DbError(format!("insert user failed: {e}")))?;
    Ok(uid)
}

pub fn get_actor(conn: &Connection, uid: &str) -> Result<Option<Actor>, ServerError> {
    conn.query_row(
        "select uid, username, email, role from users where uid = ?",
        params![uid],
        |row| {
            let role: String = row.get(3)?;
            Ok(Actor {
                user: UserRef {
                    uid: row.get(0)?,
                    username: row.get(1)?,
                    email: row.get(2)?,
                },
                role: if role == "admin" { Role::Admin } else { Role::Member },
            })
        },
    )
    .optional()
    .map_err(|e| ServerError::DbError(format!("load user failed: {e}")))
}
