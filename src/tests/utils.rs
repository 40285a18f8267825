use crate::auth::sessions::create_session;
use crate::config::AppConfig;
use crate::db::connection::{init_db, Database};
use crate::db::recalls::upsert_recall;
use crate::db::users::{create_user, get_actor, Role};
use crate::domain::recall::{RecallSnapshot, UsdaRecall, UserRef};
use crate::errors::ServerError;
use crate::router::AppState;
use crate::storage::testing::RecordingBlobStore;
use crate::storage::BlobStore;
use astra::{Body, Response};
use chrono::{NaiveDate, Utc};
use http::{Method, Request};
use std::io::Read;
use std::sync::Arc;
use tempfile::TempDir;

/// App state over a fresh database in its own temp directory.
pub struct TestApp {
    pub state: AppState,
    pub blobs: Arc<RecordingBlobStore>,
    _dir: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.sqlite").to_string_lossy().to_string();
        let db = Database::new(db_path.clone());
        init_db(&db, "sql/schema.sql")
            .unwrap_or_else(|e| panic!("Database initialization failed: {e}"));

        let blobs = Arc::new(RecordingBlobStore::default());
        let config = AppConfig {
            db_path,
            max_upload_bytes: 1024,
            ..AppConfig::default()
        };
        let shared: Arc<dyn BlobStore> = blobs.clone();

        TestApp {
            state: AppState::with_parts(db, shared, config),
            blobs,
            _dir: dir,
        }
    }

    pub fn db(&self) -> &Database {
        &self.state.db
    }

    /// Create a user with a live session. Returns the user and its cookie header.
    pub fn sign_in(&self, username: &str, role: Role) -> (UserRef, String) {
        let now = Utc::now().timestamp();
        let email = format!("{username}@example.com");

        let (actor, token) = self
            .db()
            .with_conn(|conn| {
                let uid = create_user(conn, username, &email, role, now)?;
                let token = create_session(conn, &uid, now)?;
                let actor = get_actor(conn, &uid)?.ok_or(ServerError::NotFound)?;
                Ok::<_, ServerError>((actor, token))
            })
            .expect("Failed to create signed-in user");

        (actor.user, format!("session={token}"))
    }

    pub fn seed(&self, snapshot: &RecallSnapshot) {
        self.db()
            .with_conn(|conn| upsert_recall(conn, snapshot, Utc::now()))
            .expect("Failed to seed recall");
    }
}

pub fn usda_recall(number: &str, states: &[&str]) -> RecallSnapshot {
    RecallSnapshot::Usda(UsdaRecall {
        recall_number: number.to_string(),
        title: format!("Recall {number}"),
        recall_date: NaiveDate::from_ymd_opt(2024, 6, 1),
        recall_type: Some("Active Recall".into()),
        recall_classification: Some("Class I".into()),
        recall_reason: Some("Listeria".into()),
        risk_level: None,
        establishment: None,
        states: Some(states.join(", ")),
        product_items: None,
        summary: None,
        active: true,
        language: Some("English".into()),
        affected_states: states.iter().map(|s| s.to_string()).collect(),
    })
}

pub fn request(method: Method, uri: &str, cookie: Option<&str>, body: impl Into<Body>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header("Cookie", cookie);
    }
    builder.body(body.into()).unwrap()
}

pub fn json_request(method: Method, uri: &str, cookie: Option<&str>, body: &serde_json::Value) -> Request<Body> {
    let mut req = request(method, uri, cookie, body.to_string());
    req.headers_mut()
        .insert("Content-Type", "application/json".parse().unwrap());
    req
}

pub fn body_string(resp: Response) -> String {
    let mut body = String::new();
    resp.into_body().reader().read_to_string(&mut body).unwrap();
    body
}

pub fn body_json(resp: Response) -> serde_json::Value {
    serde_json::from_str(&body_string(resp)).expect("response body is not JSON")
}

/// Status of a handler error; panics if the handler succeeded.
pub fn err_status(result: crate::responses::ResultResp) -> u16 {
    match result {
        Ok(resp) => panic!("expected an error, got {}", resp.status()),
        Err(e) => e.status(),
    }
}
