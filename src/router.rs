use crate::auth::sessions::{load_actor_from_session, session_token_from_cookie};
use crate::auth::token::generate_id;
use crate::config::AppConfig;
use crate::db::ingest_runs::get_recent_ingest_runs;
use crate::db::pending_changes::recent_resolved;
use crate::db::recalls::{get_recall, list_recalls, upsert_recall, RecallDisplayStores, RecallFilter};
use crate::db::users::Actor;
use crate::db::Database;
use crate::domain::pending::{image_storage_path, NewProposal};
use crate::domain::recall::{
    recall_key, AuditedDisplay, RecallDisplay, RecallSnapshot, RecallSource, StoredRecall,
    TempFdaRecall, UploadedImage,
};
use crate::domain::resolve_affected_states;
use crate::errors::ServerError;
use crate::geos::canonical_state;
use crate::ingest::{spawn_ingest, IngestSettings};
use crate::mailings::send_digest;
use crate::responses::{
    bytes_response, html_response, json_error_response, json_response, redirect, ResultResp,
};
use crate::review::PendingChangeWorkflow;
use crate::spreadsheets::export_recalls_xlsx;
use crate::storage::{BlobStore, LocalBlobStore, StorageError};
use crate::templates;
use crate::templates::pages::{AdminVm, HomeVm, RecallVm};
use astra::{Request, Response};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::io::Read;
use std::sync::Arc;

const MAX_JSON_BYTES: usize = 1024 * 1024;

/// Everything a request handler needs, built once at startup.
pub struct AppState {
    pub db: Database,
    pub blobs: Arc<dyn BlobStore>,
    pub displays: RecallDisplayStores,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let db = Database::new(config.db_path.clone());
        let blobs: Arc<dyn BlobStore> = Arc::new(LocalBlobStore::new(
            config.upload_dir.clone(),
            config.public_base_url.clone(),
        ));
        Self::with_parts(db, blobs, config)
    }

    pub fn with_parts(db: Database, blobs: Arc<dyn BlobStore>, config: AppConfig) -> Self {
        let displays = RecallDisplayStores::sqlite(&db);
        Self {
            db,
            blobs,
            displays,
            config,
        }
    }

    pub fn workflow(&self) -> PendingChangeWorkflow<'_> {
        PendingChangeWorkflow::new(
            &self.db,
            self.blobs.as_ref(),
            &self.displays,
            self.config.proposal_scope,
        )
    }
}

/// Entry point for the server: API paths get JSON errors, pages get HTML.
pub fn route(req: Request, state: &AppState) -> Response {
    let is_api = req.uri().path().starts_with("/api/");
    match handle(req, state) {
        Ok(resp) => resp,
        Err(err) if is_api => json_error_response(err),
        Err(err) => templates::html_error_response(err),
    }
}

pub fn handle(mut req: Request, state: &AppState) -> ResultResp {
    let method = req.method().as_str().to_string();
    let path = req.uri().path().to_string();
    let segments: Vec<&str> = path.trim_matches('/').split('/').filter(|s| !s.is_empty()).collect();

    tracing::debug!(%method, %path, "request");

    match (method.as_str(), segments.as_slice()) {
        // Pages
        ("GET", []) => home(&req, state),
        ("GET", ["recalls", source, id]) => recall_detail(&req, state, source, id),
        ("GET", ["admin"]) => admin_dashboard(&req, state, None),
        ("POST", ["admin", "pending", id, "approve"]) => {
            let actor = require_admin(&req, state)?;
            state
                .workflow()
                .approve(id, &actor.user, Utc::now())?;
            redirect("/admin")
        }
        ("POST", ["admin", "pending", id, "reject"]) => {
            let actor = require_admin(&req, state)?;
            let form = read_form(&mut req)?;
            let reason = form.get("reason").map(|r| r.trim()).filter(|r| !r.is_empty());
            state
                .workflow()
                .reject(id, &actor.user, reason, Utc::now())?;
            redirect("/admin")
        }
        ("POST", ["admin", "ingest"]) => {
            let actor = require_admin(&req, state)?;
            let form = read_form(&mut req)?;
            let source = parse_source(form.get("source").map(String::as_str).unwrap_or(""))?;
            if source == RecallSource::TempFda {
                return Err(ServerError::BadRequest(
                    "TEMP_FDA recalls are entered manually".into(),
                ));
            }
            tracing::info!(%source, admin = %actor.user.uid, "ingest requested");
            spawn_ingest(&state.db, IngestSettings::from(&state.config), source);
            redirect("/admin")
        }
        ("POST", ["admin", "digest"]) => {
            require_admin(&req, state)?;
            let report = send_digest(&state.db, &state.config, Utc::now())?;
            let flash = format!(
                "Digest with {} recalls sent to {} recipients.",
                report.recalls, report.recipients
            );
            admin_dashboard(&req, state, Some(flash))
        }
        ("GET", ["uploads", rest @ ..]) if !rest.is_empty() => serve_upload(state, &rest.join("/")),

        // Recall API
        ("GET", ["api", "recalls"]) => api_list_recalls(&req, state),
        ("GET", ["api", "recalls", "export.xlsx"]) => {
            require_admin(&req, state)?;
            let query = parse_query(&req);
            let filter = recall_filter(&query)?;
            let recalls = state.db.with_conn(|conn| list_recalls(conn, &filter))?;
            let label = filter.state.as_deref().unwrap_or("all").replace(' ', "_");
            export_recalls_xlsx(&recalls, &label)
        }
        ("GET", ["api", "recalls", source, id]) => {
            let source = parse_source(source)?;
            let recall = load_recall(state, source, id)?;
            let pending_change = state
                .workflow()
                .pending_recall_keys()?
                .contains(&recall_key(id, source));
            json_response(200, &RecallBody {
                recall: &recall,
                pending_change,
            })
        }
        ("GET", ["api", "states", "resolve"]) => {
            let query = parse_query(&req);
            let pattern = query.get("pattern").map(String::as_str).unwrap_or("");
            json_response(
                200,
                &json!({ "pattern": pattern, "affected_states": resolve_affected_states(pattern) }),
            )
        }
        ("PUT", ["api", "recalls", source, id, "display"]) => {
            let actor = require_admin(&req, state)?;
            let source = parse_source(source)?;
            let display: RecallDisplay = read_json(&mut req)?;
            let now = Utc::now();
            let audited = AuditedDisplay {
                display,
                proposed_by: Some(actor.user.clone()),
                proposed_at: Some(now),
                approved_by: Some(actor.user.clone()),
                approved_at: Some(now),
            };
            state
                .displays
                .for_source(source)
                .update_recall_display(id, Some(&audited))?;
            tracing::info!(recall = %recall_key(id, source), admin = %actor.user.uid, "display overridden");
            json_response(200, &audited)
        }
        ("DELETE", ["api", "recalls", source, id, "display"]) => {
            let actor = require_admin(&req, state)?;
            let source = parse_source(source)?;
            state
                .displays
                .for_source(source)
                .update_recall_display(id, None)?;
            tracing::info!(recall = %recall_key(id, source), admin = %actor.user.uid, "display override removed");
            json_response(200, &json!({ "ok": true }))
        }
        ("POST", ["api", "recalls", source, id, "images"]) => {
            let source = parse_source(source)?;
            upload_image(&mut req, state, source, id)
        }
        ("POST", ["api", "temp-fda-recalls"]) => {
            let actor = require_admin(&req, state)?;
            let mut recall: TempFdaRecall = read_json(&mut req)?;
            if recall.id.trim().is_empty() || recall.title.trim().is_empty() {
                return Err(ServerError::BadRequest("id and title are required".into()));
            }
            if recall.affected_states.is_empty() {
                recall.affected_states = recall
                    .distribution_pattern
                    .as_deref()
                    .map(resolve_affected_states)
                    .unwrap_or_default();
            }
            let snapshot = RecallSnapshot::TempFda(recall);
            state
                .db
                .with_conn(|conn| upsert_recall(conn, &snapshot, Utc::now()))?;
            tracing::info!(recall = %recall_key(snapshot.id(), RecallSource::TempFda), admin = %actor.user.uid, "temp FDA recall registered");
            let stored = load_recall(state, RecallSource::TempFda, snapshot.id())?;
            json_response(201, &stored)
        }

        // Pending-change API
        ("POST", ["api", "pending-changes"]) => {
            let actor = require_member(&req, state)?;
            let proposal: NewProposal = read_json(&mut req)?;
            let change = state
                .workflow()
                .create_or_update_proposal(proposal, &actor.user, Utc::now())?;
            json_response(200, &change)
        }
        ("GET", ["api", "pending-changes"]) => {
            let actor = require_member(&req, state)?;
            let changes = if actor.is_admin() {
                state.workflow().all_pending()?
            } else {
                state.workflow().pending_for_user(&actor.user.uid)?
            };
            json_response(200, &changes)
        }
        ("GET", ["api", "pending-changes", "recall", source, id]) => {
            require_member(&req, state)?;
            let source = parse_source(source)?;
            let changes = state.workflow().pending_for_recall(id, source)?;
            json_response(200, &changes)
        }
        ("GET", ["api", "pending-changes", id]) => {
            let actor = require_member(&req, state)?;
            let change = state.workflow().get(id)?;
            if !actor.is_admin() && change.proposed_by.uid != actor.user.uid {
                return Err(ServerError::Forbidden(
                    "pending change belongs to another user".into(),
                ));
            }
            json_response(200, &change)
        }
        ("POST", ["api", "pending-changes", id, "approve"]) => {
            let actor = require_admin(&req, state)?;
            state.workflow().approve(id, &actor.user, Utc::now())?;
            json_response(200, &json!({ "ok": true }))
        }
        ("POST", ["api", "pending-changes", id, "reject"]) => {
            let actor = require_admin(&req, state)?;
            let body: RejectBody = read_json_or_default(&mut req)?;
            let reason = body.reason.as_deref().map(str::trim).filter(|r| !r.is_empty());
            state
                .workflow()
                .reject(id, &actor.user, reason, Utc::now())?;
            json_response(200, &json!({ "ok": true }))
        }
        ("POST", ["api", "pending-changes", id, "withdraw"]) => {
            let actor = require_member(&req, state)?;
            state.workflow().withdraw(id, &actor.user, Utc::now())?;
            json_response(200, &json!({ "ok": true }))
        }

        _ => Err(ServerError::NotFound),
    }
}

#[derive(Serialize)]
struct RecallBody<'a> {
    #[serde(flatten)]
    recall: &'a StoredRecall,
    pending_change: bool,
}

#[derive(Deserialize, Default)]
struct RejectBody {
    reason: Option<String>,
}

fn home(req: &Request, state: &AppState) -> ResultResp {
    let actor = current_actor(req, state)?;
    let query = parse_query(req);
    let filter = recall_filter(&query)?;
    let recalls = state.db.with_conn(|conn| list_recalls(conn, &filter))?;
    let pending_keys = state.workflow().pending_recall_keys()?;

    html_response(templates::pages::home_page(&HomeVm {
        actor: actor.as_ref(),
        recalls,
        pending_keys,
        state: filter.state,
        source: filter.source,
    }))
}

fn recall_detail(req: &Request, state: &AppState, source: &str, id: &str) -> ResultResp {
    let actor = current_actor(req, state)?;
    let source = parse_source(source)?;
    let recall = load_recall(state, source, id)?;
    // Pending edits are only shown to signed-in editors.
    let pending = match &actor {
        Some(_) => state.workflow().pending_for_recall(id, source)?,
        None => Vec::new(),
    };

    html_response(templates::pages::recall_page(&RecallVm {
        actor: actor.as_ref(),
        recall,
        pending,
    }))
}

fn admin_dashboard(req: &Request, state: &AppState, flash: Option<String>) -> ResultResp {
    let actor = require_admin(req, state)?;
    let pending = state.workflow().all_pending()?;
    let (resolved, ingest_runs) = state.db.with_conn(|conn| {
        Ok::<_, ServerError>((recent_resolved(conn, 20)?, get_recent_ingest_runs(conn)?))
    })?;

    html_response(templates::pages::admin_page(&AdminVm {
        actor: &actor,
        pending,
        resolved,
        ingest_runs,
        flash,
    }))
}

fn api_list_recalls(req: &Request, state: &AppState) -> ResultResp {
    let query = parse_query(req);
    let filter = recall_filter(&query)?;
    let exclude_pending = query
        .get("exclude_pending")
        .is_some_and(|v| v == "true" || v == "1");

    let mut recalls = state.db.with_conn(|conn| list_recalls(conn, &filter))?;
    if exclude_pending {
        let pending = state.workflow().pending_recall_keys()?;
        recalls.retain(|r| !pending.contains(&recall_key(&r.id, r.source)));
    }

    json_response(200, &json!({ "count": recalls.len(), "recalls": recalls }))
}

fn upload_image(
    req: &mut Request,
    state: &AppState,
    source: RecallSource,
    recall_id: &str,
) -> ResultResp {
    let actor = require_member(req, state)?;
    load_recall(state, source, recall_id)?;

    let query = parse_query(req);
    let original = query
        .get("filename")
        .map(|f| f.trim())
        .filter(|f| !f.is_empty())
        .ok_or_else(|| ServerError::BadRequest("filename query parameter is required".into()))?;

    let declared = req
        .headers()
        .get("Content-Type")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<mime::Mime>().ok());
    let content_type = image_content_type(declared, original)?;

    let bytes = read_body(req, state.config.max_upload_bytes)?;
    if bytes.is_empty() {
        return Err(ServerError::BadRequest("empty upload".into()));
    }

    let extension = extension_for(&content_type);
    let filename = format!("{}.{}", generate_id(), extension);
    let storage_path = image_storage_path(source, recall_id, &filename);

    state
        .blobs
        .save(&storage_path, &bytes)
        .map_err(storage_error)?;
    let url = state
        .blobs
        .make_public(&storage_path)
        .map_err(storage_error)?;

    tracing::info!(
        recall = %recall_key(recall_id, source),
        %storage_path,
        bytes = bytes.len(),
        uploader = %actor.user.uid,
        "image uploaded"
    );

    json_response(
        201,
        &UploadedImage {
            filename,
            storage_path,
            url: Some(url),
            content_type: Some(content_type.essence_str().to_string()),
            uploaded_by: Some(actor.user.uid),
            uploaded_at: Some(Utc::now()),
        },
    )
}

fn serve_upload(state: &AppState, path: &str) -> ResultResp {
    if !state.blobs.is_public(path) {
        return Err(ServerError::NotFound);
    }
    let bytes = state.blobs.read(path).map_err(storage_error)?;
    let content_type = path
        .rsplit_once('.')
        .and_then(|(_, ext)| mime_for_extension(ext))
        .map(|m| m.essence_str().to_string())
        .unwrap_or_else(|| mime::APPLICATION_OCTET_STREAM.essence_str().to_string());
    bytes_response(&content_type, bytes)
}

// ---------- helpers ----------

fn now_unix() -> i64 {
    Utc::now().timestamp()
}

fn current_actor(req: &Request, state: &AppState) -> Result<Option<Actor>, ServerError> {
    let token = req
        .headers()
        .get("Cookie")
        .and_then(|v| v.to_str().ok())
        .and_then(session_token_from_cookie);

    match token {
        Some(token) => state
            .db
            .with_conn(|conn| load_actor_from_session(conn, token, now_unix())),
        None => Ok(None),
    }
}

fn require_member(req: &Request, state: &AppState) -> Result<Actor, ServerError> {
    current_actor(req, state)?.ok_or_else(|| ServerError::Unauthorized("sign in required".into()))
}

fn require_admin(req: &Request, state: &AppState) -> Result<Actor, ServerError> {
    let actor = require_member(req, state)?;
    if !actor.is_admin() {
        return Err(ServerError::Forbidden("admin role required".into()));
    }
    Ok(actor)
}

fn load_recall(state: &AppState, source: RecallSource, id: &str) -> Result<StoredRecall, ServerError> {
    state
        .db
        .with_conn(|conn| get_recall(conn, source, id))?
        .ok_or(ServerError::NotFound)
}

fn parse_source(raw: &str) -> Result<RecallSource, ServerError> {
    raw.parse::<RecallSource>().map_err(ServerError::BadRequest)
}

fn recall_filter(query: &HashMap<String, String>) -> Result<RecallFilter, ServerError> {
    let param = |key: &str| query.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());

    let state = match param("state") {
        Some(raw) => Some(
            canonical_state(raw)
                .ok_or_else(|| ServerError::BadRequest(format!("unknown state '{raw}'")))?
                .to_string(),
        ),
        None => None,
    };
    let source = param("source").map(parse_source).transpose()?;
    let limit = match param("limit") {
        Some(raw) => Some(
            raw.parse::<i64>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| ServerError::BadRequest(format!("invalid limit '{raw}'")))?,
        ),
        None => None,
    };

    Ok(RecallFilter {
        source,
        state,
        updated_since: None,
        limit,
    })
}

fn parse_query(req: &Request) -> HashMap<String, String> {
    req.uri()
        .query()
        .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default()
}

/// Read at most `limit` bytes of body; anything longer is rejected.
fn read_body(req: &mut Request, limit: usize) -> Result<Vec<u8>, ServerError> {
    let mut buf = Vec::new();
    req.body_mut()
        .reader()
        .take(limit as u64 + 1)
        .read_to_end(&mut buf)
        .map_err(|e| ServerError::BadRequest(format!("failed to read request body: {e}")))?;
    if buf.len() > limit {
        return Err(ServerError::BadRequest(format!(
            "request body exceeds {limit} bytes"
        )));
    }
    Ok(buf)
}

fn read_json<T: DeserializeOwned>(req: &mut Request) -> Result<T, ServerError> {
    let bytes = read_body(req, MAX_JSON_BYTES)?;
    serde_json::from_slice(&bytes)
        .map_err(|e| ServerError::BadRequest(format!("invalid JSON body: {e}")))
}

fn read_json_or_default<T: DeserializeOwned + Default>(req: &mut Request) -> Result<T, ServerError> {
    let bytes = read_body(req, MAX_JSON_BYTES)?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(&bytes)
        .map_err(|e| ServerError::BadRequest(format!("invalid JSON body: {e}")))
}

fn read_form(req: &mut Request) -> Result<HashMap<String, String>, ServerError> {
    let bytes = read_body(req, MAX_JSON_BYTES)?;
    Ok(url::form_urlencoded::parse(&bytes).into_owned().collect())
}

fn mime_for_extension(ext: &str) -> Option<mime::Mime> {
    match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => Some(mime::IMAGE_JPEG),
        "png" => Some(mime::IMAGE_PNG),
        "gif" => Some(mime::IMAGE_GIF),
        "webp" => "image/webp".parse().ok(),
        _ => None,
    }
}

fn extension_for(content_type: &mime::Mime) -> &'static str {
    match content_type.subtype().as_str() {
        "png" => "png",
        "gif" => "gif",
        "webp" => "webp",
        _ => "jpg",
    }
}

/// Declared type if it's a supported image, else guessed from the file name.
fn image_content_type(declared: Option<mime::Mime>, filename: &str) -> Result<mime::Mime, ServerError> {
    let guessed = filename
        .rsplit_once('.')
        .and_then(|(_, ext)| mime_for_extension(ext));

    let candidate = match declared {
        Some(m) if m.type_() == mime::IMAGE => Some(m),
        Some(m) if m == mime::APPLICATION_OCTET_STREAM => guessed,
        Some(m) => {
            return Err(ServerError::BadRequest(format!(
                "unsupported content type '{m}'; images only"
            )))
        }
        None => guessed,
    };

    candidate
        .filter(|m| mime_for_extension(m.subtype().as_str()).is_some())
        .ok_or_else(|| ServerError::BadRequest(format!("'{filename}' is not a supported image")))
}

fn storage_error(e: StorageError) -> ServerError {
    match e {
        StorageError::NotFound(_) => ServerError::NotFound,
        StorageError::InvalidPath(p) => ServerError::BadRequest(format!("invalid path '{p}'")),
        other => {
            tracing::error!(error = %other, "blob storage failed");
            ServerError::InternalError
        }
    }
}
