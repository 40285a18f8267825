use crate::db::pending_changes::recent_resolved;
use crate::db::users::Role;
use crate::domain::recall::RecallSnapshot;
use crate::router::handle;
use crate::tests::utils::{body_json, err_status, json_request, request, usda_recall, TestApp};
use astra::Body;
use http::Method;
use serde_json::{json, Value};

fn propose(app: &TestApp, cookie: &str, snapshot: &RecallSnapshot, title: &str) -> Value {
    let body = json!({
        "recall_id": snapshot.id(),
        "recall_source": "USDA",
        "original_recall": serde_json::to_value(snapshot).unwrap(),
        "proposed_display": { "preview_title": title }
    });
    let req = json_request(Method::POST, "/api/pending-changes", Some(cookie), &body);
    let resp = handle(req, &app.state).expect("proposal failed");
    assert_eq!(resp.status(), 200);
    body_json(resp)
}

fn post(app: &TestApp, uri: &str, cookie: &str) -> crate::responses::ResultResp {
    handle(request(Method::POST, uri, Some(cookie), Body::empty()), &app.state)
}

fn get_json(app: &TestApp, uri: &str, cookie: Option<&str>) -> Value {
    body_json(handle(request(Method::GET, uri, cookie, Body::empty()), &app.state).unwrap())
}

#[test]
fn proposals_require_sign_in() {
    let app = TestApp::new();
    let snapshot = usda_recall("100-2024", &["Ohio"]);
    app.seed(&snapshot);

    let body = json!({
        "recall_id": "100-2024",
        "recall_source": "USDA",
        "original_recall": serde_json::to_value(&snapshot).unwrap(),
        "proposed_display": {}
    });
    let req = json_request(Method::POST, "/api/pending-changes", None, &body);
    assert_eq!(err_status(handle(req, &app.state)), 401);
}

#[test]
fn second_proposal_overwrites_the_first() {
    let app = TestApp::new();
    let (alice, alice_cookie) = app.sign_in("alice", Role::Member);
    let (bob, bob_cookie) = app.sign_in("bob", Role::Member);
    let snapshot = usda_recall("101-2024", &["Ohio"]);
    app.seed(&snapshot);

    let first = propose(&app, &alice_cookie, &snapshot, "First");
    let second = propose(&app, &bob_cookie, &snapshot, "Second");

    assert_eq!(first["id"], second["id"]);
    assert_eq!(second["proposed_by"]["uid"], bob.uid.as_str());
    assert_eq!(second["proposed_display"]["preview_title"], "Second");

    let for_recall = get_json(&app, "/api/pending-changes/recall/USDA/101-2024", Some(&alice_cookie));
    assert_eq!(for_recall.as_array().unwrap().len(), 1);

    // Members only see their own proposals.
    let mine = get_json(&app, "/api/pending-changes", Some(&alice_cookie));
    assert!(mine.as_array().unwrap().is_empty());
    let theirs = get_json(&app, "/api/pending-changes", Some(&bob_cookie));
    assert_eq!(theirs.as_array().unwrap().len(), 1);
    assert_ne!(alice.uid, bob.uid);
}

#[test]
fn invalid_proposal_is_rejected() {
    let app = TestApp::new();
    let (_, cookie) = app.sign_in("alice", Role::Member);
    let snapshot = usda_recall("102-2024", &["Ohio"]);
    app.seed(&snapshot);

    let body = json!({
        "recall_id": "some-other-id",
        "recall_source": "USDA",
        "original_recall": serde_json::to_value(&snapshot).unwrap(),
        "proposed_display": {}
    });
    let req = json_request(Method::POST, "/api/pending-changes", Some(&cookie), &body);
    assert_eq!(err_status(handle(req, &app.state)), 400);
}

#[test]
fn admin_approval_publishes_display() {
    let app = TestApp::new();
    let (editor, editor_cookie) = app.sign_in("editor", Role::Member);
    let (admin, admin_cookie) = app.sign_in("admin", Role::Admin);
    let snapshot = usda_recall("103-2024", &["Ohio"]);
    app.seed(&snapshot);

    let change = propose(&app, &editor_cookie, &snapshot, "Frozen dumplings");
    let id = change["id"].as_str().unwrap();
    let approve_uri = format!("/api/pending-changes/{id}/approve");

    assert_eq!(err_status(post(&app, &approve_uri, &editor_cookie)), 403);
    assert_eq!(post(&app, &approve_uri, &admin_cookie).unwrap().status(), 200);

    let recall = get_json(&app, "/api/recalls/USDA/103-2024", None);
    assert_eq!(recall["pending_change"], false);
    assert_eq!(recall["display"]["preview_title"], "Frozen dumplings");
    assert_eq!(recall["display"]["proposed_by"]["uid"], editor.uid.as_str());
    assert_eq!(recall["display"]["approved_by"]["uid"], admin.uid.as_str());

    // Already resolved.
    assert_eq!(err_status(post(&app, &approve_uri, &admin_cookie)), 404);
}

#[test]
fn rejection_reason_is_archived() {
    let app = TestApp::new();
    let (_, editor_cookie) = app.sign_in("editor", Role::Member);
    let (_, admin_cookie) = app.sign_in("admin", Role::Admin);
    let snapshot = usda_recall("104-2024", &["Ohio"]);
    app.seed(&snapshot);

    let change = propose(&app, &editor_cookie, &snapshot, "Wrong product");
    let id = change["id"].as_str().unwrap().to_string();

    let req = json_request(
        Method::POST,
        &format!("/api/pending-changes/{id}/reject"),
        Some(&admin_cookie),
        &json!({ "reason": "  title doesn't match the notice " }),
    );
    assert_eq!(handle(req, &app.state).unwrap().status(), 200);

    let resolved = app.db().with_conn(|conn| recent_resolved(conn, 10)).unwrap();
    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].id, id);
    assert_eq!(resolved[0].resolution, "rejected");
    assert_eq!(resolved[0].reason.as_deref(), Some("title doesn't match the notice"));

    let recall = get_json(&app, "/api/recalls/USDA/104-2024", None);
    assert!(recall["display"].is_null());
}

#[test]
fn only_the_proposer_can_withdraw_or_read() {
    let app = TestApp::new();
    let (_, alice_cookie) = app.sign_in("alice", Role::Member);
    let (_, bob_cookie) = app.sign_in("bob", Role::Member);
    let (_, admin_cookie) = app.sign_in("admin", Role::Admin);
    let snapshot = usda_recall("105-2024", &["Ohio"]);
    app.seed(&snapshot);

    let change = propose(&app, &alice_cookie, &snapshot, "Mine");
    let id = change["id"].as_str().unwrap();

    let get_uri = format!("/api/pending-changes/{id}");
    let req = request(Method::GET, &get_uri, Some(&bob_cookie), Body::empty());
    assert_eq!(err_status(handle(req, &app.state)), 403);
    assert_eq!(get_json(&app, &get_uri, Some(&admin_cookie))["id"], id);

    let withdraw_uri = format!("/api/pending-changes/{id}/withdraw");
    assert_eq!(err_status(post(&app, &withdraw_uri, &bob_cookie)), 403);
    assert_eq!(post(&app, &withdraw_uri, &alice_cookie).unwrap().status(), 200);

    let all = get_json(&app, "/api/pending-changes", Some(&admin_cookie));
    assert!(all.as_array().unwrap().is_empty());
}

#[test]
fn admin_display_override_can_be_set_and_cleared() {
    let app = TestApp::new();
    let (_, admin_cookie) = app.sign_in("admin", Role::Admin);
    app.seed(&usda_recall("106-2024", &["Ohio"]));

    let req = json_request(
        Method::PUT,
        "/api/recalls/USDA/106-2024/display",
        Some(&admin_cookie),
        &json!({ "preview_title": "Direct edit", "editor_note": null }),
    );
    assert_eq!(handle(req, &app.state).unwrap().status(), 200);

    let recall = get_json(&app, "/api/recalls/USDA/106-2024", None);
    assert_eq!(recall["display"]["preview_title"], "Direct edit");
    assert!(recall["display"]
        .as_object()
        .unwrap()
        .contains_key("editor_note"));

    let req = request(
        Method::DELETE,
        "/api/recalls/USDA/106-2024/display",
        Some(&admin_cookie),
        Body::empty(),
    );
    assert_eq!(handle(req, &app.state).unwrap().status(), 200);
    let recall = get_json(&app, "/api/recalls/USDA/106-2024", None);
    assert!(recall["display"].is_null());
}
