use crate::db::pending_changes::recent_resolved;
use crate::db::users::Role;
use crate::router::{handle, route};
use crate::tests::utils::{body_json, body_string, err_status, json_request, request, usda_recall, TestApp};
use astra::Body;
use http::Method;
use serde_json::json;

#[test]
fn admin_page_is_admin_only() {
    let app = TestApp::new();
    let (_, member) = app.sign_in("member", Role::Member);
    let (_, admin) = app.sign_in("admin", Role::Admin);

    let resp = route(request(Method::GET, "/admin", None, Body::empty()), &app.state);
    assert_eq!(resp.status(), 401);
    assert!(body_string(resp).contains("sign in required"));

    let req = request(Method::GET, "/admin", Some(&member), Body::empty());
    assert_eq!(err_status(handle(req, &app.state)), 403);

    let req = request(Method::GET, "/admin", Some(&admin), Body::empty());
    let resp = handle(req, &app.state).expect("Handler failed");
    assert_eq!(resp.status(), 200);
    let body = body_string(resp);
    assert!(body.contains("Review queue"));
    assert!(body.contains("<span class=\"text-base font-medium\">admin</span>"));
}

#[test]
fn reject_form_archives_and_redirects() {
    let app = TestApp::new();
    let (_, editor) = app.sign_in("editor", Role::Member);
    let (_, admin) = app.sign_in("admin", Role::Admin);
    let snapshot = usda_recall("200-2024", &["Kansas"]);
    app.seed(&snapshot);

    let proposal = json!({
        "recall_id": "200-2024",
        "recall_source": "USDA",
        "original_recall": serde_json::to_value(&snapshot).unwrap(),
        "proposed_display": { "preview_title": "Spam" }
    });
    let req = json_request(Method::POST, "/api/pending-changes", Some(&editor), &proposal);
    let id = body_json(handle(req, &app.state).unwrap())["id"]
        .as_str()
        .unwrap()
        .to_string();

    let mut req = request(
        Method::POST,
        &format!("/admin/pending/{id}/reject"),
        Some(&admin),
        "reason=duplicate+of+201-2024".to_string(),
    );
    req.headers_mut().insert(
        "Content-Type",
        "application/x-www-form-urlencoded".parse().unwrap(),
    );
    let resp = handle(req, &app.state).unwrap();
    assert_eq!(resp.status(), 303);
    assert_eq!(resp.headers()["Location"], "/admin");

    let resolved = app.db().with_conn(|conn| recent_resolved(conn, 5)).unwrap();
    assert_eq!(resolved[0].reason.as_deref(), Some("duplicate of 201-2024"));
}

#[test]
fn export_is_an_admin_spreadsheet() {
    let app = TestApp::new();
    let (_, member) = app.sign_in("member", Role::Member);
    let (_, admin) = app.sign_in("admin", Role::Admin);
    app.seed(&usda_recall("210-2024", &["Nevada"]));

    let req = request(Method::GET, "/api/recalls/export.xlsx?state=NV", Some(&member), Body::empty());
    assert_eq!(err_status(handle(req, &app.state)), 403);

    let req = request(Method::GET, "/api/recalls/export.xlsx?state=NV", Some(&admin), Body::empty());
    let resp = handle(req, &app.state).unwrap();
    assert_eq!(resp.status(), 200);
    let disposition = resp.headers()["Content-Disposition"].to_str().unwrap().to_string();
    assert!(disposition.contains("Nevada"));
}

#[test]
fn digest_without_mail_config_is_a_server_error() {
    let app = TestApp::new();
    let (_, admin) = app.sign_in("admin", Role::Admin);

    let req = request(Method::POST, "/admin/digest", Some(&admin), Body::empty());
    assert_eq!(err_status(handle(req, &app.state)), 500);
}

#[test]
fn manual_sources_cannot_be_ingested() {
    let app = TestApp::new();
    let (_, admin) = app.sign_in("admin", Role::Admin);

    for form in ["source=TEMP_FDA", "source=CDC"] {
        let req = request(Method::POST, "/admin/ingest", Some(&admin), form.to_string());
        assert_eq!(err_status(handle(req, &app.state)), 400, "{form}");
    }
}

#[test]
fn recall_page_shows_pending_edits_to_editors() {
    let app = TestApp::new();
    let (_, editor) = app.sign_in("editor", Role::Member);
    let snapshot = usda_recall("220-2024", &["Idaho"]);
    app.seed(&snapshot);

    let proposal = json!({
        "recall_id": "220-2024",
        "recall_source": "USDA",
        "original_recall": serde_json::to_value(&snapshot).unwrap(),
        "proposed_display": { "preview_title": "Potato salad" }
    });
    let req = json_request(Method::POST, "/api/pending-changes", Some(&editor), &proposal);
    handle(req, &app.state).unwrap();

    let req = request(Method::GET, "/recalls/USDA/220-2024", Some(&editor), Body::empty());
    let body = body_string(handle(req, &app.state).unwrap());
    assert!(body.contains("Recall 220-2024"));
    assert!(body.contains("Potato salad"));

    let req = request(Method::GET, "/recalls/USDA/220-2024", None, Body::empty());
    let body = body_string(handle(req, &app.state).unwrap());
    assert!(!body.contains("Potato salad"));

    let resp = route(request(Method::GET, "/recalls/USDA/missing", None, Body::empty()), &app.state);
    assert_eq!(resp.status(), 404);
}
