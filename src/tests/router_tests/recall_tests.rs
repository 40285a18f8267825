use crate::db::users::Role;
use crate::router::{handle, route};
use crate::tests::utils::{body_json, body_string, err_status, json_request, request, usda_recall, TestApp};
use astra::Body;
use http::Method;
use serde_json::json;

fn listed_ids(body: &serde_json::Value) -> Vec<String> {
    body["recalls"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_str().unwrap().to_string())
        .collect()
}

#[test]
fn state_filter_accepts_abbreviations_and_includes_nationwide() {
    let app = TestApp::new();
    app.seed(&usda_recall("001-2024", &["Ohio"]));
    app.seed(&usda_recall("002-2024", &["Texas"]));
    app.seed(&usda_recall("003-2024", &["Nationwide"]));

    let req = request(Method::GET, "/api/recalls?state=oh", None, Body::empty());
    let resp = handle(req, &app.state).expect("Handler failed");
    assert_eq!(resp.status(), 200);

    let body = body_json(resp);
    let mut ids = listed_ids(&body);
    ids.sort();
    assert_eq!(ids, vec!["001-2024", "003-2024"]);
    assert_eq!(body["count"], 2);
}

#[test]
fn unknown_state_is_a_bad_request() {
    let app = TestApp::new();
    let req = request(Method::GET, "/api/recalls?state=Atlantis", None, Body::empty());
    let resp = route(req, &app.state);
    assert_eq!(resp.status(), 400);
    assert!(body_json(resp)["error"].as_str().unwrap().contains("Atlantis"));
}

#[test]
fn exclude_pending_hides_recalls_under_review() {
    let app = TestApp::new();
    let (_, cookie) = app.sign_in("editor", Role::Member);
    let snapshot = usda_recall("010-2024", &["Iowa"]);
    app.seed(&snapshot);
    app.seed(&usda_recall("011-2024", &["Iowa"]));

    let proposal = json!({
        "recall_id": "010-2024",
        "recall_source": "USDA",
        "original_recall": serde_json::to_value(&snapshot).unwrap(),
        "proposed_display": { "preview_title": "Deli turkey" }
    });
    let req = json_request(Method::POST, "/api/pending-changes", Some(&cookie), &proposal);
    assert_eq!(handle(req, &app.state).unwrap().status(), 200);

    let req = request(Method::GET, "/api/recalls?exclude_pending=true", None, Body::empty());
    let body = body_json(handle(req, &app.state).unwrap());
    assert_eq!(listed_ids(&body), vec!["011-2024"]);

    let req = request(Method::GET, "/api/recalls/USDA/010-2024", None, Body::empty());
    let body = body_json(handle(req, &app.state).unwrap());
    assert_eq!(body["pending_change"], true);
    assert_eq!(body["title"], "Recall 010-2024");
}

#[test]
fn missing_recall_is_json_404() {
    let app = TestApp::new();
    let req = request(Method::GET, "/api/recalls/FDA/F-404-2024", None, Body::empty());
    let resp = route(req, &app.state);
    assert_eq!(resp.status(), 404);
    assert_eq!(body_json(resp)["status"], 404);
}

#[test]
fn resolve_endpoint_reports_states() {
    let app = TestApp::new();
    let req = request(
        Method::GET,
        "/api/states/resolve?pattern=Distributed%20in%20TX%20and%20along%20the%20West%20Coast",
        None,
        Body::empty(),
    );
    let body = body_json(handle(req, &app.state).unwrap());
    let states: Vec<&str> = body["affected_states"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s.as_str().unwrap())
        .collect();
    assert!(states.contains(&"Texas"));
    assert!(states.contains(&"Washington"));
    assert!(states.contains(&"Oregon"));
}

#[test]
fn image_upload_requires_sign_in() {
    let app = TestApp::new();
    app.seed(&usda_recall("020-2024", &["Utah"]));

    let req = request(
        Method::POST,
        "/api/recalls/USDA/020-2024/images?filename=label.png",
        None,
        vec![1u8, 2, 3],
    );
    assert_eq!(err_status(handle(req, &app.state)), 401);
}

#[test]
fn uploaded_image_is_stored_public_and_served() {
    let app = TestApp::new();
    let (user, cookie) = app.sign_in("photographer", Role::Member);
    app.seed(&usda_recall("021-2024", &["Utah"]));

    let mut req = request(
        Method::POST,
        "/api/recalls/USDA/021-2024/images?filename=label.png",
        Some(&cookie),
        vec![0x89u8, b'P', b'N', b'G'],
    );
    req.headers_mut()
        .insert("Content-Type", "image/png".parse().unwrap());

    let resp = handle(req, &app.state).expect("upload failed");
    assert_eq!(resp.status(), 201);

    let image = body_json(resp);
    let storage_path = image["storage_path"].as_str().unwrap().to_string();
    assert!(storage_path.starts_with("recall-images/USDA/021-2024/"));
    assert!(storage_path.ends_with(".png"));
    assert_eq!(image["content_type"], "image/png");
    assert_eq!(image["uploaded_by"], user.uid.as_str());
    assert!(app.blobs.contains(&storage_path));

    let req = request(Method::GET, &format!("/uploads/{storage_path}"), None, Body::empty());
    let resp = handle(req, &app.state).unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers()["Content-Type"], "image/png");
}

#[test]
fn upload_rejects_non_images_and_oversized_bodies() {
    let app = TestApp::new();
    let (_, cookie) = app.sign_in("photographer", Role::Member);
    app.seed(&usda_recall("022-2024", &["Utah"]));

    let req = request(
        Method::POST,
        "/api/recalls/USDA/022-2024/images?filename=notes.txt",
        Some(&cookie),
        "hello".to_string(),
    );
    assert_eq!(err_status(handle(req, &app.state)), 400);

    // Test config caps uploads at 1 KiB.
    let req = request(
        Method::POST,
        "/api/recalls/USDA/022-2024/images?filename=big.jpg",
        Some(&cookie),
        vec![0u8; 2048],
    );
    assert_eq!(err_status(handle(req, &app.state)), 400);
    assert!(app.blobs.stored.lock().unwrap().is_empty());
}

#[test]
fn private_blobs_are_not_served() {
    let app = TestApp::new();
    app.blobs
        .stored
        .lock()
        .unwrap()
        .insert("recall-images/USDA/x/secret.png".into());

    let req = request(Method::GET, "/uploads/recall-images/USDA/x/secret.png", None, Body::empty());
    assert_eq!(err_status(handle(req, &app.state)), 404);
}

#[test]
fn temp_fda_registration_is_admin_only_and_resolves_states() {
    let app = TestApp::new();
    let (_, member) = app.sign_in("member", Role::Member);
    let (_, admin) = app.sign_in("admin", Role::Admin);

    let body = json!({
        "id": "press-2024-07",
        "title": "Sprouts recalled",
        "announced_date": "2024-07-02",
        "company": "Green Farms",
        "product": "Alfalfa sprouts",
        "reason": "Salmonella",
        "url": null,
        "distribution_pattern": "Sold in Georgia and Florida"
    });

    let req = json_request(Method::POST, "/api/temp-fda-recalls", Some(&member), &body);
    assert_eq!(err_status(handle(req, &app.state)), 403);

    let req = json_request(Method::POST, "/api/temp-fda-recalls", Some(&admin), &body);
    let resp = handle(req, &app.state).unwrap();
    assert_eq!(resp.status(), 201);

    let stored = body_json(resp);
    assert_eq!(stored["source"], "TEMP_FDA");
    assert_eq!(stored["affected_states"], json!(["Florida", "Georgia"]));

    let req = request(Method::GET, "/api/recalls?source=temp-fda&state=GA", None, Body::empty());
    let listed = body_json(handle(req, &app.state).unwrap());
    assert_eq!(listed_ids(&listed), vec!["press-2024-07"]);
}

#[test]
fn home_page_lists_recalls() {
    let app = TestApp::new();
    app.seed(&usda_recall("030-2024", &["Maine"]));

    let req = request(Method::GET, "/?state=ME", None, Body::empty());
    let resp = handle(req, &app.state).unwrap();
    assert_eq!(resp.status(), 200);
    let body = body_string(resp);
    assert!(body.contains("Recall 030-2024"));
}
