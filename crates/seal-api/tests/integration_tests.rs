//! # Integration Tests for seal-api
//!
//! Exercises the router with `tower::ServiceExt::oneshot`. Auth,
//! validation, and role checks run without any database I/O (the pool
//! is lazy and those paths reject before touching it). Full lifecycle
//! scenarios need Postgres and are `#[ignore]`d with a reason; run them
//! with `DATABASE_URL` set and `cargo test -- --ignored`.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use seal_api::auth::{AuthKeys, CallerIdentity, Role};
use seal_api::state::{AppConfig, AppState};

const TEST_SECRET: &str = "integration-test-secret";

/// Helper: build the test app over a lazy, unreachable pool. Requests
/// that reject before their first query never notice.
fn test_app() -> axum::Router {
    let config = AppConfig {
        port: 3000,
        database_url: "postgres://localhost:9/none".to_string(),
        jwt_secret: TEST_SECRET.to_string(),
        max_db_connections: 2,
    };
    let state = AppState::new(config).expect("lazy pool construction");
    seal_api::app(state)
}

/// Helper: build the app against the real database named by
/// `DATABASE_URL`, with migrations applied.
async fn db_app() -> (axum::Router, sqlx::PgPool) {
    let config = AppConfig {
        port: 3000,
        database_url: std::env::var("DATABASE_URL").expect("DATABASE_URL for ignored tests"),
        jwt_secret: TEST_SECRET.to_string(),
        max_db_connections: 5,
    };
    let state = AppState::new(config).expect("pool construction");
    seal_api::db::run_migrations(&state.db)
        .await
        .expect("migrations");
    let pool = state.db.clone();
    (seal_api::app(state), pool)
}

fn token_for(id: i64, role: Role, handle: &str) -> String {
    let keys = AuthKeys::from_secret(TEST_SECRET.as_bytes());
    keys.issue_token(&CallerIdentity {
        id,
        role,
        handle: handle.to_string(),
    })
    .expect("token")
}

fn admin_token() -> String {
    token_for(1, Role::Admin, "admin")
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

fn send_json(method: &str, uri: &str, token: Option<&str>, body: serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

async fn body_json(response: axum::http::Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn error_code(response: axum::http::Response<Body>) -> String {
    let body = body_json(response).await;
    body["error"]["code"].as_str().unwrap().to_string()
}

// -- Health -------------------------------------------------------------------

#[tokio::test]
async fn health_is_public() {
    let response = test_app().oneshot(get("/api/health", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"ok");
}

// -- Authentication -----------------------------------------------------------

#[tokio::test]
async fn protected_routes_require_a_token() {
    let response = test_app().oneshot(get("/api/seals", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(response).await, "UNAUTHORIZED");
}

#[tokio::test]
async fn garbage_tokens_are_rejected() {
    let response = test_app()
        .oneshot(get("/api/seals", Some("not.a.token")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn tokens_signed_with_another_secret_are_rejected() {
    let keys = AuthKeys::from_secret(b"some-other-secret");
    let token = keys
        .issue_token(&CallerIdentity {
            id: 1,
            role: Role::Admin,
            handle: "admin".to_string(),
        })
        .unwrap();
    let response = test_app()
        .oneshot(get("/api/seals", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// -- Role checks (no database touched) ----------------------------------------

#[tokio::test]
async fn report_requires_admin() {
    let token = token_for(7, Role::Technician, "T-07");
    let response = test_app()
        .oneshot(get("/api/seals/report", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(error_code(response).await, "FORBIDDEN");
}

#[tokio::test]
async fn logs_require_admin() {
    let token = token_for(42, Role::User, "alice");
    let response = test_app()
        .oneshot(get("/api/logs", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn my_seals_requires_a_technician() {
    let token = token_for(42, Role::User, "alice");
    let response = test_app()
        .oneshot(get("/api/technicians/my-seals", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn install_requires_a_technician() {
    let token = token_for(42, Role::User, "alice");
    let response = test_app()
        .oneshot(send_json(
            "PUT",
            "/api/technicians/seals/SN-1001/install",
            Some(&token),
            serde_json::json!({ "image_paths": ["a.jpg"] }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn generate_requires_admin() {
    let token = token_for(42, Role::User, "alice");
    let response = test_app()
        .oneshot(send_json(
            "POST",
            "/api/seals/generate",
            Some(&token),
            serde_json::json!({ "base_number": "SN-1000", "count": 3 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

// -- Request validation --------------------------------------------------------

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let token = admin_token();
    let request = Request::builder()
        .method("POST")
        .uri("/api/seals/generate")
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {token}"))
        .body(Body::from("{not json"))
        .unwrap();
    let response = test_app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_code(response).await, "BAD_REQUEST");
}

#[tokio::test]
async fn generate_rejects_a_zero_count() {
    let response = test_app()
        .oneshot(send_json(
            "POST",
            "/api/seals/generate",
            Some(&admin_token()),
            serde_json::json!({ "base_number": "SN-1000", "count": 0 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error_code(response).await, "VALIDATION_ERROR");
}

#[tokio::test]
async fn generate_rejects_a_base_without_digits() {
    let response = test_app()
        .oneshot(send_json(
            "POST",
            "/api/seals/generate",
            Some(&admin_token()),
            serde_json::json!({ "base_number": "SEAL-", "count": 3 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn list_rejects_an_unknown_status_filter() {
    let response = test_app()
        .oneshot(get("/api/seals?status=LOST", Some(&admin_token())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn login_rejects_an_empty_username() {
    let response = test_app()
        .oneshot(send_json(
            "POST",
            "/api/auth/login",
            None,
            serde_json::json!({ "username": "", "password": "pw" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn registration_rejects_a_short_password() {
    let response = test_app()
        .oneshot(send_json(
            "POST",
            "/api/technicians/register",
            None,
            serde_json::json!({
                "tech_code": "T-07",
                "name": "Jordan",
                "password": "short"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn evidence_upload_rejects_an_empty_list() {
    let token = token_for(7, Role::Technician, "T-07");
    let response = test_app()
        .oneshot(send_json(
            "POST",
            "/api/technicians/seals/SN-1001/images",
            Some(&token),
            serde_json::json!({ "image_paths": [] }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error_code(response).await, "VALIDATION_ERROR");
}

#[tokio::test]
async fn import_requires_admin() {
    let token = token_for(7, Role::Technician, "T-07");
    let response = test_app()
        .oneshot(send_json(
            "POST",
            "/api/technicians/import",
            Some(&token),
            serde_json::json!({ "technicians": [] }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn import_rejects_a_code_repeated_within_the_batch() {
    let entry = serde_json::json!({
        "tech_code": "T-07",
        "name": "Jordan",
        "password": "field-pass-1"
    });
    let response = test_app()
        .oneshot(send_json(
            "POST",
            "/api/technicians/import",
            Some(&admin_token()),
            serde_json::json!({ "technicians": [entry.clone(), entry] }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error_code(response).await, "VALIDATION_ERROR");
}

#[tokio::test]
async fn action_search_requires_a_keyword() {
    let response = test_app()
        .oneshot(get("/api/logs/action", Some(&admin_token())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn range_rejects_malformed_dates() {
    let response = test_app()
        .oneshot(get(
            "/api/logs/range?from=yesterday&to=2026-01-01",
            Some(&admin_token()),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

// -- Database-backed scenarios -------------------------------------------------
//
// These run the full lifecycle against Postgres. Each test generates
// unique seal numbers so reruns do not collide.

fn unique_number(prefix: &str) -> String {
    use std::sync::atomic::{AtomicU32, Ordering};
    static SEQ: AtomicU32 = AtomicU32::new(0);
    // Digit-only suffix so bulk generation can extend it.
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .subsec_nanos();
    let seq = SEQ.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}-{nanos:09}{seq:03}")
}

async fn register_technician(app: &axum::Router, tech_code: &str) -> i64 {
    let response = app
        .clone()
        .oneshot(send_json(
            "POST",
            "/api/technicians/register",
            None,
            serde_json::json!({
                "tech_code": tech_code,
                "name": "Field Tech",
                "password": "field-pass-1"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["id"].as_i64().unwrap()
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn full_lifecycle_available_to_returned() {
    let (app, _pool) = db_app().await;
    let admin = admin_token();
    let number = unique_number("LC");
    let tech_code = unique_number("T");

    // Generate.
    let response = app
        .clone()
        .oneshot(send_json(
            "POST",
            "/api/seals",
            Some(&admin),
            serde_json::json!({ "number": number }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body_json(response).await["status"], "AVAILABLE");

    // Assign to a fresh technician.
    let tech_id = register_technician(&app, &tech_code).await;
    let response = app
        .clone()
        .oneshot(send_json(
            "PUT",
            &format!("/api/seals/{number}/assign"),
            Some(&admin),
            serde_json::json!({ "technician_id": tech_id }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "ASSIGNED");

    // Issue to the bootstrap admin user (id 1 exists via migration seed).
    let response = app
        .clone()
        .oneshot(send_json(
            "PUT",
            &format!("/api/seals/{number}/issue"),
            Some(&admin),
            serde_json::json!({ "user_id": 1 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let seal = body_json(response).await;
    assert_eq!(seal["status"], "ISSUED");
    assert_eq!(seal["owner_user_id"], 1);
    assert!(seal["technician_id"].is_null());

    // Use as the owner.
    let owner = token_for(1, Role::Admin, "admin");
    let response = app
        .clone()
        .oneshot(send_json(
            "PUT",
            &format!("/api/seals/{number}/use"),
            Some(&owner),
            serde_json::json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "USED");

    // Return.
    let response = app
        .clone()
        .oneshot(send_json(
            "PUT",
            &format!("/api/seals/{number}/return"),
            Some(&owner),
            serde_json::json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "RETURNED");

    // The audit log replays to the final status.
    let response = app
        .clone()
        .oneshot(get(&format!("/api/logs/seal/{number}"), Some(&admin)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let entries = body_json(response).await;
    let actions: Vec<&str> = entries
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["action"].as_str().unwrap())
        .collect();
    assert_eq!(actions.len(), 5);
    let replayed = seal_core::replay(actions.iter().copied()).unwrap();
    assert_eq!(replayed, seal_core::SealStatus::Returned);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn concurrent_issue_has_exactly_one_winner() {
    let (app, _pool) = db_app().await;
    let admin = admin_token();
    let number = unique_number("CC");
    let tech_code = unique_number("T");

    let response = app
        .clone()
        .oneshot(send_json(
            "POST",
            "/api/seals",
            Some(&admin),
            serde_json::json!({ "number": number }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let tech_id = register_technician(&app, &tech_code).await;
    let response = app
        .clone()
        .oneshot(send_json(
            "PUT",
            &format!("/api/seals/{number}/assign"),
            Some(&admin),
            serde_json::json!({ "technician_id": tech_id }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let issue = |app: axum::Router, admin: String, number: String| async move {
        app.oneshot(send_json(
            "PUT",
            &format!("/api/seals/{number}/issue"),
            Some(&admin),
            serde_json::json!({ "user_id": 1 }),
        ))
        .await
        .unwrap()
        .status()
    };
    let (a, b) = tokio::join!(
        issue(app.clone(), admin.clone(), number.clone()),
        issue(app.clone(), admin.clone(), number.clone()),
    );

    let mut statuses = [a, b];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::OK, StatusCode::CONFLICT]);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn duplicate_number_aborts_the_whole_batch() {
    let (app, _pool) = db_app().await;
    let admin = admin_token();
    let base = unique_number("DUP");

    // Pre-create the second number in the would-be sequence.
    let colliding = seal_core::sequential_numbers(&base, 2).unwrap()[1].clone();
    let response = app
        .clone()
        .oneshot(send_json(
            "POST",
            "/api/seals",
            Some(&admin),
            serde_json::json!({ "number": colliding }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .clone()
        .oneshot(send_json(
            "POST",
            "/api/seals/generate",
            Some(&admin),
            serde_json::json!({ "base_number": base, "count": 3 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(error_code(response).await, "DUPLICATE_SEAL_NUMBER");

    // The first number of the sequence must not exist: nothing committed.
    let first = seal_core::sequential_numbers(&base, 1).unwrap()[0].clone();
    let response = app
        .clone()
        .oneshot(get(&format!("/api/seals/check/{first}"), Some(&admin)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["exists"], false);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn install_by_the_wrong_technician_is_forbidden() {
    let (app, _pool) = db_app().await;
    let admin = admin_token();
    let number = unique_number("IN");
    let assigned_code = unique_number("T");
    let other_code = unique_number("T");

    let response = app
        .clone()
        .oneshot(send_json(
            "POST",
            "/api/seals",
            Some(&admin),
            serde_json::json!({ "number": number }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let assigned_id = register_technician(&app, &assigned_code).await;
    let other_id = register_technician(&app, &other_code).await;

    let response = app
        .clone()
        .oneshot(send_json(
            "PUT",
            &format!("/api/seals/{number}/assign"),
            Some(&admin),
            serde_json::json!({ "technician_id": assigned_id }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // A different technician cannot install it.
    let intruder = token_for(other_id, Role::Technician, &other_code);
    let response = app
        .clone()
        .oneshot(send_json(
            "PUT",
            &format!("/api/technicians/seals/{number}/install"),
            Some(&intruder),
            serde_json::json!({ "image_paths": ["site.jpg"] }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // The assigned one can, and can then return it.
    let assignee = token_for(assigned_id, Role::Technician, &assigned_code);
    let response = app
        .clone()
        .oneshot(send_json(
            "PUT",
            &format!("/api/technicians/seals/{number}/install"),
            Some(&assignee),
            serde_json::json!({ "image_paths": ["site.jpg", "closeup.jpg"] }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let seal = body_json(response).await;
    assert_eq!(seal["status"], "INSTALLED");
    assert_eq!(seal["image_paths"].as_array().unwrap().len(), 2);

    let response = app
        .clone()
        .oneshot(send_json(
            "PUT",
            &format!("/api/technicians/seals/{number}/return"),
            Some(&assignee),
            serde_json::json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "RETURNED");
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn install_on_an_issued_seal_is_a_capability_rejection() {
    let (app, _pool) = db_app().await;
    let admin = admin_token();
    let number = unique_number("IS");
    let assigned_code = unique_number("T");
    let other_code = unique_number("T");

    let response = app
        .clone()
        .oneshot(send_json(
            "POST",
            "/api/seals",
            Some(&admin),
            serde_json::json!({ "number": number }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let assigned_id = register_technician(&app, &assigned_code).await;
    let other_id = register_technician(&app, &other_code).await;

    let response = app
        .clone()
        .oneshot(send_json(
            "PUT",
            &format!("/api/seals/{number}/assign"),
            Some(&admin),
            serde_json::json!({ "technician_id": assigned_id }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(send_json(
            "PUT",
            &format!("/api/seals/{number}/issue"),
            Some(&admin),
            serde_json::json!({ "user_id": 1 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // The seal now belongs to user 1; an unrelated technician acting
    // on it gets a capability rejection, not lifecycle detail.
    let intruder = token_for(other_id, Role::Technician, &other_code);
    let response = app
        .clone()
        .oneshot(send_json(
            "PUT",
            &format!("/api/technicians/seals/{number}/install"),
            Some(&intruder),
            serde_json::json!({ "image_paths": ["site.jpg"] }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(error_code(response).await, "FORBIDDEN");
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn attaching_evidence_appends_without_a_transition() {
    let (app, _pool) = db_app().await;
    let admin = admin_token();
    let number = unique_number("EV");
    let tech_code = unique_number("T");
    let other_code = unique_number("T");

    let response = app
        .clone()
        .oneshot(send_json(
            "POST",
            "/api/seals",
            Some(&admin),
            serde_json::json!({ "number": number }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let tech_id = register_technician(&app, &tech_code).await;
    let other_id = register_technician(&app, &other_code).await;
    let response = app
        .clone()
        .oneshot(send_json(
            "PUT",
            &format!("/api/seals/{number}/assign"),
            Some(&admin),
            serde_json::json!({ "technician_id": tech_id }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // The assigned technician attaches evidence twice; paths accumulate
    // and the status never moves.
    let holder = token_for(tech_id, Role::Technician, &tech_code);
    let response = app
        .clone()
        .oneshot(send_json(
            "POST",
            &format!("/api/technicians/seals/{number}/images"),
            Some(&holder),
            serde_json::json!({ "image_paths": ["site-front.jpg"] }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let seal = body_json(response).await;
    assert_eq!(seal["status"], "ASSIGNED");
    assert_eq!(seal["image_paths"], serde_json::json!(["site-front.jpg"]));

    let response = app
        .clone()
        .oneshot(send_json(
            "POST",
            &format!("/api/technicians/seals/{number}/images"),
            Some(&holder),
            serde_json::json!({ "image_paths": ["site-back.jpg"] }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await["image_paths"],
        serde_json::json!(["site-front.jpg", "site-back.jpg"])
    );

    // A technician who does not hold the seal is rejected.
    let intruder = token_for(other_id, Role::Technician, &other_code);
    let response = app
        .clone()
        .oneshot(send_json(
            "POST",
            &format!("/api/technicians/seals/{number}/images"),
            Some(&intruder),
            serde_json::json!({ "image_paths": ["spoof.jpg"] }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Attaching evidence is not a transition, so the history still
    // holds exactly the GENERATE and ASSIGN entries and replays clean.
    let response = app
        .clone()
        .oneshot(get(&format!("/api/logs/seal/{number}"), Some(&admin)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let entries = body_json(response).await;
    let actions: Vec<&str> = entries
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["action"].as_str().unwrap())
        .collect();
    assert_eq!(actions.len(), 2);
    let replayed = seal_core::replay(actions.iter().copied()).unwrap();
    assert_eq!(replayed, seal_core::SealStatus::Assigned);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn multi_check_answers_in_request_order() {
    let (app, _pool) = db_app().await;
    let admin = admin_token();
    let first = unique_number("MC");
    let second = unique_number("MC");
    let absent = unique_number("MC");

    for number in [&first, &second] {
        let response = app
            .clone()
            .oneshot(send_json(
                "POST",
                "/api/seals",
                Some(&admin),
                serde_json::json!({ "number": number }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = app
        .clone()
        .oneshot(get(
            &format!("/api/seals/check?numbers={first},{absent},{second}"),
            Some(&admin),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let results = body_json(response).await;
    let results = results.as_array().unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(results[0]["number"], first.as_str());
    assert_eq!(results[0]["exists"], true);
    assert_eq!(results[1]["number"], absent.as_str());
    assert_eq!(results[1]["exists"], false);
    assert_eq!(results[2]["number"], second.as_str());
    assert_eq!(results[2]["exists"], true);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn import_registers_every_technician_or_none() {
    let (app, _pool) = db_app().await;
    let admin = admin_token();
    let taken_code = unique_number("T");
    let fresh_code = unique_number("T");

    register_technician(&app, &taken_code).await;

    // One colliding code rolls back the whole batch.
    let response = app
        .clone()
        .oneshot(send_json(
            "POST",
            "/api/technicians/import",
            Some(&admin),
            serde_json::json!({ "technicians": [
                { "tech_code": fresh_code, "name": "Casey", "password": "field-pass-1" },
                { "tech_code": taken_code, "name": "Robin", "password": "field-pass-1" },
            ] }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error_code(response).await, "VALIDATION_ERROR");

    // The fresh code was rolled back, so it can still be imported.
    let response = app
        .clone()
        .oneshot(send_json(
            "POST",
            "/api/technicians/import",
            Some(&admin),
            serde_json::json!({ "technicians": [
                { "tech_code": fresh_code, "name": "Casey", "password": "field-pass-1" },
            ] }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let imported = body_json(response).await;
    assert_eq!(imported.as_array().unwrap().len(), 1);

    // Imported technicians can log in with the imported password.
    let response = app
        .clone()
        .oneshot(send_json(
            "POST",
            "/api/technicians/login",
            None,
            serde_json::json!({ "tech_code": fresh_code, "password": "field-pass-1" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn bootstrap_admin_can_log_in() {
    let (app, _pool) = db_app().await;
    let response = app
        .clone()
        .oneshot(send_json(
            "POST",
            "/api/auth/login",
            None,
            serde_json::json!({ "username": "admin", "password": "admin123" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["token"].as_str().is_some());
    assert_eq!(body["user"]["role"], "admin");
}
