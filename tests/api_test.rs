//! End-to-end tests driving the HTTP router.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use chrono::NaiveDate;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tempfile::NamedTempFile;
use tower::ServiceExt;

use vuot_vu_mon::{AccountService, AppState, FixedClock, QuizRepository, TokenIssuer, router};

const SECRET: &str = "api-test-secret";

struct TestApp {
    _db: NamedTempFile,
    repo: QuizRepository,
    app: Router,
}

fn setup() -> TestApp {
    let db = NamedTempFile::new().expect("Failed to create temp file");
    let repo = QuizRepository::new(db.path().to_str().expect("Invalid path").to_string())
        .expect("Failed to create repository");
    repo.run_migrations().expect("Migrations failed");

    let today = NaiveDate::from_ymd_opt(2026, 6, 1).expect("valid date");
    let state = AppState::new(
        repo.clone(),
        TokenIssuer::new(SECRET, 30),
        Arc::new(FixedClock(today)),
        false,
    );
    let app = router(state, "http://localhost:5173").expect("Router failed");
    TestApp { _db: db, repo, app }
}

async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("Failed to build request");

    let response = app.clone().oneshot(request).await.expect("Request failed");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Failed to read body")
        .to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("Body is not JSON")
    };
    (status, value)
}

async fn guest_token(app: &Router) -> String {
    let (status, body) = call(app, Method::POST, "/api/auth/guest", None, None).await;
    assert_eq!(status, StatusCode::CREATED);
    body["data"]["token"]
        .as_str()
        .expect("token missing")
        .to_string()
}

fn admin_token(repo: &QuizRepository) -> String {
    let accounts = AccountService::new(repo.clone(), TokenIssuer::new(SECRET, 30));
    accounts
        .ensure_admin("admin@example.com", "admin123", "Admin")
        .expect("Admin failed");
    accounts
        .login(vuot_vu_mon::LoginRequest::new(
            Some("admin@example.com".into()),
            Some("admin123".into()),
        ))
        .expect("Login failed")
        .token()
        .clone()
}

#[tokio::test]
async fn test_health_and_welcome() {
    let t = setup();
    let (status, body) = call(&t.app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "OK");

    let (status, body) = call(&t.app, Method::GET, "/", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn test_unknown_route_is_enveloped_404() {
    let t = setup();
    let (status, body) = call(&t.app, Method::GET, "/api/nope", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"success": false, "message": "Endpoint not found"}));
}

#[tokio::test]
async fn test_guest_play_then_register() {
    let t = setup();
    let token = guest_token(&t.app).await;

    let (status, body) = call(
        &t.app,
        Method::POST,
        "/api/game/submit_result",
        Some(&token),
        Some(json!({"exam_type": "quiz", "score": 95, "details_json": {"correct": 19}})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Result submitted successfully");
    assert_eq!(body["data"]["stars_earned"], 5);
    assert_eq!(body["data"]["streak_status"]["current_streak"], 1);
    assert_eq!(body["data"]["user"]["last_learnt_date"], "2026-06-01");

    let (status, body) = call(
        &t.app,
        Method::POST,
        "/api/auth/register",
        Some(&token),
        Some(json!({"email": "kid@example.com", "password": "secret1", "full_name": "Kid"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Guest account upgraded to Student successfully");
    assert_eq!(body["data"]["upgraded"], true);
    assert_eq!(body["data"]["user"]["role"], "student");
    assert!(body["data"]["user"].get("password_hash").is_none());
    let student_token = body["data"]["token"].as_str().expect("token").to_string();

    let (status, body) = call(&t.app, Method::GET, "/api/auth/me", Some(&student_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["user"]["email"], "kid@example.com");
    assert_eq!(body["data"]["user"]["stars_balance"], 5);
    assert_eq!(body["data"]["user"]["stats"]["total_exams"], 1);

    let (status, body) =
        call(&t.app, Method::GET, "/api/game/history", Some(&student_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["count"], 1);
    assert_eq!(body["data"]["history"][0]["details_json"]["correct"], 19);

    let (status, body) = call(
        &t.app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({"email": "kid@example.com", "password": "secret1"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Login successful");
}

#[tokio::test]
async fn test_auth_failures() {
    let t = setup();

    let (status, body) = call(&t.app, Method::GET, "/api/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Access token required");
    assert_eq!(body["success"], false);

    let (status, body) = call(&t.app, Method::GET, "/api/auth/me", Some("bogus"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Invalid or expired token");

    let stranger = TokenIssuer::new(SECRET, 30).issue(4242).expect("Issue failed");
    let (status, body) = call(&t.app, Method::GET, "/api/auth/me", Some(&stranger), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "User not found");

    let (status, body) = call(
        &t.app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({"email": "ghost@example.com", "password": "secret1"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid email or password");
}

#[tokio::test]
async fn test_submit_rejects_bad_input() {
    let t = setup();
    let token = guest_token(&t.app).await;

    let (status, body) = call(
        &t.app,
        Method::POST,
        "/api/game/submit_result",
        Some(&token),
        Some(json!({"exam_type": "quiz", "score": 120})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "score must be between 0 and 100");

    let (status, body) = call(
        &t.app,
        Method::POST,
        "/api/game/submit_result",
        Some(&token),
        Some(json!({"score": 50})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "exam_type and score are required");
}

#[tokio::test]
async fn test_admin_routes_require_admin() {
    let t = setup();
    let token = guest_token(&t.app).await;

    let (status, body) = call(&t.app, Method::GET, "/api/admin/questions", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Admin access required");
}

#[tokio::test]
async fn test_admin_question_crud_and_game_draw() {
    let t = setup();
    let admin = admin_token(&t.repo);

    let (status, body) = call(
        &t.app,
        Method::POST,
        "/api/admin/questions",
        Some(&admin),
        Some(json!({
            "content_json": {"question": "Con gì kêu meo meo?", "options": ["Chó", "Mèo"]},
            "correct_answer": "Mèo",
            "type": "multiple_choice",
            "tags": [
                {"tag_key": "môn_học", "tag_value": "tiếng_việt"},
                {"tag_key": "game_type", "tag_value": "quiz"}
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Question created successfully");
    let id = body["data"]["question"]["id"].as_i64().expect("id");

    let (status, body) = call(
        &t.app,
        Method::GET,
        "/api/game/questions?subject=ti%E1%BA%BFng_vi%E1%BB%87t&game_type=quiz",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["count"], 1);
    assert_eq!(body["data"]["questions"][0]["content"]["options"][1]["id"], "B");

    let (status, body) = call(
        &t.app,
        Method::PUT,
        &format!("/api/admin/questions/{}", id),
        Some(&admin),
        Some(json!({"explanation": "Mèo kêu meo meo"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["question"]["explanation"], "Mèo kêu meo meo");

    let (status, body) = call(&t.app, Method::GET, &format!("/api/questions/{}", id), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["question"]["type"], "multiple_choice");

    let (status, _) = call(
        &t.app,
        Method::DELETE,
        &format!("/api/admin/questions/{}", id),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(&t.app, Method::GET, &format!("/api/questions/{}", id), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Question not found");

    let (status, body) = call(&t.app, Method::GET, "/api/questions/abc", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_shop_purchase_and_shortage() {
    let t = setup();
    let token = guest_token(&t.app).await;

    let (status, body) = call(&t.app, Method::GET, "/api/shop/items", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["count"], 5);

    let (status, body) = call(
        &t.app,
        Method::POST,
        "/api/shop/purchase",
        Some(&token),
        Some(json!({"itemId": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({
            "success": false,
            "message": "Not enough stars",
            "required": 100,
            "current": 0,
            "shortage": 100
        })
    );

    let admin = admin_token(&t.repo);
    let (status, body) = call(
        &t.app,
        Method::POST,
        "/api/shop/purchase",
        Some(&admin),
        Some(json!({"item_id": 3, "quantity": 2})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Purchase successful");
    assert_eq!(body["data"]["stars_spent"], 100);
    assert_eq!(body["data"]["new_total_stars"], 900);

    let (status, body) = call(&t.app, Method::GET, "/api/shop/inventory", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["count"], 1);

    let (status, body) = call(&t.app, Method::GET, "/api/shop/purchases", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 1);
}
