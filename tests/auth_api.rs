#[macro_use]
mod common;

use actix_web::test;
use common::{bearer, memory_state, peer, test_settings, MockGenerator, PASSWORD};
use serde_json::{json, Value};

#[actix_web::test]
async fn test_register_login_and_verify() {
    let (state, _store) = memory_state(test_settings(), MockGenerator::new());
    let tokens = state.auth_service.clone();
    let app = test_app!(state);

    let register_response = test::TestRequest::post()
        .uri("/api/auth/register")
        .peer_addr(peer())
        .set_json(json!({
            "username": "alice99",
            "email": "alice@example.com",
            "password": PASSWORD
        }))
        .send_request(&app)
        .await;

    assert_eq!(register_response.status(), 201);
    let register_body: Value = test::read_body_json(register_response).await;
    assert_eq!(register_body["user"]["username"], "alice99");
    assert_eq!(register_body["user"]["email"], "alice@example.com");
    assert!(register_body["user"].get("password_hash").is_none());
    let user_id = register_body["user"]["id"].as_str().expect("user id").to_string();

    let login_response = test::TestRequest::post()
        .uri("/api/auth/login")
        .peer_addr(peer())
        .set_json(json!({ "emailOrUsername": "alice99", "password": PASSWORD }))
        .send_request(&app)
        .await;

    assert_eq!(login_response.status(), 200);
    let login_body: Value = test::read_body_json(login_response).await;
    let token = login_body["token"].as_str().expect("token");

    let verified = tokens.tokens().verify(token).expect("token should verify");
    assert_eq!(verified.user_id.to_string(), user_id);

    let resume_response = test::TestRequest::get()
        .uri("/api/resume")
        .peer_addr(peer())
        .insert_header(bearer(token))
        .send_request(&app)
        .await;

    assert_eq!(resume_response.status(), 404);
    let body: Value = test::read_body_json(resume_response).await;
    assert_eq!(body, json!({ "error": "Resume not found" }));
}

#[actix_web::test]
async fn test_login_by_email() {
    let (state, _store) = memory_state(test_settings(), MockGenerator::new());
    common::login_token(&state, "bob").await;
    let app = test_app!(state);

    let response = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "emailOrUsername": "bob@example.com", "password": PASSWORD }))
        .send_request(&app)
        .await;

    assert_eq!(response.status(), 200);
}

#[actix_web::test]
async fn test_duplicate_registration_is_rejected() {
    let (state, store) = memory_state(test_settings(), MockGenerator::new());
    let app = test_app!(state);

    let first = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({ "username": "carol", "email": "carol@example.com", "password": PASSWORD }))
        .send_request(&app)
        .await;
    assert_eq!(first.status(), 201);

    for (username, email) in [("carol", "other@example.com"), ("carol2", "carol@example.com")] {
        let response = test::TestRequest::post()
            .uri("/api/auth/register")
            .set_json(json!({ "username": username, "email": email, "password": PASSWORD }))
            .send_request(&app)
            .await;

        assert_eq!(response.status(), 400);
        let body: Value = test::read_body_json(response).await;
        assert_eq!(body, json!({ "error": "User already exists" }));
    }

    assert_eq!(store.user_count().await, 1);
}

#[actix_web::test]
async fn test_invalid_login() {
    let (state, _store) = memory_state(test_settings(), MockGenerator::new());
    common::login_token(&state, "dave").await;
    let app = test_app!(state);

    for identifier in ["dave", "nobody"] {
        let response = test::TestRequest::post()
            .uri("/api/auth/login")
            .set_json(json!({ "emailOrUsername": identifier, "password": "Wrong1!pass" }))
            .send_request(&app)
            .await;

        assert_eq!(response.status(), 400);
        let body: Value = test::read_body_json(response).await;
        assert_eq!(body, json!({ "error": "Invalid credentials" }));
    }
}

#[actix_web::test]
async fn test_invalid_registration() {
    let (state, store) = memory_state(test_settings(), MockGenerator::new());
    let app = test_app!(state);

    let response = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({ "username": "a!", "email": "not-an-email", "password": "weak" }))
        .send_request(&app)
        .await;

    assert_eq!(response.status(), 400);
    let body: Value = test::read_body_json(response).await;
    let fields: Vec<&str> = body["errors"]
        .as_array()
        .expect("errors array")
        .iter()
        .filter_map(|e| e["field"].as_str())
        .collect();
    assert!(fields.contains(&"username"));
    assert!(fields.contains(&"email"));
    assert!(fields.contains(&"password"));
    assert_eq!(store.user_count().await, 0);
}

#[actix_web::test]
async fn test_malformed_json_body() {
    let (state, _store) = memory_state(test_settings(), MockGenerator::new());
    let app = test_app!(state);

    let response = test::TestRequest::post()
        .uri("/api/auth/login")
        .insert_header(("Content-Type", "application/json"))
        .set_payload("{not json")
        .send_request(&app)
        .await;

    assert_eq!(response.status(), 400);
    let body: Value = test::read_body_json(response).await;
    assert_eq!(body["errors"][0]["field"], "body");
}

#[actix_web::test]
async fn test_logout_revokes_token() {
    let (state, _store) = memory_state(test_settings(), MockGenerator::new());
    let (_, token) = common::login_token(&state, "erin").await;
    let app = test_app!(state);

    let response = test::TestRequest::post()
        .uri("/api/auth/logout")
        .insert_header(bearer(&token))
        .send_request(&app)
        .await;

    assert_eq!(response.status(), 200);
    let body: Value = test::read_body_json(response).await;
    assert_eq!(body, json!({ "message": "Successfully logged out" }));

    let reuse = test::TestRequest::get()
        .uri("/api/resume")
        .insert_header(bearer(&token))
        .send_request(&app)
        .await;

    assert_eq!(reuse.status(), 401);
    let body: Value = test::read_body_json(reuse).await;
    assert_eq!(body, json!({ "error": "Invalid or expired token" }));
}

#[actix_web::test]
async fn test_logout_requires_token() {
    let (state, _store) = memory_state(test_settings(), MockGenerator::new());
    let app = test_app!(state);

    let response = test::TestRequest::post()
        .uri("/api/auth/logout")
        .send_request(&app)
        .await;

    assert_eq!(response.status(), 401);
}

#[actix_web::test]
async fn test_auth_routes_are_rate_limited_per_client() {
    let mut settings = test_settings();
    settings.rate_limit.auth.max_requests = 2;
    settings.rate_limit.auth.message = "Slow down".to_string();
    let (state, _store) = memory_state(settings, MockGenerator::new());
    let app = test_app!(state);

    let login = || {
        test::TestRequest::post()
            .uri("/api/auth/login")
            .peer_addr(peer())
            .set_json(json!({ "emailOrUsername": "nobody", "password": "Wrong1!pass" }))
    };

    for _ in 0..2 {
        let response = login().send_request(&app).await;
        assert_eq!(response.status(), 400);
    }

    let limited = login().send_request(&app).await;
    assert_eq!(limited.status(), 429);
    let retry_after: u64 = limited
        .headers()
        .get("Retry-After")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .expect("Retry-After header");
    assert!(retry_after >= 1 && retry_after <= 900);
    let body = test::read_body(limited).await;
    assert_eq!(body, "Slow down");

    // Another client has its own window.
    let other = test::TestRequest::post()
        .uri("/api/auth/login")
        .peer_addr("198.51.100.1:5000".parse().expect("peer"))
        .set_json(json!({ "emailOrUsername": "nobody", "password": "Wrong1!pass" }))
        .send_request(&app)
        .await;
    assert_eq!(other.status(), 400);
}

#[actix_web::test]
async fn test_unknown_route_returns_not_found() {
    let (state, _store) = memory_state(test_settings(), MockGenerator::new());
    let app = test_app!(state);

    let response = test::TestRequest::get().uri("/api/nope").send_request(&app).await;

    assert_eq!(response.status(), 404);
    let body: Value = test::read_body_json(response).await;
    assert_eq!(body, json!({ "error": "Not Found" }));
}
