#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use async_trait::async_trait;
use mockall::mock;
use resumegen_server::db::{MemoryStore, ResumeStore, SaveOutcome};
use resumegen_server::error::{DatabaseError, GenerationError};
use resumegen_server::{AppState, Settings, TextGenerator};
use serde_json::{json, Value};
use uuid::Uuid;

pub const PASSWORD: &str = "Secur3!Pass";

mock! {
    pub Generator {}

    #[async_trait]
    impl TextGenerator for Generator {
        async fn generate(&self, system: &str, user: &str) -> Result<String, GenerationError>;
    }
}

mock! {
    pub Resumes {}

    #[async_trait]
    impl ResumeStore for Resumes {
        async fn get_resume(&self, user_id: Uuid) -> Result<Option<Value>, DatabaseError>;
        async fn upsert_resume(&self, user_id: Uuid, document: &Value) -> Result<SaveOutcome, DatabaseError>;
    }
}

/// Builds the full router around `$state`, the way `main` does.
macro_rules! test_app {
    ($state:expr) => {{
        let data = actix_web::web::Data::new($state);
        let cors_config = data.config.cors.clone();
        actix_web::test::init_service(
            actix_web::App::new()
                .wrap(resumegen_server::routes::error_handlers())
                .wrap(resumegen_server::routes::security_headers())
                .wrap(resumegen_server::routes::cors(&cors_config))
                .configure(|cfg| resumegen_server::routes::configure(cfg, data.clone())),
        )
        .await
    }};
}

pub fn test_settings() -> Settings {
    Settings::new_for_test().expect("Failed to load test config")
}

pub fn memory_state(settings: Settings, generator: MockGenerator) -> (AppState, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let state = AppState::from_parts(settings, store.clone(), store.clone(), Arc::new(generator))
        .expect("Failed to build app state");
    (state, store)
}

pub fn peer() -> SocketAddr {
    "203.0.113.7:40000".parse().expect("peer address")
}

/// Registers `username` through the service layer and returns a fresh token.
pub async fn login_token(state: &AppState, username: &str) -> (Uuid, String) {
    let user = state
        .auth_service
        .register(username, &format!("{}@example.com", username), PASSWORD)
        .await
        .expect("Failed to register user");
    let token = state
        .auth_service
        .login(username, PASSWORD)
        .await
        .expect("Failed to login");
    (user.id, token)
}

pub fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", token))
}

pub fn sample_resume() -> Value {
    json!({
        "personal": {
            "fullName": "Alice Example",
            "email": "alice@example.com",
            "profession": "Software Engineer",
            "address": "1 Main St",
            "city": "Springfield",
            "state": "IL"
        },
        "education": {
            "schoolName": "State University",
            "schoolLocation": "Springfield, IL",
            "degree": "BSc",
            "fieldOfStudy": "Computer Science",
            "gradMonth": "June",
            "gradYear": "2018"
        },
        "experience": {
            "company": "Acme",
            "employer": "Acme Corp",
            "role": "Backend Engineer",
            "address": "2 Market St",
            "startDate": "2018-07-01",
            "finishDate": "2023-01-31",
            "currentlyHere": false
        },
        "skills": ["Rust", "PostgreSQL", "Kubernetes"],
        "certifications": ["CKA"],
        "contact": {
            "phone": "555-0100",
            "twitter": "@alice",
            "linkedin": "https://linkedin.com/in/alice",
            "github": "https://github.com/alice"
        }
    })
}
