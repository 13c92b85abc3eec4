pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod generation;
pub mod resume;
pub mod routes;
pub mod validation;

use std::sync::Arc;
use actix_web::HttpResponse;
use tracing::info;

pub use error::AppError;
pub type Result<T> = std::result::Result<T, AppError>;
pub use config::Settings;

pub use auth::{AuthService, RateLimitConfig, RateLimiter, RevocationList, TokenCodec};
pub use db::{MemoryStore, PgStore, ResumeStore, UserStore};
pub use generation::{OpenAiClient, TextGenerator};

/// Health check endpoint handler
/// Returns a JSON response with server status and timestamp
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Application state shared across all components
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub auth_service: Arc<AuthService>,
    pub resumes: Arc<dyn ResumeStore>,
    pub generator: Arc<dyn TextGenerator>,
    pub rate_limiter: Arc<RateLimiter>,
    pub revocations: Arc<RevocationList>,
}

impl AppState {
    /// Connects to Postgres, applies pending migrations and builds the
    /// generation client.
    pub async fn new(config: Settings) -> Result<Self> {
        let store = Arc::new(
            PgStore::connect(&config.database)
                .await
                .map_err(|e| AppError::from(e).context("Failed to connect to database"))?,
        );
        store.run_migrations().await?;
        info!("Database migrations applied");

        let generator = Arc::new(OpenAiClient::new(&config.llm)?);
        info!("Generation client configured for model {}", generator.model());

        Self::from_parts(config, store.clone(), store, generator)
    }

    /// Wires the shared components around caller-supplied collaborators.
    pub fn from_parts(
        config: Settings,
        users: Arc<dyn UserStore>,
        resumes: Arc<dyn ResumeStore>,
        generator: Arc<dyn TextGenerator>,
    ) -> Result<Self> {
        let revocations = Arc::new(RevocationList::new());
        let tokens = Arc::new(TokenCodec::from_config(&config.auth));
        let auth_service = Arc::new(AuthService::new(
            users,
            tokens,
            revocations.clone(),
            config.auth.bcrypt_cost,
        )?);
        let rate_limiter = Arc::new(RateLimiter::new(RateLimitConfig::from(&config.rate_limit)));

        Ok(Self {
            config: Arc::new(config),
            auth_service,
            resumes,
            generator,
            rate_limiter,
            revocations,
        })
    }

    /// State backed by a fresh `MemoryStore`, for tests and local runs
    /// without a database.
    pub fn in_memory(config: Settings, generator: Arc<dyn TextGenerator>) -> Result<Self> {
        let store = Arc::new(MemoryStore::new());
        Self::from_parts(config, store.clone(), store, generator)
    }

    /// Drops expired rate-limit windows and revocation entries.
    pub async fn purge_expired(&self) {
        self.rate_limiter.cleanup().await;
        let purged = self.revocations.purge_expired().await;
        if purged > 0 {
            info!("Purged {} expired revocations", purged);
        }
    }
}
