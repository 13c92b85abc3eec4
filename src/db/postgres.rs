use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use uuid::Uuid;
use crate::config::DatabaseConfig;
use crate::db::models::{SaveOutcome, User};
use crate::db::{ResumeStore, UserStore};
use crate::error::DatabaseError;

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// PostgreSQL-backed user and resume storage.
#[derive(Clone)]
pub struct PgStore {
    pool: Arc<PgPool>,
}

impl PgStore {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect(&config.url)
            .await
            .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

        Ok(Self { pool: Arc::new(pool) })
    }

    pub async fn run_migrations(&self) -> Result<(), DatabaseError> {
        sqlx::migrate!("./migrations").run(self.pool.as_ref()).await?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        self.pool.as_ref()
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn begin_transaction(&self) -> Result<Transaction<'_, Postgres>, DatabaseError> {
        Ok(self.pool.as_ref().begin().await?)
    }

    async fn create_user_with_transaction(
        &self,
        user: &User,
        transaction: &mut Transaction<'_, Postgres>,
    ) -> Result<User, DatabaseError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, username, email, password_hash, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, username, email, password_hash, created_at
            "#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .fetch_one(&mut **transaction)
        .await?;

        Ok(user)
    }
}

/// The insert failure is what the caller acts on; a failed rollback after it
/// is only logged.
fn keep_insert_error(insert_error: DatabaseError, rollback: Result<(), sqlx::Error>) -> DatabaseError {
    if let Err(rollback_error) = rollback {
        warn!(error = %rollback_error, "Rollback after failed user insert also failed");
    }
    insert_error
}

#[async_trait]
impl UserStore for PgStore {
    async fn user_exists(&self, username: &str, email: &str) -> Result<bool, DatabaseError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = $1 OR username = $2)",
        )
        .bind(email)
        .bind(username)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(exists)
    }

    async fn create_user(&self, user: &User) -> Result<User, DatabaseError> {
        let mut transaction = self.begin_transaction().await?;

        let result = self.create_user_with_transaction(user, &mut transaction).await;

        match result {
            Ok(user) => {
                transaction.commit().await?;
                Ok(user)
            }
            Err(e) => Err(keep_insert_error(e, transaction.rollback().await)),
        }
    }

    async fn find_by_username_or_email(&self, identifier: &str) -> Result<Option<User>, DatabaseError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, email, password_hash, created_at FROM users WHERE email = $1 OR username = $1 LIMIT 1",
        )
        .bind(identifier)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(user)
    }
}

#[async_trait]
impl ResumeStore for PgStore {
    async fn get_resume(&self, user_id: Uuid) -> Result<Option<Value>, DatabaseError> {
        let document = sqlx::query_scalar::<_, Json<Value>>(
            "SELECT resume_data FROM resumes WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(document.map(|Json(value)| value))
    }

    async fn upsert_resume(&self, user_id: Uuid, document: &Value) -> Result<SaveOutcome, DatabaseError> {
        // xmax is zero only for a freshly inserted row version.
        let inserted = sqlx::query_scalar::<_, bool>(
            r#"
            INSERT INTO resumes (user_id, resume_data)
            VALUES ($1, $2)
            ON CONFLICT (user_id)
            DO UPDATE SET resume_data = EXCLUDED.resume_data, updated_at = now()
            RETURNING (xmax = 0) AS inserted
            "#,
        )
        .bind(user_id)
        .bind(Json(document))
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(if inserted { SaveOutcome::Created } else { SaveOutcome::Updated })
    }
}
