//! Database module
//!
//! Persistence sits behind two traits so handlers never depend on a concrete
//! backend. `PgStore` is the production implementation; `MemoryStore` backs
//! tests and local experiments.

pub mod memory;
pub mod models;
pub mod postgres;

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;
use crate::error::DatabaseError;

pub use memory::MemoryStore;
pub use models::{PublicUser, SaveOutcome, User};
pub use postgres::PgStore;

#[async_trait]
pub trait UserStore: Send + Sync {
    /// True if either the username or the email is already on file.
    async fn user_exists(&self, username: &str, email: &str) -> Result<bool, DatabaseError>;

    /// Inserts a user. Fails with `DatabaseError::Duplicate` on a
    /// username or email collision.
    async fn create_user(&self, user: &User) -> Result<User, DatabaseError>;

    async fn find_by_username_or_email(&self, identifier: &str) -> Result<Option<User>, DatabaseError>;
}

#[async_trait]
pub trait ResumeStore: Send + Sync {
    async fn get_resume(&self, user_id: Uuid) -> Result<Option<Value>, DatabaseError>;

    /// Inserts or replaces the user's single resume document. Concurrent
    /// saves for the same user are last-write-wins.
    async fn upsert_resume(&self, user_id: Uuid, document: &Value) -> Result<SaveOutcome, DatabaseError>;
}
