use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;
use crate::db::models::{SaveOutcome, User};
use crate::db::{ResumeStore, UserStore};
use crate::error::DatabaseError;

/// In-process store with the same uniqueness rules as the SQL schema.
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<Vec<User>>,
    resumes: RwLock<HashMap<Uuid, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn user_count(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn resume_count(&self) -> usize {
        self.resumes.read().await.len()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn user_exists(&self, username: &str, email: &str) -> Result<bool, DatabaseError> {
        let users = self.users.read().await;
        Ok(users.iter().any(|u| u.username == username || u.email == email))
    }

    async fn create_user(&self, user: &User) -> Result<User, DatabaseError> {
        // Check and insert under one lock, like the unique constraints would.
        let mut users = self.users.write().await;
        if users
            .iter()
            .any(|u| u.id == user.id || u.username == user.username || u.email == user.email)
        {
            return Err(DatabaseError::Duplicate);
        }
        users.push(user.clone());
        Ok(user.clone())
    }

    async fn find_by_username_or_email(&self, identifier: &str) -> Result<Option<User>, DatabaseError> {
        let users = self.users.read().await;
        Ok(users
            .iter()
            .find(|u| u.email == identifier || u.username == identifier)
            .cloned())
    }
}

#[async_trait]
impl ResumeStore for MemoryStore {
    async fn get_resume(&self, user_id: Uuid) -> Result<Option<Value>, DatabaseError> {
        Ok(self.resumes.read().await.get(&user_id).cloned())
    }

    async fn upsert_resume(&self, user_id: Uuid, document: &Value) -> Result<SaveOutcome, DatabaseError> {
        let mut resumes = self.resumes.write().await;
        match resumes.insert(user_id, document.clone()) {
            None => Ok(SaveOutcome::Created),
            Some(_) => Ok(SaveOutcome::Updated),
        }
    }
}
