//! Password hashing with bcrypt.
//!
//! Both operations are CPU-bound and run on tokio's blocking pool so a slow
//! hash never stalls other requests.

use crate::error::AppError;
use bcrypt::{hash, verify};

pub async fn hash_password(password: &str, cost: u32) -> Result<String, AppError> {
    let password = password.to_owned();
    tokio::task::spawn_blocking(move || hash(password, cost))
        .await
        .map_err(|e| AppError::InternalError(format!("Password hashing task failed: {}", e)))?
        .map_err(|e| AppError::InternalError(format!("Failed to hash password: {}", e)))
}

/// Compares a password against a stored bcrypt hash. An unparseable hash
/// counts as a mismatch.
pub async fn verify_password(password: &str, password_hash: &str) -> Result<bool, AppError> {
    let password = password.to_owned();
    let password_hash = password_hash.to_owned();
    tokio::task::spawn_blocking(move || verify(password, &password_hash).unwrap_or(false))
        .await
        .map_err(|e| AppError::InternalError(format!("Password verification task failed: {}", e)))
}
