use crate::auth::password::{hash_password, verify_password};
use crate::auth::revocation::RevocationList;
use crate::auth::token::{TokenCodec, VerifiedToken};
use crate::db::{PublicUser, User, UserStore};
use crate::error::{AppError, AuthError, DatabaseError};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Credential checks, token issuance and revocation.
pub struct AuthService {
    users: Arc<dyn UserStore>,
    tokens: Arc<TokenCodec>,
    revocations: Arc<RevocationList>,
    bcrypt_cost: u32,
    // Compared against when no user matches, so a miss costs the same as a
    // wrong password.
    dummy_hash: String,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserStore>,
        tokens: Arc<TokenCodec>,
        revocations: Arc<RevocationList>,
        bcrypt_cost: u32,
    ) -> Result<Self, AppError> {
        let dummy_hash = bcrypt::hash(Uuid::new_v4().to_string(), bcrypt_cost)
            .map_err(|e| AppError::InternalError(format!("Failed to prepare dummy hash: {}", e)))?;

        Ok(Self {
            users,
            tokens,
            revocations,
            bcrypt_cost,
            dummy_hash,
        })
    }

    pub fn tokens(&self) -> &TokenCodec {
        &self.tokens
    }

    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<PublicUser, AppError> {
        if self.users.user_exists(username, email).await? {
            debug!("Registration rejected, username or email already on file");
            return Err(AuthError::DuplicateUser.into());
        }

        let password_hash = hash_password(password, self.bcrypt_cost).await?;
        let user = User::new(username.to_string(), email.to_string(), password_hash);

        // The unique constraints still guard against a concurrent registration
        // that slipped past the existence check.
        let created = match self.users.create_user(&user).await {
            Ok(created) => created,
            Err(DatabaseError::Duplicate) => return Err(AuthError::DuplicateUser.into()),
            Err(e) => return Err(e.into()),
        };

        info!(user_id = %created.id, "User registered");
        Ok(created.public())
    }

    /// Resolves a username or email plus password to a user id.
    pub async fn authenticate(&self, identifier: &str, password: &str) -> Result<Uuid, AppError> {
        let user = self.users.find_by_username_or_email(identifier).await?;

        let (user_id, stored_hash) = match &user {
            Some(user) => (Some(user.id), user.password_hash.as_str()),
            None => (None, self.dummy_hash.as_str()),
        };

        let matches = verify_password(password, stored_hash).await?;
        match user_id {
            Some(id) if matches => Ok(id),
            _ => Err(AuthError::InvalidCredentials.into()),
        }
    }

    pub async fn login(&self, identifier: &str, password: &str) -> Result<String, AppError> {
        let user_id = self.authenticate(identifier, password).await?;
        let token = self
            .tokens
            .issue(user_id)
            .map_err(|e| AppError::InternalError(format!("Failed to issue token: {}", e)))?;

        info!(user_id = %user_id, "Login successful");
        Ok(token)
    }

    /// Verifies a bearer token and checks it has not been revoked.
    pub async fn validate_token(&self, token: &str) -> Result<VerifiedToken, AuthError> {
        let verified = self.tokens.verify(token).map_err(|e| {
            debug!(reason = %e, "Token rejected");
            AuthError::InvalidToken(e)
        })?;

        if self.revocations.is_revoked(verified.token_id).await {
            warn!(user_id = %verified.user_id, "Revoked token presented");
            return Err(AuthError::Revoked);
        }

        Ok(verified)
    }

    pub async fn invalidate_token(&self, token: &VerifiedToken) {
        self.revocations.revoke(token.token_id, token.expires_at).await;
        info!(user_id = %token.user_id, "Token revoked");
    }
}
