use std::collections::HashMap;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Process-local denylist of token ids.
///
/// Entries are kept only until the token would have expired anyway. Like the
/// rate limiter, the list is not shared between replicas.
#[derive(Debug, Default)]
pub struct RevocationList {
    revoked: RwLock<HashMap<Uuid, i64>>,
}

impl RevocationList {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn revoke(&self, token_id: Uuid, expires_at: i64) {
        let mut revoked = self.revoked.write().await;
        revoked.insert(token_id, expires_at);
    }

    pub async fn is_revoked(&self, token_id: Uuid) -> bool {
        self.revoked.read().await.contains_key(&token_id)
    }

    /// Drops entries for tokens that have expired. Returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        self.purge_expired_at(Utc::now().timestamp()).await
    }

    pub async fn purge_expired_at(&self, now: i64) -> usize {
        let mut revoked = self.revoked.write().await;
        let before = revoked.len();
        revoked.retain(|_, expires_at| *expires_at > now);
        before - revoked.len()
    }

    pub async fn len(&self) -> usize {
        self.revoked.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
