//! Core contracts shared by identity integrations.
//!
//! The host platform owns account persistence and request plumbing. This
//! crate defines what crosses that boundary: the canonical identity record an
//! integration produces, and the keyed TTL token store the host lends to
//! flows that need short-lived correlation state.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Unknown, expired, or already consumed. Callers cannot tell these
    /// apart.
    #[error("token not found")]
    NotFound,

    #[error("store backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Namespace for tokens held in a [`TokenStore`]. Redeeming with the wrong
/// kind behaves exactly like redeeming an unknown id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Session,
    OAuth,
    Registration,
}

/// Canonical identity record produced by a federation flow.
///
/// `external_id` and `email` must be non-empty before the record is handed
/// to account lookup; enforcing that is the flow's job, not the record's.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FederatedIdentity {
    /// Stable per-account identifier on the provider side.
    pub external_id: String,
    pub email: String,
    /// Ordered username candidates; the consumer tries each until one is
    /// free.
    pub candidate_usernames: Vec<String>,
    /// `url:`-tagged avatar reference.
    pub avatar: Option<String>,
    /// Provider-specific fields passed through opaquely (student ids etc.).
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Keyed TTL token store lent by the host platform.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Store a payload under a fresh opaque id with the given lifetime.
    async fn issue(
        &self,
        kind: TokenKind,
        ttl_seconds: u64,
        payload: serde_json::Value,
    ) -> StoreResult<String>;

    /// Atomically remove and return the payload stored under `id`.
    ///
    /// Exactly one of any number of concurrent calls for the same id may
    /// succeed; every other caller observes [`StoreError::NotFound`].
    async fn redeem(&self, id: &str, kind: TokenKind) -> StoreResult<serde_json::Value>;

    /// Drop expired tokens, returning how many were removed.
    async fn purge_expired(&self) -> StoreResult<usize>;
}

#[derive(Debug, Clone)]
struct StoredToken {
    kind: TokenKind,
    payload: serde_json::Value,
    expires_at: DateTime<Utc>,
}

/// In-memory implementation of [`TokenStore`].
pub struct InMemoryTokenStore {
    tokens: Arc<RwLock<HashMap<String, StoredToken>>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self {
            tokens: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryTokenStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn issue(
        &self,
        kind: TokenKind,
        ttl_seconds: u64,
        payload: serde_json::Value,
    ) -> StoreResult<String> {
        let id = Uuid::new_v4().to_string();
        let expires_at = Utc::now() + Duration::seconds(ttl_seconds as i64);

        let mut tokens = self.tokens.write().await;
        tokens.insert(
            id.clone(),
            StoredToken {
                kind,
                payload,
                expires_at,
            },
        );

        Ok(id)
    }

    async fn redeem(&self, id: &str, kind: TokenKind) -> StoreResult<serde_json::Value> {
        let mut tokens = self.tokens.write().await;

        // Kind check, removal, and expiry check share one critical section,
        // so concurrent redemptions of the same id cannot both succeed. A
        // wrong-kind lookup must not consume the token.
        match tokens.get(id) {
            Some(stored) if stored.kind == kind => {}
            _ => return Err(StoreError::NotFound),
        }

        let stored = tokens.remove(id).ok_or(StoreError::NotFound)?;

        if stored.expires_at <= Utc::now() {
            return Err(StoreError::NotFound);
        }

        Ok(stored.payload)
    }

    async fn purge_expired(&self) -> StoreResult<usize> {
        let mut tokens = self.tokens.write().await;
        let now = Utc::now();

        let before = tokens.len();
        tokens.retain(|_, stored| stored.expires_at > now);

        Ok(before - tokens.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_issue_and_redeem() {
        let store = InMemoryTokenStore::new();

        let id = store
            .issue(TokenKind::OAuth, 600, json!({ "redirect": "/problems" }))
            .await
            .unwrap();

        let payload = store.redeem(&id, TokenKind::OAuth).await.unwrap();
        assert_eq!(payload["redirect"], "/problems");

        // Redemption is destructive.
        let result = store.redeem(&id, TokenKind::OAuth).await;
        assert!(matches!(result, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn test_unknown_id_not_found() {
        let store = InMemoryTokenStore::new();

        let result = store.redeem("no-such-token", TokenKind::OAuth).await;
        assert!(matches!(result, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn test_expired_indistinguishable_from_unknown() {
        let store = InMemoryTokenStore::new();

        let id = store
            .issue(TokenKind::OAuth, 0, json!({ "redirect": "/" }))
            .await
            .unwrap();

        let result = store.redeem(&id, TokenKind::OAuth).await;
        assert!(matches!(result, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn test_kind_mismatch_does_not_consume() {
        let store = InMemoryTokenStore::new();

        let id = store
            .issue(TokenKind::OAuth, 600, json!({ "redirect": "/" }))
            .await
            .unwrap();

        let result = store.redeem(&id, TokenKind::Session).await;
        assert!(matches!(result, Err(StoreError::NotFound)));

        // The token is still there for the right kind.
        let payload = store.redeem(&id, TokenKind::OAuth).await.unwrap();
        assert_eq!(payload["redirect"], "/");
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let store = InMemoryTokenStore::new();

        store
            .issue(TokenKind::OAuth, 0, json!({}))
            .await
            .unwrap();
        let live = store
            .issue(TokenKind::OAuth, 600, json!({}))
            .await
            .unwrap();

        let purged = store.purge_expired().await.unwrap();
        assert_eq!(purged, 1);

        assert!(store.redeem(&live, TokenKind::OAuth).await.is_ok());
    }

    #[tokio::test]
    async fn test_concurrent_redemption_single_success() {
        let store = Arc::new(InMemoryTokenStore::new());

        let id = store
            .issue(TokenKind::OAuth, 600, json!({ "redirect": "/" }))
            .await
            .unwrap();

        let mut handles = vec![];
        for _ in 0..100 {
            let store = store.clone();
            let id = id.clone();
            handles.push(tokio::spawn(async move {
                store.redeem(&id, TokenKind::OAuth).await
            }));
        }

        let mut successes = 0;
        let mut not_found = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(StoreError::NotFound) => not_found += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!(successes, 1);
        assert_eq!(not_found, 99);
    }
}
