//! Server-side record of open sessions, keyed by refresh-token id.
//!
//! Login opens a session, refresh rotates it, logout closes it. A refresh
//! token whose id is not in the store is treated as revoked.

use std::time::Duration;

use chrono::{DateTime, Utc};
use moka::future::Cache;

use crate::models::Claims;

#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    pub user_id: u64,
    pub opened_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct SessionStore {
    sessions: Cache<String, SessionRecord>,
}

impl SessionStore {
    pub fn new(refresh_ttl_secs: usize) -> Self {
        Self {
            sessions: Cache::builder()
                .max_capacity(100_000)
                .time_to_live(Duration::from_secs(refresh_ttl_secs as u64))
                .build(),
        }
    }

    pub async fn open(&self, refresh: &Claims) {
        self.sessions
            .insert(
                refresh.jti.clone(),
                SessionRecord {
                    user_id: refresh.user_id,
                    opened_at: Utc::now(),
                },
            )
            .await;
    }

    pub async fn is_open(&self, jti: &str) -> bool {
        self.sessions.get(jti).await.is_some()
    }

    /// Closes `old_jti` and opens `next`. Returns false, opening nothing,
    /// if `old_jti` was not open.
    pub async fn rotate(&self, old_jti: &str, next: &Claims) -> bool {
        if self.sessions.remove(old_jti).await.is_none() {
            return false;
        }
        self.open(next).await;
        true
    }

    /// Idempotent.
    pub async fn close(&self, jti: &str) {
        self.sessions.invalidate(jti).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TokenType;

    fn refresh(jti: &str) -> Claims {
        Claims {
            user_id: 1,
            sub: "a".to_string(),
            role: 3,
            exp: 0,
            jti: jti.to_string(),
            token_type: TokenType::Refresh,
            employee_id: Some(1),
        }
    }

    #[actix_web::test]
    async fn lifecycle() {
        let store = SessionStore::new(60);
        store.open(&refresh("one")).await;
        assert!(store.is_open("one").await);

        assert!(store.rotate("one", &refresh("two")).await);
        assert!(!store.is_open("one").await);
        assert!(store.is_open("two").await);

        // replaying the rotated token fails
        assert!(!store.rotate("one", &refresh("three")).await);
        assert!(!store.is_open("three").await);

        store.close("two").await;
        store.close("two").await;
        assert!(!store.is_open("two").await);
    }
}
