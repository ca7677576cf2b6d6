//! Server-side sessions.
//!
//! A login creates an opaque random id that maps to a serialized
//! [`SessionUser`] snapshot. Handlers never see the store directly: the auth
//! middleware resolves the id and hands them the snapshot.

use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use rand::{Rng, distributions::Alphanumeric};
use serde::{Deserialize, Serialize};

use crate::entities::user::{self, UserRole};
use crate::error::{AppError, AppResult};

const SESSION_ID_LEN: usize = 48;
const MAX_SESSIONS: u64 = 100_000;

/// Identity snapshot stored per session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: i32,
    pub full_name: String,
    pub phone_number: String,
    pub username: String,
    pub role: UserRole,
}

impl From<&user::Model> for SessionUser {
    fn from(user: &user::Model) -> Self {
        Self {
            id: user.id,
            full_name: user.full_name.clone(),
            phone_number: user.phone_number.clone(),
            username: user.username.clone(),
            role: user.role,
        }
    }
}

/// The id of the session that authenticated the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionId(pub String);

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Stores `user` under a fresh id and returns the id.
    async fn create(&self, user: &SessionUser) -> AppResult<String>;

    async fn get(&self, session_id: &str) -> AppResult<Option<SessionUser>>;

    /// Replaces the snapshot of an existing session.
    async fn update(&self, session_id: &str, user: &SessionUser) -> AppResult<()>;

    async fn remove(&self, session_id: &str);

    /// Ends every session of `user_id` except `keep`. Returns how many ended.
    async fn remove_user(&self, user_id: i32, keep: Option<&str>) -> usize;
}

/// In-process store; entries expire `ttl` after they were last written.
#[derive(Clone)]
pub struct MemorySessionStore {
    sessions: Cache<String, String>,
}

impl MemorySessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Cache::builder()
                .max_capacity(MAX_SESSIONS)
                .time_to_live(ttl)
                .build(),
        }
    }
}

fn new_session_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SESSION_ID_LEN)
        .map(char::from)
        .collect()
}

fn encode(user: &SessionUser) -> AppResult<String> {
    serde_json::to_string(user)
        .map_err(|e| AppError::Internal(format!("Failed to serialize session: {}", e)))
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, user: &SessionUser) -> AppResult<String> {
        let session_id = new_session_id();
        self.sessions.insert(session_id.clone(), encode(user)?).await;
        Ok(session_id)
    }

    async fn get(&self, session_id: &str) -> AppResult<Option<SessionUser>> {
        let Some(raw) = self.sessions.get(session_id).await else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(user) => Ok(Some(user)),
            Err(e) => {
                tracing::warn!(error = %e, "Discarding unreadable session");
                self.sessions.invalidate(session_id).await;
                Ok(None)
            }
        }
    }

    async fn update(&self, session_id: &str, user: &SessionUser) -> AppResult<()> {
        if self.sessions.contains_key(session_id) {
            self.sessions
                .insert(session_id.to_string(), encode(user)?)
                .await;
        }
        Ok(())
    }

    async fn remove(&self, session_id: &str) {
        self.sessions.invalidate(session_id).await;
    }

    async fn remove_user(&self, user_id: i32, keep: Option<&str>) -> usize {
        let stale: Vec<_> = self
            .sessions
            .iter()
            .filter(|(id, _)| keep != Some(id.as_str()))
            .filter(|(_, raw)| {
                serde_json::from_str::<SessionUser>(raw).is_ok_and(|user| user.id == user_id)
            })
            .map(|(id, _)| id)
            .collect();

        for id in &stale {
            self.sessions.invalidate(id.as_str()).await;
        }
        stale.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> SessionUser {
        SessionUser {
            id: 1,
            full_name: "Alice".to_string(),
            phone_number: "0812345678".to_string(),
            username: "alice".to_string(),
            role: UserRole::Customer,
        }
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let store = MemorySessionStore::new(Duration::from_secs(60));
        let id = store.create(&alice()).await.unwrap();
        assert_eq!(id.len(), SESSION_ID_LEN);
        assert_eq!(store.get(&id).await.unwrap(), Some(alice()));
    }

    #[tokio::test]
    async fn ids_are_unique() {
        let store = MemorySessionStore::new(Duration::from_secs(60));
        let a = store.create(&alice()).await.unwrap();
        let b = store.create(&alice()).await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn removed_sessions_are_gone() {
        let store = MemorySessionStore::new(Duration::from_secs(60));
        let id = store.create(&alice()).await.unwrap();
        store.remove(&id).await;
        assert_eq!(store.get(&id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn sessions_expire() {
        let store = MemorySessionStore::new(Duration::from_millis(50));
        let id = store.create(&alice()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(store.get(&id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn update_refreshes_snapshot_but_never_creates() {
        let store = MemorySessionStore::new(Duration::from_secs(60));
        let id = store.create(&alice()).await.unwrap();
        let mut changed = alice();
        changed.phone_number = "0899999999".to_string();
        store.update(&id, &changed).await.unwrap();
        assert_eq!(store.get(&id).await.unwrap(), Some(changed.clone()));

        store.update("missing", &changed).await.unwrap();
        assert_eq!(store.get("missing").await.unwrap(), None);
    }

    #[test]
    fn snapshot_uses_camel_case_keys() {
        let json = serde_json::to_value(alice()).unwrap();
        assert_eq!(json["fullName"], "Alice");
        assert_eq!(json["phoneNumber"], "0812345678");
        assert_eq!(json["role"], "customer");
    }

    #[tokio::test]
    async fn remove_user_ends_only_that_users_other_sessions() {
        let store = MemorySessionStore::new(Duration::from_secs(60));
        let current = store.create(&alice()).await.unwrap();
        let laptop = store.create(&alice()).await.unwrap();
        let mut bob = alice();
        bob.id = 2;
        bob.username = "bob".to_string();
        let other = store.create(&bob).await.unwrap();

        assert_eq!(store.remove_user(1, Some(&current)).await, 1);
        assert_eq!(store.get(&laptop).await.unwrap(), None);
        assert_eq!(store.get(&current).await.unwrap(), Some(alice()));
        assert_eq!(store.get(&other).await.unwrap(), Some(bob));

        assert_eq!(store.remove_user(1, None).await, 1);
        assert_eq!(store.get(&current).await.unwrap(), None);
    }
}
