use std::path::PathBuf;
use std::sync::Arc;

use codelab_api_types::AuthPayload;
use codelab_api_types::Role;
use codelab_api_types::User;
use serde::Deserialize;
use serde::Serialize;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Default)]
struct SessionState {
    access_token: Option<String>,
    user: Option<User>,
    persist: bool,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct PersistRecord {
    persist: bool,
}

/// Current-user state, shared by handle rather than ambient globals.
///
/// The only writers are the three reducers (login, refresh, logout); readers
/// are every authenticated request. Invariant: a present access token implies
/// a present user, because the two are only ever set together from one login
/// response.
///
/// The "remember this device" flag is the one durable piece, stored as a tiny
/// JSON file so a later start can decide whether to attempt a silent refresh.
#[derive(Debug, Clone)]
pub struct Session {
    state: Arc<RwLock<SessionState>>,
    persist_path: Option<PathBuf>,
}

impl Session {
    /// A session with no durable storage, used by tests and one-shot calls.
    pub fn in_memory() -> Session {
        Session {
            state: Arc::new(RwLock::new(SessionState::default())),
            persist_path: None,
        }
    }

    /// A session whose persist flag survives restarts at `path`.
    pub async fn with_persist_file(path: PathBuf) -> Session {
        let persist = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice::<PersistRecord>(&bytes)
                .map(|record| record.persist)
                .unwrap_or(false),
            Err(_) => false,
        };

        Session {
            state: Arc::new(RwLock::new(SessionState {
                persist,
                ..SessionState::default()
            })),
            persist_path: Some(path),
        }
    }

    pub async fn access_token(&self) -> Option<String> {
        self.state.read().await.access_token.clone()
    }

    pub async fn user(&self) -> Option<User> {
        self.state.read().await.user.clone()
    }

    pub async fn role(&self) -> Option<Role> {
        self.state.read().await.user.as_ref().map(|user| user.role)
    }

    pub async fn is_authenticated(&self) -> bool {
        self.state.read().await.access_token.is_some()
    }

    pub async fn persist(&self) -> bool {
        self.state.read().await.persist
    }

    /// Login reducer: token and user land together, never separately.
    pub async fn apply_login(&self, payload: AuthPayload) {
        let mut state = self.state.write().await;
        state.access_token = Some(payload.access_token);
        state.user = Some(payload.user);
    }

    /// Refresh reducer: a new token for the already-known user.
    pub async fn apply_refresh(&self, access_token: String) {
        self.state.write().await.access_token = Some(access_token);
    }

    /// Logout reducer: clears in-process state and the durable persist flag.
    pub async fn clear(&self) {
        {
            let mut state = self.state.write().await;
            state.access_token = None;
            state.user = None;
            state.persist = false;
        }

        if let Some(path) = &self.persist_path {
            if let Err(err) = tokio::fs::remove_file(path).await {
                if err.kind() != std::io::ErrorKind::NotFound {
                    log::warn!("failed to clear persist flag: {err}");
                }
            }
        }
    }

    pub async fn set_persist(&self, persist: bool) {
        self.state.write().await.persist = persist;

        if let Some(path) = &self.persist_path {
            let record = PersistRecord { persist };
            // Losing the flag only costs one extra login prompt.
            if let Some(parent) = path.parent() {
                let _ = tokio::fs::create_dir_all(parent).await;
            }
            match serde_json::to_vec(&record) {
                Ok(bytes) => {
                    if let Err(err) = tokio::fs::write(path, bytes).await {
                        log::warn!("failed to store persist flag: {err}");
                    }
                }
                Err(err) => log::warn!("failed to encode persist flag: {err}"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codelab_api_types::Role;

    fn sample_payload() -> AuthPayload {
        AuthPayload {
            user: User {
                id: "u_1".to_string(),
                username: "ada".to_string(),
                email: "ada@example.com".to_string(),
                role: Role::Student,
                avatar: None,
                created_at: None,
            },
            access_token: "tok_1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_token_implies_user() {
        let session = Session::in_memory();
        assert!(!session.is_authenticated().await);

        session.apply_login(sample_payload()).await;
        assert!(session.is_authenticated().await);
        assert!(session.user().await.is_some());

        session.apply_refresh("tok_2".to_string()).await;
        assert_eq!(session.access_token().await.unwrap(), "tok_2");
        assert!(session.user().await.is_some());

        session.clear().await;
        assert!(session.access_token().await.is_none());
        assert!(session.user().await.is_none());
    }

    #[tokio::test]
    async fn test_persist_flag_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("persist.json");

        let session = Session::with_persist_file(path.clone()).await;
        assert!(!session.persist().await);
        session.set_persist(true).await;

        let reloaded = Session::with_persist_file(path.clone()).await;
        assert!(reloaded.persist().await);
    }

    #[tokio::test]
    async fn test_logout_clears_durable_persist_flag() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("persist.json");

        let session = Session::with_persist_file(path.clone()).await;
        session.apply_login(sample_payload()).await;
        session.set_persist(true).await;
        session.clear().await;

        let reloaded = Session::with_persist_file(path).await;
        assert!(!reloaded.persist().await);
    }
}
