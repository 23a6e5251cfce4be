//! Persisted login session and the in-memory view of who is signed in.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use shared::User;
use thiserror::Error;

use crate::api::CoreApi;
use crate::config::Config;
use crate::nav::{Navigator, Route, Section};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("session file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("session file is corrupt: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("could not encode session: {0}")]
    Encode(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoredSession {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user: Option<User>,
}

/// Token and cached user on disk. Every read goes back to the file, so a
/// login or logout from another process is picked up by the next request.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn default_location() -> anyhow::Result<Self> {
        Ok(Self::new(Config::config_dir()?.join("session.toml")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<StoredSession, StoreError> {
        if !self.path.exists() {
            return Ok(StoredSession::default());
        }
        let content = std::fs::read_to_string(&self.path)?;
        Ok(toml::from_str(&content)?)
    }

    fn write(&self, stored: &StoredSession) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, toml::to_string_pretty(stored)?)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }

    pub fn token(&self) -> Option<String> {
        match self.read() {
            Ok(stored) => stored.token.filter(|t| !t.is_empty()),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Ignoring unreadable session file");
                None
            }
        }
    }

    pub fn user(&self) -> Option<User> {
        match self.read() {
            Ok(stored) => stored.user,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Ignoring unreadable session file");
                None
            }
        }
    }

    pub fn save(&self, token: &str, user: &User) -> Result<(), StoreError> {
        self.write(&StoredSession {
            token: Some(token.to_string()),
            user: Some(user.clone()),
        })
    }

    /// Replace the cached user, keeping the token.
    pub fn save_user(&self, user: &User) -> Result<(), StoreError> {
        let mut stored = self.read().unwrap_or_default();
        stored.user = Some(user.clone());
        self.write(&stored)
    }

    pub fn clear(&self) -> Result<(), StoreError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Who is signed in, shared by every view and service client.
pub struct Session {
    store: SessionStore,
    navigator: Navigator,
    user: RwLock<Option<User>>,
    loading: AtomicBool,
}

impl Session {
    pub fn new(store: SessionStore, navigator: Navigator) -> Self {
        Self {
            store,
            navigator,
            user: RwLock::new(None),
            loading: AtomicBool::new(true),
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    pub fn token(&self) -> Option<String> {
        self.store.token()
    }

    pub fn current_user(&self) -> Option<User> {
        self.user.read().ok().and_then(|guard| guard.clone())
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    pub fn is_admin(&self) -> bool {
        self.current_user().map(|u| u.is_admin()).unwrap_or(false)
    }

    fn set_user(&self, user: Option<User>) {
        if let Ok(mut guard) = self.user.write() {
            *guard = user;
        }
    }

    /// Adopt the cached user optimistically. Without a complete stored
    /// session the user is sent to the login screen.
    ///
    /// Returns `true` when a token exists and is worth revalidating.
    pub fn init(&self) -> bool {
        let token = self.store.token();
        let user = self.store.user();

        match (&token, user) {
            (Some(_), Some(user)) => {
                tracing::debug!(user = %user.username, "Restored cached session");
                self.set_user(Some(user));
            }
            _ => {
                self.set_user(None);
                if !self.navigator.current().is_login() {
                    self.navigator.navigate(Route::Login);
                }
            }
        }

        self.loading.store(false, Ordering::SeqCst);
        token.is_some()
    }

    /// Ask the core service who the token belongs to. Any failure is
    /// treated as an invalid token and logs the user out.
    pub async fn revalidate(&self, core: &CoreApi) -> bool {
        if self.store.token().is_none() {
            return false;
        }

        match core.current_user().await {
            Ok(user) => {
                if let Err(e) = self.store.save_user(&user) {
                    tracing::warn!(error = %e, "Failed to cache user");
                }
                self.set_user(Some(user));
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "Stored session is no longer valid");
                self.logout();
                false
            }
        }
    }

    /// Persist a fresh login and enter the dashboard.
    pub fn establish(&self, token: &str, user: User) -> Result<(), StoreError> {
        self.store.save(token, &user)?;
        tracing::info!(user = %user.username, "Signed in");
        self.set_user(Some(user));
        self.loading.store(false, Ordering::SeqCst);
        self.navigator.navigate(Route::Dashboard(Section::Overview));
        Ok(())
    }

    pub fn logout(&self) {
        if let Err(e) = self.store.clear() {
            tracing::error!(error = %e, "Failed to remove session file");
        }
        self.set_user(None);
        self.navigator.navigate(Route::Login);
    }

    /// Called when any service answers 401.
    pub fn expire(&self) {
        tracing::warn!("Session rejected by the server, signing out");
        self.logout();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sample_user, Stub};
    use serde_json::json;

    fn fresh(dir: &tempfile::TempDir, start: Route) -> Session {
        let store = SessionStore::new(dir.path().join("session.toml"));
        Session::new(store, Navigator::new(start))
    }

    #[test]
    fn test_store_roundtrip_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("nested").join("session.toml"));
        assert!(store.token().is_none());

        store.save("abc", &sample_user()).unwrap();
        assert_eq!(store.token().as_deref(), Some("abc"));
        assert_eq!(store.user().unwrap().username, "jsmith");

        let mut renamed = sample_user();
        renamed.full_name = "Janet Smith".to_string();
        store.save_user(&renamed).unwrap();
        assert_eq!(store.token().as_deref(), Some("abc"));
        assert_eq!(store.user().unwrap().full_name, "Janet Smith");

        store.clear().unwrap();
        assert!(store.token().is_none());
        store.clear().unwrap();
    }

    #[test]
    fn test_corrupt_file_reads_as_signed_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.toml");
        std::fs::write(&path, "token = [not toml").unwrap();
        let store = SessionStore::new(&path);
        assert!(store.token().is_none());
        assert!(store.user().is_none());
    }

    #[test]
    fn test_init_without_session_goes_to_login() {
        let dir = tempfile::tempdir().unwrap();
        let session = fresh(&dir, Route::Dashboard(Section::Contacts));

        assert!(session.is_loading());
        assert!(!session.init());
        assert!(!session.is_loading());
        assert!(session.current_user().is_none());
        assert_eq!(session.navigator().current(), Route::Login);
    }

    #[test]
    fn test_init_adopts_cached_user() {
        let dir = tempfile::tempdir().unwrap();
        let session = fresh(&dir, Route::Dashboard(Section::Overview));
        session.store().save("abc", &sample_user()).unwrap();

        assert!(session.init());
        assert_eq!(session.current_user().unwrap().username, "jsmith");
        assert_eq!(session.navigator().current(), Route::Dashboard(Section::Overview));
    }

    #[tokio::test]
    async fn test_revalidate_failure_logs_out() {
        let stub = Stub::start().await;
        stub.respond("GET", "/users/me", 500, json!({"error": "boom"}));

        let dir = tempfile::tempdir().unwrap();
        let session = std::sync::Arc::new(fresh(&dir, Route::Dashboard(Section::Overview)));
        session.store().save("abc", &sample_user()).unwrap();
        session.init();

        let backend = stub.backend(session.clone());
        assert!(!session.revalidate(&backend.core).await);
        assert!(session.current_user().is_none());
        assert!(session.token().is_none());
        assert_eq!(session.navigator().current(), Route::Login);
    }

    #[tokio::test]
    async fn test_revalidate_refreshes_cached_user() {
        let stub = Stub::start().await;
        let mut fresh_user = json!(sample_user());
        fresh_user["full_name"] = json!("Janet Smith");
        stub.respond("GET", "/users/me", 200, fresh_user);

        let dir = tempfile::tempdir().unwrap();
        let session = std::sync::Arc::new(fresh(&dir, Route::Dashboard(Section::Overview)));
        session.store().save("abc", &sample_user()).unwrap();
        session.init();

        let backend = stub.backend(session.clone());
        assert!(session.revalidate(&backend.core).await);
        assert_eq!(session.current_user().unwrap().full_name, "Janet Smith");
        assert_eq!(session.store().user().unwrap().full_name, "Janet Smith");
        assert_eq!(stub.last("GET", "/users/me").unwrap().authorization.as_deref(), Some("Bearer abc"));
    }

    #[test]
    fn test_establish_and_logout() {
        let dir = tempfile::tempdir().unwrap();
        let session = fresh(&dir, Route::Login);

        session.establish("tok", sample_user()).unwrap();
        assert_eq!(session.token().as_deref(), Some("tok"));
        assert_eq!(session.navigator().current(), Route::Dashboard(Section::Overview));
        assert!(!session.is_admin());

        session.logout();
        assert!(session.token().is_none());
        assert!(session.current_user().is_none());
        assert_eq!(session.navigator().current(), Route::Login);
    }
}
