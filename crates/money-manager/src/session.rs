//! Authentication session
//!
//! The bearer token is held by one `Session` handle that is passed to every
//! component that needs it. Lifecycle: anonymous -> authenticated -> expired.
//! A 401 from the service moves an authenticated session to expired and
//! removes the stored token.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticated { token: String },
    Expired,
}

/// Shared session handle; clones see the same state
#[derive(Debug, Clone)]
pub struct Session {
    state: Arc<Mutex<SessionState>>,
    /// Where the token is persisted, if anywhere
    store: Option<PathBuf>,
}

impl Session {
    #[cfg(test)]
    pub fn anonymous() -> Self {
        Self {
            state: Arc::new(Mutex::new(SessionState::Anonymous)),
            store: None,
        }
    }

    /// In-memory session with a known token
    #[cfg(test)]
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            state: Arc::new(Mutex::new(SessionState::Authenticated { token: token.into() })),
            store: None,
        }
    }

    /// Open the session stored at `store`, falling back to `fallback_token`
    pub fn open(store: &Path, fallback_token: Option<String>) -> io::Result<Self> {
        let stored = match std::fs::read_to_string(store) {
            Ok(content) => Some(content.trim().to_string()).filter(|t| !t.is_empty()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => return Err(e),
        };

        let state = match stored.or(fallback_token) {
            Some(token) => SessionState::Authenticated { token },
            None => SessionState::Anonymous,
        };

        Ok(Self {
            state: Arc::new(Mutex::new(state)),
            store: Some(store.to_path_buf()),
        })
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn state(&self) -> SessionState {
        self.lock().clone()
    }

    /// Token to attach to requests, if signed in
    pub fn bearer(&self) -> Option<String> {
        match &*self.lock() {
            SessionState::Authenticated { token } => Some(token.clone()),
            _ => None,
        }
    }

    /// Store a freshly issued token
    pub fn authenticate(&self, token: &str) -> io::Result<()> {
        if let Some(path) = &self.store {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, token)?;
        }
        *self.lock() = SessionState::Authenticated {
            token: token.to_string(),
        };
        tracing::debug!(token = %mask_token(token), "session authenticated");
        Ok(())
    }

    /// The service rejected the token; forget it
    pub fn expire(&self) {
        let mut state = self.lock();
        if matches!(*state, SessionState::Authenticated { .. }) {
            *state = SessionState::Expired;
            tracing::warn!("session expired, stored token cleared");
        }
        drop(state);
        self.remove_stored();
    }

    /// Explicit sign-out
    pub fn sign_out(&self) {
        *self.lock() = SessionState::Anonymous;
        self.remove_stored();
    }

    fn remove_stored(&self) {
        if let Some(path) = &self.store {
            if let Err(e) = std::fs::remove_file(path) {
                if e.kind() != io::ErrorKind::NotFound {
                    tracing::warn!(path = %path.display(), error = %e, "could not remove stored token");
                }
            }
        }
    }
}

/// Mask a token for safe logging: "eyJhbGciOi..." -> "eyJh****"
pub fn mask_token(token: &str) -> String {
    let visible: String = token.chars().take(4).collect();
    format!("{}****", visible)
}
