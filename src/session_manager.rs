use crate::{
    course_models::{AuthenticatedUser, User},
    error::ApiError,
    log_util::log_debug,
    token_store::TokenStore,
};

/// Credentials for one signed-in user. Passed explicitly to every authenticated call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    token: String,
    user: Option<User>,
}

impl Session {
    pub fn new(token: impl Into<String>, user: Option<User>) -> Self {
        Self {
            token: token.into(),
            user,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn display_name(&self) -> &str {
        self.user
            .as_ref()
            .map(|user| user.name.as_str())
            .unwrap_or("<unverified>")
    }
}

/// Owns the session lifecycle: created on login, replaced on re-login, dropped on logout.
#[derive(Debug, Default)]
pub struct SessionManager {
    store: Option<TokenStore>,
    session: Option<Session>,
}

impl SessionManager {
    pub fn new(store: Option<TokenStore>) -> Self {
        Self {
            store,
            session: None,
        }
    }

    pub fn current(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn is_signed_in(&self) -> bool {
        self.session.is_some()
    }

    /// Token persisted by a previous run, if any. Store failures are logged and treated as absent.
    pub fn stored_token(&self) -> Option<String> {
        let store = self.store.as_ref()?;
        match store.load_token() {
            Ok(token) => token.filter(|value| !value.trim().is_empty()),
            Err(err) => {
                log_debug(&format!("SessionManager: failed to read stored token: {}", err));
                None
            }
        }
    }

    /// Install the session returned by login or registration and persist its token.
    pub fn establish(&mut self, auth: AuthenticatedUser) -> Result<&Session, ApiError> {
        let token = auth
            .token
            .filter(|token| !token.is_empty())
            .ok_or_else(|| ApiError::Decode("authentication response carried no token".into()))?;
        self.persist(&token);
        log_debug(&format!("SessionManager: signed in as {}", auth.user.email));
        Ok(self.session.insert(Session::new(token, Some(auth.user))))
    }

    /// Install a stored token before the profile call has confirmed it.
    pub fn restore(&mut self, token: String) -> &Session {
        self.session.insert(Session::new(token, None))
    }

    /// Attach the confirmed profile to the active session.
    pub fn confirm_user(&mut self, user: User) {
        if let Some(session) = self.session.as_mut() {
            session.user = Some(user);
        }
    }

    /// Drop the session and clear the persisted token.
    pub fn logout(&mut self) {
        self.session = None;
        if let Some(store) = self.store.as_ref() {
            if let Err(err) = store.clear_token() {
                log_debug(&format!("SessionManager: failed to clear stored token: {}", err));
            }
        }
        log_debug("SessionManager: session cleared");
    }

    fn persist(&self, token: &str) {
        if let Some(store) = self.store.as_ref() {
            if let Err(err) = store.save_token(token) {
                log_debug(&format!("SessionManager: failed to persist token: {}", err));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{fs, time::SystemTime};

    fn user() -> User {
        User {
            id: "u1".into(),
            name: "Ada".into(),
            email: "ada@example.com".into(),
            role: "user".into(),
        }
    }

    fn temp_store() -> (std::path::PathBuf, TokenStore) {
        let mut temp_dir = std::env::temp_dir();
        let unique = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        temp_dir.push(format!("coursegen-session-{unique}"));
        fs::create_dir_all(&temp_dir).unwrap();
        let store = TokenStore::open_at(temp_dir.join("test.sqlite")).unwrap();
        (temp_dir, store)
    }

    #[test]
    fn establish_persists_token_and_logout_clears_it() {
        let (temp_dir, store) = temp_store();
        let mut manager = SessionManager::new(Some(store));

        let session = manager
            .establish(AuthenticatedUser {
                user: user(),
                token: Some("jwt-123".into()),
            })
            .unwrap();
        assert_eq!(session.token(), "jwt-123");
        assert_eq!(manager.stored_token().as_deref(), Some("jwt-123"));

        manager.logout();
        assert!(!manager.is_signed_in());
        assert_eq!(manager.stored_token(), None);

        fs::remove_dir_all(&temp_dir).unwrap();
    }

    #[test]
    fn establish_without_token_leaves_session_empty() {
        let mut manager = SessionManager::new(None);
        let result = manager.establish(AuthenticatedUser {
            user: user(),
            token: None,
        });
        assert!(matches!(result, Err(ApiError::Decode(_))));
        assert!(manager.current().is_none());
    }

    #[test]
    fn restored_session_gains_user_after_confirmation() {
        let mut manager = SessionManager::new(None);
        manager.restore("stored".into());
        assert_eq!(manager.current().map(Session::display_name), Some("<unverified>"));
        manager.confirm_user(user());
        assert_eq!(manager.current().map(Session::display_name), Some("Ada"));
    }
}
