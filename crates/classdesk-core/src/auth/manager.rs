//! The session manager: single source of truth for who is logged in.
//!
//! State is either Authenticated (a `Session` is held) or Anonymous. Every
//! transition is written through to the `SessionStore` and then published
//! synchronously to all observers, in the order the transitions happened.

use std::sync::Arc;

use parking_lot::{Mutex, ReentrantMutex};
use tracing::{debug, info, warn};

use crate::api::{AuthClient, AuthError, LoginRequest};
use crate::storage::SessionStore;

use super::claims::TokenClaims;
use super::observers::{Observer, ObserverList, Subscription};
use super::session::Session;

/// Key the persisted session is stored under.
pub const SESSION_STORAGE_KEY: &str = "currentUser";

pub struct SessionManager {
    client: AuthClient,
    store: Arc<dyn SessionStore>,
    current: Mutex<Option<Session>>,
    observers: ObserverList,
    /// Serializes mutation + fan-out. Re-entrant so an observer can call
    /// back into the manager from inside a notification.
    publish_gate: ReentrantMutex<()>,
}

impl SessionManager {
    /// Create a manager and restore any session persisted in `store`.
    pub fn new(client: AuthClient, store: Arc<dyn SessionStore>) -> Self {
        let manager = Self {
            client,
            store,
            current: Mutex::new(None),
            observers: ObserverList::default(),
            publish_gate: ReentrantMutex::new(()),
        };
        manager.restore_on_startup();
        manager
    }

    /// Load the persisted session, if any. Only run from `new`, before any
    /// observer exists.
    ///
    /// Expiry is not checked here; `is_authenticated` does that lazily. A
    /// record that does not deserialize is deleted.
    fn restore_on_startup(&self) {
        let _gate = self.publish_gate.lock();

        let restored = match self.store.get(SESSION_STORAGE_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<Session>(&raw) {
                Ok(session) => {
                    debug!(user = %session.display_name, role = %session.primary_role, "Restored persisted session");
                    Some(session)
                }
                Err(e) => {
                    warn!(error = %e, "Discarding corrupt persisted session");
                    self.delete_record();
                    None
                }
            },
            Ok(None) => {
                debug!("No persisted session found");
                None
            }
            Err(e) => {
                warn!(error = %e, "Failed to read persisted session");
                None
            }
        };

        self.publish(restored);
    }

    /// Exchange credentials for a session.
    ///
    /// Returns `Ok(true)` once a token was issued and the session published,
    /// `Ok(false)` if the server answered without a token (state untouched),
    /// or the classified error if the request failed (state untouched).
    /// A token whose payload cannot be decoded still logs in, with no roles.
    pub async fn login(&self, username: &str, password: &str) -> Result<bool, AuthError> {
        let request = LoginRequest {
            name: username.to_string(),
            password: password.to_string(),
        };

        let response = match self.client.login(&request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(user = %username, error = %e, "Login failed");
                return Err(e);
            }
        };

        let Some(token) = response.token() else {
            info!(user = %username, "Login response carried no token");
            return Ok(false);
        };

        let claims = TokenClaims::decode_lenient(token);
        let session = Session::from_claims(username, token.to_string(), &claims);

        let _gate = self.publish_gate.lock();
        self.persist(&session);
        info!(user = %username, role = %session.primary_role, "Login successful");
        self.publish(Some(session));
        Ok(true)
    }

    /// Clear the session and its persisted record. Safe to call repeatedly.
    pub fn logout(&self) {
        let _gate = self.publish_gate.lock();
        self.delete_record();
        if let Some(previous) = self.current.lock().as_ref() {
            info!(user = %previous.display_name, "Logged out");
        }
        self.publish(None);
    }

    pub fn current_session(&self) -> Option<Session> {
        self.current.lock().clone()
    }

    /// True if a session is held and its token has not expired.
    ///
    /// An expired or unreadable token logs the user out as a side effect.
    pub fn is_authenticated(&self) -> bool {
        let _gate = self.publish_gate.lock();

        let Some(token) = self.token() else {
            return false;
        };

        match TokenClaims::decode(&token) {
            Ok(claims) if !claims.is_expired() => true,
            Ok(claims) => {
                info!(exp = ?claims.exp, "Session token expired, logging out");
                self.logout();
                false
            }
            Err(e) => {
                warn!(error = %e, "Session token unreadable, logging out");
                self.logout();
                false
            }
        }
    }

    /// Bearer token of the current session.
    pub fn token(&self) -> Option<String> {
        self.current.lock().as_ref().map(|s| s.token.clone())
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.current
            .lock()
            .as_ref()
            .map(|s| s.has_role(role))
            .unwrap_or(false)
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.current
            .lock()
            .as_ref()
            .map(|s| s.has_permission(permission))
            .unwrap_or(false)
    }

    /// Register an observer. It is called once right away with the current
    /// state, then after every login, logout and forced logout.
    pub fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(Option<&Session>) + Send + Sync + 'static,
    {
        let _gate = self.publish_gate.lock();
        let observer: Observer = Arc::new(observer);
        let current = self.current_session();
        observer(current.as_ref());
        self.observers.add(observer)
    }

    pub fn subscriber_count(&self) -> usize {
        self.observers.len()
    }

    // Callers hold `publish_gate` for the three helpers below.

    fn publish(&self, next: Option<Session>) {
        *self.current.lock() = next.clone();
        self.observers.notify(next.as_ref());
    }

    fn persist(&self, session: &Session) {
        let result = serde_json::to_string(session)
            .map_err(anyhow::Error::from)
            .and_then(|json| self.store.set(SESSION_STORAGE_KEY, &json));
        if let Err(e) = result {
            warn!(error = %e, "Failed to persist session");
        }
    }

    fn delete_record(&self) {
        if let Err(e) = self.store.delete(SESSION_STORAGE_KEY) {
            warn!(error = %e, "Failed to delete persisted session");
        }
    }
}
