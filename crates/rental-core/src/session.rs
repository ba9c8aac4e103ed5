//! Session manager: the single owner of "who is logged in".
//!
//! State moves `Bootstrapping -> Authenticated | Anonymous` on startup, then
//! between `Anonymous` and `Authenticated` through login, signup and logout.
//! A failed token refresh anywhere in the client also drops the session to
//! `Anonymous`. Observers hold a [`watch::Receiver`] from [`AuthSession::subscribe`].

use std::fmt;
use std::sync::{Arc, Weak};

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, watch};

use crate::api::{ApiClient, ApiResult, AuthEvent};
use crate::auth::{TokenStore, token};
use crate::services;
use crate::types::{LoginRequest, SignupRequest, User};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Stored credentials are being validated.
    Bootstrapping,
    Anonymous,
    Authenticated(User),
}

impl SessionState {
    pub fn user(&self) -> Option<&User> {
        match self {
            SessionState::Authenticated(user) => Some(user),
            _ => None,
        }
    }
}

/// What the stored access token claims about itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessTokenInfo {
    pub masked: String,
    pub user_id: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub expired: bool,
}

impl AccessTokenInfo {
    pub fn inspect(access_token: &str) -> Self {
        let payload = token::decode(access_token);
        Self {
            masked: token::mask_token(access_token),
            user_id: payload.as_ref().and_then(|p| p.user_id.clone()),
            expires_at: payload
                .and_then(|p| p.expires_at_millis())
                .and_then(DateTime::from_timestamp_millis),
            expired: token::is_expired(access_token),
        }
    }
}

pub struct AuthSession {
    client: ApiClient,
    state: Arc<watch::Sender<SessionState>>,
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSession")
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

impl AuthSession {
    /// Creates a session in `Bootstrapping`.
    ///
    /// When called inside a tokio runtime, also starts listening for
    /// [`AuthEvent::SessionExpired`] from the client.
    pub fn new(client: ApiClient) -> Self {
        let (state, _) = watch::channel(SessionState::Bootstrapping);
        let state = Arc::new(state);

        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(watch_session_expiry(
                client.subscribe(),
                client.tokens().clone(),
                Arc::downgrade(&state),
            ));
        }

        Self { client, state }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn user(&self) -> Option<User> {
        self.state.borrow().user().cloned()
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(*self.state.borrow(), SessionState::Authenticated(_))
    }

    pub fn is_loading(&self) -> bool {
        matches!(*self.state.borrow(), SessionState::Bootstrapping)
    }

    /// Receives every state transition from now on.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Decoded claims of the stored access token, if any.
    pub fn access_token_info(&self) -> Option<AccessTokenInfo> {
        self.tokens()
            .access_token()
            .map(|t| AccessTokenInfo::inspect(&t))
    }

    /// Re-derives the session user from stored credentials.
    ///
    /// Migrates legacy storage keys first. Without a refresh token the session
    /// is `Anonymous` straight away. Any failure to load the profile clears
    /// the stored credentials and ends in `Anonymous`.
    pub async fn bootstrap(&self) -> SessionState {
        self.transition(SessionState::Bootstrapping);
        // A token carried over from the legacy key gets one profile check
        // even though it cannot be refreshed.
        let migrated = self.tokens().migrate_legacy();

        if !migrated && !self.tokens().has_credentials() {
            self.tokens().clear();
            self.transition(SessionState::Anonymous);
            return self.state();
        }

        match services::auth::me(&self.client).await {
            Ok(user) => self.transition(SessionState::Authenticated(user)),
            Err(err) => {
                tracing::info!(error = %err, "stored credentials rejected");
                self.tokens().clear();
                self.transition(SessionState::Anonymous);
            }
        }
        self.state()
    }

    /// # Errors
    /// Returns the server's message for bad credentials; the session stays
    /// `Anonymous`.
    pub async fn login(&self, email: &str, password: &str) -> ApiResult<User> {
        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let auth = services::auth::login(&self.client, &request).await?;
        self.transition(SessionState::Authenticated(auth.user.clone()));
        Ok(auth.user)
    }

    /// # Errors
    /// Returns the server's validation message; the session stays
    /// `Anonymous`.
    pub async fn signup(&self, request: &SignupRequest) -> ApiResult<User> {
        let auth = services::auth::signup(&self.client, request).await?;
        self.transition(SessionState::Authenticated(auth.user.clone()));
        Ok(auth.user)
    }

    /// Revokes the refresh token server-side when possible, then always
    /// clears local credentials.
    pub async fn logout(&self) {
        if let Some(refresh_token) = self.tokens().refresh_token()
            && let Err(err) = services::auth::logout(&self.client, &refresh_token).await
        {
            tracing::warn!(error = %err, "server logout failed, clearing local session anyway");
        }
        self.tokens().clear();
        self.transition(SessionState::Anonymous);
    }

    fn tokens(&self) -> &TokenStore {
        self.client.tokens()
    }

    fn transition(&self, next: SessionState) {
        log_transition(&next);
        self.state.send_replace(next);
    }
}

fn log_transition(next: &SessionState) {
    match next {
        SessionState::Bootstrapping => tracing::debug!("session bootstrapping"),
        SessionState::Anonymous => tracing::info!("session anonymous"),
        SessionState::Authenticated(user) => {
            tracing::info!(user_id = %user.id, "session authenticated");
        }
    }
}

/// Drops the session to `Anonymous` whenever the client gives up on a
/// refresh. Ends when the session is dropped or the client is gone.
async fn watch_session_expiry(
    mut events: broadcast::Receiver<AuthEvent>,
    tokens: TokenStore,
    state: Weak<watch::Sender<SessionState>>,
) {
    loop {
        match events.recv().await {
            Ok(AuthEvent::SessionExpired) | Err(broadcast::error::RecvError::Lagged(_)) => {
                let Some(state) = state.upgrade() else {
                    return;
                };
                // A login may have finished after the failed refresh.
                if !tokens.has_credentials() {
                    log_transition(&SessionState::Anonymous);
                    state.send_replace(SessionState::Anonymous);
                }
            }
            Err(broadcast::error::RecvError::Closed) => return,
        }
    }
}
