//! Session lifecycle: login, register, logout, refresh, and the derived
//! authentication state.
//!
//! [`SessionManager`] is the sole writer of the credential store. Every
//! operation that mutates stored tokens (login, logout, refresh) serializes
//! on one internal lock, which is also what makes the executor-facing
//! [`SessionManager::refresh_if_stale`] single-flight: concurrent requests
//! that each hit a 401 queue on the lock, and all but the first discover on
//! re-reading the store that the work is already done.

use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use warble_auth::{AuthDb, TokenPair, User};

use crate::client::decode_json;
use crate::error::{CoreError, Result};
use crate::models::{Credentials, Registration};

/// Derived authentication state.
///
/// Never persisted; recomputed from the store by [`SessionManager::probe`]
/// and kept current by the session operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// The store has not been probed yet. Only legitimate before startup
    /// initialization completes.
    Unknown,
    /// A token pair is present. Necessary but not sufficient proof of
    /// validity; the first real request settles it.
    Authenticated,
    /// No usable credentials.
    Unauthenticated,
}

/// Owns the auth flows against the backend and the derived session state.
pub struct SessionManager {
    http: reqwest::Client,
    base_url: String,
    store: AuthDb,
    state: RwLock<SessionState>,
    /// Serializes every store mutation: login, logout, and refresh.
    auth_lock: Mutex<()>,
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

impl SessionManager {
    /// Create a session manager for the backend at `base_url`, backed by the
    /// given credential store.
    ///
    /// The URL is validated here so a misconfigured base URL fails at
    /// startup rather than on the first request.
    pub fn new(base_url: impl Into<String>, store: AuthDb) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        reqwest::Url::parse(&base_url).map_err(|e| CoreError::InvalidBaseUrl {
            url: base_url.clone(),
            details: e.to_string(),
        })?;

        Ok(Self {
            http: crate::warble_reqwest_client(),
            base_url,
            store,
            state: RwLock::new(SessionState::Unknown),
            auth_lock: Mutex::new(()),
        })
    }

    /// The credential store backing this session.
    pub fn store(&self) -> &AuthDb {
        &self.store
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub(crate) fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Cached derived state. Cheap; does not touch the store.
    pub fn current_state(&self) -> SessionState {
        *self.state.read()
    }

    fn set_state(&self, next: SessionState) {
        let mut state = self.state.write();
        if *state != next {
            debug!(from = ?*state, to = ?next, "session state transition");
            *state = next;
        }
    }

    /// One-time startup check: a stored token pair makes the session
    /// tentatively `Authenticated`, an empty store makes it
    /// `Unauthenticated`.
    pub async fn probe(&self) -> Result<SessionState> {
        let next = match self.store.get_token_pair().await? {
            Some(_) => SessionState::Authenticated,
            None => SessionState::Unauthenticated,
        };
        self.set_state(next);
        Ok(next)
    }

    /// Log in with username and password.
    ///
    /// On success the returned token pair is persisted atomically and the
    /// session becomes `Authenticated`. A rejection surfaces as
    /// [`CoreError::InvalidCredentials`] with the server's message and
    /// writes nothing. Afterwards the profile is fetched best-effort; its
    /// failure never fails the login.
    pub async fn login(&self, credentials: &Credentials) -> Result<TokenPair> {
        let _guard = self.auth_lock.lock().await;

        info!(username = %credentials.username, "logging in");
        let response = self
            .http
            .post(self.endpoint("/auth/login"))
            .json(credentials)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CoreError::InvalidCredentials {
                status: status.as_u16(),
                message,
            });
        }

        let pair: TokenPair = decode_json(response).await?;
        self.store.set_token_pair(&pair).await?;
        self.set_state(SessionState::Authenticated);
        info!("login succeeded");

        if let Err(e) = self.cache_profile(&pair.access_token).await {
            debug!("profile fetch after login failed: {e}");
        }

        Ok(pair)
    }

    /// Register a new account.
    ///
    /// Returns the created profile without mutating session state or the
    /// store; whether to follow up with [`login`](Self::login) is the
    /// caller's decision.
    pub async fn register(&self, registration: &Registration) -> Result<User> {
        info!(username = %registration.username, "registering account");
        let response = self
            .http
            .post(self.endpoint("/auth/register"))
            .json(registration)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CoreError::Api {
                status: status.as_u16(),
                body,
            });
        }

        decode_json(response).await
    }

    /// Log out: notify the backend best-effort, then wipe local credentials.
    ///
    /// Logout is a local guarantee. The backend call's outcome is logged and
    /// otherwise ignored; the store is cleared regardless, and clearing an
    /// already-empty store is fine.
    pub async fn logout(&self) -> Result<()> {
        let _guard = self.auth_lock.lock().await;

        if let Ok(Some(pair)) = self.store.get_token_pair().await {
            let outcome = self
                .http
                .post(self.endpoint("/auth/logout"))
                .bearer_auth(&pair.access_token)
                .send()
                .await;
            match outcome {
                Ok(response) => debug!(status = %response.status(), "notified backend of logout"),
                Err(e) => debug!("logout notification failed, clearing locally anyway: {e}"),
            }
        }

        self.store.clear_credentials().await?;
        self.set_state(SessionState::Unauthenticated);
        info!("logged out");
        Ok(())
    }

    /// Exchange the stored refresh token for a new pair.
    ///
    /// Fails fast with [`CoreError::NoRefreshToken`] when nothing is stored
    /// (no network call). Any failure of the exchange itself wipes the store
    /// and demotes the session; this is the single path that moves
    /// `Authenticated` to `Unauthenticated` asynchronously.
    pub async fn refresh(&self) -> Result<TokenPair> {
        let _guard = self.auth_lock.lock().await;
        self.refresh_locked().await
    }

    /// Single-flight refresh used by the request executor after a 401.
    ///
    /// `stale_access` is the access token the backend just rejected (`None`
    /// when the request went out unauthenticated). After acquiring the
    /// session lock the store is re-read: if the stored token already
    /// differs, another caller refreshed while this one waited, and the
    /// stored pair is returned without a network call.
    pub async fn refresh_if_stale(&self, stale_access: Option<&str>) -> Result<TokenPair> {
        let _guard = self.auth_lock.lock().await;

        if let Some(pair) = self.store.get_token_pair().await? {
            match stale_access {
                // The request carried no token; anything stored is fresher.
                None => return Ok(pair),
                Some(stale) if pair.access_token != stale => {
                    debug!("token already refreshed by another caller");
                    return Ok(pair);
                }
                _ => {}
            }
        }

        self.refresh_locked().await
    }

    /// Perform the network refresh. Caller must hold `auth_lock`.
    async fn refresh_locked(&self) -> Result<TokenPair> {
        let Some(current) = self.store.get_token_pair().await? else {
            self.set_state(SessionState::Unauthenticated);
            return Err(CoreError::NoRefreshToken);
        };

        debug!("refreshing token pair");
        let outcome = self
            .http
            .post(self.endpoint("/auth/refresh"))
            .json(&RefreshRequest {
                refresh_token: &current.refresh_token,
            })
            .send()
            .await;

        let response = match outcome {
            Ok(response) => response,
            Err(e) => {
                // An unreachable backend invalidates the session the same
                // way a rejection does.
                warn!("token refresh did not reach the backend: {e}");
                self.wipe_session().await?;
                return Err(CoreError::RefreshFailed {
                    status: None,
                    reason: format!("network error: {e}"),
                });
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, "backend rejected token refresh");
            self.wipe_session().await?;
            return Err(CoreError::RefreshFailed {
                status: Some(status.as_u16()),
                reason: body,
            });
        }

        let pair: TokenPair = match decode_json(response).await {
            Ok(pair) => pair,
            Err(e) => {
                self.wipe_session().await?;
                return Err(CoreError::RefreshFailed {
                    status: None,
                    reason: format!("undecodable refresh response: {e}"),
                });
            }
        };

        self.store.set_token_pair(&pair).await?;
        self.set_state(SessionState::Authenticated);
        debug!("token pair refreshed");
        Ok(pair)
    }

    async fn wipe_session(&self) -> Result<()> {
        self.store.clear_credentials().await?;
        self.set_state(SessionState::Unauthenticated);
        Ok(())
    }

    /// Fetch `/auth/me` and cache the profile. Callers treat failure as
    /// non-fatal; no fallback profile is fabricated.
    async fn cache_profile(&self, access_token: &str) -> Result<()> {
        let response = self
            .http
            .get(self.endpoint("/auth/me"))
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CoreError::Api {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let user: User = decode_json(response).await?;
        self.store.set_cached_profile(&user).await?;
        Ok(())
    }
}
