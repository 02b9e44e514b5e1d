//! Token pair and profile storage.
//!
//! This module provides the credential operations layered on [`AuthDb`]:
//! storing the access/refresh token pair issued by the backend and the
//! cached user profile.
//!
//! Everything lives in a single `credentials` key-value table with fixed
//! logical keys. The token pair is written inside one transaction, so a
//! reader can never observe an access token from one issuance next to a
//! refresh token from another.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::db::AuthDb;
use crate::error::AuthResult;

/// Key for the stored access token.
const KEY_ACCESS_TOKEN: &str = "access_token";
/// Key for the stored refresh token.
const KEY_REFRESH_TOKEN: &str = "refresh_token";
/// Key for the cached user profile (JSON).
const KEY_PROFILE: &str = "profile";

const UPSERT_CREDENTIAL: &str = r#"
    INSERT INTO credentials (key, value, updated_at)
    VALUES (?, ?, ?)
    ON CONFLICT (key) DO UPDATE SET
        value = excluded.value,
        updated_at = excluded.updated_at
"#;

/// An access/refresh token pair from a single issuance.
///
/// This is both the wire shape returned by the backend's token endpoints
/// and the unit of persistence: the pair is stored and replaced wholesale,
/// never one half at a time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    /// Short-lived token attached to authenticated requests.
    pub access_token: String,
    /// Long-lived token used to obtain a new pair.
    pub refresh_token: String,
    /// Token scheme, always "bearer" in practice.
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl TokenPair {
    /// Create a bearer token pair.
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            token_type: default_token_type(),
        }
    }
}

/// The authenticated user's profile as reported by the backend.
///
/// Cached locally for display purposes only; authorization always comes
/// from the token pair, never from this record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Backend identifier for the user.
    pub id: String,
    pub username: String,
    pub email: String,
    pub is_active: bool,
}

impl AuthDb {
    /// Store a token pair, replacing any previously stored pair.
    ///
    /// Both tokens are written in a single transaction.
    pub async fn set_token_pair(&self, pair: &TokenPair) -> AuthResult<()> {
        let now = chrono::Utc::now().timestamp();

        let mut tx = self.pool().begin().await?;
        for (key, value) in [
            (KEY_ACCESS_TOKEN, pair.access_token.as_str()),
            (KEY_REFRESH_TOKEN, pair.refresh_token.as_str()),
        ] {
            sqlx::query(UPSERT_CREDENTIAL)
                .bind(key)
                .bind(value)
                .bind(now)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        Ok(())
    }

    /// Load the stored token pair.
    ///
    /// Returns `None` when no pair is stored. If only one half of a pair is
    /// found the store is corrupt; the remnant is deleted and `None` is
    /// returned so the caller sees a clean logged-out state.
    pub async fn get_token_pair(&self) -> AuthResult<Option<TokenPair>> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT key, value FROM credentials WHERE key IN (?, ?)")
                .bind(KEY_ACCESS_TOKEN)
                .bind(KEY_REFRESH_TOKEN)
                .fetch_all(self.pool())
                .await?;

        let mut access = None;
        let mut refresh = None;
        for (key, value) in rows {
            match key.as_str() {
                KEY_ACCESS_TOKEN => access = Some(value),
                KEY_REFRESH_TOKEN => refresh = Some(value),
                _ => {}
            }
        }

        match (access, refresh) {
            (Some(access_token), Some(refresh_token)) => {
                Ok(Some(TokenPair::new(access_token, refresh_token)))
            }
            (None, None) => Ok(None),
            (access, refresh) => {
                warn!(
                    has_access = access.is_some(),
                    has_refresh = refresh.is_some(),
                    "found half a token pair in auth.db, clearing it"
                );
                self.clear_token_pair().await?;
                Ok(None)
            }
        }
    }

    /// Delete the stored token pair, leaving the cached profile alone.
    async fn clear_token_pair(&self) -> AuthResult<()> {
        sqlx::query("DELETE FROM credentials WHERE key IN (?, ?)")
            .bind(KEY_ACCESS_TOKEN)
            .bind(KEY_REFRESH_TOKEN)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    /// Wipe all stored credentials: the token pair and the cached profile.
    ///
    /// Safe to call when nothing is stored.
    pub async fn clear_credentials(&self) -> AuthResult<()> {
        sqlx::query("DELETE FROM credentials")
            .execute(self.pool())
            .await?;
        Ok(())
    }

    /// Cache the user's profile, replacing any previously cached one.
    pub async fn set_cached_profile(&self, user: &User) -> AuthResult<()> {
        let json = serde_json::to_string(user)?;
        let now = chrono::Utc::now().timestamp();

        sqlx::query(UPSERT_CREDENTIAL)
            .bind(KEY_PROFILE)
            .bind(json)
            .bind(now)
            .execute(self.pool())
            .await?;

        Ok(())
    }

    /// Load the cached user profile.
    ///
    /// Returns `None` when no profile is cached. A profile that fails to
    /// parse is discarded rather than surfaced as an error.
    pub async fn get_cached_profile(&self) -> AuthResult<Option<User>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT value FROM credentials WHERE key = ?")
                .bind(KEY_PROFILE)
                .fetch_optional(self.pool())
                .await?;

        let Some((json,)) = row else {
            return Ok(None);
        };

        match serde_json::from_str(&json) {
            Ok(user) => Ok(Some(user)),
            Err(e) => {
                warn!("cached profile in auth.db failed to parse, discarding: {e}");
                sqlx::query("DELETE FROM credentials WHERE key = ?")
                    .bind(KEY_PROFILE)
                    .execute(self.pool())
                    .await?;
                Ok(None)
            }
        }
    }
}
