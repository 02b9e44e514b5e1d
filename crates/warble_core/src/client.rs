//! Authenticated request execution.
//!
//! [`ApiClient`] is the single place that understands the backend's
//! authorization contract: attach the current access token as a bearer
//! header, and on a 401 run the session manager's single-flight refresh and
//! reissue the request exactly once with the fresh token. Resource clients
//! are built on top of it and never look at 401s themselves.
//!
//! Retries are scoped strictly to that one 401-refresh-retry transition.
//! Transport failures, other HTTP errors, and undecodable bodies all pass
//! straight through to the caller.

use std::sync::Arc;

use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::{CoreError, Result};
use crate::session::SessionManager;

/// A file payload for multipart endpoints.
///
/// The bytes are retained so the form can be rebuilt if the request is
/// retried after a token refresh; a reqwest multipart form is consumed on
/// send.
#[derive(Debug, Clone)]
pub struct FilePart {
    pub field: String,
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl FilePart {
    pub fn new(
        field: impl Into<String>,
        file_name: impl Into<String>,
        mime: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            field: field.into(),
            file_name: file_name.into(),
            mime: mime.into(),
            bytes,
        }
    }

    fn to_form(&self) -> Result<reqwest::multipart::Form> {
        let part = reqwest::multipart::Part::bytes(self.bytes.clone())
            .file_name(self.file_name.clone())
            .mime_str(&self.mime)?;
        Ok(reqwest::multipart::Form::new().part(self.field.clone(), part))
    }
}

/// Request payload, held in a rebuildable form across the retry boundary.
enum RequestBody {
    Empty,
    Json(serde_json::Value),
    Multipart(FilePart),
}

/// HTTP client for the backend's authenticated endpoints.
///
/// Cheap to clone; clones share the underlying connection pool and session.
#[derive(Clone)]
pub struct ApiClient {
    session: Arc<SessionManager>,
}

impl ApiClient {
    pub fn new(session: Arc<SessionManager>) -> Self {
        Self { session }
    }

    /// The session manager this client authenticates through.
    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.execute(Method::GET, path, RequestBody::Empty).await
    }

    pub async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        self.execute(Method::POST, path, Self::json_body(body)?)
            .await
    }

    pub async fn put<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        self.execute(Method::PUT, path, Self::json_body(body)?)
            .await
    }

    /// PUT with no body, for action endpoints like task toggling.
    pub async fn put_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.execute(Method::PUT, path, RequestBody::Empty).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.execute(Method::DELETE, path, RequestBody::Empty).await
    }

    /// POST a file as `multipart/form-data`.
    ///
    /// Goes through the same attach/401-retry path as the JSON helpers.
    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        file: FilePart,
    ) -> Result<T> {
        self.execute(Method::POST, path, RequestBody::Multipart(file))
            .await
    }

    fn json_body<B: Serialize>(body: &B) -> Result<RequestBody> {
        let value = serde_json::to_value(body)
            .map_err(|e| CoreError::serialization(std::any::type_name::<B>(), e))?;
        Ok(RequestBody::Json(value))
    }

    /// The 401-refresh-retry dance. `path` must start with `/`.
    async fn execute<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: RequestBody,
    ) -> Result<T> {
        let url = format!("{}{}", self.session.base_url(), path);

        let (token_used, response) = self.attempt(&method, &url, &body).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return process(response).await;
        }

        debug!(%url, "request unauthorized, refreshing session");
        if let Err(e) = self.session.refresh_if_stale(token_used.as_deref()).await {
            warn!("session refresh after 401 failed: {e}");
            return Err(CoreError::session_expired(e));
        }

        // Exactly one retry, re-reading the store for the fresh token.
        let (_, retried) = self.attempt(&method, &url, &body).await?;
        if retried.status() == StatusCode::UNAUTHORIZED {
            let status = retried.status().as_u16();
            let body_text = retried.text().await.unwrap_or_default();
            warn!(%url, "request still unauthorized after refresh");
            return Err(CoreError::session_expired(CoreError::Api {
                status,
                body: body_text,
            }));
        }

        process(retried).await
    }

    /// Issue one attempt, reading the latest stored access token.
    ///
    /// Returns the token that was attached (if any) alongside the response,
    /// so the 401 path can tell the session manager which token the backend
    /// rejected.
    async fn attempt(
        &self,
        method: &Method,
        url: &str,
        body: &RequestBody,
    ) -> Result<(Option<String>, reqwest::Response)> {
        let token = self
            .session
            .store()
            .get_token_pair()
            .await?
            .map(|pair| pair.access_token);

        let mut request = self.session.http().request(method.clone(), url);
        if let Some(token) = &token {
            request = request.bearer_auth(token);
        }
        request = match body {
            RequestBody::Empty => request,
            RequestBody::Json(value) => request.json(value),
            RequestBody::Multipart(file) => request.multipart(file.to_form()?),
        };

        let response = request.send().await?;
        Ok((token, response))
    }
}

/// Turn a non-401 response into the caller's type or a typed error.
async fn process<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
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

/// Decode a JSON response body by content type.
///
/// Non-JSON bodies and mistyped JSON both surface as [`CoreError::Decode`]
/// rather than being force-parsed.
pub(crate) async fn decode_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    if !content_type.contains("json") {
        return Err(CoreError::Decode {
            expected: std::any::type_name::<T>(),
            details: format!("unexpected content type '{content_type}'"),
        });
    }

    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| CoreError::Decode {
        expected: std::any::type_name::<T>(),
        details: e.to_string(),
    })
}
