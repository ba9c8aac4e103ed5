//! Authenticated HTTP client.
//!
//! Every outbound request goes through [`ApiClient::send`]. The client attaches
//! the stored access token, and on a 401 for a request that carried one it
//! runs one refresh exchange and retries once with the new token.
//!
//! Concurrent 401s share a single refresh: the first caller fills the
//! refresh slot with a shared future, later callers await the same future,
//! and whoever observes completion empties the slot. At most one refresh
//! exchange is in flight at any time.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, Result};
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;

use super::envelope;
use super::error::{ApiError, ApiResult};
use crate::auth::TokenStore;
use crate::config::Config;
use crate::types::RefreshResponse;

/// Standard User-Agent header for rental API requests.
pub const USER_AGENT: &str = concat!("rental/", env!("CARGO_PKG_VERSION"));

/// Path of the refresh exchange.
pub const REFRESH_PATH: &str = "/auth/refresh";

/// Session-wide notifications published by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    /// The refresh exchange failed and local credentials were cleared.
    SessionExpired,
}

/// One outbound call.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    #[must_use]
    pub fn query<K: Into<String>>(mut self, pairs: impl IntoIterator<Item = (K, String)>) -> Self {
        self.query
            .extend(pairs.into_iter().map(|(k, v)| (k.into(), v)));
        self
    }

    /// Attaches a JSON body.
    ///
    /// # Errors
    /// Returns a `Parse` error if `body` cannot be serialized.
    pub fn json(mut self, body: &impl Serialize) -> ApiResult<Self> {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::parse(format!("Failed to encode request body: {e}")))?;
        self.body = Some(value);
        Ok(self)
    }
}

type SharedRefresh = Shared<BoxFuture<'static, ApiResult<String>>>;

struct InFlight {
    generation: u64,
    refresh: SharedRefresh,
}

#[derive(Default)]
struct RefreshSlot {
    next_generation: u64,
    in_flight: Option<InFlight>,
}

struct Inner {
    http: reqwest::Client,
    base_url: String,
    tokens: TokenStore,
    refresh: Mutex<RefreshSlot>,
    events: broadcast::Sender<AuthEvent>,
}

/// Outcome of a single HTTP attempt that did not fail outright.
enum Attempt {
    Success(Value),
    Unauthorized(String),
}

/// Cheap-to-clone handle on the shared client state.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<Inner>,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Builds a client for `config.api_url` with the configured timeout.
    ///
    /// # Errors
    /// Returns an error if the base URL is invalid or the HTTP client cannot
    /// be constructed.
    pub fn new(config: &Config, tokens: TokenStore) -> Result<Self> {
        let base_url = config.api_url.trim().trim_end_matches('/').to_string();
        url::Url::parse(&base_url).with_context(|| format!("Invalid API base URL: {base_url}"))?;

        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().context("Failed to build HTTP client")?;

        let (events, _) = broadcast::channel(16);
        Ok(Self {
            inner: Arc::new(Inner {
                http,
                base_url,
                tokens,
                refresh: Mutex::new(RefreshSlot::default()),
                events,
            }),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.inner.tokens
    }

    /// Receives [`AuthEvent`]s published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.inner.events.subscribe()
    }

    /// # Errors
    /// See [`ApiClient::send`].
    pub async fn get(&self, path: &str) -> ApiResult<Value> {
        self.send(ApiRequest::new(Method::GET, path)).await
    }

    /// # Errors
    /// See [`ApiClient::send`].
    pub async fn post(&self, path: &str, body: &impl Serialize) -> ApiResult<Value> {
        self.send(ApiRequest::new(Method::POST, path).json(body)?)
            .await
    }

    /// # Errors
    /// See [`ApiClient::send`].
    pub async fn put(&self, path: &str, body: &impl Serialize) -> ApiResult<Value> {
        self.send(ApiRequest::new(Method::PUT, path).json(body)?)
            .await
    }

    /// # Errors
    /// See [`ApiClient::send`].
    pub async fn patch(&self, path: &str, body: &impl Serialize) -> ApiResult<Value> {
        self.send(ApiRequest::new(Method::PATCH, path).json(body)?)
            .await
    }

    /// # Errors
    /// See [`ApiClient::send`].
    pub async fn delete(&self, path: &str) -> ApiResult<Value> {
        self.send(ApiRequest::new(Method::DELETE, path)).await
    }

    /// Sends `request`, refreshing and retrying once on a 401.
    ///
    /// Returns the parsed JSON body (`Null` for an empty body).
    ///
    /// # Errors
    /// - `Transport`/`Timeout` when the server cannot be reached.
    /// - `SessionExpired` when a refresh was needed and failed.
    /// - `HttpStatus` for every other non-2xx answer, including a 401 on a
    ///   request sent without a token or on the retry.
    pub async fn send(&self, request: ApiRequest) -> ApiResult<Value> {
        let sent_with = self.inner.tokens.access_token();

        let body = match self.attempt(&request, sent_with.as_deref()).await? {
            Attempt::Success(value) => return Ok(value),
            Attempt::Unauthorized(body) => body,
        };

        let Some(stale) = sent_with else {
            return Err(ApiError::http_status(401, &body));
        };

        tracing::debug!(path = %request.path, "access token rejected, refreshing");
        let fresh = self.fresh_access_token(&stale).await?;

        match self.attempt(&request, Some(&fresh)).await? {
            Attempt::Success(value) => Ok(value),
            Attempt::Unauthorized(body) => {
                tracing::warn!(path = %request.path, "request rejected after token refresh");
                Err(ApiError::http_status(401, &body))
            }
        }
    }

    async fn attempt(&self, request: &ApiRequest, token: Option<&str>) -> ApiResult<Attempt> {
        let url = format!("{}{}", self.inner.base_url, request.path);
        let mut builder = self.inner.http.request(request.method.clone(), &url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }

        tracing::debug!(
            method = %request.method,
            path = %request.path,
            authenticated = token.is_some(),
            "sending request"
        );

        let response = builder.send().await.map_err(|e| ApiError::from_reqwest(&e))?;
        let status = response.status();
        let text = response.text().await.map_err(|e| ApiError::from_reqwest(&e))?;

        if status == StatusCode::UNAUTHORIZED {
            return Ok(Attempt::Unauthorized(text));
        }
        if !status.is_success() {
            tracing::debug!(status = status.as_u16(), path = %request.path, "request failed");
            return Err(ApiError::http_status(status.as_u16(), &text));
        }

        Ok(Attempt::Success(parse_body(&text)))
    }

    /// Returns an access token newer than `stale`, joining or starting the
    /// single in-flight refresh.
    async fn fresh_access_token(&self, stale: &str) -> ApiResult<String> {
        let (generation, refresh) = {
            let mut slot = self.inner.refresh.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(in_flight) = &slot.in_flight {
                (in_flight.generation, in_flight.refresh.clone())
            } else {
                // A refresh that finished after our request was sent already
                // replaced the token.
                if let Some(current) = self.inner.tokens.access_token()
                    && current != stale
                {
                    return Ok(current);
                }
                if self.inner.tokens.refresh_token().is_none() {
                    drop(slot);
                    self.inner.expire_session();
                    return Err(ApiError::session_expired());
                }

                let generation = slot.next_generation;
                slot.next_generation += 1;
                let refresh = Inner::refresh_exchange(Arc::clone(&self.inner))
                    .boxed()
                    .shared();
                slot.in_flight = Some(InFlight {
                    generation,
                    refresh: refresh.clone(),
                });
                (generation, refresh)
            }
        };

        let result = refresh.await;

        let mut slot = self.inner.refresh.lock().unwrap_or_else(PoisonError::into_inner);
        if slot
            .in_flight
            .as_ref()
            .is_some_and(|f| f.generation == generation)
        {
            slot.in_flight = None;
        }
        result
    }
}

impl Inner {
    async fn refresh_exchange(self: Arc<Self>) -> ApiResult<String> {
        let Some(refresh_token) = self.tokens.refresh_token() else {
            self.expire_session();
            return Err(ApiError::session_expired());
        };

        tracing::debug!("exchanging refresh token");
        let url = format!("{}{REFRESH_PATH}", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&serde_json::json!({ "refreshToken": refresh_token }))
            .send()
            .await
            .map_err(|e| ApiError::from_reqwest(&e))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| ApiError::from_reqwest(&e))?;
        if !status.is_success() {
            tracing::info!(status = status.as_u16(), "refresh rejected, ending session");
            self.expire_session();
            return Err(ApiError::session_expired());
        }

        let refreshed: RefreshResponse = match envelope::decode(parse_body(&text)) {
            Ok(refreshed) => refreshed,
            Err(err) => {
                tracing::warn!(error = %err, "unusable refresh response, ending session");
                self.expire_session();
                return Err(ApiError::session_expired());
            }
        };

        match refreshed.refresh_token.as_deref().filter(|t| !t.is_empty()) {
            Some(rotated) => self.tokens.set(&refreshed.access_token, rotated),
            None => self.tokens.set_access_token(&refreshed.access_token),
        }
        tracing::debug!("access token refreshed");
        Ok(refreshed.access_token)
    }

    fn expire_session(&self) {
        self.tokens.clear();
        // No subscribers is fine.
        let _ = self.events.send(AuthEvent::SessionExpired);
    }
}

/// Empty bodies parse as `Null`; non-JSON text is kept as a string.
fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}
