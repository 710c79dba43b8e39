use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::error::ClientError;
use crate::domain::auth::TokenManager;
use crate::infrastructure::config::Config;

/// Where requests are sent from, which decides the base endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionContext {
    /// Backend process: talks to the API origin directly.
    Trusted { api_base_url: String },
    /// Untrusted caller: goes through the same-origin forwarding path, which
    /// attaches the HTTP-only credential on its side.
    Forwarded { origin: String, proxy_prefix: String },
}

impl ExecutionContext {
    pub fn base_endpoint(&self) -> String {
        match self {
            ExecutionContext::Trusted { api_base_url } => {
                api_base_url.trim_end_matches('/').to_string()
            }
            ExecutionContext::Forwarded {
                origin,
                proxy_prefix,
            } => format!(
                "{}/{}",
                origin.trim_end_matches('/'),
                proxy_prefix.trim_matches('/')
            ),
        }
    }

    fn sends_cookies(&self) -> bool {
        matches!(self, ExecutionContext::Forwarded { .. })
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub context: ExecutionContext,
    pub request_timeout: Duration,
}

impl ClientConfig {
    pub fn trusted(config: &Config) -> Self {
        Self {
            context: ExecutionContext::Trusted {
                api_base_url: config.api_base_url.clone(),
            },
            request_timeout: config.request_timeout(),
        }
    }

    pub fn forwarded(origin: impl Into<String>, config: &Config) -> Self {
        Self {
            context: ExecutionContext::Forwarded {
                origin: origin.into(),
                proxy_prefix: config.proxy_prefix.clone(),
            },
            request_timeout: config.request_timeout(),
        }
    }
}

/// Build the underlying HTTP client: bounded wait, JSON by default, and a
/// cookie jar when calls go through the forwarding path.
pub fn build_http_client(
    context: &ExecutionContext,
    request_timeout: Duration,
) -> Result<reqwest::Client, ClientError> {
    let mut default_headers = HeaderMap::new();
    default_headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    default_headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));

    reqwest::Client::builder()
        .timeout(request_timeout)
        .default_headers(default_headers)
        .cookie_store(context.sends_cookies())
        .build()
        .map_err(|e| ClientError::InvalidRequest(format!("Failed to build HTTP client: {}", e)))
}

/// Outbound call, kept whole so it can be replayed after a refresh
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Option<String>,
    headers: HeaderMap,
    body: Option<Bytes>,
    retried: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: None,
            headers: HeaderMap::new(),
            body: None,
            retried: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Raw query string, without the leading `?`
    pub fn query(mut self, query: impl Into<String>) -> Self {
        let query = query.into();
        self.query = (!query.is_empty()).then_some(query);
        self
    }

    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn json<T: Serialize>(self, body: &T) -> Result<Self, ClientError> {
        let bytes = serde_json::to_vec(body)
            .map_err(|e| ClientError::InvalidRequest(format!("Failed to encode body: {}", e)))?;
        Ok(self
            .header(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .body(bytes))
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Whether this request already went through one refresh and replay
    pub fn is_retried(&self) -> bool {
        self.retried
    }

    fn mark_retried(mut self) -> Self {
        self.retried = true;
        self
    }

    fn url(&self, base_endpoint: &str) -> String {
        let mut url = format!("{}/{}", base_endpoint, self.path.trim_start_matches('/'));
        if let Some(query) = &self.query {
            url.push('?');
            url.push_str(query);
        }
        url
    }
}

/// Response as received, before any status handling
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ClientError> {
        serde_json::from_slice(&self.body).map_err(|e| ClientError::Decode(e.to_string()))
    }

    /// Turn a non-2xx response into the matching error
    pub fn error_for_status(self) -> Result<Self, ClientError> {
        match self.status {
            status if status.is_success() => Ok(self),
            StatusCode::UNAUTHORIZED => Err(ClientError::Unauthorized { body: self.body }),
            status => Err(ClientError::Status {
                status,
                body: self.body,
            }),
        }
    }
}

/// HTTP client for the academy API that attaches the stored credential and
/// transparently renews it once when a request comes back 401.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_endpoint: String,
    tokens: Arc<TokenManager>,
}

impl ApiClient {
    pub fn new(config: ClientConfig, tokens: Arc<TokenManager>) -> Result<Self, ClientError> {
        let http = build_http_client(&config.context, config.request_timeout)?;
        Ok(Self::from_parts(http, &config.context, tokens))
    }

    /// Reuse an existing HTTP client (and its connection pool)
    pub fn from_parts(
        http: reqwest::Client,
        context: &ExecutionContext,
        tokens: Arc<TokenManager>,
    ) -> Self {
        Self {
            http,
            base_endpoint: context.base_endpoint(),
            tokens,
        }
    }

    pub fn base_endpoint(&self) -> &str {
        &self.base_endpoint
    }

    pub fn tokens(&self) -> &Arc<TokenManager> {
        &self.tokens
    }

    /// Send a request and return the response whatever its status.
    ///
    /// A first 401 triggers one shared refresh and a single replay with the
    /// renewed credential. If the session cannot be renewed the original 401
    /// is returned.
    pub async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, ClientError> {
        let access_token = self.tokens.access_token().await;
        let response = self.dispatch(&request, access_token.as_deref()).await?;

        if response.status != StatusCode::UNAUTHORIZED || request.is_retried() {
            return Ok(response);
        }

        let request = request.mark_retried();
        tracing::debug!(
            method = %request.method,
            path = %request.path,
            "Request unauthorized, renewing session"
        );

        match self.tokens.refresh_after_unauthorized().await {
            Ok(access_token) => self.dispatch(&request, Some(&access_token)).await,
            Err(e) => {
                tracing::warn!(
                    method = %request.method,
                    path = %request.path,
                    error = %e,
                    "Session could not be renewed"
                );
                Ok(response)
            }
        }
    }

    /// Like [`execute`](Self::execute) but non-2xx responses become errors
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ClientError> {
        self.execute(request).await?.error_for_status()
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.send(ApiRequest::get(path)).await?.json()
    }

    pub async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        self.send(ApiRequest::post(path).json(body)?).await?.json()
    }

    pub async fn put_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        self.send(ApiRequest::put(path).json(body)?).await?.json()
    }

    pub async fn patch_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        self.send(ApiRequest::patch(path).json(body)?).await?.json()
    }

    pub async fn delete(&self, path: &str) -> Result<(), ClientError> {
        self.send(ApiRequest::delete(path)).await.map(|_| ())
    }

    async fn dispatch(
        &self,
        request: &ApiRequest,
        access_token: Option<&str>,
    ) -> Result<ApiResponse, ClientError> {
        let mut headers = request.headers.clone();
        if let Some(token) = access_token {
            match HeaderValue::from_str(&format!("Bearer {}", token)) {
                Ok(value) => {
                    headers.insert(header::AUTHORIZATION, value);
                }
                Err(_) => {
                    tracing::warn!("Stored access token is not a valid header value, sending without it");
                }
            }
        }

        let mut builder = self
            .http
            .request(request.method.clone(), request.url(&self.base_endpoint))
            .headers(headers);
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        tracing::debug!(
            method = %request.method,
            path = %request.path,
            status = status.as_u16(),
            replay = request.retried,
            "API response"
        );

        Ok(ApiResponse {
            status,
            headers,
            body,
        })
    }
}
