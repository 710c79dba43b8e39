use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;

use crate::domain::auth::{RefreshEndpoint, RefreshError, RefreshTokenRequest, RefreshTokenResponse};

const REFRESH_PATH: &str = "/auth/refresh";

/// `POST /auth/refresh` on the backend.
///
/// Uses its own client with a short timeout: every queued request waits on
/// this call. It is never retried.
pub struct HttpRefreshEndpoint {
    http_client: reqwest::Client,
    refresh_url: String,
}

impl HttpRefreshEndpoint {
    pub fn new(api_base_url: &str, timeout: Duration) -> Result<Self, RefreshError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RefreshError::Transport(format!("Failed to build refresh client: {}", e)))?;

        Ok(Self {
            http_client,
            refresh_url: format!("{}{}", api_base_url.trim_end_matches('/'), REFRESH_PATH),
        })
    }
}

#[async_trait]
impl RefreshEndpoint for HttpRefreshEndpoint {
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshTokenResponse, RefreshError> {
        let response = self
            .http_client
            .post(&self.refresh_url)
            .header("Accept", "application/json")
            .json(&RefreshTokenRequest {
                refresh_token: refresh_token.to_string(),
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "Refresh endpoint rejected the session");
            return Err(RefreshError::Rejected {
                status: status.as_u16(),
            });
        }

        response
            .json::<RefreshTokenResponse>()
            .await
            .map_err(|e| RefreshError::MalformedResponse(e.to_string()))
    }
}

/// Collapses concurrent refreshes of the same refresh credential into one call.
///
/// The gateway builds a token manager per request, so the per-manager single
/// flight does not span requests; this layer does. Successful results are kept
/// for `ttl` so requests racing on the old credential receive the same renewed
/// pair. Failures are not cached.
pub struct CoalescingRefreshEndpoint {
    inner: Arc<dyn RefreshEndpoint>,
    results: Cache<String, RefreshTokenResponse>,
}

impl CoalescingRefreshEndpoint {
    pub fn new(inner: Arc<dyn RefreshEndpoint>, ttl: Duration) -> Self {
        Self {
            inner,
            results: Cache::builder()
                .max_capacity(10_000)
                .time_to_live(ttl)
                .build(),
        }
    }
}

#[async_trait]
impl RefreshEndpoint for CoalescingRefreshEndpoint {
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshTokenResponse, RefreshError> {
        let inner = self.inner.clone();
        let token = refresh_token.to_string();

        self.results
            .try_get_with(refresh_token.to_string(), async move {
                inner.refresh(&token).await
            })
            .await
            .map_err(|e: Arc<RefreshError>| (*e).clone())
    }
}
