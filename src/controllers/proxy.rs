use axum::{
    body::{Body, Bytes},
    extract::{OriginalUri, State},
    http::{HeaderMap, Method},
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::{
    domain::auth::{RefreshEndpoint, TokenManager},
    error::AppError,
    infrastructure::{
        http::{
            headers::{forwardable_request_headers, forwardable_response_headers},
            ApiClient, ApiRequest, ApiResponse, ExecutionContext,
        },
        store::{CookieCredentialStore, CookieSettings},
    },
};

/// Same-origin forwarding path to the backend API.
///
/// The browser never sees its credential: it lives in HTTP-only cookies and is
/// attached here as a bearer header. Expired access tokens are renewed on this
/// side and the new pair goes back as cookies.
pub struct ProxyController {
    http_client: reqwest::Client,
    context: ExecutionContext,
    proxy_prefix: String,
    refresh_endpoint: Arc<dyn RefreshEndpoint>,
    cookie_settings: CookieSettings,
}

impl ProxyController {
    pub fn new(
        http_client: reqwest::Client,
        api_base_url: String,
        proxy_prefix: &str,
        refresh_endpoint: Arc<dyn RefreshEndpoint>,
        cookie_settings: CookieSettings,
    ) -> Self {
        Self {
            http_client,
            context: ExecutionContext::Trusted { api_base_url },
            proxy_prefix: proxy_prefix.trim_end_matches('/').to_string(),
            refresh_endpoint,
            cookie_settings,
        }
    }

    /// ANY {proxy_prefix}/*path - Forward to the backend with the cookie credential
    pub async fn forward(
        State(controller): State<Arc<ProxyController>>,
        method: Method,
        OriginalUri(uri): OriginalUri,
        headers: HeaderMap,
        body: Bytes,
    ) -> Response {
        // Still percent-encoded: decoding would let `%3F` or `%2F` reshape the URL
        let path = match upstream_path(uri.path(), &controller.proxy_prefix) {
            Ok(path) => path.to_string(),
            Err(e) => return e.into_response(),
        };

        let store = Arc::new(CookieCredentialStore::from_headers(
            &headers,
            controller.cookie_settings,
        ));
        let tokens = Arc::new(TokenManager::new(
            store.clone(),
            controller.refresh_endpoint.clone(),
        ));
        let client = ApiClient::from_parts(controller.http_client.clone(), &controller.context, tokens);

        let mut request =
            ApiRequest::new(method, path).headers(forwardable_request_headers(&headers));
        if let Some(query) = uri.query() {
            request = request.query(query);
        }
        if !body.is_empty() {
            request = request.body(body);
        }

        tracing::debug!(
            method = %request.method(),
            path = %request.path(),
            "Forwarding request"
        );

        let mut response = match client.execute(request).await {
            Ok(upstream) => relay(upstream),
            Err(e) => AppError::from(e).into_response(),
        };

        // Renewed or cleared credentials travel back even if the replay failed.
        store.write_set_cookie_headers(response.headers_mut());
        response
    }

    /// Whether the backend answers at all (any status counts)
    pub async fn upstream_reachable(&self) -> bool {
        match self.http_client.head(self.context.base_endpoint()).send().await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Backend unreachable");
                false
            }
        }
    }
}

/// Part of the raw request path after the proxy prefix.
///
/// Dot segments are refused, including encoded ones (`%2e`), since URL parsing
/// resolves them and the request would leave the API base path.
fn upstream_path<'a>(raw_path: &'a str, proxy_prefix: &str) -> Result<&'a str, AppError> {
    let path = raw_path
        .strip_prefix(proxy_prefix)
        .filter(|rest| rest.starts_with('/'))
        .ok_or_else(|| AppError::BadRequest("path outside the forwarding prefix".to_string()))?;

    let has_dot_segment = path.split('/').any(|segment| {
        let segment = segment.to_ascii_lowercase().replace("%2e", ".");
        segment == "." || segment == ".."
    });
    if has_dot_segment {
        return Err(AppError::BadRequest(
            "dot segments are not forwarded".to_string(),
        ));
    }

    Ok(path)
}

fn relay(upstream: ApiResponse) -> Response {
    let mut response = Response::new(Body::from(upstream.body));
    *response.status_mut() = upstream.status;
    *response.headers_mut() = forwardable_response_headers(&upstream.headers);
    response
}
