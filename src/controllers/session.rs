use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    infrastructure::store::{CookieCredentialStore, CookieSettings, CredentialStore},
};

pub struct SessionController {
    cookie_settings: CookieSettings,
}

impl SessionController {
    pub fn new(cookie_settings: CookieSettings) -> Self {
        Self { cookie_settings }
    }

    /// POST /api/session/logout - Drop both credential cookies
    pub async fn logout(
        State(controller): State<Arc<SessionController>>,
        headers: HeaderMap,
    ) -> AppResult<Response> {
        let store = CookieCredentialStore::from_headers(&headers, controller.cookie_settings);
        store
            .clear_all()
            .await
            .map_err(|e| AppError::Internal(e.to_string()))?;

        let mut response = StatusCode::NO_CONTENT.into_response();
        store.write_set_cookie_headers(response.headers_mut());

        tracing::info!("Session cookies cleared");
        Ok(response)
    }
}
