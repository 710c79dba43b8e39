use async_trait::async_trait;
use axum::http::HeaderMap;
use parking_lot::Mutex;

use super::credential_store::{CredentialStore, StoreError};
use crate::infrastructure::auth::{
    get_cookie_value, SecureCookie, ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE,
};

/// Lifetimes and flags of the credential cookies
#[derive(Debug, Clone, Copy)]
pub struct CookieSettings {
    pub access_token_max_age_days: i64,
    pub refresh_token_max_age_days: i64,
    pub secure: bool,
}

impl Default for CookieSettings {
    fn default() -> Self {
        Self {
            access_token_max_age_days: 7,
            refresh_token_max_age_days: 30,
            secure: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum CookieWrite {
    Set(String),
    Clear,
}

#[derive(Debug, Default)]
struct CookieState {
    access_token: Option<String>,
    refresh_token: Option<String>,
    access_write: Option<CookieWrite>,
    refresh_write: Option<CookieWrite>,
}

/// Credential store over one request's HTTP-only cookies.
///
/// Reads come from the incoming `Cookie` header; writes are recorded and turned
/// into `Set-Cookie` headers on the outgoing response.
#[derive(Debug)]
pub struct CookieCredentialStore {
    settings: CookieSettings,
    state: Mutex<CookieState>,
}

impl CookieCredentialStore {
    pub fn from_headers(headers: &HeaderMap, settings: CookieSettings) -> Self {
        Self {
            settings,
            state: Mutex::new(CookieState {
                access_token: get_cookie_value(headers, ACCESS_TOKEN_COOKIE),
                refresh_token: get_cookie_value(headers, REFRESH_TOKEN_COOKIE),
                ..CookieState::default()
            }),
        }
    }

    pub fn has_pending_writes(&self) -> bool {
        let state = self.state.lock();
        state.access_write.is_some() || state.refresh_write.is_some()
    }

    /// Append one `Set-Cookie` header per credential written during the request
    pub fn write_set_cookie_headers(&self, headers: &mut HeaderMap) {
        let state = self.state.lock();
        let writes = [
            (
                ACCESS_TOKEN_COOKIE,
                &state.access_write,
                self.settings.access_token_max_age_days,
            ),
            (
                REFRESH_TOKEN_COOKIE,
                &state.refresh_write,
                self.settings.refresh_token_max_age_days,
            ),
        ];

        for (name, write, max_age_days) in writes {
            let cookie = match write {
                Some(CookieWrite::Set(value)) => SecureCookie::for_days(name, value, max_age_days),
                Some(CookieWrite::Clear) => SecureCookie::expired(name),
                None => continue,
            };
            cookie.secure(self.settings.secure).append_to(headers);
        }
    }
}

fn validate(token: &str) -> Result<(), StoreError> {
    let valid = !token.is_empty()
        && token
            .bytes()
            .all(|b| b.is_ascii_graphic() && b != b';' && b != b',' && b != b'"');
    if valid {
        Ok(())
    } else {
        Err(StoreError::Malformed(
            "token is not a valid cookie value".to_string(),
        ))
    }
}

#[async_trait]
impl CredentialStore for CookieCredentialStore {
    async fn get_access_token(&self) -> Result<Option<String>, StoreError> {
        Ok(self.state.lock().access_token.clone())
    }

    async fn get_refresh_token(&self) -> Result<Option<String>, StoreError> {
        Ok(self.state.lock().refresh_token.clone())
    }

    async fn set_access_token(&self, token: &str) -> Result<(), StoreError> {
        validate(token)?;
        let mut state = self.state.lock();
        state.access_token = Some(token.to_string());
        state.access_write = Some(CookieWrite::Set(token.to_string()));
        Ok(())
    }

    async fn set_refresh_token(&self, token: &str) -> Result<(), StoreError> {
        validate(token)?;
        let mut state = self.state.lock();
        state.refresh_token = Some(token.to_string());
        state.refresh_write = Some(CookieWrite::Set(token.to_string()));
        Ok(())
    }

    async fn clear_all(&self) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        state.access_token = None;
        state.refresh_token = None;
        state.access_write = Some(CookieWrite::Clear);
        state.refresh_write = Some(CookieWrite::Clear);
        Ok(())
    }
}
