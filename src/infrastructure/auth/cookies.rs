use axum::http::{header, HeaderMap, HeaderValue};

pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// Builder for an HTTP-only, same-site credential cookie
#[derive(Debug, Clone)]
pub struct SecureCookie {
    name: String,
    value: String,
    max_age_secs: i64,
    secure: bool,
}

impl SecureCookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>, max_age_secs: i64) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            max_age_secs,
            secure: true,
        }
    }

    pub fn for_days(name: impl Into<String>, value: impl Into<String>, days: i64) -> Self {
        Self::new(name, value, days * SECONDS_PER_DAY)
    }

    /// Cookie that makes the browser drop `name` immediately
    pub fn expired(name: impl Into<String>) -> Self {
        Self::new(name, "", 0)
    }

    /// Local development runs over plain HTTP
    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn build(&self) -> String {
        let mut cookie = format!(
            "{}={}; HttpOnly; SameSite=Strict; Path=/; Max-Age={}",
            self.name, self.value, self.max_age_secs
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }

    pub fn append_to(&self, headers: &mut HeaderMap) {
        match HeaderValue::from_str(&self.build()) {
            Ok(value) => {
                headers.append(header::SET_COOKIE, value);
            }
            Err(e) => {
                tracing::warn!(cookie = %self.name, error = %e, "Skipping unrepresentable cookie");
            }
        }
    }
}

/// Value of cookie `name` from the request's `Cookie` headers
pub fn get_cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim_matches('"').to_string())
        .filter(|value| !value.is_empty())
}
