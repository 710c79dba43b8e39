use serde::{Deserialize, Serialize};

const LOGIN_SEGMENT: &str = "auth/login";

/// UI locales served by the academy front end
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Locale {
    #[default]
    #[serde(rename = "en")]
    English,
    #[serde(rename = "ar")]
    Arabic,
}

impl Locale {
    pub const ALL: [Locale; 2] = [Locale::English, Locale::Arabic];

    pub fn as_str(&self) -> &'static str {
        match self {
            Locale::English => "en",
            Locale::Arabic => "ar",
        }
    }

    pub fn parse(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|locale| locale.as_str() == code)
    }
}

impl std::fmt::Display for Locale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Navigation seam for contexts that can send the user to another page.
///
/// Only browser-like contexts provide one. Trusted server contexts have nowhere
/// to redirect and leave the 401 to the caller.
pub trait Navigator: Send + Sync {
    /// Path (and query) of the page currently shown
    fn current_path(&self) -> Option<String>;

    fn redirect(&self, url: &str);
}

/// Locale taken from the first path segment, or `default` when it is not a supported locale
pub fn locale_from_path(path: &str, default: Locale) -> Locale {
    path.trim_start_matches('/')
        .split(['/', '?', '#'])
        .next()
        .and_then(Locale::parse)
        .unwrap_or(default)
}

/// True for `/<locale>/auth/login` and bare `/auth/login`, with or without a trailing query
pub fn is_login_path(path: &str) -> bool {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let path = path.trim_end_matches('/');
    let rest = path.trim_start_matches('/');

    if rest == LOGIN_SEGMENT {
        return true;
    }

    match rest.split_once('/') {
        Some((locale, tail)) => Locale::parse(locale).is_some() && tail == LOGIN_SEGMENT,
        None => false,
    }
}

/// Login URL carrying the current path as `returnUrl`.
///
/// Returns `None` when the user is already on a login page.
pub fn login_redirect_url(current_path: &str, default: Locale) -> Option<String> {
    if is_login_path(current_path) {
        return None;
    }

    let locale = locale_from_path(current_path, default);
    Some(format!(
        "/{}/{}?returnUrl={}",
        locale,
        LOGIN_SEGMENT,
        urlencoding::encode(current_path)
    ))
}
