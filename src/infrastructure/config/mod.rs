use serde::Deserialize;
use std::env;
use std::time::Duration;

use crate::domain::auth::Locale;
use crate::infrastructure::store::CookieSettings;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub api_base_url: String,
    pub host: String,
    pub port: u16,
    pub proxy_prefix: String,
    pub request_timeout_secs: u64,
    pub refresh_timeout_secs: u64,
    pub refresh_coalesce_ttl_secs: u64,
    pub default_locale: Locale,
    // Credential cookies
    pub access_token_max_age_days: i64,
    pub refresh_token_max_age_days: i64,
    pub cookie_secure: bool,
    pub environment: Environment,
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenvy::dotenv().ok();

        let environment = match env::var("ENVIRONMENT")
            .unwrap_or_else(|_| "development".to_string())
            .as_str()
        {
            "production" => Environment::Production,
            _ => Environment::Development,
        };

        let default_locale = env::var("DEFAULT_LOCALE").unwrap_or_else(|_| "en".to_string());
        let default_locale = Locale::parse(&default_locale)
            .ok_or_else(|| format!("Unsupported DEFAULT_LOCALE: {}", default_locale))?;

        let config = Config {
            api_base_url: env::var("API_BASE_URL")?,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()?,
            proxy_prefix: env::var("PROXY_PREFIX").unwrap_or_else(|_| "/api/proxy".to_string()),
            request_timeout_secs: env::var("REQUEST_TIMEOUT_SECS")
                .unwrap_or_else(|_| "15".to_string())
                .parse()?,
            refresh_timeout_secs: env::var("REFRESH_TIMEOUT_SECS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()?,
            refresh_coalesce_ttl_secs: env::var("REFRESH_COALESCE_TTL_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()?,
            default_locale,
            access_token_max_age_days: env::var("ACCESS_TOKEN_MAX_AGE_DAYS")
                .unwrap_or_else(|_| "7".to_string())
                .parse()?,
            refresh_token_max_age_days: env::var("REFRESH_TOKEN_MAX_AGE_DAYS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()?,
            cookie_secure: env::var("COOKIE_SECURE")
                .map(|s| s.to_lowercase() == "true")
                .unwrap_or(environment == Environment::Production),
            environment,
            log_format: env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .parse::<String>()
                .map(|s| match s.as_str() {
                    "json" => LogFormat::Json,
                    _ => LogFormat::Pretty,
                })?,
        };

        if config.refresh_timeout_secs >= config.request_timeout_secs {
            tracing::warn!(
                refresh_timeout_secs = config.refresh_timeout_secs,
                request_timeout_secs = config.request_timeout_secs,
                "Refresh timeout is not shorter than the request timeout"
            );
        }

        Ok(config)
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn refresh_timeout(&self) -> Duration {
        Duration::from_secs(self.refresh_timeout_secs)
    }

    pub fn refresh_coalesce_ttl(&self) -> Duration {
        Duration::from_secs(self.refresh_coalesce_ttl_secs)
    }

    pub fn cookie_settings(&self) -> CookieSettings {
        CookieSettings {
            access_token_max_age_days: self.access_token_max_age_days,
            refresh_token_max_age_days: self.refresh_token_max_age_days,
            secure: self.cookie_secure,
        }
    }
}
