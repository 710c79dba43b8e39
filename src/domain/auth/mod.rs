pub mod dto;
pub mod error;
pub mod redirect;
pub mod token_manager;

pub use dto::{CredentialPair, RefreshTokenRequest, RefreshTokenResponse};
pub use error::RefreshError;
pub use redirect::{is_login_path, locale_from_path, login_redirect_url, Locale, Navigator};
pub use token_manager::{RefreshEndpoint, RefreshOutcome, RefreshPhase, TokenManager};
