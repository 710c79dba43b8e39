pub mod cookies;
pub mod request_id;

pub use cookies::{get_cookie_value, SecureCookie, ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE};
pub use request_id::{request_id_middleware, RequestId};
