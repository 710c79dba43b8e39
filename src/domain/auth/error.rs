/// Why a refresh cycle failed.
///
/// Cloneable because a single outcome is handed to every request queued behind
/// the refresh.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RefreshError {
    #[error("no refresh token available")]
    MissingRefreshToken,
    #[error("refresh rejected with status {status}")]
    Rejected { status: u16 },
    #[error("malformed refresh response: {0}")]
    MalformedResponse(String),
    #[error("refresh request timed out")]
    Timeout,
    #[error("refresh transport error: {0}")]
    Transport(String),
    #[error("credential store error: {0}")]
    Store(String),
    #[error("refresh abandoned before it settled")]
    Abandoned,
}

impl From<reqwest::Error> for RefreshError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RefreshError::Timeout
        } else if err.is_decode() {
            RefreshError::MalformedResponse(err.to_string())
        } else {
            RefreshError::Transport(err.to_string())
        }
    }
}
