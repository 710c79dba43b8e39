use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("credential store unavailable: {0}")]
    Unavailable(String),
    #[error("malformed credential: {0}")]
    Malformed(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Secure storage for the access/refresh credential pair.
///
/// Each call is assumed atomic and immediately visible to later calls.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn get_access_token(&self) -> Result<Option<String>, StoreError>;

    async fn get_refresh_token(&self) -> Result<Option<String>, StoreError>;

    async fn set_access_token(&self, token: &str) -> Result<(), StoreError>;

    async fn set_refresh_token(&self, token: &str) -> Result<(), StoreError>;

    /// Drop both credentials (logout or dead session)
    async fn clear_all(&self) -> Result<(), StoreError>;
}
