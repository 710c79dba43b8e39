use async_trait::async_trait;
use parking_lot::RwLock;

use super::credential_store::{CredentialStore, StoreError};
use crate::domain::auth::CredentialPair;

#[derive(Debug, Default)]
struct Slots {
    access_token: Option<String>,
    refresh_token: Option<String>,
}

/// Process-local credential store for trusted contexts and tests
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    slots: RwLock<Slots>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pair(pair: CredentialPair) -> Self {
        Self {
            slots: RwLock::new(Slots {
                access_token: Some(pair.access_token),
                refresh_token: Some(pair.refresh_token),
            }),
        }
    }

    /// Synchronous view of the stored pair, if both halves are present
    pub fn snapshot(&self) -> Option<CredentialPair> {
        let slots = self.slots.read();
        match (&slots.access_token, &slots.refresh_token) {
            (Some(access_token), Some(refresh_token)) => Some(CredentialPair {
                access_token: access_token.clone(),
                refresh_token: refresh_token.clone(),
            }),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        let slots = self.slots.read();
        slots.access_token.is_none() && slots.refresh_token.is_none()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn get_access_token(&self) -> Result<Option<String>, StoreError> {
        Ok(self.slots.read().access_token.clone())
    }

    async fn get_refresh_token(&self) -> Result<Option<String>, StoreError> {
        Ok(self.slots.read().refresh_token.clone())
    }

    async fn set_access_token(&self, token: &str) -> Result<(), StoreError> {
        self.slots.write().access_token = Some(token.to_string());
        Ok(())
    }

    async fn set_refresh_token(&self, token: &str) -> Result<(), StoreError> {
        self.slots.write().refresh_token = Some(token.to_string());
        Ok(())
    }

    async fn clear_all(&self) -> Result<(), StoreError> {
        let mut slots = self.slots.write();
        slots.access_token = None;
        slots.refresh_token = None;
        Ok(())
    }
}
