pub mod cookie;
pub mod credential_store;
pub mod memory;

pub use cookie::{CookieCredentialStore, CookieSettings};
pub use credential_store::{CredentialStore, StoreError};
pub use memory::MemoryCredentialStore;
