/// Credential Store
///
/// The auth core only reaches persisted account state through
/// [`CredentialStore`]. Every method is atomic with respect to a single
/// account record; nothing here locks across accounts.

mod memory;
mod postgres;

pub use memory::InMemoryCredentialStore;
pub use postgres::PgCredentialStore;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::auth::Fingerprint;

/// Public view of an account, safe to put in responses and request extensions
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountIdentity {
    pub id: Uuid,
    pub email: String,
    pub name: String,
}

/// Full account record as held by the store
#[derive(Debug, Clone)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub refresh_fingerprint: Option<Fingerprint>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn identity(&self) -> AccountIdentity {
        AccountIdentity {
            id: self.id,
            email: self.email.clone(),
            name: self.name.clone(),
        }
    }
}

/// Fields needed to create an account
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub name: String,
    pub password_hash: String,
}

/// Outcome of a compare-and-swap on the refresh fingerprint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FingerprintSwap {
    /// The stored fingerprint matched and was replaced
    Swapped,
    /// The stored fingerprint had already moved on (or was cleared)
    Stale,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("account not found")]
    NotFound,
    #[error("duplicate entry: {0}")]
    Conflict(String),
    #[error("credential store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait::async_trait]
pub trait CredentialStore: Send + Sync {
    async fn create_account(&self, account: NewAccount) -> Result<Account, StoreError>;

    async fn find_account_by_id(&self, id: Uuid) -> Result<Account, StoreError>;

    async fn find_account_by_email(&self, email: &str) -> Result<Account, StoreError>;

    /// Unconditionally overwrite (or clear, with `None`) the refresh fingerprint.
    async fn set_fingerprint(
        &self,
        id: Uuid,
        fingerprint: Option<&Fingerprint>,
    ) -> Result<(), StoreError>;

    /// Replace the fingerprint with `next` only if it still equals `current`.
    async fn swap_fingerprint(
        &self,
        id: Uuid,
        current: &Fingerprint,
        next: &Fingerprint,
    ) -> Result<FingerprintSwap, StoreError>;

    /// Store a new password hash and clear the refresh fingerprint in one update.
    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), StoreError>;
}
