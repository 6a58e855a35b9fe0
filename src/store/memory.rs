use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use super::{Account, CredentialStore, FingerprintSwap, NewAccount, StoreError};
use crate::auth::Fingerprint;

/// Process-local credential store.
///
/// Each account lives in its own `DashMap` entry; mutations hold that
/// entry's shard lock for the whole read-compare-write.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    accounts: DashMap<Uuid, Account>,
    emails: DashMap<String, Uuid>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove an account outright. Tokens already issued for it stop verifying.
    pub fn remove_account(&self, id: Uuid) -> Option<Account> {
        let (_, account) = self.accounts.remove(&id)?;
        self.emails.remove(&account.email.to_lowercase());
        Some(account)
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

#[async_trait::async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn create_account(&self, account: NewAccount) -> Result<Account, StoreError> {
        let key = account.email.to_lowercase();
        match self.emails.entry(key) {
            Entry::Occupied(_) => Err(StoreError::Conflict("Email already registered".to_string())),
            Entry::Vacant(slot) => {
                let now = Utc::now();
                let record = Account {
                    id: Uuid::new_v4(),
                    email: account.email,
                    name: account.name,
                    password_hash: account.password_hash,
                    refresh_fingerprint: None,
                    created_at: now,
                    updated_at: now,
                };
                self.accounts.insert(record.id, record.clone());
                slot.insert(record.id);
                Ok(record)
            }
        }
    }

    async fn find_account_by_id(&self, id: Uuid) -> Result<Account, StoreError> {
        self.accounts
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or(StoreError::NotFound)
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Account, StoreError> {
        let id = self
            .emails
            .get(&email.to_lowercase())
            .map(|entry| *entry.value())
            .ok_or(StoreError::NotFound)?;
        self.find_account_by_id(id).await
    }

    async fn set_fingerprint(
        &self,
        id: Uuid,
        fingerprint: Option<&Fingerprint>,
    ) -> Result<(), StoreError> {
        let mut account = self.accounts.get_mut(&id).ok_or(StoreError::NotFound)?;
        account.refresh_fingerprint = fingerprint.cloned();
        account.updated_at = Utc::now();
        Ok(())
    }

    async fn swap_fingerprint(
        &self,
        id: Uuid,
        current: &Fingerprint,
        next: &Fingerprint,
    ) -> Result<FingerprintSwap, StoreError> {
        let mut account = self.accounts.get_mut(&id).ok_or(StoreError::NotFound)?;
        if account.refresh_fingerprint.as_ref() != Some(current) {
            return Ok(FingerprintSwap::Stale);
        }
        account.refresh_fingerprint = Some(next.clone());
        account.updated_at = Utc::now();
        Ok(FingerprintSwap::Swapped)
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), StoreError> {
        let mut account = self.accounts.get_mut(&id).ok_or(StoreError::NotFound)?;
        account.password_hash = password_hash.to_string();
        account.refresh_fingerprint = None;
        account.updated_at = Utc::now();
        Ok(())
    }
}
