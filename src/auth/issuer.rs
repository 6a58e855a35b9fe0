/// Session issuance
///
/// Entry points into the session cycle: registering an account, logging in
/// with a password, and issuing a fresh pair for a known account id.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::auth::password::{hash_password, verify_password};
use crate::auth::{SessionService, TokenPair};
use crate::error::{AppError, AuthError, ValidationError};
use crate::store::{AccountIdentity, NewAccount, StoreError};

impl SessionService {
    /// Issue a new access/refresh pair for `account_id`.
    ///
    /// Overwrites the stored refresh fingerprint, which ends any session
    /// previously open for the account.
    ///
    /// # Errors
    /// - `AccountNotFound` if the id does not resolve
    /// - `StoreUnavailable` if the store fails or times out
    pub async fn issue(&self, account_id: Uuid) -> Result<TokenPair, AuthError> {
        self.issue_at(account_id, Utc::now()).await
    }

    pub(crate) async fn issue_at(
        &self,
        account_id: Uuid,
        issued_at: DateTime<Utc>,
    ) -> Result<TokenPair, AuthError> {
        let account = self
            .store_call("find_account_by_id", self.store.find_account_by_id(account_id))
            .await?;

        let (pair, fingerprint) = self.mint_pair(&account, issued_at)?;

        self.store_call(
            "set_fingerprint",
            self.store.set_fingerprint(account.id, Some(&fingerprint)),
        )
        .await?;

        tracing::info!(user_id = %account.id, "Session issued");
        Ok(pair)
    }

    /// Check an email/password pair and open a session.
    ///
    /// Unknown email and wrong password fail identically, including in how
    /// long they take: both run one bcrypt verify at the service's cost.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(AccountIdentity, TokenPair), AuthError> {
        let email = email.trim();
        let account = match self
            .store_call("find_account_by_email", self.store.find_account_by_email(email))
            .await
        {
            Ok(account) => account,
            Err(StoreError::NotFound) => {
                if let Some(decoy) = self.decoy_hash() {
                    verify_password(password, decoy);
                }
                tracing::warn!("Login attempt for unknown email");
                return Err(AuthError::InvalidCredentials);
            }
            Err(e) => return Err(e.into()),
        };

        if !verify_password(password, &account.password_hash) {
            tracing::warn!(user_id = %account.id, "Login attempt with wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        let pair = self.issue(account.id).await?;
        Ok((account.identity(), pair))
    }

    /// Create an account. Does not open a session.
    ///
    /// # Errors
    /// - Validation error for blank fields or an out-of-bounds password
    /// - `StoreError::Conflict` if the email is already registered
    pub async fn register(
        &self,
        email: &str,
        name: &str,
        password: &str,
    ) -> Result<AccountIdentity, AppError> {
        let email = required("email", email)?;
        let name = required("name", name)?;
        let password_hash = hash_password(password, self.password_cost())?;

        let account = self
            .store_call(
                "create_account",
                self.store.create_account(NewAccount {
                    email,
                    name,
                    password_hash,
                }),
            )
            .await?;

        tracing::info!(user_id = %account.id, "Account registered");
        Ok(account.identity())
    }
}

fn required(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField(field));
    }
    Ok(trimmed.to_string())
}
