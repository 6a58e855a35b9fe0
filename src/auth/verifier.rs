/// Access token verification
///
/// Runs on every protected request. The stored refresh fingerprint is not
/// consulted: an access token stays valid for its whole TTL even after the
/// session behind it was rotated or revoked.

use crate::auth::claims::TokenClaims;
use crate::auth::SessionService;
use crate::error::{AuthError, RejectReason};
use crate::store::{AccountIdentity, StoreError};

impl SessionService {
    /// Resolve an access token to the account it was issued for.
    ///
    /// # Errors
    /// - `Unauthenticated` for any decode failure or a deleted account
    /// - `StoreUnavailable` if the store fails or times out
    pub async fn verify(&self, access_token: &str) -> Result<AccountIdentity, AuthError> {
        let claims = self.access.decode(access_token).map_err(|reason| {
            tracing::warn!(reason = %reason, "Access token rejected");
            AuthError::Unauthenticated(reason)
        })?;
        let account_id = claims.account_id()?;

        match self
            .store_call("find_account_by_id", self.store.find_account_by_id(account_id))
            .await
        {
            Ok(account) => {
                tracing::debug!(user_id = %account.id, "Access token verified");
                Ok(account.identity())
            }
            Err(StoreError::NotFound) => {
                tracing::warn!(user_id = %account_id, "Access token for missing account");
                Err(AuthError::Unauthenticated(RejectReason::AccountNotFound))
            }
            Err(e) => Err(e.into()),
        }
    }
}
