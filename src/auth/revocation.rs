/// Session revocation
///
/// Clearing the stored fingerprint invalidates every outstanding refresh
/// token for the account. Access tokens already handed out keep working
/// until they expire.

use uuid::Uuid;

use crate::auth::password::{hash_password, verify_password};
use crate::auth::SessionService;
use crate::error::{AppError, AuthError};

impl SessionService {
    /// Log the account out everywhere. Idempotent.
    pub async fn revoke(&self, account_id: Uuid) -> Result<(), AuthError> {
        self.store_call("set_fingerprint", self.store.set_fingerprint(account_id, None))
            .await?;

        tracing::info!(user_id = %account_id, "Session revoked");
        Ok(())
    }

    /// Replace the account password and end its session in the same update.
    ///
    /// # Errors
    /// - `InvalidCredentials` if `current_password` is wrong
    /// - Validation error if `new_password` is out of bounds
    pub async fn change_password(
        &self,
        account_id: Uuid,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AppError> {
        let account = self
            .store_call("find_account_by_id", self.store.find_account_by_id(account_id))
            .await
            .map_err(AuthError::from)?;

        if !verify_password(current_password, &account.password_hash) {
            tracing::warn!(user_id = %account.id, "Password change with wrong current password");
            return Err(AuthError::InvalidCredentials.into());
        }

        let password_hash = hash_password(new_password, self.password_cost())?;

        self.store_call(
            "update_password",
            self.store.update_password(account.id, &password_hash),
        )
        .await
        .map_err(AuthError::from)?;

        tracing::info!(user_id = %account.id, "Password changed, session revoked");
        Ok(())
    }
}
