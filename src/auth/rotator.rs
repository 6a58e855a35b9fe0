/// Refresh token rotation
///
/// Exchanges a refresh token for a new pair exactly once. The presented
/// token moves through these stages:
///
/// ```text
/// Presented -> Decoded -> FingerprintMatched -> Rotated
///     \            \              \
///      +------------+--------------+--> Rejected
/// ```
///
/// Rejected is terminal; the client has to log in again.

use chrono::Utc;

use crate::auth::claims::TokenClaims;
use crate::auth::{Fingerprint, SessionService, TokenPair};
use crate::error::{AuthError, RejectReason};
use crate::store::{FingerprintSwap, StoreError};

/// Last stage a rotation reached before it was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationStage {
    Presented,
    Decoded,
    FingerprintMatched,
}

fn reject(stage: RotationStage, reason: RejectReason) -> AuthError {
    tracing::warn!(stage = ?stage, reason = %reason, "Refresh token rejected");
    AuthError::Unauthenticated(reason)
}

impl SessionService {
    /// Exchange `presented` for a new access/refresh pair.
    ///
    /// The presented token must be the one whose fingerprint is currently
    /// stored for its account. On success that fingerprint is replaced, so
    /// presenting the same token again fails with `FingerprintMismatch`.
    ///
    /// # Errors
    /// - `Unauthenticated` if the token is invalid, its account is gone, or
    ///   it has already been used or revoked
    /// - `StoreUnavailable` if the store fails or times out
    pub async fn rotate(&self, presented: &str) -> Result<TokenPair, AuthError> {
        // Presented -> Decoded
        let claims = self
            .refresh
            .decode(presented)
            .map_err(|reason| reject(RotationStage::Presented, reason))?;
        let account_id = claims
            .account_id()
            .map_err(|reason| reject(RotationStage::Presented, reason))?;

        // Decoded -> FingerprintMatched
        let account = match self
            .store_call("find_account_by_id", self.store.find_account_by_id(account_id))
            .await
        {
            Ok(account) => account,
            Err(StoreError::NotFound) => {
                return Err(reject(RotationStage::Decoded, RejectReason::AccountNotFound))
            }
            Err(e) => return Err(e.into()),
        };

        let presented_fingerprint = Fingerprint::of(presented);
        if account.refresh_fingerprint.as_ref() != Some(&presented_fingerprint) {
            return Err(reject(RotationStage::Decoded, RejectReason::FingerprintMismatch));
        }

        // FingerprintMatched -> Rotated
        let (pair, next_fingerprint) = self.mint_pair(&account, Utc::now())?;

        let swap = self
            .store_call(
                "swap_fingerprint",
                self.store
                    .swap_fingerprint(account.id, &presented_fingerprint, &next_fingerprint),
            )
            .await;

        match swap {
            Ok(FingerprintSwap::Swapped) => {
                tracing::info!(user_id = %account.id, "Refresh token rotated");
                Ok(pair)
            }
            Ok(FingerprintSwap::Stale) => Err(reject(
                RotationStage::FingerprintMatched,
                RejectReason::FingerprintMismatch,
            )),
            Err(StoreError::NotFound) => Err(reject(
                RotationStage::FingerprintMatched,
                RejectReason::AccountNotFound,
            )),
            Err(e) => Err(e.into()),
        }
    }
}
