/// Session service
///
/// Holds everything the session operations share: the two token codecs,
/// the credential store and the bound on store calls. The operations
/// themselves live next to this file (`issuer`, `verifier`, `rotator`,
/// `revocation`), each as an `impl SessionService` block.

use std::future::Future;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::auth::claims::{AccessClaims, RefreshClaims};
use crate::auth::codec::{AccessCodec, RefreshCodec};
use crate::auth::Fingerprint;
use crate::configuration::JwtSettings;
use crate::error::{AuthError, ConfigError};
use crate::store::{Account, CredentialStore, StoreError};

const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(2);

/// Hashed once per service and checked against when a login names an
/// unknown email, so both login failures pay for one bcrypt verify.
const DECOY_PASSWORD: &str = "authgate-decoy-password";

/// Freshly minted access/refresh pair
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds
    pub access_expires_in: i64,
    /// Refresh token lifetime in seconds
    pub refresh_expires_in: i64,
}

pub struct SessionService {
    pub(crate) access: AccessCodec,
    pub(crate) refresh: RefreshCodec,
    pub(crate) store: Arc<dyn CredentialStore>,
    store_timeout: Duration,
    password_cost: u32,
    decoy_hash: OnceLock<Option<String>>,
}

impl SessionService {
    /// # Errors
    /// Returns a config error if the JWT settings are unusable (shared or
    /// empty secrets, non-positive or inverted expiries)
    pub fn new(settings: &JwtSettings, store: Arc<dyn CredentialStore>) -> Result<Self, ConfigError> {
        settings.validate()?;

        Ok(Self {
            access: AccessCodec::new(
                &settings.access_secret,
                settings.access_token_expiry,
                &settings.issuer,
            ),
            refresh: RefreshCodec::new(
                &settings.refresh_secret,
                settings.refresh_token_expiry,
                &settings.issuer,
            ),
            store,
            store_timeout: DEFAULT_STORE_TIMEOUT,
            password_cost: bcrypt::DEFAULT_COST,
            decoy_hash: OnceLock::new(),
        })
    }

    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    pub fn with_password_cost(mut self, cost: u32) -> Self {
        self.password_cost = cost;
        self.decoy_hash = OnceLock::new();
        self
    }

    pub fn store_timeout(&self) -> Duration {
        self.store_timeout
    }

    pub fn password_cost(&self) -> u32 {
        self.password_cost
    }

    pub fn access_ttl_seconds(&self) -> i64 {
        self.access.ttl_seconds()
    }

    pub fn refresh_ttl_seconds(&self) -> i64 {
        self.refresh.ttl_seconds()
    }

    /// bcrypt hash at `password_cost` with nothing behind it
    pub(crate) fn decoy_hash(&self) -> Option<&str> {
        self.decoy_hash
            .get_or_init(|| match bcrypt::hash(DECOY_PASSWORD, self.password_cost) {
                Ok(hash) => Some(hash),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to hash decoy password");
                    None
                }
            })
            .as_deref()
    }

    /// Run one credential store call under the configured timeout.
    ///
    /// An elapsed timeout is reported as `StoreError::Unavailable`; the
    /// in-flight call is dropped.
    pub(crate) async fn store_call<T, F>(&self, operation: &'static str, call: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        match tokio::time::timeout(self.store_timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                tracing::error!(
                    operation = operation,
                    timeout_ms = self.store_timeout.as_millis() as u64,
                    "Credential store call timed out"
                );
                Err(StoreError::Unavailable(format!(
                    "{} timed out after {}ms",
                    operation,
                    self.store_timeout.as_millis()
                )))
            }
        }
    }

    /// Mint a new pair for `account` and the fingerprint of its refresh half
    pub(crate) fn mint_pair(
        &self,
        account: &Account,
        issued_at: DateTime<Utc>,
    ) -> Result<(TokenPair, Fingerprint), AuthError> {
        let access_claims = AccessClaims::new(
            account,
            issued_at,
            self.access.ttl_seconds(),
            self.access.issuer(),
        );
        let refresh_claims = RefreshClaims::new(
            account.id,
            issued_at,
            self.refresh.ttl_seconds(),
            self.refresh.issuer(),
        );

        let access_token = self.access.encode(&access_claims)?;
        let refresh_token = self.refresh.encode(&refresh_claims)?;
        let fingerprint = Fingerprint::of(&refresh_token);

        Ok((
            TokenPair {
                access_token,
                refresh_token,
                access_expires_in: self.access.ttl_seconds(),
                refresh_expires_in: self.refresh.ttl_seconds(),
            },
            fingerprint,
        ))
    }
}
