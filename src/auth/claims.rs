/// JWT Claims structures
///
/// Access and refresh tokens carry different claim sets. Both embed their
/// own expiry and a random `jti`, so two tokens minted in the same second
/// for the same account are still distinct strings.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::RejectReason;
use crate::store::Account;

/// Which credential a claim set belongs to. Stamped into the JWT `kid` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn key_id(&self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }
}

/// Behaviour shared by every claim set a [`TokenCodec`](super::TokenCodec) handles
pub trait TokenClaims: Serialize + DeserializeOwned {
    const KIND: TokenKind;

    fn subject(&self) -> &str;

    fn expires_at(&self) -> i64;

    /// Account id carried in `sub`
    fn account_id(&self) -> Result<Uuid, RejectReason> {
        Uuid::parse_str(self.subject()).map_err(|_| RejectReason::Malformed)
    }
}

/// Claims for short-lived access tokens
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct AccessClaims {
    /// Subject (account ID as UUID string)
    pub sub: String,
    pub email: String,
    /// Display name
    pub name: String,
    pub iss: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    pub jti: String,
}

impl AccessClaims {
    pub fn new(account: &Account, issued_at: DateTime<Utc>, ttl_seconds: i64, issuer: &str) -> Self {
        let iat = issued_at.timestamp();
        Self {
            sub: account.id.to_string(),
            email: account.email.clone(),
            name: account.name.clone(),
            iss: issuer.to_string(),
            iat,
            exp: iat.saturating_add(ttl_seconds),
            jti: Uuid::new_v4().to_string(),
        }
    }
}

impl TokenClaims for AccessClaims {
    const KIND: TokenKind = TokenKind::Access;

    fn subject(&self) -> &str {
        &self.sub
    }

    fn expires_at(&self) -> i64 {
        self.exp
    }
}

/// Claims for long-lived refresh tokens
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct RefreshClaims {
    pub sub: String,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

impl RefreshClaims {
    pub fn new(account_id: Uuid, issued_at: DateTime<Utc>, ttl_seconds: i64, issuer: &str) -> Self {
        let iat = issued_at.timestamp();
        Self {
            sub: account_id.to_string(),
            iss: issuer.to_string(),
            iat,
            exp: iat.saturating_add(ttl_seconds),
            jti: Uuid::new_v4().to_string(),
        }
    }
}

impl TokenClaims for RefreshClaims {
    const KIND: TokenKind = TokenKind::Refresh;

    fn subject(&self) -> &str {
        &self.sub
    }

    fn expires_at(&self) -> i64 {
        self.exp
    }
}
