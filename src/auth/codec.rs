/// JWT Token Codec
///
/// Encodes claims into signed HS256 tokens and verifies them back. Pure:
/// no store access, no clock other than the expiry check.
///
/// A codec is typed by the claims it handles, so the access codec and the
/// refresh codec are different types with different secrets. Each token also
/// carries its kind in the `kid` header, checked before anything else.

use std::marker::PhantomData;

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::auth::claims::{AccessClaims, RefreshClaims, TokenClaims};
use crate::error::{AuthError, RejectReason};

pub type AccessCodec = TokenCodec<AccessClaims>;
pub type RefreshCodec = TokenCodec<RefreshClaims>;

pub struct TokenCodec<C> {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    issuer: String,
    ttl_seconds: i64,
    _claims: PhantomData<fn() -> C>,
}

impl<C: TokenClaims> TokenCodec<C> {
    pub fn new(secret: &str, ttl_seconds: i64, issuer: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_issuer(&[issuer]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            issuer: issuer.to_string(),
            ttl_seconds,
            _claims: PhantomData,
        }
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn ttl_seconds(&self) -> i64 {
        self.ttl_seconds
    }

    /// Sign `claims` into a token string
    ///
    /// # Errors
    /// Returns `TokenEncoding` if serialization or signing fails
    pub fn encode(&self, claims: &C) -> Result<String, AuthError> {
        let mut header = Header::new(Algorithm::HS256);
        header.kid = Some(C::KIND.key_id().to_string());

        encode(&header, claims, &self.encoding_key)
            .map_err(|e| AuthError::TokenEncoding(e.to_string()))
    }

    /// Verify integrity and expiry of `token` and return its claims
    pub fn decode(&self, token: &str) -> Result<C, RejectReason> {
        let header = decode_header(token).map_err(|e| {
            tracing::debug!(error = %e, "Token header could not be parsed");
            RejectReason::Malformed
        })?;

        if header.kid.as_deref() != Some(C::KIND.key_id()) {
            tracing::debug!(
                expected = C::KIND.key_id(),
                found = ?header.kid,
                "Token presented to the wrong codec"
            );
            return Err(RejectReason::InvalidSignature);
        }

        decode::<C>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                let reason = reject_reason(e.kind());
                tracing::debug!(error = %e, reason = %reason, "JWT validation error");
                reason
            })
    }
}

fn reject_reason(kind: &ErrorKind) -> RejectReason {
    match kind {
        ErrorKind::ExpiredSignature => RejectReason::Expired,
        ErrorKind::InvalidSignature | ErrorKind::InvalidIssuer | ErrorKind::InvalidAlgorithm => {
            RejectReason::InvalidSignature
        }
        _ => RejectReason::Malformed,
    }
}
