/// Authentication module
///
/// Token encoding, password hashing, and the session operations:
/// issue, verify, rotate and revoke.

mod claims;
mod codec;
mod fingerprint;
mod issuer;
mod password;
mod revocation;
mod rotator;
mod session;
mod verifier;

pub use claims::{AccessClaims, RefreshClaims, TokenClaims, TokenKind};
pub use codec::{AccessCodec, RefreshCodec, TokenCodec};
pub use fingerprint::Fingerprint;
pub use password::{hash_password, verify_password};
pub use rotator::RotationStage;
pub use session::{SessionService, TokenPair};
