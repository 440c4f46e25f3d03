//! Bearer tokens for hub sessions.
//!
//! A token is `base64url(claims JSON) "." base64url(MAC)`, where the MAC is a
//! blake3 keyed hash of the first segment. Issuer and verifier share the key.

mod claims;
mod token;

pub use claims::{Claims, Scope};
pub use token::{TokenIssuer, TokenVerifier};
