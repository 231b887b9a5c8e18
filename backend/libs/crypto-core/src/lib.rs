//! Shared cryptographic primitives for the account backend.
//!
//! - `jwt`: stateless identity token issuance and validation
//! - `password`: one-way credential hashing (Argon2id)
//! - `secret`: signing secret strength checks used at startup

pub mod jwt;
pub mod password;
pub mod secret;

pub use jwt::{Claims, Clock, FixedClock, SystemClock, TokenAuthority, TokenError};
pub use password::{Argon2Hasher, CredentialHasher, HashError};
pub use secret::{validate_signing_secret, SecretError, SecretStrength};
