//! Identity token authority shared by every transport of the account backend.
//!
//! Tokens are stateless: validity is a function of the signature, the embedded
//! timestamps and the current time. Nothing is persisted per token.
//!
//! ## Security Design
//!
//! - **Single algorithm**: validation accepts exactly the configured HMAC
//!   algorithm. Tokens whose header names any other algorithm are rejected as
//!   malformed, so there is no algorithm-confusion path.
//! - **Instance keys**: keys live inside a `TokenAuthority` value handed to the
//!   transports at construction. There is no global key storage.
//! - **Injectable clock**: issuance and expiry checks read time from a `Clock`,
//!   which keeps both deterministic in tests.
//!
//! ## Usage
//!
//! ```rust
//! use chrono::Duration;
//! use crypto_core::jwt::TokenAuthority;
//!
//! let authority = TokenAuthority::from_secret(
//!     "a-signing-secret-that-is-long-enough-for-hs256",
//!     "HS256",
//!     "account-service",
//!     Duration::hours(24),
//! )
//! .expect("valid algorithm");
//!
//! let token = authority.issue("4f1c2a9e-0000-0000-0000-000000000000").unwrap();
//! let subject = authority.validate(&token).unwrap();
//! assert_eq!(subject, "4f1c2a9e-0000-0000-0000-000000000000");
//! ```

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

// ============================================================================
// Clock
// ============================================================================

/// Source of wall-clock time for token issuance and validation
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// Reads the system clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Always reports the same instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

// ============================================================================
// Data Structures
// ============================================================================

/// Registered claims carried by every identity token
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject (account id)
    pub sub: String,
    /// Issuer
    pub iss: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Not before (Unix timestamp), only checked when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("token is malformed or carries an invalid signature")]
    Malformed,

    #[error("token has expired")]
    Expired,

    #[error("token is not valid yet")]
    NotYetValid,

    #[error("failed to sign token: {0}")]
    Signing(String),

    #[error("unsupported token algorithm: {0}")]
    UnsupportedAlgorithm(String),
}

/// Parse a configured algorithm name. Only secret-based algorithms are accepted.
pub fn parse_algorithm(name: &str) -> Result<Algorithm, TokenError> {
    match name.trim().to_ascii_uppercase().as_str() {
        "HS256" => Ok(Algorithm::HS256),
        "HS384" => Ok(Algorithm::HS384),
        "HS512" => Ok(Algorithm::HS512),
        other => Err(TokenError::UnsupportedAlgorithm(other.to_string())),
    }
}

// ============================================================================
// Token Authority
// ============================================================================

/// Issues and validates signed, time-bounded identity tokens
#[derive(Clone)]
pub struct TokenAuthority {
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    expiry: Duration,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for TokenAuthority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenAuthority")
            .field("algorithm", &self.algorithm)
            .field("issuer", &self.issuer)
            .field("expiry", &self.expiry)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

impl TokenAuthority {
    /// Build an authority from a shared HMAC secret
    ///
    /// ## Errors
    ///
    /// Returns `TokenError::UnsupportedAlgorithm` when `algorithm` is not one of
    /// HS256, HS384 or HS512.
    pub fn from_secret(
        secret: &str,
        algorithm: &str,
        issuer: impl Into<String>,
        expiry: Duration,
    ) -> Result<Self, TokenError> {
        let algorithm = parse_algorithm(algorithm)?;

        Ok(Self {
            algorithm,
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            issuer: issuer.into(),
            expiry,
            clock: Arc::new(SystemClock),
        })
    }

    /// Replace the clock used for `iat`/`exp` and for validation
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn expiry(&self) -> Duration {
        self.expiry
    }

    /// Issue a token for `subject` valid from now until now + expiry
    pub fn issue(&self, subject: &str) -> Result<String, TokenError> {
        let now = self.clock.now();

        let claims = Claims {
            sub: subject.to_string(),
            iss: self.issuer.clone(),
            iat: now.timestamp(),
            exp: (now + self.expiry).timestamp(),
            nbf: None,
        };

        encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Validate a token and return its subject
    ///
    /// ## Errors
    ///
    /// - `Malformed`: cannot be parsed, wrong signature, wrong algorithm or issuer
    /// - `Expired`: current time is at or past `exp`
    /// - `NotYetValid`: `nbf` is present and current time is before it
    pub fn validate(&self, token: &str) -> Result<String, TokenError> {
        self.decode_claims(token).map(|claims| claims.sub)
    }

    /// Validate a token and return all of its claims
    pub fn decode_claims(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(self.algorithm);
        // Time checks run against the injected clock below.
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.leeway = 0;
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "sub", "iss"]);

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| {
                tracing::debug!(error = %e, "token rejected during decode");
                TokenError::Malformed
            })?
            .claims;

        let now = self.clock.now().timestamp();
        if now >= claims.exp {
            return Err(TokenError::Expired);
        }
        if let Some(nbf) = claims.nbf {
            if now < nbf {
                return Err(TokenError::NotYetValid);
            }
        }

        Ok(claims)
    }
}

// ============================================================================
// Tests
// ============================================================================
