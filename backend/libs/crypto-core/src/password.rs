//! Password hashing and verification using Argon2id
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HashError {
    #[error("password hashing failed: {0}")]
    Hash(String),

    #[error("stored password hash is invalid: {0}")]
    InvalidHash(String),
}

/// One-way transformation of secrets with later verification
///
/// Implementations are CPU bound; async callers should run them on a
/// blocking thread.
pub trait CredentialHasher: Send + Sync {
    /// Produce a salted, self-describing hash of `password`
    fn hash(&self, password: &str) -> Result<String, HashError>;

    /// Check `password` against a hash produced by `hash`
    ///
    /// Returns `Ok(false)` on mismatch. Errors are reserved for hashes that
    /// cannot be parsed or for internal failures.
    fn verify(&self, password: &str, password_hash: &str) -> Result<bool, HashError>;
}

/// Argon2id hasher emitting PHC strings
///
/// ## Security
///
/// - Random 16-byte salt per hash
/// - Verification is constant time
/// - Hashes record their own parameters, so changing cost settings does not
///   invalidate stored credentials
#[derive(Debug, Clone)]
pub struct Argon2Hasher {
    params: Params,
}

impl Default for Argon2Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Argon2Hasher {
    /// Hasher with the library's recommended cost parameters
    pub fn new() -> Self {
        Self {
            params: Params::default(),
        }
    }

    /// Hasher with explicit cost parameters
    ///
    /// `memory_kib` is the memory cost in KiB, `iterations` the time cost and
    /// `parallelism` the lane count.
    pub fn with_params(
        memory_kib: u32,
        iterations: u32,
        parallelism: u32,
    ) -> Result<Self, HashError> {
        let params = Params::new(memory_kib, iterations, parallelism, None)
            .map_err(|e| HashError::Hash(format!("invalid argon2 parameters: {}", e)))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, password: &str) -> Result<String, HashError> {
        let salt = SaltString::generate(&mut OsRng);

        let hash = self
            .argon2()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| HashError::Hash(e.to_string()))?
            .to_string();

        Ok(hash)
    }

    fn verify(&self, password: &str, password_hash: &str) -> Result<bool, HashError> {
        let parsed =
            PasswordHash::new(password_hash).map_err(|e| HashError::InvalidHash(e.to_string()))?;

        match self.argon2().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(HashError::Hash(e.to_string())),
        }
    }
}
