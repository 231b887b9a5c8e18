//! Signing secret strength checks
//!
//! Run once at startup against the configured token secret. A missing secret is
//! an error; a weak one is reported so the caller can decide how loudly to warn.

const MIN_SECRET_LENGTH: usize = 32; // 256 bits minimum
const RECOMMENDED_SECRET_LENGTH: usize = 64;

/// Secret strength classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretStrength {
    Weak,
    Acceptable,
    Strong,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SecretError {
    #[error("signing secret is empty")]
    Missing,
}

/// Classify an HMAC signing secret
///
/// **Criteria**:
/// - Minimum 32 bytes
/// - Shannon entropy of at least 4 bits/byte
/// - No runs of four repeated or sequential bytes
/// - 64 bytes with entropy of 5 bits/byte or more is `Strong`
pub fn validate_signing_secret(secret: &str) -> Result<SecretStrength, SecretError> {
    let bytes = secret.as_bytes();

    if bytes.is_empty() {
        return Err(SecretError::Missing);
    }

    if bytes.len() < MIN_SECRET_LENGTH {
        return Ok(SecretStrength::Weak);
    }

    let entropy = shannon_entropy(bytes);
    if entropy < 4.0 || has_obvious_patterns(bytes) {
        return Ok(SecretStrength::Weak);
    }

    if bytes.len() >= RECOMMENDED_SECRET_LENGTH && entropy >= 5.0 {
        Ok(SecretStrength::Strong)
    } else {
        Ok(SecretStrength::Acceptable)
    }
}

/// Bits per byte, 0 to 8
fn shannon_entropy(data: &[u8]) -> f64 {
    let mut freq = [0u32; 256];
    for &byte in data {
        freq[byte as usize] += 1;
    }

    let len = data.len() as f64;
    freq.iter()
        .filter(|&&count| count > 0)
        .map(|&count| {
            let p = f64::from(count) / len;
            -p * p.log2()
        })
        .sum()
}

fn has_obvious_patterns(data: &[u8]) -> bool {
    let mut same = 1;
    let mut seq = 1;

    for w in data.windows(2) {
        same = if w[0] == w[1] { same + 1 } else { 1 };
        seq = if i16::from(w[1]) - i16::from(w[0]) == 1 { seq + 1 } else { 1 };

        if same >= 4 || seq >= 4 {
            return true;
        }
    }

    false
}
