//! Integration tests for crypto-core token and credential primitives
//!
//! This test module covers:
//! - Tokens issued by one authority validated by an equivalently configured one
//! - Expiry handling under an injected clock
//! - Raw claim layout on the wire
//! - Hashing used together with token issuance

use chrono::{Duration, TimeZone, Utc};
use crypto_core::{Argon2Hasher, CredentialHasher, FixedClock, TokenAuthority, TokenError};
use std::sync::Arc;

const SECRET: &str = "integration-secret-8f2Kq9vLx3Tz7Wm1Rb5Nc0Hd4Jg6Ys";

fn authority() -> TokenAuthority {
    TokenAuthority::from_secret(SECRET, "HS256", "account-service", Duration::hours(24))
        .expect("HS256 is supported")
}

#[test]
fn test_token_validates_across_instances() {
    let issuing = authority();
    let validating = authority();

    let token = issuing.issue("0b7c1f7e-3c55-4d8e-9f11-2f4a3c1d9e20").unwrap();
    let subject = validating.validate(&token).unwrap();

    assert_eq!(subject, "0b7c1f7e-3c55-4d8e-9f11-2f4a3c1d9e20");
}

#[test]
fn test_token_lifetime_follows_clock() {
    let issued_at = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
    let issuing = authority().with_clock(Arc::new(FixedClock(issued_at)));
    let token = issuing.issue("account").unwrap();

    let within = authority().with_clock(Arc::new(FixedClock(issued_at + Duration::hours(23))));
    assert_eq!(within.validate(&token).unwrap(), "account");

    let after = authority().with_clock(Arc::new(FixedClock(issued_at + Duration::hours(24))));
    assert_eq!(after.validate(&token), Err(TokenError::Expired));
}

#[test]
fn test_wire_claims_layout() {
    let issued_at = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
    let authority = authority().with_clock(Arc::new(FixedClock(issued_at)));
    let token = authority.issue("account").unwrap();

    let claims = authority.decode_claims(&token).unwrap();
    let json = serde_json::to_value(&claims).unwrap();

    assert_eq!(json["sub"], "account");
    assert_eq!(json["iss"], "account-service");
    assert_eq!(json["iat"], issued_at.timestamp());
    assert_eq!(json["exp"], (issued_at + Duration::hours(24)).timestamp());
    assert!(json.get("nbf").is_none());
}

#[test]
fn test_hashed_credentials_and_token_flow() {
    let hasher = Argon2Hasher::with_params(8 * 1024, 1, 1).unwrap();
    let stored = hasher.hash("password123").unwrap();

    assert!(hasher.verify("password123", &stored).unwrap());
    assert!(!hasher.verify("password124", &stored).unwrap());

    let token = authority().issue("account").unwrap();
    assert!(authority().validate(&token).is_ok());
}
