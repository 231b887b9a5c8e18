//! Shared authentication contract
//!
//! Both transports call `authenticate_bearer` with the raw `authorization`
//! value they received, so header parsing and token validation cannot drift
//! between them. Every failure is reported as `Unauthenticated`; the reason is
//! only logged.
//!
//! On the gRPC side `RpcAuthPolicy` is evaluated by a tower layer against the
//! request path before any handler runs.

use crate::error::{AccountError, Result};
use crypto_core::TokenAuthority;
use std::collections::HashSet;
use std::sync::Arc;
use tonic::codegen::http::HeaderMap;
use tracing::{debug, warn};
use uuid::Uuid;

pub const AUTHORIZATION_HEADER: &str = "authorization";

/// Request-scoped identity of an authenticated caller
///
/// Created by a transport after token validation and handed to the handler,
/// either as an argument or as a request extension. Never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthContext {
    pub account_id: Uuid,
}

impl AuthContext {
    pub fn new(account_id: Uuid) -> Self {
        Self { account_id }
    }

    /// Allow the call only when it targets the caller's own account
    pub fn ensure_owner(&self, target_id: &str) -> Result<Uuid> {
        match Uuid::parse_str(target_id.trim()) {
            Ok(id) if id == self.account_id => Ok(id),
            _ => {
                warn!(
                    caller = %self.account_id,
                    target = %target_id,
                    "Caller attempted to act on another account"
                );
                Err(AccountError::Forbidden)
            }
        }
    }
}

/// Validate an `Authorization: Bearer <token>` value
///
/// The scheme is matched case-insensitively. The token subject must be an
/// account id.
pub fn authenticate_bearer(
    authority: &TokenAuthority,
    header: Option<&str>,
) -> Result<AuthContext> {
    let header = header.ok_or_else(|| {
        debug!("Missing authorization header");
        AccountError::Unauthenticated
    })?;

    let token = match header.trim().split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") => token.trim(),
        _ => {
            debug!("Invalid authorization format (expected 'Bearer <token>')");
            return Err(AccountError::Unauthenticated);
        }
    };
    if token.is_empty() {
        return Err(AccountError::Unauthenticated);
    }

    let subject = authority.validate(token).map_err(|e| {
        debug!(error = %e, "Token validation failed");
        AccountError::Unauthenticated
    })?;

    let account_id = Uuid::parse_str(&subject).map_err(|_| {
        warn!("Token subject is not an account id");
        AccountError::Unauthenticated
    })?;

    Ok(AuthContext::new(account_id))
}

/// Which RPC methods require a token
///
/// Methods are named by their full gRPC path, e.g.
/// `/user.v1.UserService/CreateUser`. Anything not on the public list requires
/// a valid bearer token.
#[derive(Debug, Clone)]
pub struct RpcAuthPolicy {
    authority: Arc<TokenAuthority>,
    public_methods: HashSet<&'static str>,
}

impl RpcAuthPolicy {
    pub fn new(authority: Arc<TokenAuthority>) -> Self {
        Self {
            authority,
            public_methods: HashSet::new(),
        }
    }

    pub fn allow_unauthenticated(mut self, full_method: &'static str) -> Self {
        self.public_methods.insert(full_method);
        self
    }

    pub fn is_public(&self, full_method: &str) -> bool {
        self.public_methods.contains(full_method)
    }

    /// `Ok(None)` for public methods, `Ok(Some(ctx))` for authenticated callers
    pub fn authorize(&self, full_method: &str, headers: &HeaderMap) -> Result<Option<AuthContext>> {
        if self.is_public(full_method) {
            return Ok(None);
        }

        let header = match headers.get(AUTHORIZATION_HEADER) {
            Some(value) => Some(value.to_str().map_err(|_| {
                debug!("Invalid authorization metadata encoding");
                AccountError::Unauthenticated
            })?),
            None => None,
        };

        authenticate_bearer(&self.authority, header).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    const SECRET: &str = "auth-contract-secret-4Jq8Zr2Xv6Nm1Kp9Lw3Hs7Db";
    const CREATE: &str = "/user.v1.UserService/CreateUser";
    const GET: &str = "/user.v1.UserService/GetUser";

    fn authority(expiry: Duration) -> TokenAuthority {
        TokenAuthority::from_secret(SECRET, "HS256", "account-service", expiry).unwrap()
    }

    #[test]
    fn test_valid_bearer() {
        let authority = authority(Duration::hours(1));
        let id = Uuid::new_v4();
        let token = authority.issue(&id.to_string()).unwrap();

        let ctx = authenticate_bearer(&authority, Some(&format!("Bearer {token}"))).unwrap();
        assert_eq!(ctx.account_id, id);

        let lower = authenticate_bearer(&authority, Some(&format!("bearer {token}"))).unwrap();
        assert_eq!(lower.account_id, id);
    }

    #[test]
    fn test_every_failure_is_unauthenticated() {
        let authority = authority(Duration::hours(1));
        let expired = self::authority(Duration::seconds(-1))
            .issue(&Uuid::new_v4().to_string())
            .unwrap();
        let not_an_id = authority.issue("admin").unwrap();
        let valid = authority.issue(&Uuid::new_v4().to_string()).unwrap();

        let headers = [
            None,
            Some(String::new()),
            Some("Bearer".to_string()),
            Some("Bearer ".to_string()),
            Some(valid.clone()),
            Some(format!("Basic {valid}")),
            Some("Bearer garbage".to_string()),
            Some(format!("Bearer {expired}")),
            Some(format!("Bearer {not_an_id}")),
        ];

        for header in headers {
            let result = authenticate_bearer(&authority, header.as_deref());
            assert!(
                matches!(result, Err(AccountError::Unauthenticated)),
                "header {header:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_ensure_owner() {
        let id = Uuid::new_v4();
        let ctx = AuthContext::new(id);

        assert_eq!(ctx.ensure_owner(&id.to_string()).unwrap(), id);
        assert!(matches!(
            ctx.ensure_owner(&Uuid::new_v4().to_string()),
            Err(AccountError::Forbidden)
        ));
        assert!(matches!(ctx.ensure_owner("not-a-uuid"), Err(AccountError::Forbidden)));
    }

    #[test]
    fn test_policy_allows_public_method_without_token() {
        let policy = RpcAuthPolicy::new(Arc::new(authority(Duration::hours(1))))
            .allow_unauthenticated(CREATE);

        assert_eq!(policy.authorize(CREATE, &HeaderMap::new()).unwrap(), None);
        assert!(matches!(
            policy.authorize(GET, &HeaderMap::new()),
            Err(AccountError::Unauthenticated)
        ));
    }

    #[test]
    fn test_policy_authenticates_private_method() {
        let authority = Arc::new(authority(Duration::hours(1)));
        let policy = RpcAuthPolicy::new(Arc::clone(&authority)).allow_unauthenticated(CREATE);
        let id = Uuid::new_v4();
        let token = authority.issue(&id.to_string()).unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION_HEADER, format!("Bearer {token}").parse().unwrap());

        let ctx = policy.authorize(GET, &headers).unwrap().unwrap();
        assert_eq!(ctx.account_id, id);

        assert!(matches!(
            policy.authorize("/user.v1.UserService/DeleteUser", &HeaderMap::new()),
            Err(AccountError::Unauthenticated)
        ));
    }
}
