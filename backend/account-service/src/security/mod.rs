/// Security module for account-service
///
/// Provides:
/// - Bearer token authentication shared by the HTTP and gRPC adapters
/// - Ownership checks on the authenticated request context
/// - The allow-list of RPC methods callable without a token
///
/// Token issuance and password hashing live in `crypto-core`.
pub mod auth;

pub use auth::{authenticate_bearer, AuthContext, RpcAuthPolicy, AUTHORIZATION_HEADER};
