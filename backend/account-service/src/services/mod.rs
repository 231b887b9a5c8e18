/// Service layer for account-service
///
/// - Account service: registration, authentication and account lifecycle
pub mod account_service;

pub use account_service::{parse_account_id, AccountService};
