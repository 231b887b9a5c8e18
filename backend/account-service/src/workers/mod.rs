/// Background workers for account-service
pub mod account_count;

pub use account_count::{run_account_count_probe, AccountCountConfig};
