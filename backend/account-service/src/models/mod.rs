/// Data models for account management
pub mod account;

pub use account::{Account, AccountPatch, NewAccount, PublicAccount};
