/// Account persistence
///
/// `AccountStore` is the single contract both implementations honour:
/// - `memory`: process-local map behind one `RwLock`; writers are serialized
/// - `postgres`: sqlx/Postgres; uniqueness is enforced by the `accounts_email_key` index
///
/// Under any number of concurrent `create` calls sharing one email, exactly one
/// succeeds and the rest fail with `DuplicateEmail`.
pub mod memory;
pub mod postgres;

pub use memory::InMemoryAccountStore;
pub use postgres::PgAccountStore;

use crate::context::OpContext;
use crate::error::Result;
use crate::models::{Account, AccountPatch, NewAccount};
use async_trait::async_trait;
use uuid::Uuid;

#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Insert a new account, assigning id and creation time when absent.
    /// Fails with `DuplicateEmail` when the email is already held.
    async fn create(&self, ctx: &OpContext, account: NewAccount) -> Result<Account>;

    async fn get_by_email(&self, ctx: &OpContext, email: &str) -> Result<Account>;

    async fn get_by_id(&self, ctx: &OpContext, id: Uuid) -> Result<Account>;

    /// Newest first, ties broken by id
    async fn list(&self, ctx: &OpContext) -> Result<Vec<Account>>;

    /// Apply a non-empty patch. An email change collides only with a different id.
    async fn update(&self, ctx: &OpContext, id: Uuid, patch: AccountPatch) -> Result<Account>;

    async fn delete(&self, ctx: &OpContext, id: Uuid) -> Result<()>;

    async fn count(&self, ctx: &OpContext) -> Result<i64>;
}
