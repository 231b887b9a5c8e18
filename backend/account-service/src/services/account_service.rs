//! Account orchestration
//!
//! The only write path into the `AccountStore`. Inputs are normalized and
//! validated here before any store access; hashing runs on the blocking pool
//! under the caller's context.

use crate::context::OpContext;
use crate::db::AccountStore;
use crate::error::{AccountError, Result};
use crate::models::{AccountPatch, NewAccount, PublicAccount};
use crate::validators::{
    check_email, check_name, check_password, normalize_email, normalize_name, validate_email,
};
use crypto_core::CredentialHasher;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Parse an external account id. Anything unparsable cannot exist.
pub fn parse_account_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| AccountError::NotFound)
}

#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn AccountStore>,
    hasher: Arc<dyn CredentialHasher>,
}

impl AccountService {
    pub fn new(store: Arc<dyn AccountStore>, hasher: Arc<dyn CredentialHasher>) -> Self {
        Self { store, hasher }
    }

    /// Create an account
    ///
    /// ## Errors
    ///
    /// - `Validation` for an empty name, malformed email or short password
    /// - `DuplicateEmail` when the normalized email is taken, including when a
    ///   concurrent registration wins between the probe and the insert
    pub async fn register(
        &self,
        ctx: &OpContext,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<PublicAccount> {
        let name = normalize_name(name);
        let email = normalize_email(email);
        check_name(&name)?;
        check_email(&email)?;
        check_password(password)?;

        match self.store.get_by_email(ctx, &email).await {
            Ok(_) => return Err(AccountError::DuplicateEmail),
            Err(AccountError::NotFound) => {}
            Err(e) => return Err(e),
        }

        let password_hash = self.hash_password(ctx, password).await?;

        let account = match self
            .store
            .create(ctx, NewAccount::new(name, email, password_hash))
            .await
        {
            Ok(account) => account,
            Err(AccountError::DuplicateEmail) => {
                debug!("Registration lost the email uniqueness race");
                return Err(AccountError::DuplicateEmail);
            }
            Err(e) => return Err(e),
        };

        info!(account_id = %account.id, "Account registered");
        Ok(account.into())
    }

    /// Check credentials and return the matching account
    ///
    /// Every credential problem collapses to `InvalidCredentials`: callers cannot
    /// tell an unknown email from a wrong password or a malformed address.
    pub async fn authenticate(
        &self,
        ctx: &OpContext,
        email: &str,
        password: &str,
    ) -> Result<PublicAccount> {
        let email = normalize_email(email);
        if !validate_email(&email) || password.trim().is_empty() {
            return Err(AccountError::InvalidCredentials);
        }

        let account = match self.store.get_by_email(ctx, &email).await {
            Ok(account) => account,
            Err(AccountError::NotFound) => return Err(AccountError::InvalidCredentials),
            Err(e) => return Err(e),
        };

        if !self.verify_password(ctx, password, &account.password_hash).await? {
            warn!(account_id = %account.id, "Failed login attempt");
            return Err(AccountError::InvalidCredentials);
        }

        Ok(account.into())
    }

    pub async fn get(&self, ctx: &OpContext, id: Uuid) -> Result<PublicAccount> {
        self.store.get_by_id(ctx, id).await.map(PublicAccount::from)
    }

    pub async fn list(&self, ctx: &OpContext) -> Result<Vec<PublicAccount>> {
        let accounts = self.store.list(ctx).await?;
        Ok(accounts.into_iter().map(PublicAccount::from).collect())
    }

    /// Apply a partial update
    ///
    /// Present fields are validated like registration input. A patch with no
    /// fields fails with `NoFieldsToUpdate` before the store is touched.
    pub async fn update(
        &self,
        ctx: &OpContext,
        id: Uuid,
        patch: AccountPatch,
    ) -> Result<PublicAccount> {
        if patch.is_empty() {
            return Err(AccountError::NoFieldsToUpdate);
        }

        let name = patch.name.as_deref().map(normalize_name);
        let email = patch.email.as_deref().map(normalize_email);
        if let Some(name) = &name {
            check_name(name)?;
        }
        if let Some(email) = &email {
            check_email(email)?;
        }

        let account = self
            .store
            .update(ctx, id, AccountPatch { name, email })
            .await?;

        info!(account_id = %account.id, "Account updated");
        Ok(account.into())
    }

    pub async fn delete(&self, ctx: &OpContext, id: Uuid) -> Result<()> {
        self.store.delete(ctx, id).await?;
        info!(account_id = %id, "Account deleted");
        Ok(())
    }

    pub async fn count(&self, ctx: &OpContext) -> Result<i64> {
        self.store.count(ctx).await
    }

    async fn hash_password(&self, ctx: &OpContext, password: &str) -> Result<String> {
        let hasher = Arc::clone(&self.hasher);
        let password = password.to_owned();

        ctx.run(async move {
            let hash = tokio::task::spawn_blocking(move || hasher.hash(&password)).await??;
            Ok(hash)
        })
        .await
    }

    async fn verify_password(&self, ctx: &OpContext, password: &str, hash: &str) -> Result<bool> {
        let hasher = Arc::clone(&self.hasher);
        let password = password.to_owned();
        let hash = hash.to_owned();

        ctx.run(async move {
            let matches =
                tokio::task::spawn_blocking(move || hasher.verify(&password, &hash)).await??;
            Ok(matches)
        })
        .await
    }
}
