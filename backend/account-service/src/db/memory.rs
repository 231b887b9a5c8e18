//! In-process account store
//!
//! All state lives behind one `tokio::sync::RwLock`. Reads share the lock;
//! every mutation takes it exclusively, so the email check and the write it
//! guards happen as one step. Emails are normalized on the way in, so the
//! index is keyed by the same form whichever caller reaches the store.

use super::AccountStore;
use crate::context::OpContext;
use crate::error::{AccountError, Result};
use crate::models::{Account, AccountPatch, NewAccount};
use crate::validators::normalize_email;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Default)]
struct Accounts {
    by_id: HashMap<Uuid, Account>,
    /// normalized email -> id
    by_email: HashMap<String, Uuid>,
}

#[derive(Debug, Default)]
pub struct InMemoryAccountStore {
    inner: RwLock<Accounts>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn create(&self, ctx: &OpContext, account: NewAccount) -> Result<Account> {
        ctx.run(async {
            let mut guard = self.inner.write().await;

            let mut account = account.into_account();
            account.email = normalize_email(&account.email);

            if guard.by_email.contains_key(&account.email) {
                return Err(AccountError::DuplicateEmail);
            }
            if guard.by_id.contains_key(&account.id) {
                return Err(AccountError::Internal(format!(
                    "account id {} already assigned",
                    account.id
                )));
            }

            guard.by_email.insert(account.email.clone(), account.id);
            guard.by_id.insert(account.id, account.clone());
            Ok(account)
        })
        .await
    }

    async fn get_by_email(&self, ctx: &OpContext, email: &str) -> Result<Account> {
        ctx.run(async {
            let guard = self.inner.read().await;
            guard
                .by_email
                .get(&normalize_email(email))
                .and_then(|id| guard.by_id.get(id))
                .cloned()
                .ok_or(AccountError::NotFound)
        })
        .await
    }

    async fn get_by_id(&self, ctx: &OpContext, id: Uuid) -> Result<Account> {
        ctx.run(async {
            let guard = self.inner.read().await;
            guard.by_id.get(&id).cloned().ok_or(AccountError::NotFound)
        })
        .await
    }

    async fn list(&self, ctx: &OpContext) -> Result<Vec<Account>> {
        ctx.run(async {
            let guard = self.inner.read().await;
            let mut accounts: Vec<Account> = guard.by_id.values().cloned().collect();
            accounts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
            Ok(accounts)
        })
        .await
    }

    async fn update(&self, ctx: &OpContext, id: Uuid, patch: AccountPatch) -> Result<Account> {
        if patch.is_empty() {
            return Err(AccountError::NoFieldsToUpdate);
        }

        ctx.run(async {
            let mut guard = self.inner.write().await;
            let Accounts { by_id, by_email } = &mut *guard;

            let current = by_id.get_mut(&id).ok_or(AccountError::NotFound)?;
            let email = patch.email.as_deref().map(normalize_email);

            if let Some(email) = &email {
                if let Some(holder) = by_email.get(email) {
                    if *holder != id {
                        return Err(AccountError::DuplicateEmail);
                    }
                }
            }

            if let Some(email) = email {
                if email != current.email {
                    by_email.remove(&current.email);
                    by_email.insert(email.clone(), id);
                    current.email = email;
                }
            }
            if let Some(name) = patch.name {
                current.name = name;
            }

            Ok(current.clone())
        })
        .await
    }

    async fn delete(&self, ctx: &OpContext, id: Uuid) -> Result<()> {
        ctx.run(async {
            let mut guard = self.inner.write().await;
            let removed = guard.by_id.remove(&id).ok_or(AccountError::NotFound)?;
            guard.by_email.remove(&removed.email);
            Ok(())
        })
        .await
    }

    async fn count(&self, ctx: &OpContext) -> Result<i64> {
        ctx.run(async {
            let guard = self.inner.read().await;
            Ok(guard.by_id.len() as i64)
        })
        .await
    }
}
