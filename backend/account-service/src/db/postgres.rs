//! Postgres-backed account store
//!
//! Uniqueness is delegated to the `accounts_email_key` unique index; a
//! violation surfaces as `DuplicateEmail` rather than a database error.
//! Emails are normalized before they are bound, and the table refuses any
//! row whose email is not already in normalized form.

use super::AccountStore;
use crate::config::DatabaseSettings;
use crate::context::OpContext;
use crate::error::{AccountError, Result};
use crate::models::{Account, AccountPatch, NewAccount};
use crate::validators::normalize_email;
use anyhow::Context;
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

const EMAIL_UNIQUE_INDEX: &str = "accounts_email_key";
const ACCOUNT_COLUMNS: &str = "id, name, email, password_hash, created_at";

#[derive(Debug, Clone)]
pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool and apply pending migrations
    pub async fn connect(settings: &DatabaseSettings, url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(Duration::from_secs(settings.acquire_timeout))
            .connect(url)
            .await
            .context("Failed to connect to PostgreSQL")?;

        info!(
            max_connections = settings.max_connections,
            "Database pool initialized"
        );

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("Failed to run database migrations")?;
        info!("Database migrations completed");

        Ok(Self::new(pool))
    }
}

/// Translate write failures, keeping the unique index signal distinct
fn map_write_error(err: sqlx::Error) -> AccountError {
    match &err {
        sqlx::Error::Database(db)
            if db.is_unique_violation() && db.constraint() == Some(EMAIL_UNIQUE_INDEX) =>
        {
            AccountError::DuplicateEmail
        }
        _ => AccountError::from(err),
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn create(&self, ctx: &OpContext, account: NewAccount) -> Result<Account> {
        let mut account = account.into_account();
        account.email = normalize_email(&account.email);

        ctx.run(async {
            sqlx::query_as::<_, Account>(&format!(
                r#"
                INSERT INTO accounts (id, name, email, password_hash, created_at)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING {ACCOUNT_COLUMNS}
                "#
            ))
            .bind(account.id)
            .bind(&account.name)
            .bind(&account.email)
            .bind(&account.password_hash)
            .bind(account.created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(map_write_error)
        })
        .await
    }

    async fn get_by_email(&self, ctx: &OpContext, email: &str) -> Result<Account> {
        ctx.run(async {
            sqlx::query_as::<_, Account>(&format!(
                "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE email = $1"
            ))
            .bind(normalize_email(email))
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AccountError::NotFound)
        })
        .await
    }

    async fn get_by_id(&self, ctx: &OpContext, id: Uuid) -> Result<Account> {
        ctx.run(async {
            sqlx::query_as::<_, Account>(&format!(
                "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1"
            ))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AccountError::NotFound)
        })
        .await
    }

    async fn list(&self, ctx: &OpContext) -> Result<Vec<Account>> {
        ctx.run(async {
            let accounts = sqlx::query_as::<_, Account>(&format!(
                "SELECT {ACCOUNT_COLUMNS} FROM accounts ORDER BY created_at DESC, id"
            ))
            .fetch_all(&self.pool)
            .await?;
            Ok(accounts)
        })
        .await
    }

    async fn update(&self, ctx: &OpContext, id: Uuid, patch: AccountPatch) -> Result<Account> {
        if patch.is_empty() {
            return Err(AccountError::NoFieldsToUpdate);
        }

        ctx.run(async {
            sqlx::query_as::<_, Account>(&format!(
                r#"
                UPDATE accounts
                SET name = COALESCE($2, name),
                    email = COALESCE($3, email)
                WHERE id = $1
                RETURNING {ACCOUNT_COLUMNS}
                "#
            ))
            .bind(id)
            .bind(patch.name.as_deref())
            .bind(patch.email.as_deref().map(normalize_email))
            .fetch_optional(&self.pool)
            .await
            .map_err(map_write_error)?
            .ok_or(AccountError::NotFound)
        })
        .await
    }

    async fn delete(&self, ctx: &OpContext, id: Uuid) -> Result<()> {
        ctx.run(async {
            let result = sqlx::query("DELETE FROM accounts WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await?;

            if result.rows_affected() == 0 {
                return Err(AccountError::NotFound);
            }
            Ok(())
        })
        .await
    }

    async fn count(&self, ctx: &OpContext) -> Result<i64> {
        ctx.run(async {
            let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM accounts")
                .fetch_one(&self.pool)
                .await?;
            Ok(count)
        })
        .await
    }
}
