use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Stored account, including the credential hash
///
/// Not `Serialize`: only `PublicAccount` crosses a transport.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Account {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn to_public(&self) -> PublicAccount {
        PublicAccount::from(self)
    }
}

/// Account projection returned to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicAccount {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl PublicAccount {
    /// RFC 3339 timestamp with second precision, as carried on the RPC wire
    pub fn created_at_rfc3339(&self) -> String {
        self.created_at.to_rfc3339_opts(SecondsFormat::Secs, true)
    }
}

impl From<&Account> for PublicAccount {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            name: account.name.clone(),
            email: account.email.clone(),
            created_at: account.created_at,
        }
    }
}

impl From<Account> for PublicAccount {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            name: account.name,
            email: account.email,
            created_at: account.created_at,
        }
    }
}

/// Input to `AccountStore::create`
///
/// `id` and `created_at` are assigned by the store when absent.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub id: Option<Uuid>,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl NewAccount {
    pub fn new(name: String, email: String, password_hash: String) -> Self {
        Self {
            id: None,
            name,
            email,
            password_hash,
            created_at: None,
        }
    }

    /// Fill in store-assigned fields
    pub fn into_account(self) -> Account {
        Account {
            id: self.id.unwrap_or_else(Uuid::new_v4),
            name: self.name,
            email: self.email,
            password_hash: self.password_hash,
            created_at: self.created_at.unwrap_or_else(Utc::now),
        }
    }
}

/// Partial update; an empty patch is an error, not a no-op
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AccountPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl AccountPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none()
    }
}
