// Shared fixtures for account-service integration tests
#![allow(dead_code)]

use account_service::config::{
    DatabaseSettings, JwtSettings, ServerSettings, Settings, ShutdownSettings, WorkerSettings,
};
use account_service::db::{AccountStore, InMemoryAccountStore};
use account_service::services::AccountService;
use crypto_core::{Argon2Hasher, TokenAuthority};
use std::sync::Arc;
use std::time::Duration;

pub const TEST_SECRET: &str = "integration-test-secret-with-enough-length-0123456789";
pub const TEST_ISSUER: &str = "account-service-test";

pub fn authority() -> Arc<TokenAuthority> {
    Arc::new(
        TokenAuthority::from_secret(
            TEST_SECRET,
            "HS256",
            TEST_ISSUER,
            chrono::Duration::hours(1),
        )
        .unwrap(),
    )
}

/// Cheap argon2 parameters keep the suite fast
pub fn accounts_with(store: Arc<dyn AccountStore>) -> AccountService {
    let hasher = Argon2Hasher::with_params(8 * 1024, 1, 1).unwrap();
    AccountService::new(store, Arc::new(hasher))
}

pub fn accounts() -> AccountService {
    accounts_with(Arc::new(InMemoryAccountStore::new()))
}

/// Loopback settings with OS-assigned ports
pub fn settings() -> Settings {
    Settings {
        server: ServerSettings {
            host: "127.0.0.1".to_string(),
            http_port: 0,
            grpc_port: 0,
            request_timeout: Duration::from_secs(10),
        },
        database: DatabaseSettings {
            url: None,
            max_connections: 5,
            acquire_timeout: 5,
        },
        jwt: JwtSettings {
            secret: TEST_SECRET.to_string(),
            algorithm: "HS256".to_string(),
            issuer: TEST_ISSUER.to_string(),
            expiry_seconds: 3600,
        },
        shutdown: ShutdownSettings {
            drain_timeout: Duration::from_secs(10),
            force_timeout: Duration::from_secs(5),
        },
        worker: WorkerSettings {
            count_interval: Duration::from_secs(3600),
            count_timeout: Duration::from_secs(5),
        },
    }
}
