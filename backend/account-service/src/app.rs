//! Process wiring
//!
//! `Application::build` turns `Settings` into a ready-to-run process: token
//! authority, account store, both bound listeners. `run_until` hands the three
//! service units to the supervisor.
//!
//! Listeners are bound while the lifecycle is still `Starting`, so a port
//! conflict fails startup instead of surfacing later as a unit error.

use crate::config::{JwtSettings, Settings};
use crate::db::{AccountStore, InMemoryAccountStore, PgAccountStore};
use crate::grpc::user::v1::user_service_server::UserServiceServer;
use crate::grpc::{account_auth_policy, AccountGrpcService, RpcAuthLayer};
use crate::http::{build_router, AppState};
use crate::services::AccountService;
use crate::supervisor::{LifecycleState, ServiceUnit, Supervisor};
use crate::workers::{run_account_count_probe, AccountCountConfig};
use anyhow::{anyhow, Context, Result};
use crypto_core::{validate_signing_secret, Argon2Hasher, SecretStrength, TokenAuthority};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_stream::wrappers::TcpListenerStream;
use tokio_util::sync::CancellationToken;
use tonic::transport::Server;
use tracing::{info, warn};

pub const HTTP_UNIT: &str = "http";
pub const GRPC_UNIT: &str = "grpc";
pub const COUNT_PROBE_UNIT: &str = "account-count";

/// Build the token authority, rejecting an empty secret and warning on a weak one
pub fn build_token_authority(jwt: &JwtSettings) -> Result<TokenAuthority> {
    match validate_signing_secret(&jwt.secret) {
        Ok(SecretStrength::Weak) => {
            warn!("JWT_SECRET is weak; use at least 32 random bytes outside development")
        }
        Ok(strength) => info!(?strength, "JWT signing secret validated"),
        Err(e) => return Err(anyhow!(e)).context("Invalid JWT_SECRET"),
    }

    let authority = TokenAuthority::from_secret(
        &jwt.secret,
        &jwt.algorithm,
        jwt.issuer.clone(),
        chrono::Duration::seconds(jwt.expiry_seconds),
    )
    .context("Failed to initialize token authority")?;

    info!(
        issuer = authority.issuer(),
        expiry_seconds = authority.expiry().num_seconds(),
        "Token authority ready"
    );
    Ok(authority)
}

/// Postgres when `DATABASE_URL` is set, otherwise an in-process store
pub async fn build_account_store(settings: &Settings) -> Result<Arc<dyn AccountStore>> {
    match &settings.database.url {
        Some(url) => {
            let store = PgAccountStore::connect(&settings.database, url).await?;
            Ok(Arc::new(store))
        }
        None => {
            warn!("DATABASE_URL not set; accounts are kept in memory and lost on exit");
            Ok(Arc::new(InMemoryAccountStore::new()))
        }
    }
}

pub struct Application {
    settings: Settings,
    accounts: AccountService,
    authority: Arc<TokenAuthority>,
    http_listener: TcpListener,
    grpc_listener: TcpListener,
    supervisor: Supervisor,
}

impl Application {
    pub async fn build(settings: Settings) -> Result<Self> {
        let authority = Arc::new(build_token_authority(&settings.jwt)?);
        let store = build_account_store(&settings).await?;
        let accounts = AccountService::new(store, Arc::new(Argon2Hasher::new()));

        Self::with_services(settings, accounts, authority).await
    }

    /// Bind both listeners around already constructed services
    pub async fn with_services(
        settings: Settings,
        accounts: AccountService,
        authority: Arc<TokenAuthority>,
    ) -> Result<Self> {
        let supervisor = Supervisor::new();

        let http_addr = settings.server.http_addr();
        let http_listener = TcpListener::bind(&http_addr)
            .await
            .with_context(|| format!("Failed to bind HTTP listener on {}", http_addr))?;

        let grpc_addr = settings.server.grpc_addr();
        let grpc_listener = TcpListener::bind(&grpc_addr)
            .await
            .with_context(|| format!("Failed to bind gRPC listener on {}", grpc_addr))?;

        Ok(Self {
            settings,
            accounts,
            authority,
            http_listener,
            grpc_listener,
            supervisor,
        })
    }

    pub fn http_addr(&self) -> Result<SocketAddr> {
        self.http_listener
            .local_addr()
            .context("HTTP listener has no local address")
    }

    pub fn grpc_addr(&self) -> Result<SocketAddr> {
        self.grpc_listener
            .local_addr()
            .context("gRPC listener has no local address")
    }

    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.supervisor.subscribe()
    }

    /// Cancelling the returned token stops the process as a signal would
    pub fn shutdown_token(&self) -> CancellationToken {
        self.supervisor.shutdown_token()
    }

    /// Serve until `signal` resolves or a unit fails; returns the first unit error
    pub async fn run_until<S>(self, signal: S) -> Result<()>
    where
        S: Future<Output = ()>,
    {
        let Application {
            settings,
            accounts,
            authority,
            http_listener,
            grpc_listener,
            supervisor,
        } = self;

        info!(addr = %http_listener.local_addr()?, "HTTP server listening");
        info!(addr = %grpc_listener.local_addr()?, "gRPC server listening");

        let router = build_router(AppState {
            accounts: accounts.clone(),
            authority: Arc::clone(&authority),
            request_timeout: settings.server.request_timeout,
        });
        let grpc_auth = RpcAuthLayer::new(account_auth_policy(Arc::clone(&authority)));
        let grpc = AccountGrpcService::new(
            accounts.clone(),
            authority,
            settings.server.request_timeout,
        );
        let probe = AccountCountConfig {
            interval: settings.worker.count_interval,
            probe_timeout: settings.worker.count_timeout,
        };

        let units = vec![
            ServiceUnit::new(HTTP_UNIT, settings.shutdown.drain_timeout, move |token| async move {
                axum::serve(http_listener, router)
                    .with_graceful_shutdown(async move { token.cancelled().await })
                    .await
                    .context("HTTP server error")
            }),
            ServiceUnit::new(GRPC_UNIT, settings.shutdown.force_timeout, move |token| async move {
                let (mut reporter, health) = tonic_health::server::health_reporter();
                reporter
                    .set_serving::<UserServiceServer<AccountGrpcService>>()
                    .await;

                Server::builder()
                    .layer(grpc_auth)
                    .add_service(health)
                    .add_service(grpc.into_server())
                    .serve_with_incoming_shutdown(
                        TcpListenerStream::new(grpc_listener),
                        async move {
                            token.cancelled().await;
                            reporter
                                .set_not_serving::<UserServiceServer<AccountGrpcService>>()
                                .await;
                        },
                    )
                    .await
                    .context("gRPC server error")
            }),
            ServiceUnit::new(
                COUNT_PROBE_UNIT,
                settings.shutdown.drain_timeout,
                move |token| async move {
                    let ticks = run_account_count_probe(accounts, probe, token).await;
                    info!(ticks, "Account count probe stopped");
                    Ok(())
                },
            ),
        ];

        let result = supervisor.run(units, signal).await;
        match &result {
            Ok(()) => info!("Account service shutdown complete"),
            Err(e) => warn!(error = %format!("{e:#}"), "Account service stopped with error"),
        }
        result
    }
}
