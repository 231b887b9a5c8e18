//! Token enforcement in front of every gRPC method
//!
//! The layer wraps the whole tonic router, so it sees the full method path of
//! each call before routing. Public paths pass straight through. Every other
//! path needs a valid bearer token, and the resulting `AuthContext` is placed
//! in the request extensions for the handler to pick up.

use super::server::CREATE_USER_METHOD;
use crate::security::{AuthContext, RpcAuthPolicy};
use crypto_core::TokenAuthority;
use futures::future::BoxFuture;
use std::sync::Arc;
use std::task::{Context, Poll};
use tonic::body::BoxBody;
use tonic::codegen::http;
use tower::{Layer, Service};
use tracing::debug;

pub const HEALTH_CHECK_METHOD: &str = "/grpc.health.v1.Health/Check";
pub const HEALTH_WATCH_METHOD: &str = "/grpc.health.v1.Health/Watch";

/// Registration and health checks are reachable without a token
pub fn account_auth_policy(authority: Arc<TokenAuthority>) -> RpcAuthPolicy {
    RpcAuthPolicy::new(authority)
        .allow_unauthenticated(CREATE_USER_METHOD)
        .allow_unauthenticated(HEALTH_CHECK_METHOD)
        .allow_unauthenticated(HEALTH_WATCH_METHOD)
}

/// Tower layer applying an `RpcAuthPolicy` to every call
#[derive(Debug, Clone)]
pub struct RpcAuthLayer {
    policy: Arc<RpcAuthPolicy>,
}

impl RpcAuthLayer {
    pub fn new(policy: RpcAuthPolicy) -> Self {
        Self {
            policy: Arc::new(policy),
        }
    }
}

impl<S> Layer<S> for RpcAuthLayer {
    type Service = RpcAuthService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RpcAuthService {
            inner,
            policy: Arc::clone(&self.policy),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RpcAuthService<S> {
    inner: S,
    policy: Arc<RpcAuthPolicy>,
}

impl<S, ReqBody> Service<http::Request<ReqBody>> for RpcAuthService<S>
where
    S: Service<http::Request<ReqBody>, Response = http::Response<BoxBody>>,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: http::Request<ReqBody>) -> Self::Future {
        match self.policy.authorize(req.uri().path(), req.headers()) {
            Ok(Some(auth)) => {
                req.extensions_mut().insert::<AuthContext>(auth);
            }
            Ok(None) => {}
            Err(err) => {
                debug!(method = %req.uri().path(), "Rejected gRPC call without valid token");
                let response = err.to_status().into_http();
                return Box::pin(async move { Ok(response) });
            }
        }

        Box::pin(self.inner.call(req))
    }
}
