//! gRPC server implementation for account-service
//!
//! Implements the RPCs from user_service.proto:
//! - CreateUser: public, returns the new account and a token
//! - GetUser: bearer token required, caller may only read its own account
//!
//! Tokens are checked by `RpcAuthLayer` before a handler runs; handlers only
//! read the `AuthContext` it leaves in the request extensions.

use crate::context::OpContext;
use crate::error::AccountError;
use crate::models::PublicAccount;
use crate::security::AuthContext;
use crate::services::AccountService;
use crypto_core::TokenAuthority;
use std::sync::Arc;
use std::time::Duration;
use tonic::{Request, Response, Status};
use tracing::{error, info};

// Import generated protobuf types
pub mod user {
    pub mod v1 {
        tonic::include_proto!("user.v1");
    }
}

use user::v1::user_service_server::{UserService, UserServiceServer};
use user::v1::*;

pub const CREATE_USER_METHOD: &str = "/user.v1.UserService/CreateUser";
pub const GET_USER_METHOD: &str = "/user.v1.UserService/GetUser";

/// Account gRPC server
#[derive(Clone)]
pub struct AccountGrpcService {
    accounts: AccountService,
    authority: Arc<TokenAuthority>,
    request_timeout: Duration,
}

impl AccountGrpcService {
    pub fn new(
        accounts: AccountService,
        authority: Arc<TokenAuthority>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            accounts,
            authority,
            request_timeout,
        }
    }

    pub fn into_server(self) -> UserServiceServer<Self> {
        UserServiceServer::new(self)
    }

    fn request_context(&self) -> OpContext {
        OpContext::with_timeout(self.request_timeout)
    }
}

/// Identity attached by `RpcAuthLayer`; absent means the layer was bypassed
fn caller<T>(request: &Request<T>) -> Result<AuthContext, Status> {
    request
        .extensions()
        .get::<AuthContext>()
        .copied()
        .ok_or_else(|| AccountError::Unauthenticated.to_status())
}

fn to_proto_user(account: &PublicAccount) -> User {
    User {
        id: account.id.to_string(),
        name: account.name.clone(),
        email: account.email.clone(),
        created_at: account.created_at_rfc3339(),
    }
}

#[tonic::async_trait]
impl UserService for AccountGrpcService {
    /// Register a new account and return a token for it
    async fn create_user(
        &self,
        request: Request<CreateUserRequest>,
    ) -> std::result::Result<Response<CreateUserResponse>, Status> {
        let req = request.into_inner();
        let ctx = self.request_context();

        let account = self
            .accounts
            .register(&ctx, &req.name, &req.email, &req.password)
            .await?;

        let token = self.authority.issue(&account.id.to_string()).map_err(|e| {
            error!(account_id = %account.id, error = %e, "Failed to issue token");
            Status::internal("failed to generate token")
        })?;

        info!(account_id = %account.id, "Account created via gRPC");

        Ok(Response::new(CreateUserResponse {
            user: Some(to_proto_user(&account)),
            token,
        }))
    }

    /// Fetch the caller's own account
    async fn get_user(
        &self,
        request: Request<GetUserRequest>,
    ) -> std::result::Result<Response<GetUserResponse>, Status> {
        let auth = caller(&request)?;
        let id = auth.ensure_owner(&request.get_ref().id)?;
        let ctx = self.request_context();

        let account = self.accounts.get(&ctx, id).await?;

        Ok(Response::new(GetUserResponse {
            user: Some(to_proto_user(&account)),
        }))
    }
}
