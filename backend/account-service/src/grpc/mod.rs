/// gRPC server module for account-service
///
/// Exports:
/// - AccountGrpcService: UserService implementation
/// - RpcAuthLayer: bearer token enforcement for every method
/// - user::v1: Generated protobuf types from user_service.proto
pub mod auth_layer;
pub mod server;

pub use auth_layer::{account_auth_policy, RpcAuthLayer, HEALTH_CHECK_METHOD, HEALTH_WATCH_METHOD};
pub use server::user;
pub use server::{AccountGrpcService, CREATE_USER_METHOD, GET_USER_METHOD};
