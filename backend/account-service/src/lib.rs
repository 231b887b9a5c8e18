/// Account Service Library
///
/// Account registration, authentication and lookup over HTTP and gRPC.
///
/// ## Modules
///
/// - `app`: Process wiring (listeners, store selection, service units)
/// - `config`: Service configuration
/// - `context`: Deadline and cancellation carried by every operation
/// - `db`: Account stores (in-memory and PostgreSQL)
/// - `error`: Error types
/// - `grpc`: gRPC server implementation
/// - `http`: HTTP API
/// - `models`: Data models
/// - `security`: Bearer authentication and RPC method policy
/// - `services`: Business logic
/// - `supervisor`: Lifecycle state machine for the long-running units
/// - `validators`: Input validation
/// - `workers`: Background jobs
pub mod app;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod grpc;
pub mod http;
pub mod models;
pub mod security;
pub mod services;
pub mod supervisor;
pub mod validators;
pub mod workers;

// Re-export commonly used types
pub use app::Application;
pub use error::{AccountError, Result};
pub use supervisor::LifecycleState;
