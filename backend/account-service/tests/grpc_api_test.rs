// Integration tests for the account gRPC API
//
// Each test starts the full application on loopback ports and talks to it
// with the generated client.

mod common;

use account_service::grpc::user::v1::user_service_client::UserServiceClient;
use account_service::grpc::user::v1::{CreateUserRequest, GetUserRequest};
use account_service::Application;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tonic::transport::Channel;
use tonic::{Code, Request};

struct Running {
    client: UserServiceClient<Channel>,
    grpc_url: String,
    stop: oneshot::Sender<()>,
    handle: JoinHandle<anyhow::Result<()>>,
}

impl Running {
    async fn shutdown(self) {
        let _ = self.stop.send(());
        self.handle.await.unwrap().unwrap();
    }
}

async fn start() -> Running {
    let app = Application::with_services(
        common::settings(),
        common::accounts(),
        common::authority(),
    )
    .await
    .unwrap();
    let grpc_url = format!("http://{}", app.grpc_addr().unwrap());

    let (stop, stopped) = oneshot::channel::<()>();
    let handle = tokio::spawn(app.run_until(async move {
        let _ = stopped.await;
    }));

    let client = UserServiceClient::connect(grpc_url.clone()).await.unwrap();
    Running {
        client,
        grpc_url,
        stop,
        handle,
    }
}

fn create(name: &str, email: &str, password: &str) -> Request<CreateUserRequest> {
    Request::new(CreateUserRequest {
        name: name.to_string(),
        email: email.to_string(),
        password: password.to_string(),
    })
}

fn get(id: &str, authorization: Option<String>) -> Request<GetUserRequest> {
    let mut request = Request::new(GetUserRequest { id: id.to_string() });
    if let Some(value) = authorization {
        request
            .metadata_mut()
            .insert("authorization", value.parse().unwrap());
    }
    request
}

#[tokio::test]
async fn test_create_then_get_user() {
    let mut running = start().await;

    let created = running
        .client
        .create_user(create("Grace", "Grace@Example.com", "hopper-1906"))
        .await
        .unwrap()
        .into_inner();
    let user = created.user.unwrap();
    assert_eq!(user.email, "grace@example.com");
    assert!(chrono::DateTime::parse_from_rfc3339(&user.created_at).is_ok());
    assert_eq!(common::authority().validate(&created.token).unwrap(), user.id);

    let fetched = running
        .client
        .get_user(get(&user.id, Some(format!("Bearer {}", created.token))))
        .await
        .unwrap()
        .into_inner()
        .user
        .unwrap();
    assert_eq!(fetched, user);

    running.shutdown().await;
}

#[tokio::test]
async fn test_create_user_errors() {
    let mut running = start().await;

    running
        .client
        .create_user(create("Grace", "grace@example.com", "hopper-1906"))
        .await
        .unwrap();

    let dup = running
        .client
        .create_user(create("Other", "GRACE@example.com", "hopper-1906"))
        .await
        .unwrap_err();
    assert_eq!(dup.code(), Code::AlreadyExists);

    let short = running
        .client
        .create_user(create("Other", "other@example.com", "short"))
        .await
        .unwrap_err();
    assert_eq!(short.code(), Code::InvalidArgument);

    let unnamed = running
        .client
        .create_user(create("   ", "third@example.com", "hopper-1906"))
        .await
        .unwrap_err();
    assert_eq!(unnamed.code(), Code::InvalidArgument);

    running.shutdown().await;
}

#[tokio::test]
async fn test_get_user_authorization() {
    let mut running = start().await;

    let grace = running
        .client
        .create_user(create("Grace", "grace@example.com", "hopper-1906"))
        .await
        .unwrap()
        .into_inner();
    let alan = running
        .client
        .create_user(create("Alan", "alan@example.com", "turing-1912"))
        .await
        .unwrap()
        .into_inner();
    let grace_id = grace.user.unwrap().id;
    let alan_id = alan.user.unwrap().id;

    let missing = running.client.get_user(get(&grace_id, None)).await.unwrap_err();
    assert_eq!(missing.code(), Code::Unauthenticated);

    // A raw token without the scheme is not accepted
    let raw = running
        .client
        .get_user(get(&grace_id, Some(grace.token.clone())))
        .await
        .unwrap_err();
    assert_eq!(raw.code(), Code::Unauthenticated);

    let foreign = running
        .client
        .get_user(get(&alan_id, Some(format!("Bearer {}", grace.token))))
        .await
        .unwrap_err();
    assert_eq!(foreign.code(), Code::PermissionDenied);

    let own = running
        .client
        .get_user(get(&alan_id, Some(format!("bearer {}", alan.token))))
        .await
        .unwrap();
    assert_eq!(own.into_inner().user.unwrap().name, "Alan");

    running.shutdown().await;
}

#[tokio::test]
async fn test_health_service_reports_serving() {
    use tonic_health::pb::health_check_response::ServingStatus;
    use tonic_health::pb::health_client::HealthClient;
    use tonic_health::pb::HealthCheckRequest;

    let running = start().await;
    let channel = Channel::from_shared(running.grpc_url.clone())
        .unwrap()
        .connect()
        .await
        .unwrap();
    let mut health = HealthClient::new(channel);

    let response = health
        .check(HealthCheckRequest {
            service: "user.v1.UserService".to_string(),
        })
        .await
        .unwrap()
        .into_inner();
    assert_eq!(response.status, ServingStatus::Serving as i32);

    running.shutdown().await;
}
