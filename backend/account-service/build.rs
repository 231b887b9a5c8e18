// Build script for account-service
// Compiles user_service.proto for gRPC server and client code generation
fn main() {
    println!("cargo:rerun-if-changed=../proto/services/user_service.proto");

    // Client code is generated for integration tests
    tonic_build::configure()
        .build_server(true)
        .build_client(true)
        .compile_protos(
            &["../proto/services/user_service.proto"],
            &["../proto/services"],
        )
        .expect("Failed to compile user_service.proto for account-service");
}
