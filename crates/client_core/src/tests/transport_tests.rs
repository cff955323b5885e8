use super::*;
use server_api::{build_router, ApiContext};
use serde_json::json;
use shared::{
    domain::{Role, SessionId},
    error::ErrorCode,
    protocol::{session_positions_route, sessions_route},
};
use storage::Storage;
use tokio::net::TcpListener;

async fn spawn_backend(storage: Storage) -> anyhow::Result<String> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let app = build_router(ApiContext::new(storage));
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(format!("http://{addr}"))
}

#[test]
fn base_url_gains_a_trailing_slash() {
    let transport = HttpTransport::new("http://localhost:8443/api").expect("url");
    assert_eq!(transport.base_url().as_str(), "http://localhost:8443/api/");
    assert_eq!(
        transport.url("/admin/sessions").expect("join").as_str(),
        "http://localhost:8443/api/admin/sessions"
    );
    assert!(HttpTransport::new("not a url").is_err());
}

#[tokio::test]
async fn talks_to_a_live_backend() -> anyhow::Result<()> {
    let base = spawn_backend(Storage::new()).await?;
    let transport = HttpTransport::new(&base)?;

    let session = transport
        .post(&sessions_route(Role::Admin), json!({"name": "2025 Fall"}))
        .await?;
    assert_eq!(session["id"], json!(1));

    let listed = transport.get(&sessions_route(Role::Ta)).await?;
    assert_eq!(listed[0]["name"], json!("2025 Fall"));

    let positions = transport
        .get(&session_positions_route(Role::Admin, SessionId(1)))
        .await?;
    assert_eq!(positions, json!([]));
    Ok(())
}

#[tokio::test]
async fn error_bodies_become_typed_errors() -> anyhow::Result<()> {
    let base = spawn_backend(Storage::new()).await?;
    let transport = HttpTransport::new(&base)?;
    transport
        .post(&sessions_route(Role::Admin), json!({"name": "Fall"}))
        .await?;

    let err = transport
        .post(&sessions_route(Role::Admin), json!({"name": "Fall"}))
        .await
        .expect_err("duplicate");
    assert_eq!(err.code(), Some(ErrorCode::Validation));

    let err = transport
        .get(&session_positions_route(Role::Admin, SessionId(77)))
        .await
        .expect_err("unknown session");
    assert_eq!(err.code(), Some(ErrorCode::NotFound));
    Ok(())
}

#[tokio::test]
async fn unreachable_backend_is_a_request_error() -> anyhow::Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);

    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let transport = HttpTransport::new(&format!("http://{addr}"))?;
    let err = transport
        .get("/healthz")
        .await
        .expect_err("nothing listening");
    assert!(matches!(err, TransportError::Request(_)), "{err}");
    Ok(())
}
