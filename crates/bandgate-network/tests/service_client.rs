//! `ServiceClient` against an in-process stand-in for the rfid-security service.

use axum::Json;
use axum::extract::Path;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use bandgate_core::Uid;
use bandgate_network::service::API_KEY_HEADER;
use bandgate_network::{
    Authorization, Authorizer, ServiceClient, ServiceConfig, SslVerify, sync_sounds,
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::json;
use std::net::SocketAddr;

const KEY: &str = "test-key";

async fn authorized(headers: HeaderMap, Path((uid, permission)): Path<(String, String)>) -> Response {
    if headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok()) != Some(KEY) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    match (uid.as_str(), permission.as_str()) {
        ("04AABBCC", "Open Door") => Json(json!({
            "media": {"id": "04AABBCC", "name": "Band"},
            "sound": {"id": 1, "name": "ada.wav"},
            "color": {"int": 0x00FF00, "hex": "00ff00", "html": "#00ff00"}
        }))
        .into_response(),
        ("04AABBCC", _) => StatusCode::FORBIDDEN.into_response(),
        ("0BAD", _) => (StatusCode::OK, "not json").into_response(),
        _ => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

async fn sounds() -> Json<serde_json::Value> {
    Json(json!([
        {"id": 1, "name": "ada.wav", "last_update_timestamp": "2024-05-01T12:00:00Z"},
        {"id": 2, "name": "bob.wav", "last_update_timestamp": null}
    ]))
}

async fn sound(Path(name): Path<String>) -> Json<serde_json::Value> {
    Json(json!({
        "id": 1,
        "name": name,
        "content": STANDARD.encode(format!("RIFF-{name}")),
    }))
}

async fn start_service() -> SocketAddr {
    let app = axum::Router::new()
        .route("/api/v1.0/authorized/{uid}/{permission}", get(authorized))
        .route("/api/v1.0/sounds", get(sounds))
        .route("/api/v1.0/sounds/{name}", get(sound));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    address
}

fn client(address: SocketAddr, key: &str) -> ServiceClient {
    ServiceClient::new(ServiceConfig {
        api_url: format!("http://{address}/api/v1.0"),
        api_key: key.to_string(),
        ssl_verify: SslVerify::Disabled,
    })
    .unwrap()
}

/// Runs the blocking `authorize` the way a handler does: off the runtime.
async fn authorize(client: ServiceClient, uid: &str, permission: &str) -> Authorization {
    let uid: Uid = uid.parse().unwrap();
    let permission = permission.to_string();
    tokio::task::spawn_blocking(move || client.authorize(&uid, &permission))
        .await
        .unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn test_granted_with_media_config() {
    let address = start_service().await;

    match authorize(client(address, KEY), "04aabbcc", "Open Door").await {
        Authorization::Granted(config) => {
            assert_eq!(config.sound_name(), Some("ada.wav"));
            assert_eq!(config.color.map(|c| c.int), Some(0x00FF00));
        }
        Authorization::Denied => panic!("expected a grant"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unreadable_body_grants_with_defaults() {
    let address = start_service().await;

    let authorization = authorize(client(address, KEY), "0BAD", "Open Door").await;
    assert_eq!(authorization, Authorization::Granted(Default::default()));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_forbidden_denies() {
    let address = start_service().await;

    let authorization = authorize(client(address, KEY), "04AABBCC", "Staff Only").await;
    assert_eq!(authorization, Authorization::Denied);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unexpected_status_denies() {
    let address = start_service().await;

    let authorization = authorize(client(address, KEY), "0123", "Open Door").await;
    assert_eq!(authorization, Authorization::Denied);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_wrong_key_denies() {
    let address = start_service().await;

    let authorization = authorize(client(address, "wrong"), "04AABBCC", "Open Door").await;
    assert_eq!(authorization, Authorization::Denied);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unreachable_service_denies() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let address = listener.local_addr().unwrap();
    drop(listener);

    let authorization = authorize(client(address, KEY), "04AABBCC", "Open Door").await;
    assert_eq!(authorization, Authorization::Denied);
}

#[tokio::test]
async fn test_sync_downloads_catalog() {
    let address = start_service().await;
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("bob.wav"), b"local").unwrap();

    let report = sync_sounds(&client(address, KEY), dir.path()).await.unwrap();

    assert_eq!(report.downloaded, vec!["ada.wav".to_string()]);
    assert_eq!(report.current, vec!["bob.wav".to_string()]);
    assert_eq!(std::fs::read(dir.path().join("ada.wav")).unwrap(), b"RIFF-ada.wav");
    assert_eq!(std::fs::read(dir.path().join("bob.wav")).unwrap(), b"local");
}
