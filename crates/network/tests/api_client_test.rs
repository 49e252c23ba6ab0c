use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use pointpay_net::{ApiClient, Config, NetError};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio_test::{assert_err, assert_ok};

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct TokenReply {
    token: String,
}

async fn spawn_stub(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/api", addr)
}

fn stub_routes() -> Router {
    Router::new()
        .route(
            "/api/token",
            post(|Json(body): Json<Value>| async move {
                Json(json!({
                    "success": true,
                    "message": "Token generated",
                    "data": { "token": format!("tok-{}", body["amount"]) }
                }))
            }),
        )
        .route(
            "/api/whoami",
            get(|headers: HeaderMap| async move {
                let auth = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("")
                    .to_string();
                Json(json!({ "success": true, "data": { "token": auth } }))
            }),
        )
        .route(
            "/api/broke",
            get(|| async {
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "success": false, "message": "insufficient points for this transaction" })),
                )
            }),
        )
        .route(
            "/api/down",
            get(|| async { (StatusCode::BAD_GATEWAY, "upstream unavailable") }),
        )
}

#[tokio::test]
async fn test_post_data_unwraps_envelope() {
    let base = spawn_stub(stub_routes()).await;
    let client = pointpay_net::api_client(&base).unwrap();

    let reply: TokenReply = assert_ok!(client.post_data("/token", &json!({ "amount": 500 })).await);
    assert_eq!(reply.token, "tok-500");
}

#[tokio::test]
async fn test_bearer_token_is_sent() {
    let base = spawn_stub(stub_routes()).await;
    let client = ApiClient::new(
        Config::default()
            .with_base_url(&base)
            .with_bearer_token("jwt-1"),
    )
    .unwrap();

    let reply: TokenReply = client.get_data("/whoami").await.unwrap();
    assert_eq!(reply.token, "Bearer jwt-1");
}

#[tokio::test]
async fn test_api_error_carries_server_message() {
    let base = spawn_stub(stub_routes()).await;
    let client = pointpay_net::api_client(&base).unwrap();

    let err = assert_err!(client.get_data::<TokenReply>("/broke").await);
    match err {
        NetError::Api { status, message } => {
            assert_eq!(status, 400);
            assert!(message.contains("insufficient points"));
        }
        other => panic!("expected api error, got {:?}", other),
    }
    assert!(!client.get_data::<TokenReply>("/broke").await.unwrap_err().is_transient());
}

#[tokio::test]
async fn test_non_json_gateway_error_is_transient() {
    let base = spawn_stub(stub_routes()).await;
    let client = pointpay_net::api_client(&base).unwrap();

    let err = assert_err!(client.get_data::<TokenReply>("/down").await);
    assert!(matches!(err, NetError::Api { status: 502, .. }));
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_connection_refused_is_transient() {
    // Bind then drop to get a port with nothing listening.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = ApiClient::new(
        Config::default()
            .with_base_url(&format!("http://{}/api", addr))
            .with_timeout(2),
    )
    .unwrap();

    let err = client.get_data::<TokenReply>("/whoami").await.unwrap_err();
    assert!(err.is_transient(), "unexpected error: {:?}", err);
}
