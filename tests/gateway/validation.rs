use crate::support::{GatewayTestServer, ScriptedProvider};
use futures_util::StreamExt;
use interview_relay::client::RelayClient;
use interview_relay::error::StreamError;
use reqwest::StatusCode;
use serde_json::{Value, json};

async fn post(server: &GatewayTestServer, path: &str, body: Value) -> (StatusCode, Value) {
    let response = reqwest::Client::new()
        .post(server.url(path))
        .json(&body)
        .send()
        .await
        .expect("request should complete");
    let status = response.status();
    let body = response.json().await.expect("response should be json");
    (status, body)
}

#[tokio::test]
async fn interview_stream_requires_prompt() {
    let provider = ScriptedProvider::replying(&["unused"]);
    let server = GatewayTestServer::start(provider.clone()).await;

    for body in [json!({}), json!({"prompt": ""}), json!({"prompt": "  \n"})] {
        let (status, payload) = post(&server, "/api/v1/interview/stream/", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(payload["error"], "Missing 'prompt' in request body");
    }
    assert!(provider.prompts().is_empty(), "no upstream call on rejection");
}

#[tokio::test]
async fn chat_endpoints_require_input() {
    let server = GatewayTestServer::start(ScriptedProvider::replying(&["unused"])).await;

    for path in ["/api/v1/chat/", "/api/v1/chat/stream/", "/api/v1/chat/stream"] {
        let (status, payload) = post(&server, path, json!({"message": "wrong field"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{path}");
        assert_eq!(payload["error"], "Missing 'input' in request body");
    }
}

#[tokio::test]
async fn non_json_body_is_rejected_with_json_error() {
    let server = GatewayTestServer::start(ScriptedProvider::replying(&["unused"])).await;
    let response = reqwest::Client::new()
        .post(server.url("/api/v1/interview/stream/"))
        .header("content-type", "application/json")
        .body("prompt=hello")
        .send()
        .await
        .expect("request should complete");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let payload: Value = response.json().await.expect("error body should be json");
    assert!(
        payload
            .get("error")
            .and_then(Value::as_str)
            .is_some_and(|msg| msg.starts_with("Invalid JSON body"))
    );
}

#[tokio::test]
async fn client_sees_rejection_as_status_error() {
    let server = GatewayTestServer::start(ScriptedProvider::replying(&["unused"])).await;
    let client = RelayClient::new(&server.base_url(), 10);

    let events: Vec<_> = client.stream_chat("   ").collect().await;
    assert_eq!(
        events,
        vec![Err(StreamError::Status {
            status: 400,
            body: "Missing 'input' in request body".into(),
        })]
    );
}

#[tokio::test]
async fn whole_response_chat_and_test_endpoints() {
    let provider = ScriptedProvider::new(vec![
        vec![Ok("Hello"), Ok(" there")],
        vec![Ok("Congratulations!")],
    ]);
    let server = GatewayTestServer::start(provider.clone()).await;

    let (status, payload) = post(&server, "/api/v1/chat/", json!({"input": "hi"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(payload["output"], "Hello there");

    let response = reqwest::get(server.url("/api/v1/test/"))
        .await
        .expect("test endpoint should answer");
    assert_eq!(response.status(), StatusCode::OK);
    let payload: Value = response.json().await.expect("test output should be json");
    assert_eq!(payload["output"], "Congratulations!");
    assert!(provider.prompts()[1].contains("Congratulations"));
}
