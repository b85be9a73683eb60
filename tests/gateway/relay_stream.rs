use crate::support::{GatewayTestServer, ScriptedProvider};
use futures_util::StreamExt;
use interview_relay::client::{ConsumerEvent, RelayClient, consume};
use interview_relay::error::StreamError;
use interview_relay::interview::{DialogueRequest, first_turn_prompt};
use interview_relay::protocol::{StreamFrame, decode};
use reqwest::StatusCode;
use serde_json::json;

async fn raw_body(server: &GatewayTestServer, path: &str, body: serde_json::Value) -> String {
    let response = reqwest::Client::new()
        .post(server.url(path))
        .json(&body)
        .send()
        .await
        .expect("relay request should complete");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok()),
        Some("text/event-stream")
    );
    response.text().await.expect("relay body should be text")
}

async fn consume_in_reads(
    body: &str,
    read_size: usize,
) -> Vec<Result<ConsumerEvent, StreamError>> {
    let reads: Vec<Result<Vec<u8>, std::io::Error>> = body
        .as_bytes()
        .chunks(read_size)
        .map(|chunk| Ok(chunk.to_vec()))
        .collect();
    consume(futures_util::stream::iter(reads)).collect().await
}

#[tokio::test]
async fn backend_engineer_first_turn_streams_and_completes() {
    let provider = ScriptedProvider::replying(&["Tell", " me", " about..."]);
    let server = GatewayTestServer::start(provider.clone()).await;
    let client = RelayClient::new(&server.base_url(), 10);

    let request = DialogueRequest::first_turn(first_turn_prompt("Backend Engineer"));
    let events: Vec<_> = client
        .stream_interview(&request)
        .map(|event| event.expect("relay stream should not fail locally"))
        .collect()
        .await;

    assert_eq!(
        events,
        vec![
            ConsumerEvent::Update { text: "Tell".into() },
            ConsumerEvent::Update { text: "Tell me".into() },
            ConsumerEvent::Update {
                text: "Tell me about...".into()
            },
            ConsumerEvent::Completed {
                text: "Tell me about...".into()
            },
        ]
    );

    let prompts = provider.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("Backend Engineer"));
    assert!(prompts[0].contains("exactly 6 questions"));
}

#[tokio::test]
async fn every_record_mirrors_the_first_turn_tag() {
    let server = GatewayTestServer::start(ScriptedProvider::replying(&["A", "B"])).await;
    let body = raw_body(
        &server,
        "/api/v1/interview/stream/",
        json!({"prompt": "p", "isFirstMessage": false}),
    )
    .await;

    assert_eq!(
        body,
        "data: {\"chunk\":\"A\",\"done\":false,\"isFirstMessage\":false}\n\n\
         data: {\"chunk\":\"B\",\"done\":false,\"isFirstMessage\":false}\n\n\
         data: {\"chunk\":\"\",\"done\":true,\"isFirstMessage\":false}\n\n"
    );
}

#[tokio::test]
async fn chat_records_carry_no_tag() {
    let server = GatewayTestServer::start(ScriptedProvider::replying(&["Hi"])).await;
    let body = raw_body(&server, "/api/v1/chat/stream/", json!({"input": "hello"})).await;

    assert_eq!(
        body,
        "data: {\"chunk\":\"Hi\",\"done\":false}\n\n\
         data: {\"chunk\":\"\",\"done\":true}\n\n"
    );
}

#[tokio::test]
async fn upstream_failure_is_a_single_in_band_terminal() {
    let provider = ScriptedProvider::new(vec![vec![Ok("Tell"), Err("boom"), Ok("never")]]);
    let server = GatewayTestServer::start(provider).await;
    let body = raw_body(
        &server,
        "/api/v1/interview/stream/",
        json!({"prompt": "p", "isFirstMessage": true}),
    )
    .await;

    let (records, rest) = decode(&body);
    assert!(rest.is_empty(), "no bytes after the terminal record");
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].frame, StreamFrame::chunk("Tell"));
    assert!(records.iter().filter(|r| r.frame.is_terminal()).count() == 1);
    match &records[1].frame {
        StreamFrame::Error(message) => assert!(message.contains("boom")),
        other => panic!("expected error record, got {other:?}"),
    }
    assert!(!body.contains("never"));
}

#[tokio::test]
async fn consumer_result_does_not_depend_on_read_size() {
    let server =
        GatewayTestServer::start(ScriptedProvider::replying(&["caf\u{e9}", " \u{1f680}", " ok"]))
            .await;
    let body = raw_body(
        &server,
        "/api/v1/interview/stream/",
        json!({"prompt": "p", "isFirstMessage": true}),
    )
    .await;

    let whole = consume_in_reads(&body, body.len()).await;
    assert_eq!(
        whole.last(),
        Some(&Ok(ConsumerEvent::Completed {
            text: "caf\u{e9} \u{1f680} ok".into()
        }))
    );
    for read_size in [1, 2, 5, 13, 64] {
        assert_eq!(
            consume_in_reads(&body, read_size).await,
            whole,
            "read size {read_size}"
        );
    }
}

#[tokio::test]
async fn error_record_reaches_client_as_failed_event() {
    let provider = ScriptedProvider::new(vec![vec![Err("boom")]]);
    let server = GatewayTestServer::start(provider).await;
    let client = RelayClient::new(&server.base_url(), 10);

    let events: Vec<_> = client
        .stream_interview(&DialogueRequest::follow_up("p".into()))
        .collect()
        .await;

    assert_eq!(events.len(), 1);
    match &events[0] {
        Ok(ConsumerEvent::Failed { message }) => {
            assert!(message.starts_with("Failed to generate interview response"));
            assert!(message.contains("boom"));
        }
        other => panic!("expected Failed event, got {other:?}"),
    }
}
