// End-to-end exchanges against a real HTTP server (wiremock): request
// shape, exactly-once completion, error paths, and close idempotence.

mod common;

use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use sluice::client::SluiceClient;
use sluice::connection::ConnectionState;
use sluice::exchange::ExchangeOutcome;
use sluice::request::SendOptions;

use common::{init_tracing, sse_body, RecordingCallbacks};

async fn server_with_body(body: String) -> MockServer {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/stream"))
        .and(header("Accept", "text/event-stream"))
        .and(header("Cache-Control", "no-cache"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn full_conversation_round_trip() {
    let body = sse_body(&[
        json!({"type": "start", "thread_id": "t1"}),
        json!({"type": "custom_stream", "thread_id": "t1", "custom_llm_chunk": "Hello "}),
        json!({"type": "custom_stream", "thread_id": "t1", "custom_llm_chunk": "world"}),
        json!({"type": "complete", "thread_id": "t1"}),
    ]);
    let server = server_with_body(body).await;

    let callbacks = RecordingCallbacks::new();
    let client = SluiceClient::new(server.uri());
    client.set_callbacks(callbacks.clone());

    let outcome = client.send_message("hi", SendOptions::default()).await;
    assert!(outcome.is_success());

    assert_eq!(callbacks.content(), "Hello world");
    assert_eq!(
        callbacks.calls(),
        vec![
            "start:t1",
            "status:streaming",
            "content:Hello ",
            "content:world",
            "complete:t1"
        ]
    );
}

#[tokio::test]
async fn completion_signals_racing_resolve_once() {
    // Both a run_finished-shaped event and the [DONE] sentinel arrive.
    let body = sse_body(&[json!({"type": "complete", "thread_id": "t1"})]);
    let server = server_with_body(body).await;

    let callbacks = RecordingCallbacks::new();
    let client = SluiceClient::new(server.uri());
    client.set_callbacks(callbacks.clone());

    let outcome = client.send_message("hi", SendOptions::default()).await;
    assert!(outcome.is_success());
    assert_eq!(callbacks.count_prefix("complete"), 1);
    assert_eq!(callbacks.count_prefix("error"), 0);
}

#[tokio::test]
async fn backend_error_surfaces_exactly_one_on_error() {
    let body = sse_body(&[
        json!({"type": "error", "thread_id": "t1", "code": "E_BACKEND", "message": "agent crashed"}),
        json!({"type": "complete", "thread_id": "t1"}),
    ]);
    let server = server_with_body(body).await;

    let callbacks = RecordingCallbacks::new();
    let client = SluiceClient::new(server.uri());
    client.set_callbacks(callbacks.clone());

    let outcome = client.send_message("hi", SendOptions::default()).await;
    match outcome {
        ExchangeOutcome::Failed(error) => {
            assert_eq!(error.code, "E_BACKEND");
            assert_eq!(error.message, "agent crashed");
        }
        other => panic!("Expected failure, got {:?}", other),
    }
    assert_eq!(callbacks.count_prefix("error"), 1);
    assert_eq!(callbacks.count_prefix("complete"), 0);
}

#[tokio::test]
async fn non_2xx_connect_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/stream"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let callbacks = RecordingCallbacks::new();
    let client = SluiceClient::new(server.uri());
    client.set_callbacks(callbacks.clone());

    let outcome = client.send_message("hi", SendOptions::default()).await;
    match outcome {
        ExchangeOutcome::Failed(error) => {
            assert_eq!(error.code, "E_TRANSPORT_STATUS");
            assert!(error.message.contains("maintenance"));
        }
        other => panic!("Expected failure, got {:?}", other),
    }
    assert_eq!(callbacks.count_prefix("error"), 1);
}

#[tokio::test]
async fn natural_stream_end_counts_as_completion() {
    // No terminal event at all; EOF resolves the exchange.
    let body = "data: {\"type\":\"start\",\"thread_id\":\"t9\"}\n\n".to_string();
    let server = server_with_body(body).await;

    let callbacks = RecordingCallbacks::new();
    let client = SluiceClient::new(server.uri());
    client.set_callbacks(callbacks.clone());

    let outcome = client.send_message("hi", SendOptions::default()).await;
    match outcome {
        ExchangeOutcome::Completed(complete) => {
            assert_eq!(complete.thread_id.as_deref(), Some("t9"));
        }
        other => panic!("Expected completion, got {:?}", other),
    }
    assert_eq!(callbacks.count_prefix("complete"), 1);
}

#[tokio::test]
async fn connection_close_is_idempotent_after_run() {
    let body = sse_body(&[]);
    let server = server_with_body(body).await;

    let client = SluiceClient::new(server.uri());
    let (exchange, request) = client.prepare("hi", &SendOptions::default()).unwrap();
    let connection = exchange.connection();

    let outcome = exchange.run(&request).await;
    assert!(outcome.is_success());
    assert_eq!(connection.state(), ConnectionState::Closed);

    // Double close: same observable state, no error.
    connection.close(None, None).unwrap();
    connection.close(Some(1000), Some("again".to_string())).unwrap();
    assert_eq!(connection.state(), ConnectionState::Closed);
}

#[tokio::test]
async fn bearer_token_and_json_body_reach_the_wire() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/stream"))
        .and(header("Authorization", "Bearer sesame"))
        .and(header("Content-Type", "application/json"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(sse_body(&[]), "text/event-stream"),
        )
        .mount(&server)
        .await;

    let client = SluiceClient::new(server.uri()).with_auth_token("sesame");
    let outcome = client
        .send_message(
            "hello",
            SendOptions {
                thread_id: Some("t1".to_string()),
                ..Default::default()
            },
        )
        .await;
    // The mock only matches when the headers are present; success proves
    // the request shape.
    assert!(outcome.is_success());

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["prompt"], "hello");
    assert_eq!(body["thread_id"], "t1");
}

#[tokio::test]
async fn legacy_and_structured_dialects_mix_in_one_stream() {
    let body = sse_body(&[
        // Legacy start.
        json!({"type": "start", "sessionId": "s1"}),
        // Structured content (not custom-stream raw: filtered from content
        // callbacks but still normalized and dispatched).
        json!({"type": "text_message_content", "thread_id": "s1", "message_id": "m1", "delta": "ignored"}),
        // Legacy custom_stream token.
        json!({"type": "custom_stream", "sessionId": "s1", "custom_llm_chunk": "real"}),
        json!({"type": "end", "sessionId": "s1"}),
    ]);
    let server = server_with_body(body).await;

    let callbacks = RecordingCallbacks::new();
    let client = SluiceClient::new(server.uri());
    client.set_callbacks(callbacks.clone());

    let outcome = client.send_message("hi", SendOptions::default()).await;
    assert!(outcome.is_success());
    assert_eq!(callbacks.content(), "real");
    assert_eq!(callbacks.count_prefix("complete"), 1);
}
