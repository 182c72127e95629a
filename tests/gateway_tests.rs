// Integration tests for the backend gateway.
//
// The chat gateway is exercised against an in-process HTTP stub that records
// what it receives; live-channel frame decoding is tested directly on the
// parser.

use std::sync::{Arc, Mutex};

use advisor_voice::config::{BackendConfig, Language};
use advisor_voice::error::GatewayError;
use advisor_voice::gateway::{parse_server_frame, AdviceBackend, ChatGateway, ServerEvent};
use advisor_voice::session::{Speaker, TurnRecord};
use axum::{extract::State, http::HeaderMap, response::IntoResponse, routing::post, Json, Router};
use base64::Engine;
use serde_json::{json, Value};

// ============================================================================
// Stub completion endpoint
// ============================================================================

#[derive(Clone, Default)]
struct StubState {
    requests: Arc<Mutex<Vec<(Value, Option<String>)>>>,
    reply: Arc<Mutex<Value>>,
    status: Arc<Mutex<u16>>,
}

async fn stub_chat(
    State(state): State<StubState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let api_key = headers
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    state.requests.lock().unwrap().push((body, api_key));

    let status = *state.status.lock().unwrap();
    let reply = state.reply.lock().unwrap().clone();

    (
        axum::http::StatusCode::from_u16(status).unwrap(),
        Json(reply),
    )
}

/// Spawn the stub on an ephemeral port; returns its base URL and state.
async fn spawn_stub() -> (String, StubState) {
    let state = StubState {
        reply: Arc::new(Mutex::new(json!({"text": "stub reply"}))),
        status: Arc::new(Mutex::new(200)),
        ..Default::default()
    };

    let app = Router::new()
        .route("/api/chat", post(stub_chat))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}/api/chat", addr), state)
}

fn gateway_config(url: &str, api_key: Option<&str>) -> BackendConfig {
    BackendConfig {
        chat_url: url.to_string(),
        live_url: "wss://unused.example.com/live".to_string(),
        api_key: api_key.map(String::from),
        request_timeout_secs: 5,
    }
}

fn turn(speaker: Speaker, text: &str) -> TurnRecord {
    TurnRecord {
        speaker,
        text: text.to_string(),
    }
}

// ============================================================================
// Chat gateway
// ============================================================================

#[tokio::test]
async fn test_send_shapes_request_and_returns_reply() {
    let (url, state) = spawn_stub().await;
    let gateway = ChatGateway::new(&gateway_config(&url, None)).unwrap();

    let history = vec![
        turn(Speaker::User, "previous question"),
        turn(Speaker::Advisor, "previous answer"),
    ];

    let reply = gateway
        .send("What about bonds?", &history, Language::En)
        .await
        .unwrap();
    assert_eq!(reply, "stub reply");

    let requests = state.requests.lock().unwrap();
    let (body, api_key) = &requests[0];
    assert!(api_key.is_none());
    assert_eq!(body["message"], "What about bonds?");
    assert_eq!(body["lang"], "en");
    assert_eq!(body["history"][0]["role"], "user");
    assert_eq!(body["history"][0]["text"], "previous question");
    assert_eq!(body["history"][1]["role"], "model");
    assert_eq!(body["history"][1]["text"], "previous answer");
}

#[tokio::test]
async fn test_empty_history_entries_are_filtered() {
    let (url, state) = spawn_stub().await;
    let gateway = ChatGateway::new(&gateway_config(&url, None)).unwrap();

    let history = vec![
        turn(Speaker::User, "kept"),
        turn(Speaker::Advisor, "   "),
        turn(Speaker::User, ""),
    ];

    gateway.send("hello", &history, Language::Fr).await.unwrap();

    let requests = state.requests.lock().unwrap();
    let (body, _) = &requests[0];
    assert_eq!(body["lang"], "fr");
    assert_eq!(body["history"].as_array().unwrap().len(), 1);
    assert_eq!(body["history"][0]["text"], "kept");
}

#[tokio::test]
async fn test_empty_utterance_is_rejected_locally() {
    let (url, state) = spawn_stub().await;
    let gateway = ChatGateway::new(&gateway_config(&url, None)).unwrap();

    let result = gateway.send("   ", &[], Language::En).await;

    assert!(matches!(result, Err(GatewayError::InvalidInput)));
    // Never reached the endpoint
    assert!(state.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_backend_error_carries_status_and_message() {
    let (url, state) = spawn_stub().await;
    *state.status.lock().unwrap() = 500;
    *state.reply.lock().unwrap() = json!({"error": "Clé API manquante"});

    let gateway = ChatGateway::new(&gateway_config(&url, None)).unwrap();
    let result = gateway.send("hello", &[], Language::Fr).await;

    match result {
        Err(GatewayError::Backend { status, message }) => {
            assert_eq!(status, 500);
            assert_eq!(message, "Clé API manquante");
        }
        other => panic!("expected backend error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_api_key_header_is_attached() {
    let (url, state) = spawn_stub().await;
    let gateway = ChatGateway::new(&gateway_config(&url, Some("secret-key"))).unwrap();

    gateway.send("hello", &[], Language::En).await.unwrap();

    let requests = state.requests.lock().unwrap();
    let (_, api_key) = &requests[0];
    assert_eq!(api_key.as_deref(), Some("secret-key"));
}

// ============================================================================
// Live frame decoding
// ============================================================================

#[test]
fn test_parse_frame_with_all_parts_preserves_order() {
    let pcm = vec![1u8, 2, 3, 4];
    let frame = json!({
        "serverContent": {
            "inputTranscription": {"text": "user says"},
            "outputTranscription": {"text": "model says"},
            "modelTurn": {"audioData": base64::engine::general_purpose::STANDARD.encode(&pcm)},
            "turnComplete": true
        }
    });

    let events = parse_server_frame(&frame.to_string()).unwrap();

    assert_eq!(
        events,
        vec![
            ServerEvent::UserTranscript("user says".to_string()),
            ServerEvent::AdvisorTranscript("model says".to_string()),
            ServerEvent::Audio(pcm),
            ServerEvent::TurnComplete,
        ]
    );
}

#[test]
fn test_parse_frame_without_content_yields_nothing() {
    let events = parse_server_frame("{}").unwrap();
    assert!(events.is_empty());

    let events = parse_server_frame(r#"{"setupComplete": {}}"#).unwrap();
    assert!(events.is_empty());
}

#[test]
fn test_parse_interrupted_frame() {
    let frame = json!({"serverContent": {"interrupted": true}});
    let events = parse_server_frame(&frame.to_string()).unwrap();
    assert_eq!(events, vec![ServerEvent::Interrupted]);
}

#[test]
fn test_parse_rejects_malformed_frames() {
    assert!(parse_server_frame("not json").is_err());

    // Valid JSON, invalid base64 audio
    let frame = json!({"serverContent": {"modelTurn": {"audioData": "!!!"}}});
    assert!(parse_server_frame(&frame.to_string()).is_err());
}
