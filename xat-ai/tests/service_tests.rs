//! Mediator service tests against a local fake inference service

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;
use xat_ai::gateway::{
    BoundaryChannel, BoundaryRequest, ChannelError, ChatPayload, ChatRequest, HttpChannel, InferenceBroker,
    InferenceGateway, InferenceOptions, LocalChannel, TagsPayload,
};
use xat_ai::{build_router, AppState};
use xat_common::AiConfig;

type Captured = Arc<Mutex<Vec<Value>>>;

async fn fake_chat(State(captured): State<Captured>, Json(body): Json<Value>) -> Json<Value> {
    captured.lock().unwrap().push(body.clone());
    let model = body["model"].as_str().unwrap_or_default().to_string();
    Json(json!({
        "model": model,
        "created_at": "2024-03-01T12:00:00Z",
        "message": {"role": "assistant", "content": "{\"overallSentiment\": \"agree\", \"confidence\": 0.7}"},
        "done": true
    }))
}

async fn fake_tags() -> Json<Value> {
    Json(json!({"models": [{"name": "llama3.2:3b", "size": 1}, {"name": "mistral:7b", "size": 2}]}))
}

/// Serve `app` on an ephemeral localhost port and return its base URL
async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn fake_inference_service() -> (String, Captured) {
    let captured: Captured = Arc::default();
    let app = Router::new()
        .route("/api/chat", post(fake_chat))
        .route("/api/tags", get(fake_tags))
        .with_state(captured.clone());
    (serve(app).await, captured)
}

fn broker() -> InferenceBroker {
    InferenceBroker::new(Duration::from_secs(5)).unwrap()
}

fn enabled_config(service_url: &str) -> AiConfig {
    AiConfig {
        enabled: true,
        service_url: service_url.to_string(),
        ..AiConfig::default()
    }
}

async fn read_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_broker_chat_sends_fixed_options() {
    let (url, captured) = fake_inference_service().await;
    let request = ChatRequest::new("llama3.2:3b", Some("be brief"), "hello", InferenceOptions::default());

    let data = broker().chat(&format!("{}/", url), &request).await.unwrap();
    assert_eq!(data["message"]["role"], "assistant");

    let sent = captured.lock().unwrap()[0].clone();
    assert_eq!(sent["model"], "llama3.2:3b");
    assert_eq!(sent["stream"], false);
    assert_eq!(sent["options"]["temperature"], 0.3);
    assert_eq!(sent["options"]["num_predict"], 200);
    assert_eq!(sent["messages"][0]["role"], "system");
    assert_eq!(sent["messages"][1]["content"], "hello");
}

#[tokio::test]
async fn test_broker_reports_http_errors_in_envelope() {
    let app = Router::new().route(
        "/api/tags",
        get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "model store locked") }),
    );
    let url = serve(app).await;

    let response = broker()
        .handle(BoundaryRequest::InferenceTags(TagsPayload { service_url: url }))
        .await;
    assert!(!response.success);
    let error = response.error.unwrap();
    assert!(error.contains("500"));
    assert!(error.contains("model store locked"));
}

#[tokio::test]
async fn test_gateway_over_local_channel() {
    let (url, _) = fake_inference_service().await;
    let channel = Arc::new(LocalChannel::spawn(Arc::new(broker()), 8));
    let gateway = InferenceGateway::new(channel, enabled_config(&url));

    let reply = gateway.infer(None, "what do you think?").await.unwrap();
    assert!(reply.contains("overallSentiment"));
    assert_eq!(gateway.list_models().await.unwrap(), vec!["llama3.2:3b", "mistral:7b"]);
}

#[tokio::test]
async fn test_gateway_over_http_channel_through_mediator() {
    let (ollama_url, captured) = fake_inference_service().await;
    let state = AppState::new(broker());
    let mediator_url = serve(build_router(state.clone())).await;

    let channel = Arc::new(HttpChannel::new(&mediator_url, Duration::from_secs(5)).unwrap());
    let gateway = InferenceGateway::new(channel, enabled_config(&ollama_url));

    let reply = gateway.infer(Some("system"), "user").await.unwrap();
    assert!(reply.contains("agree"));
    assert_eq!(captured.lock().unwrap().len(), 1);
    assert_eq!(state.requests_handled(), 1);

    // Disabled pipeline never reaches the mediator, but the connection test does
    gateway
        .reconfigure(AiConfig {
            enabled: false,
            ..enabled_config(&ollama_url)
        })
        .await;
    assert!(gateway.infer(None, "user").await.is_none());
    assert_eq!(gateway.list_models().await.unwrap().len(), 2);
    assert_eq!(state.requests_handled(), 2);
}

#[tokio::test]
async fn test_unreachable_service_is_remote_error() {
    let state = AppState::new(broker());
    let mediator_url = serve(build_router(state.clone())).await;
    let channel = HttpChannel::new(&mediator_url, Duration::from_secs(5)).unwrap();
    let gateway = InferenceGateway::new(Arc::new(channel), enabled_config("http://127.0.0.1:9"));

    assert!(gateway.infer(None, "hello").await.is_none());
    assert!(matches!(gateway.list_models().await, Err(ChannelError::Remote(_))));
    assert!(state.last_error.read().await.is_some());
}

#[tokio::test]
async fn test_http_channel_to_missing_mediator_is_transport_error() {
    let channel = HttpChannel::new("http://127.0.0.1:9/", Duration::from_secs(2)).unwrap();
    assert_eq!(channel.base_url(), "http://127.0.0.1:9");
    let result = channel
        .send(BoundaryRequest::InferenceTags(TagsPayload {
            service_url: "http://127.0.0.1:11434".to_string(),
        }))
        .await;
    assert!(matches!(result, Err(ChannelError::Transport(_))));
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = build_router(AppState::new(broker()));
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = read_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "xat-ai");
    assert_eq!(body["requests_handled"], 0);
    assert!(body.get("last_error").is_none());
}

#[tokio::test]
async fn test_message_rejects_malformed_envelope() {
    let app = build_router(AppState::new(broker()));
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/message")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"kind": "inferenceSing", "payload": {}}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json(response).await;
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_message_accepts_wire_format() {
    let (url, captured) = fake_inference_service().await;
    let app = build_router(AppState::new(broker()));
    let envelope = serde_json::to_string(&BoundaryRequest::InferenceChat(ChatPayload {
        service_url: url,
        request: ChatRequest::new("mistral:7b", None, "hi", InferenceOptions::default()),
    }))
    .unwrap();
    assert!(envelope.contains(r#""kind":"inferenceChat""#));
    assert!(envelope.contains(r#""serviceUrl""#));

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/message")
                .header("content-type", "application/json")
                .body(Body::from(envelope))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["model"], "mistral:7b");
    assert_eq!(captured.lock().unwrap()[0]["model"], "mistral:7b");
}
