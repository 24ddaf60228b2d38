//! Inference client tests against a fake chat-completions endpoint
//!
//! The fake API is an axum router bound to an ephemeral local port; it
//! records the request it received and answers with a canned response.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};
use species_analyzer::services::classifier::{SYSTEM_PROMPT, USER_PROMPT};
use species_analyzer::services::{
    ClassifierConfig, ClassifyError, EncodedImage, OpenAiClassifier, SpeciesClassifier,
};
use tokio::sync::Mutex;

#[derive(Clone)]
struct FakeApi {
    status: StatusCode,
    response: Value,
    captured: Arc<Mutex<Option<(HeaderMap, Value)>>>,
}

async fn fake_completions(
    State(api): State<FakeApi>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    *api.captured.lock().await = Some((headers, body));
    (api.status, Json(api.response.clone()))
}

/// Start the fake API; returns its base URL and the captured request slot
async fn spawn_fake_api(
    status: StatusCode,
    response: Value,
) -> (String, Arc<Mutex<Option<(HeaderMap, Value)>>>) {
    let captured = Arc::new(Mutex::new(None));
    let api = FakeApi {
        status,
        response,
        captured: captured.clone(),
    };

    let app = Router::new()
        .route("/v1/chat/completions", post(fake_completions))
        .with_state(api);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}/v1", addr), captured)
}

fn classifier(base_url: &str) -> OpenAiClassifier {
    let mut config = ClassifierConfig::new("sk-test-key");
    config.base_url = base_url.to_string();
    config.timeout = Duration::from_secs(5);
    OpenAiClassifier::new(config).unwrap()
}

fn image() -> EncodedImage {
    EncodedImage {
        mime_type: "image/png",
        base64: "iVBORw0KGgo=".to_string(),
        byte_len: 8,
    }
}

fn completion_with(content: Value) -> Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "model": "gpt-4o-2024-08-06",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content, "refusal": null },
            "finish_reason": "stop"
        }]
    })
}

fn grey_wolf() -> Value {
    json!({
        "group": "Mammalia",
        "binomial": "Canis lupus",
        "iucn_id_no": 3746,
        "common_name": "Grey Wolf",
        "name_language": "English",
        "iucn_category": "LC",
        "iso_a3": "CAN",
        "total_area": 63_000_000.0,
        "small_range": false,
        "wb_datanam": "Canada",
        "wb_iso": "CA",
        "datanam_area": 9_000_000.5,
        "datanam_pct_area": 14.2
    })
}

#[tokio::test]
async fn test_classify_sends_structured_request() {
    let (base_url, captured) =
        spawn_fake_api(StatusCode::OK, completion_with(json!(grey_wolf().to_string()))).await;

    let record = classifier(&base_url).classify(&image()).await.unwrap();
    assert_eq!(record.common_name, "Grey Wolf");
    assert_eq!(record.iucn_id_no, 3746);
    assert_eq!(record.datanam_pct_area, 14.2);

    let (headers, body) = captured.lock().await.take().expect("request captured");
    assert_eq!(headers["authorization"], "Bearer sk-test-key");

    assert_eq!(body["model"], "gpt-4o-2024-08-06");
    assert_eq!(body["messages"][0]["content"], SYSTEM_PROMPT);
    assert_eq!(body["messages"][1]["content"][0]["text"], USER_PROMPT);
    assert_eq!(
        body["messages"][1]["content"][1]["image_url"]["url"],
        "data:image/png;base64,iVBORw0KGgo="
    );
    assert_eq!(body["response_format"]["json_schema"]["strict"], true);
    assert_eq!(
        body["response_format"]["json_schema"]["schema"]["required"]
            .as_array()
            .unwrap()
            .len(),
        13
    );
}

#[tokio::test]
async fn test_unauthorized_maps_to_auth_error() {
    let (base_url, _) = spawn_fake_api(
        StatusCode::UNAUTHORIZED,
        json!({ "error": { "message": "Incorrect API key provided" } }),
    )
    .await;

    let result = classifier(&base_url).classify(&image()).await;
    assert!(matches!(result, Err(ClassifyError::Auth(401))));
}

#[tokio::test]
async fn test_server_error_carries_api_message() {
    let (base_url, _) = spawn_fake_api(
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({ "error": { "message": "The server had an error" } }),
    )
    .await;

    match classifier(&base_url).classify(&image()).await {
        Err(ClassifyError::Api(500, msg)) => assert_eq!(msg, "The server had an error"),
        other => panic!("expected Api error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_refusal_maps_to_refused() {
    let response = json!({
        "choices": [{
            "message": { "role": "assistant", "content": null, "refusal": "I can't identify people." }
        }]
    });
    let (base_url, _) = spawn_fake_api(StatusCode::OK, response).await;

    let result = classifier(&base_url).classify(&image()).await;
    assert!(matches!(result, Err(ClassifyError::Refused(_))));
}

#[tokio::test]
async fn test_schema_mismatch_maps_to_schema_error() {
    let mut wrong = grey_wolf();
    wrong["iucn_id_no"] = json!("not a number");
    let (base_url, _) =
        spawn_fake_api(StatusCode::OK, completion_with(json!(wrong.to_string()))).await;

    let result = classifier(&base_url).classify(&image()).await;
    assert!(matches!(result, Err(ClassifyError::Schema(_))));
}

#[tokio::test]
async fn test_invalid_country_code_maps_to_schema_error() {
    let mut wrong = grey_wolf();
    wrong["iso_a3"] = json!("Canada");
    let (base_url, _) =
        spawn_fake_api(StatusCode::OK, completion_with(json!(wrong.to_string()))).await;

    let result = classifier(&base_url).classify(&image()).await;
    assert!(matches!(result, Err(ClassifyError::Schema(_))));
}

#[tokio::test]
async fn test_unreachable_endpoint_maps_to_transport_error() {
    // Bind then drop to get a port with nothing listening
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let result = classifier(&format!("http://{}/v1", addr))
        .classify(&image())
        .await;
    assert!(matches!(result, Err(ClassifyError::Transport(_))));
}
