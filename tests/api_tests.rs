#![cfg(feature = "api")]

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use video_qa_rust::api::{router, AppState};
use video_qa_rust::cache::ContextCache;
use video_qa_rust::config::ConfigBuilder;
use video_qa_rust::llm::mock::MockLLM;
use video_qa_rust::processing::BatchProcessor;
use video_qa_rust::suggest::QuestionSuggester;
use video_qa_rust::youtube::{TranscriptFetcher, TranscriptSegment, TranscriptSource, VideoId};

struct StaticFetcher;

#[async_trait]
impl TranscriptFetcher for StaticFetcher {
    async fn fetch_segments(&self, video_id: &VideoId) -> anyhow::Result<Vec<TranscriptSegment>> {
        match video_id.as_str() {
            "demo123" => Ok(vec![
                TranscriptSegment::new("Rust has no garbage collector.", 0.0, 3.0),
                TranscriptSegment::new("Memory is freed when the owner goes out of scope.", 3.0, 4.0),
            ]),
            _ => anyhow::bail!("transcripts are disabled for this video"),
        }
    }
}

fn app(llm: MockLLM) -> Router {
    let config = ConfigBuilder::new().with_delays(0, 0).build();
    let llm = Arc::new(llm);

    router(AppState {
        processor: Arc::new(BatchProcessor::new(
            llm.clone(),
            ContextCache::new(&config.cache),
            &config,
        )),
        transcripts: TranscriptSource::new(Arc::new(StaticFetcher)),
        suggester: Arc::new(QuestionSuggester::new(Some(llm), &config)),
    })
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    let request = match body {
        Some(body) => request.body(Body::from(body.to_string())),
        None => request.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn test_health() {
    let app = app(MockLLM::new());
    let (status, body) = send(&app, Method::GET, "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["cached_answers"], 0);
}

#[tokio::test]
async fn test_index_page_is_served() {
    let app = app(MockLLM::new());
    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let html = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(html.contains("Process Questions"));
    assert!(html.contains("Clear History"));
}

#[tokio::test]
async fn test_transcript_endpoint() {
    let app = app(MockLLM::new());
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/transcript",
        Some(json!({ "url": "https://youtu.be/demo123" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["video_id"], "demo123");
    assert_eq!(
        body["data"]["transcript"],
        "Rust has no garbage collector. Memory is freed when the owner goes out of scope."
    );
}

#[tokio::test]
async fn test_invalid_url_is_bad_request() {
    let app = app(MockLLM::new());
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/transcript",
        Some(json!({ "url": "https://example.com/video" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("Invalid YouTube URL"));
}

#[tokio::test]
async fn test_missing_transcript_is_unprocessable() {
    let app = app(MockLLM::new());
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/transcript",
        Some(json!({ "url": "https://www.youtube.com/watch?v=silent" })),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("disabled"));
}

#[tokio::test]
async fn test_session_question_and_history_flow() {
    let app = app(MockLLM::new().with_default_response("When its owner goes out of scope."));

    let (status, body) = send(&app, Method::POST, "/api/sessions", None).await;
    assert_eq!(status, StatusCode::OK);
    let id = body["data"]["conversation_id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/sessions/{}/questions", id),
        Some(json!({
            "url": "https://youtu.be/demo123",
            "questions": ["When is memory freed?", "   "]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["results"][0]["status"], "success");
    assert_eq!(
        body["data"]["results"][0]["answer"],
        "When its owner goes out of scope."
    );

    let history_uri = format!("/api/sessions/{}/history", id);
    let (_, body) = send(&app, Method::GET, &history_uri, None).await;
    let messages = body["data"]["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["role"], "user");
    assert_eq!(messages[1]["role"], "assistant");

    let (status, _) = send(&app, Method::DELETE, &history_uri, None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = send(&app, Method::GET, &history_uri, None).await;
    assert!(body["data"]["messages"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_empty_question_list_is_rejected() {
    let app = app(MockLLM::new());
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/sessions/abc/questions",
        Some(json!({ "url": "https://youtu.be/demo123", "questions": ["", "  "] })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Question is empty");
}

#[tokio::test]
async fn test_suggestions_endpoint() {
    let app = app(MockLLM::new().with_default_response("1. Why no GC?\n2. What is scope?"));

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/suggestions",
        Some(json!({ "url": "https://youtu.be/demo123", "limit": 3 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["questions"].as_array().unwrap().len(), 3);

    let (_, body) = send(
        &app,
        Method::POST,
        "/api/suggestions",
        Some(json!({ "url": "https://youtu.be/demo123", "generate": true })),
    )
    .await;
    assert_eq!(body["data"]["questions"], json!(["Why no GC?", "What is scope?"]));
}

#[tokio::test]
async fn test_cache_reset() {
    let llm = MockLLM::new().with_default_response("Answer");
    let app = app(llm.clone());
    let ask = json!({ "url": "https://youtu.be/demo123", "questions": ["Same question?"] });

    send(&app, Method::POST, "/api/sessions/s1/questions", Some(ask.clone())).await;
    let (status, _) = send(&app, Method::DELETE, "/api/cache", None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&app, Method::POST, "/api/sessions/s1/questions", Some(ask)).await;
    assert_eq!(body["data"]["results"][0]["cached"], false);
    assert_eq!(llm.call_count(), 2);

    let (_, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(body["cached_transcripts"], 1);
}
