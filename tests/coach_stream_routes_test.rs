// ABOUTME: End-to-end tests for the coaching stream and health routes through the full router
// ABOUTME: Exercises SSE framing, pre-stream error statuses, cancellation, deadlines, and disconnects
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;
mod helpers;

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use helpers::axum_test::{parse_sse_frames, AxumTestRequest, SseFrame};
use helpers::fake_upstream::{refused_endpoint, FakeUpstream, UpstreamReply};
use helpers::scripted_provider::{ScriptStep, ScriptedProvider};
use pierre_coach_server::llm::{CoachProvider, OpenAiCompatibleProvider, TokenEvent};
use pierre_coach_server::resources::CoachResources;
use pierre_coach_server::routes::router;
use serde_json::{json, Value};

const STREAM_PATH: &str = "/ai/coach/stream";

fn coach_body(message: &str) -> Value {
    json!({"userId": common::TEST_USER, "message": message})
}

fn real_provider(endpoint: &str) -> Arc<dyn CoachProvider> {
    let config = common::test_config(endpoint);
    Arc::new(OpenAiCompatibleProvider::new(config.provider).unwrap())
}

fn scripted_resources(provider: Arc<ScriptedProvider>) -> Arc<CoachResources> {
    common::create_test_resources(
        common::test_config("http://127.0.0.1:9/v1"),
        common::seeded_store(),
        provider,
    )
}

fn events(frames: &[SseFrame], name: &str) -> usize {
    frames.iter().filter(|frame| frame.event == name).count()
}

#[tokio::test]
async fn test_stream_relays_chunks_then_one_done() {
    let upstream =
        FakeUpstream::start(UpstreamReply::completion(&["Your volume ", "is trending up."])).await;
    let resources = common::create_test_resources(
        common::test_config(&upstream.endpoint()),
        common::seeded_store(),
        real_provider(&upstream.endpoint()),
    );

    let response = AxumTestRequest::post(STREAM_PATH)
        .header("x-request-id", "req-e2e-1")
        .json(&coach_body("How is my training going?"))
        .send(router(resources.clone()))
        .await;

    assert_eq!(response.status(), 200);
    assert_eq!(response.header("x-request-id").as_deref(), Some("req-e2e-1"));
    assert!(response
        .header("content-type")
        .unwrap()
        .starts_with("text/event-stream"));

    let frames = response.sse_frames();
    assert!(events(&frames, "chunk") >= 1);
    assert_eq!(events(&frames, "done"), 1);
    assert_eq!(events(&frames, "error"), 0);

    let done = frames.last().unwrap();
    assert_eq!(done.event, "done");
    assert_eq!(done.data["type"], "done");
    assert_eq!(done.data["request_id"], "req-e2e-1");
    assert_eq!(done.data["finish_reason"], "stop");

    let text: String = frames
        .iter()
        .filter(|frame| frame.event == "chunk")
        .map(|frame| frame.data["delta"].as_str().unwrap().to_owned())
        .collect();
    assert_eq!(text, "Your volume is trending up.");

    // The upstream saw the workout summary and the user's question
    let request = upstream.last_request().unwrap();
    let system = request["messages"][0]["content"].as_str().unwrap();
    assert!(system.contains("[workout] duration_minutes n=3"));
    let messages = request["messages"].as_array().unwrap();
    assert_eq!(
        messages.last().unwrap()["content"],
        "How is my training going?"
    );

    assert_eq!(resources.sessions.active_count(), 0);
}

#[tokio::test]
async fn test_history_token_continues_conversation() {
    let provider = Arc::new(ScriptedProvider::completing(&["ok"]));
    let resources = scripted_resources(provider.clone());

    let response = AxumTestRequest::post(STREAM_PATH)
        .json(&json!({
            "userId": common::TEST_USER,
            "message": "What about this week?",
            "historyToken": "h-1"
        }))
        .send(router(resources))
        .await;

    assert_eq!(response.status(), 200);
    let contexts = provider.contexts();
    assert_eq!(contexts.len(), 1);
    let history = contexts[0].conversation_history();
    assert_eq!(history.len(), 3);
    assert_eq!(history[2].content, "What about this week?");
}

#[tokio::test]
async fn test_generated_request_id_matches_done_frame() {
    let provider = Arc::new(ScriptedProvider::completing(&["hi"]));
    let response = AxumTestRequest::post(STREAM_PATH)
        .json(&coach_body("hello"))
        .send(router(scripted_resources(provider)))
        .await;

    let request_id = response.header("x-request-id").unwrap();
    let frames = response.sse_frames();
    assert_eq!(frames.last().unwrap().data["request_id"], request_id.as_str());
}

#[tokio::test]
async fn test_unreachable_provider_gives_single_error_frame() {
    let endpoint = refused_endpoint().await;
    let resources = common::create_test_resources(
        common::test_config(&endpoint),
        common::seeded_store(),
        real_provider(&endpoint),
    );

    let response = AxumTestRequest::post(STREAM_PATH)
        .json(&coach_body("Plan my week"))
        .send(router(resources))
        .await;

    assert_eq!(response.status(), 200);
    let frames = response.sse_frames();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].event, "error");
    assert_eq!(frames[0].data["code"], "PROVIDER_UNAVAILABLE");
}

#[tokio::test]
async fn test_wall_clock_budget_ends_with_timeout_frame() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        ScriptStep::Emit(TokenEvent::chunk("Let me think")),
        ScriptStep::Hang,
    ]));
    let mut config = common::test_config("http://127.0.0.1:9/v1");
    config.stream.request_timeout = Duration::from_millis(300);
    let resources = common::create_test_resources(config, common::seeded_store(), provider.clone());

    let response = AxumTestRequest::post(STREAM_PATH)
        .json(&coach_body("hello"))
        .send(router(resources))
        .await;

    let frames = response.sse_frames();
    assert_eq!(events(&frames, "chunk"), 1);
    assert_eq!(frames.last().unwrap().data["code"], "TIMEOUT");
    assert!(provider.stream_dropped());
}

#[tokio::test]
async fn test_client_disconnect_releases_session_and_provider() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        ScriptStep::Emit(TokenEvent::chunk("first")),
        ScriptStep::Hang,
    ]));
    let resources = scripted_resources(provider.clone());

    let response = AxumTestRequest::post(STREAM_PATH)
        .header("x-request-id", "req-leaving")
        .json(&coach_body("hello"))
        .send_streaming(router(resources.clone()))
        .await;
    assert!(resources.sessions.is_active("req-leaving"));

    let mut body = response.into_body().into_data_stream();
    let first = body.next().await.unwrap().unwrap();
    let frames = parse_sse_frames(std::str::from_utf8(&first).unwrap());
    assert_eq!(frames[0].event, "chunk");

    drop(body);

    assert!(!resources.sessions.is_active("req-leaving"));
    assert!(provider.stream_dropped());
}

#[tokio::test]
async fn test_delete_ends_active_stream_with_cancelled_frame() {
    let provider = Arc::new(ScriptedProvider::new(vec![ScriptStep::Hang]));
    let resources = scripted_resources(provider.clone());
    let app = router(resources.clone());

    let response = AxumTestRequest::post(STREAM_PATH)
        .header("x-request-id", "req-cancel-me")
        .json(&coach_body("hello"))
        .send_streaming(app.clone())
        .await;
    assert_eq!(response.status(), 200);

    let cancelled = AxumTestRequest::delete("/ai/coach/stream/req-cancel-me")
        .send(app.clone())
        .await;
    assert_eq!(cancelled.status(), 204);

    let body = tokio::time::timeout(
        Duration::from_secs(5),
        axum::body::to_bytes(response.into_body(), usize::MAX),
    )
    .await
    .expect("cancelled stream did not end")
    .unwrap();
    let frames = parse_sse_frames(std::str::from_utf8(&body).unwrap());
    assert_eq!(events(&frames, "done"), 0);
    assert_eq!(events(&frames, "error"), 1);
    let terminal = frames.last().unwrap();
    assert_eq!(terminal.event, "error");
    assert_eq!(terminal.data["code"], "CANCELLED");
    assert!(!resources.sessions.is_active("req-cancel-me"));
    assert!(provider.stream_dropped());

    let again = AxumTestRequest::delete("/ai/coach/stream/req-cancel-me")
        .send(app)
        .await;
    assert_eq!(again.status(), 404);
}

#[tokio::test]
async fn test_duplicate_request_id_is_conflict() {
    let provider = Arc::new(ScriptedProvider::completing(&["hi"]));
    let resources = scripted_resources(provider.clone());
    let _held = resources.sessions.open("req-dup", common::TEST_USER).unwrap();

    let response = AxumTestRequest::post(STREAM_PATH)
        .header("x-request-id", "req-dup")
        .json(&coach_body("hello"))
        .send(router(resources))
        .await;

    assert_eq!(response.status(), 409);
    assert!(provider.contexts().is_empty());
}

#[tokio::test]
async fn test_invalid_bodies_are_rejected_before_streaming() {
    let provider = Arc::new(ScriptedProvider::completing(&["hi"]));
    let resources = scripted_resources(provider.clone());

    let blank_message = AxumTestRequest::post(STREAM_PATH)
        .json(&coach_body("   "))
        .send(router(resources.clone()))
        .await;
    assert_eq!(blank_message.status(), 400);

    let missing_user = AxumTestRequest::post(STREAM_PATH)
        .json(&json!({"message": "hello"}))
        .send(router(resources.clone()))
        .await;
    assert_eq!(missing_user.status(), 400);

    let not_json = AxumTestRequest::post(STREAM_PATH)
        .raw_body("application/json", "{\"userId\":")
        .send(router(resources.clone()))
        .await;
    assert_eq!(not_json.status(), 400);

    let too_long = AxumTestRequest::post(STREAM_PATH)
        .json(&coach_body(&"a".repeat(4_001)))
        .send(router(resources.clone()))
        .await;
    assert_eq!(too_long.status(), 400);
    let body: Value = too_long.json();
    assert_eq!(body["error"]["code"], "INVALID_INPUT");

    assert!(provider.contexts().is_empty());
    assert_eq!(resources.sessions.active_count(), 0);
}

#[tokio::test]
async fn test_oversized_body_is_rejected_before_streaming() {
    let provider = Arc::new(ScriptedProvider::completing(&["hi"]));
    let resources = scripted_resources(provider.clone());

    let response = AxumTestRequest::post(STREAM_PATH)
        .header("x-request-id", "req-huge")
        .json(&coach_body(&"a".repeat(70 * 1024)))
        .send(router(resources.clone()))
        .await;

    assert_eq!(response.status(), 413);
    assert!(!response
        .header("content-type")
        .unwrap_or_default()
        .starts_with("text/event-stream"));
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "PAYLOAD_TOO_LARGE");
    assert_eq!(body["error"]["request_id"], "req-huge");
    assert!(provider.contexts().is_empty());
    assert!(!resources.sessions.is_active("req-huge"));
}

#[tokio::test]
async fn test_unknown_history_token_is_not_found() {
    let provider = Arc::new(ScriptedProvider::completing(&["hi"]));
    let resources = scripted_resources(provider.clone());

    let response = AxumTestRequest::post(STREAM_PATH)
        .header("x-request-id", "req-lost")
        .json(&json!({
            "userId": common::TEST_USER,
            "message": "continue",
            "historyToken": "does-not-exist"
        }))
        .send(router(resources.clone()))
        .await;

    assert_eq!(response.status(), 404);
    let body: Value = response.json();
    assert_eq!(body["error"]["request_id"], "req-lost");
    assert!(provider.contexts().is_empty());
    assert!(!resources.sessions.is_active("req-lost"));
}

#[tokio::test]
async fn test_health_and_ready() {
    let provider = Arc::new(ScriptedProvider::completing(&["hi"]));
    let resources = scripted_resources(provider);

    let health = AxumTestRequest::get("/health")
        .send(router(resources.clone()))
        .await;
    assert_eq!(health.status(), 200);
    let health: Value = health.json();
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["service"], "pierre-coach-server");

    let _held = resources.sessions.open("req-ready", common::TEST_USER).unwrap();
    let ready = AxumTestRequest::get("/ready")
        .send(router(resources.clone()))
        .await;
    assert_eq!(ready.status(), 200);
    let ready: Value = ready.json();
    assert_eq!(ready["status"], "ready");
    assert_eq!(ready["provider"], "scripted");
    assert_eq!(ready["active_sessions"], 1);
}
