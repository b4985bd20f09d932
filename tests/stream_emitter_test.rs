//! Interactive sessions delivered as event streams.

mod common;

use std::time::Duration;

use serde_json::json;

use common::{harness, happy_reasoning, test_config, wait_for_active_calls};
use triage::adapters::reasoning::{MockResponse, ScriptedReasoning};
use triage::domain::models::{StreamEvent, StreamEventKind};
use triage::services::agent::{EXECUTOR, PLANNER, REVIEWER};
use triage::services::stream_emitter::{EventStream, ACKNOWLEDGEMENT};

async fn collect(stream: &mut EventStream) -> Vec<StreamEvent> {
    let mut events = Vec::new();
    while let Some(event) = stream.events.recv().await {
        events.push(event);
    }
    events
}

fn kinds(events: &[StreamEvent]) -> Vec<StreamEventKind> {
    events.iter().map(|e| e.kind).collect()
}

#[tokio::test]
async fn test_stream_order_and_single_done() {
    common::setup_test_logging();
    let h = harness(test_config(), happy_reasoning());

    let mut stream = h
        .runtime
        .emitter
        .start("why is checkout slow?".to_string(), Some("conv-42".to_string()));
    assert_eq!(stream.conversation_id, "conv-42");
    let events = collect(&mut stream).await;

    assert_eq!(events[0].kind, StreamEventKind::Content);
    assert_eq!(events[0].payload, ACKNOWLEDGEMENT);
    assert_eq!(events[1].kind, StreamEventKind::ToolLog);
    assert!(events[1].payload.contains("2 steps"));

    let done: Vec<_> = events.iter().filter(|e| e.is_done()).collect();
    assert_eq!(done.len(), 1);
    assert!(events.last().unwrap().is_done());
    assert!(events.iter().all(|e| e.conversation_id == "conv-42"));
    assert!(!events.iter().any(|e| e.kind == StreamEventKind::Error));

    // Everything after the review notice is the report, chunked.
    let review_at = events
        .iter()
        .position(|e| e.payload.contains("generating the final report"))
        .unwrap();
    let report: String = events[review_at + 1..events.len() - 1]
        .iter()
        .map(|e| {
            assert_eq!(e.kind, StreamEventKind::Content);
            e.payload.as_str()
        })
        .collect();
    assert_eq!(report, "# Diagnosis\nAll good.");
}

#[tokio::test]
async fn test_report_is_chunked_by_characters() {
    let reasoning = happy_reasoning().with_response(
        REVIEWER,
        MockResponse::success("ééééééééééabcdefghij12345"),
    );
    let h = harness(test_config(), reasoning);

    let mut stream = h.runtime.emitter.start("q".to_string(), None);
    let events = collect(&mut stream).await;

    let review_at = events
        .iter()
        .position(|e| e.payload.contains("generating the final report"))
        .unwrap();
    let chunks: Vec<&str> = events[review_at + 1..events.len() - 1]
        .iter()
        .map(|e| e.payload.as_str())
        .collect();
    assert_eq!(chunks, vec!["éééééééééé", "abcdefghij", "12345"]);
}

#[tokio::test]
async fn test_missing_or_blank_conversation_id_is_generated() {
    let h = harness(test_config(), happy_reasoning());

    let a = h.runtime.emitter.start("q".to_string(), None);
    let b = h.runtime.emitter.start("q".to_string(), Some("  ".to_string()));

    assert!(uuid::Uuid::parse_str(&a.conversation_id).is_ok());
    assert!(uuid::Uuid::parse_str(&b.conversation_id).is_ok());
    assert_ne!(a.conversation_id, b.conversation_id);
    assert_eq!(a.trace_id.len(), 8);
}

#[tokio::test]
async fn test_failure_emits_error_then_done() {
    let reasoning = ScriptedReasoning::new().with_default(PLANNER, MockResponse::success("[]"));
    let h = harness(test_config(), reasoning);

    let mut stream = h.runtime.emitter.start("q".to_string(), None);
    let events = collect(&mut stream).await;

    assert_eq!(
        kinds(&events),
        vec![StreamEventKind::Content, StreamEventKind::Error, StreamEventKind::Done]
    );
    assert_eq!(events[1].payload, "Diagnosis failed: Planner produced no usable steps");
}

#[tokio::test(start_paused = true)]
async fn test_heartbeats_while_step_is_slow() {
    let mut config = test_config();
    config.stream.heartbeat_interval_secs = 15;
    config.pipeline.call_timeout_secs = 120;
    let reasoning = ScriptedReasoning::new()
        .with_response(PLANNER, MockResponse::success(json!(["slow step"]).to_string()))
        .with_response(
            EXECUTOR,
            MockResponse::success("eventually").with_delay(Duration::from_secs(50)),
        );
    let h = harness(config, reasoning);

    let mut stream = h.runtime.emitter.start("q".to_string(), None);
    let events = collect(&mut stream).await;

    let started = events
        .iter()
        .position(|e| e.payload.starts_with("Running step 1/1"))
        .unwrap();
    let result = events
        .iter()
        .position(|e| e.payload == "Result: eventually")
        .unwrap();
    let heartbeats = events[started..result]
        .iter()
        .filter(|e| e.kind == StreamEventKind::Heartbeat)
        .count();
    assert_eq!(heartbeats, 3);
    assert!(events.last().unwrap().is_done());
}

#[tokio::test]
async fn test_dropping_receiver_cancels_pipeline() {
    let reasoning = ScriptedReasoning::new()
        .with_response(PLANNER, MockResponse::success(json!(["stuck"]).to_string()))
        .with_response(EXECUTOR, MockResponse::hang());
    let h = harness(test_config(), reasoning);

    let mut stream = h.runtime.emitter.start("q".to_string(), None);
    while let Some(event) = stream.events.recv().await {
        if event.payload.starts_with("Running step") {
            break;
        }
    }

    assert!(wait_for_active_calls(&h.reasoning, 1).await);

    drop(stream);

    assert!(wait_for_active_calls(&h.reasoning, 0).await);
    assert!(h.reasoning.calls_for(REVIEWER).is_empty());
}
