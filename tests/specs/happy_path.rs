// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Happy path: three published events arrive in order and the stream
//! closes with a completed status.

use crate::support::*;
use relay_core::CurrentState;
use std::time::Duration;

#[tokio::test]
async fn list_backend_live_stream() {
    let stack = list_stack(scenario_config());
    let (run, collect) = stack.spawn(None);

    tokio::time::sleep(Duration::from_millis(40)).await;
    stack.publish(ev(1, CurrentState::Init)).await;
    stack.publish(ev(2, CurrentState::Processing)).await;
    stack.publish(ev(3, CurrentState::Complete)).await;

    assert!(run.await.unwrap().is_ok());
    let frames = collect.await.unwrap();

    assert_eq!(business_uuids(&frames), vec![uuid(1), uuid(2), uuid(3)]);
    assert_eq!(last_status(&frames), Some(relay_core::StatusKind::Completed));

    // Wire shape: each frame is `event: <name>` + `data: <json>`, and the
    // final frame is the status envelope
    let text = encode_all(&frames);
    assert!(text.contains("event: assistant_response\ndata: {"));
    assert!(text.ends_with("event: status\ndata: {\"status\":\"completed\",\"type\":\"status\"}\n\n"));

    // The data line of a business frame is the event payload itself
    let first_business = frames
        .iter()
        .find(|f| matches!(f, relay_core::SseFrame::Business(_)))
        .unwrap();
    let data: serde_json::Value =
        serde_json::from_str(&first_business.data_json().unwrap()).unwrap();
    assert_eq!(data["uuid"], uuid(1));
    assert_eq!(data["current_state"], "init");
}

#[tokio::test]
async fn stream_backend_live_stream() {
    let dir = tempfile::tempdir().unwrap();
    let stack = stream_stack(dir.path(), scenario_config());
    let (run, collect) = stack.spawn(None);

    tokio::time::sleep(Duration::from_millis(40)).await;
    stack.publish(ev(1, CurrentState::Init)).await;
    stack.publish(ev(2, CurrentState::Processing)).await;
    stack.publish(ev(3, CurrentState::Complete)).await;

    assert!(run.await.unwrap().is_ok());
    let frames = collect.await.unwrap();
    assert_eq!(business_uuids(&frames), vec![uuid(1), uuid(2), uuid(3)]);
    assert_eq!(last_status(&frames), Some(relay_core::StatusKind::Completed));
}

#[tokio::test]
async fn replay_of_finished_history_is_identical_to_live_order() {
    let stack = list_stack(scenario_config());
    stack.publish(ev(1, CurrentState::Init)).await;
    stack.publish(ev(2, CurrentState::Processing)).await;
    stack.publish(ev(3, CurrentState::Complete)).await;

    let (run, collect) = stack.spawn(None);
    assert!(run.await.unwrap().is_ok());
    let frames = collect.await.unwrap();
    assert_eq!(business_uuids(&frames), vec![uuid(1), uuid(2), uuid(3)]);
    // Exactly one status frame, and it is last
    assert_eq!(
        frames
            .iter()
            .filter(|f| matches!(f, relay_core::SseFrame::Status { .. }))
            .count(),
        1
    );
    assert_eq!(last_status(&frames), Some(relay_core::StatusKind::Completed));
}

#[tokio::test]
async fn terminal_publish_reaches_the_result_sink() {
    let stack = list_stack(scenario_config());
    stack.publish(ev(1, CurrentState::Processing)).await;
    stack.publish(ev(2, CurrentState::Complete)).await;

    let calls = stack.sink.calls();
    assert_eq!(calls.len(), 1, "only the terminal event is persisted");
    assert_eq!(calls[0].event.uuid, uuid(2));
    assert!(calls[0].event.execute_end_at.is_some());
}
