// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! UUID overwrite: a republished event refines the stored one in place,
//! keeping its original position and never duplicating on the wire.

use crate::support::*;
use relay_core::{CurrentState, ExecuteResult, SseFrame};
use relay_log::EventLog;

fn with_response(n: u64, state: CurrentState, text: &str) -> relay_core::AgentEvent {
    let mut event = ev(n, state);
    event.execute_result = Some(ExecuteResult::AssistantResponse(text.to_string()));
    event
}

#[tokio::test]
async fn list_backend_overwrite_yields_latest_content_once() {
    let stack = list_stack(scenario_config());
    stack
        .publish(with_response(1, CurrentState::Init, "draft"))
        .await;
    stack
        .publish(with_response(1, CurrentState::Processing, "final"))
        .await;
    stack.publish(ev(2, CurrentState::Complete)).await;

    let (run, collect) = stack.spawn(None);
    assert!(run.await.unwrap().is_ok());
    let frames = collect.await.unwrap();

    assert_eq!(business_uuids(&frames), vec![uuid(1), uuid(2)]);
    match &frames[0] {
        SseFrame::Business(ev) => assert_eq!(
            ev.execute_result,
            Some(ExecuteResult::AssistantResponse("final".to_string()))
        ),
        other => panic!("expected business frame, got {other:?}"),
    }
}

#[tokio::test]
async fn stream_backend_overwrite_yields_latest_content_once() {
    let dir = tempfile::tempdir().unwrap();
    let stack = stream_stack(dir.path(), scenario_config());
    let first = stack
        .publish(with_response(1, CurrentState::Init, "draft"))
        .await;
    let again = stack
        .publish(with_response(1, CurrentState::Processing, "final"))
        .await;
    assert_eq!(first, again, "republish keeps the original position");

    stack.publish(ev(2, CurrentState::Complete)).await;

    let (run, collect) = stack.spawn(None);
    assert!(run.await.unwrap().is_ok());
    let frames = collect.await.unwrap();
    assert_eq!(business_uuids(&frames), vec![uuid(1), uuid(2)]);
}

#[tokio::test]
async fn overwrite_preserves_create_at_and_length() {
    let stack = list_stack(scenario_config());
    stack.publish(ev(1, CurrentState::Init)).await;

    let created = stack.log.range(&stack.thread, None).await.unwrap()[0]
        .event()
        .unwrap()
        .create_at;
    assert!(created.is_some());

    stack.publish(ev(1, CurrentState::Processing)).await;

    assert_eq!(stack.log.len(&stack.thread).await.unwrap(), 1);
    let stored = stack.log.range(&stack.thread, None).await.unwrap();
    let event = stored[0].event().unwrap();
    assert_eq!(event.create_at, created);
    assert_eq!(event.current_state, CurrentState::Processing);
    assert!(event.modify_at >= created);
}
