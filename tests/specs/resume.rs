// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resume: a reconnecting client with a cursor sees only events strictly
//! after it, across both backends and across retention trims.

use crate::support::*;
use relay_core::CurrentState;
use relay_log::{Cursor, EventLog};
use std::time::Duration;

#[tokio::test]
async fn list_backend_resume_skips_delivered() {
    let stack = list_stack(scenario_config());
    let c1 = stack.publish(ev(1, CurrentState::Init)).await;
    stack.publish(ev(2, CurrentState::Processing)).await;
    stack.publish(ev(3, CurrentState::Complete)).await;

    let (run, collect) = stack.spawn(Some(c1));
    assert!(run.await.unwrap().is_ok());
    let frames = collect.await.unwrap();
    assert_eq!(business_uuids(&frames), vec![uuid(2), uuid(3)]);
}

#[tokio::test]
async fn stream_backend_resume_skips_delivered() {
    let dir = tempfile::tempdir().unwrap();
    let stack = stream_stack(dir.path(), scenario_config());
    let c1 = stack.publish(ev(1, CurrentState::Init)).await;
    stack.publish(ev(2, CurrentState::Processing)).await;
    stack.publish(ev(3, CurrentState::Complete)).await;

    let (run, collect) = stack.spawn(Some(c1));
    assert!(run.await.unwrap().is_ok());
    let frames = collect.await.unwrap();
    assert_eq!(business_uuids(&frames), vec![uuid(2), uuid(3)]);
}

#[tokio::test]
async fn list_cursor_can_come_from_len() {
    // The list shape supports integer resume cursors derived from `len`
    let stack = list_stack(scenario_config());
    stack.publish(ev(1, CurrentState::Init)).await;
    stack.publish(ev(2, CurrentState::Processing)).await;

    let len = stack.log.len(&stack.thread).await.unwrap();
    let cursor = Cursor::new((len - 1).to_string());

    stack.publish(ev(3, CurrentState::Complete)).await;

    let (run, collect) = stack.spawn(Some(cursor));
    assert!(run.await.unwrap().is_ok());
    assert_eq!(business_uuids(&collect.await.unwrap()), vec![uuid(3)]);
}

#[tokio::test]
async fn stale_cursor_behind_retention_gets_surviving_suffix() {
    let mut config = scenario_config();
    config.max_log_length = 3;
    let stack = list_stack(config);

    let c1 = stack.publish(ev(1, CurrentState::Init)).await;
    for n in 2..=6 {
        let state = if n == 6 {
            CurrentState::Complete
        } else {
            CurrentState::Processing
        };
        stack.publish(ev(n, state)).await;
    }

    // Events 1..3 were trimmed; the stale cursor sees only 4..6
    let (run, collect) = stack.spawn(Some(c1));
    assert!(run.await.unwrap().is_ok());
    let frames = collect.await.unwrap();
    assert_eq!(business_uuids(&frames), vec![uuid(4), uuid(5), uuid(6)]);
}

#[tokio::test]
async fn resume_after_disconnect_mid_stream() {
    let stack = list_stack(scenario_config());
    stack.publish(ev(1, CurrentState::Init)).await;

    // First connection reads one event, then the client goes away
    let (tx, mut rx) = tokio::sync::mpsc::channel(8);
    let first_run = tokio::spawn(stack.session(None).run(tx));
    let first_frame = rx.recv().await.unwrap();
    let resume_cursor = match &first_frame {
        relay_core::SseFrame::Business(ev) => {
            assert_eq!(ev.uuid, uuid(1));
            // The list cursor for the first delivered element
            Cursor::new("0")
        }
        other => panic!("expected business frame, got {other:?}"),
    };
    drop(rx);
    let _ = first_run.await.unwrap();

    // More activity while disconnected
    stack.publish(ev(2, CurrentState::Processing)).await;
    stack.publish(ev(3, CurrentState::Complete)).await;
    tokio::time::sleep(Duration::from_millis(10)).await;

    // Second connection resumes strictly after the cursor
    let (run, collect) = stack.spawn(Some(resume_cursor));
    assert!(run.await.unwrap().is_ok());
    let frames = collect.await.unwrap();
    assert_eq!(business_uuids(&frames), vec![uuid(2), uuid(3)]);
}
