// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn waiting_frame_then_timeout_when_log_never_appears() {
    let harness = Harness::new(test_config());
    let (run, collect) = spawn_session(harness.session(None));

    // Let the poll loop start, then push the clock past the ceiling
    tokio::time::sleep(Duration::from_millis(30)).await;
    harness.clock.advance(harness.config.business_timeout + Duration::from_secs(1));

    let result = run.await.unwrap();
    assert!(matches!(result, Err(StreamError::TimeoutExceeded)));

    let frames = collect.await.unwrap();
    assert_eq!(names(&frames), vec!["waiting"]);
}

#[tokio::test]
async fn stream_appearing_during_wait_is_picked_up() {
    let harness = Harness::new(test_config());
    let (run, collect) = spawn_session(harness.session(None));

    tokio::time::sleep(Duration::from_millis(30)).await;
    harness.publish(event(1, CurrentState::Complete)).await;

    assert!(run.await.unwrap().is_ok());
    let frames = collect.await.unwrap();
    assert_eq!(
        names(&frames),
        vec!["waiting", "assistant_response", "status"]
    );
    assert_eq!(last_status(&frames), Some(StatusKind::Completed));
}

#[tokio::test]
async fn no_waiting_frame_when_log_already_exists() {
    let harness = Harness::new(test_config());
    harness.publish(event(1, CurrentState::Complete)).await;

    let (run, collect) = spawn_session(harness.session(None));
    assert!(run.await.unwrap().is_ok());
    let frames = collect.await.unwrap();
    assert_eq!(names(&frames), vec!["assistant_response", "status"]);
}

#[tokio::test]
async fn disconnect_during_wait_is_detected() {
    let harness = Harness::new(test_config());
    let (tx, rx) = mpsc::channel(64);
    let session = harness.session(None);
    let run = tokio::spawn(session.run(tx));

    tokio::time::sleep(Duration::from_millis(25)).await;
    drop(rx);

    let result = run.await.unwrap();
    assert!(matches!(result, Err(StreamError::ClientDisconnected)));
}
