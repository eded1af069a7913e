// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use relay_log::{StreamLog, StreamNotifier};
use std::io::Write as _;

#[tokio::test]
async fn history_is_replayed_in_position_order() {
    let harness = Harness::new(test_config());
    harness.publish(event(1, CurrentState::Init)).await;
    harness.publish(event(2, CurrentState::Processing)).await;
    harness.publish(event(3, CurrentState::Complete)).await;

    let (run, collect) = spawn_session(harness.session(None));
    assert!(run.await.unwrap().is_ok());

    let frames = collect.await.unwrap();
    assert_eq!(
        business_uuids(&frames),
        vec![event_uuid(1), event_uuid(2), event_uuid(3)]
    );
    assert_eq!(last_status(&frames), Some(StatusKind::Completed));
    // Terminal frame is the last frame, and the only status frame
    assert_eq!(frames.iter().filter(|f| f.is_status()).count(), 1);
}

#[tokio::test]
async fn terminal_state_maps_to_final_status() {
    let cases = [
        (CurrentState::Complete, StatusKind::Completed),
        (CurrentState::Error, StatusKind::Failed),
    ];
    for (state, expected) in cases {
        let harness = Harness::new(test_config());
        harness.publish(event(1, state)).await;

        let (run, collect) = spawn_session(harness.session(None));
        assert!(run.await.unwrap().is_ok());
        assert_eq!(last_status(&collect.await.unwrap()), Some(expected));
    }
}

#[tokio::test]
async fn resume_delivers_strictly_after_cursor() {
    let harness = Harness::new(test_config());
    let c1 = harness.publish(event(1, CurrentState::Init)).await;
    harness.publish(event(2, CurrentState::Processing)).await;
    harness.publish(event(3, CurrentState::Complete)).await;

    let (run, collect) = spawn_session(harness.session(Some(c1)));
    assert!(run.await.unwrap().is_ok());

    let frames = collect.await.unwrap();
    assert_eq!(
        business_uuids(&frames),
        vec![event_uuid(2), event_uuid(3)],
        "no re-delivery of the event at the resume cursor"
    );
    assert_eq!(last_status(&frames), Some(StatusKind::Completed));
}

#[tokio::test]
async fn uuid_overwrite_before_connect_yields_one_frame() {
    let harness = Harness::new(test_config());

    let mut first = event(1, CurrentState::Init);
    first.execute_result = Some(relay_core::ExecuteResult::AssistantResponse(
        "draft".to_string(),
    ));
    harness.publish(first).await;

    let mut second = event(1, CurrentState::Processing);
    second.execute_result = Some(relay_core::ExecuteResult::AssistantResponse(
        "final".to_string(),
    ));
    harness.publish(second).await;

    // End the stream so the session terminates
    harness.publish(event(2, CurrentState::Complete)).await;

    let (run, collect) = spawn_session(harness.session(None));
    assert!(run.await.unwrap().is_ok());

    let frames = collect.await.unwrap();
    assert_eq!(business_uuids(&frames), vec![event_uuid(1), event_uuid(2)]);
    match &frames[0] {
        SseFrame::Business(ev) => {
            assert_eq!(
                ev.execute_result,
                Some(relay_core::ExecuteResult::AssistantResponse(
                    "final".to_string()
                ))
            );
        }
        other => panic!("expected business frame, got {other:?}"),
    }
}

#[tokio::test]
async fn malformed_entry_yields_error_frame_and_stream_continues() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config();
    let thread = ThreadId::new("thread-test");

    // Seed a log file with a record whose body no longer decodes
    let path = dir.path().join("relay.thread-test.log");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, r#"{{"seq":1,"event":{{"uuid":"broken"}}}}"#).unwrap();
    writeln!(
        file,
        r#"{{"seq":2,"event":{}}}"#,
        serde_json::to_string(&event(2, CurrentState::Complete)).unwrap()
    )
    .unwrap();
    drop(file);

    let clock = FakeClock::new();
    let log = StreamLog::with_clock(dir.path(), &config, clock.clone());
    let notifier = StreamNotifier::new(log.clone());
    let session = StreamSession::new(
        log,
        notifier,
        clock,
        config,
        thread,
        None,
    );

    let (tx, mut rx) = mpsc::channel(64);
    let run = tokio::spawn(session.run(tx));
    let mut frames = Vec::new();
    while let Some(frame) = rx.recv().await {
        frames.push(frame);
    }
    assert!(run.await.unwrap().is_ok());

    assert_eq!(names(&frames), vec!["error", "assistant_response", "status"]);
    assert_eq!(last_status(&frames), Some(StatusKind::Completed));
}

#[tokio::test]
async fn business_events_reset_inactivity_during_replay() {
    // Tight business timeout; replayed history must keep the session alive
    let mut config = test_config();
    config.business_timeout = Duration::from_secs(120);
    let harness = Harness::new(config);

    // Old history (in fake-clock terms the events are "stale")
    harness.publish(event(1, CurrentState::Processing)).await;
    harness.clock.advance(Duration::from_secs(100));

    let (run, collect) = spawn_session(harness.session(None));

    // Inactivity clock starts at connect and resets on the replayed event;
    // 100 more fake seconds keep the total under the ceiling
    tokio::time::sleep(Duration::from_millis(50)).await;
    harness.clock.advance(Duration::from_secs(100));
    tokio::time::sleep(Duration::from_millis(50)).await;
    harness.publish(event(2, CurrentState::Complete)).await;

    assert!(run.await.unwrap().is_ok());
    let frames = collect.await.unwrap();
    assert_eq!(business_uuids(&frames), vec![event_uuid(1), event_uuid(2)]);
}
