// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn live_events_stream_through_to_terminal() {
    let harness = Harness::new(test_config());
    let (run, collect) = spawn_session(harness.session(None));

    tokio::time::sleep(Duration::from_millis(30)).await;
    harness.publish(event(1, CurrentState::Init)).await;
    tokio::time::sleep(Duration::from_millis(10)).await;
    harness.publish(event(2, CurrentState::Processing)).await;
    tokio::time::sleep(Duration::from_millis(10)).await;
    harness.publish(event(3, CurrentState::Complete)).await;

    assert!(run.await.unwrap().is_ok());
    let frames = collect.await.unwrap();
    assert_eq!(
        business_uuids(&frames),
        vec![event_uuid(1), event_uuid(2), event_uuid(3)]
    );
    assert_eq!(last_status(&frames), Some(StatusKind::Completed));

    // The client connected before the log existed, so a waiting frame leads
    assert_eq!(
        names(&frames),
        vec![
            "waiting",
            "assistant_response",
            "assistant_response",
            "assistant_response",
            "status"
        ]
    );
}

#[tokio::test]
async fn control_stop_yields_stopped_status() {
    let harness = Harness::new(test_config());
    harness.publish(event(1, CurrentState::Processing)).await;

    let (run, collect) = spawn_session(harness.session(None));
    tokio::time::sleep(Duration::from_millis(40)).await;
    harness
        .publisher()
        .publish_control(&harness.thread, ControlSignal::Stop)
        .await
        .unwrap();

    assert!(run.await.unwrap().is_ok());
    let frames = collect.await.unwrap();
    assert_eq!(business_uuids(&frames), vec![event_uuid(1)]);
    assert_eq!(last_status(&frames), Some(StatusKind::Stopped));
    assert!(frames.last().unwrap().is_status(), "status is last");
}

#[tokio::test]
async fn control_signals_map_to_statuses() {
    let cases = [
        (ControlSignal::Stop, StatusKind::Stopped),
        (ControlSignal::EndStream, StatusKind::Completed),
        (ControlSignal::Error, StatusKind::Failed),
    ];
    for (signal, expected) in cases {
        let harness = Harness::new(test_config());
        harness.publish(event(1, CurrentState::Processing)).await;

        let (run, collect) = spawn_session(harness.session(None));
        tokio::time::sleep(Duration::from_millis(40)).await;
        harness
            .publisher()
            .publish_control(&harness.thread, signal)
            .await
            .unwrap();

        assert!(run.await.unwrap().is_ok());
        assert_eq!(last_status(&collect.await.unwrap()), Some(expected));
    }
}

#[tokio::test]
async fn republish_does_not_disturb_ordering() {
    let harness = Harness::new(test_config());
    harness.publish(event(1, CurrentState::Processing)).await;

    let (run, collect) = spawn_session(harness.session(None));
    tokio::time::sleep(Duration::from_millis(40)).await;

    // Refine the already-delivered event, then finish the stream
    harness.publish(event(1, CurrentState::Processing)).await;
    harness.publish(event(2, CurrentState::Complete)).await;

    assert!(run.await.unwrap().is_ok());
    let frames = collect.await.unwrap();
    // The refinement overwrote position 0, which this reader had already
    // passed; delivery continues in position order with no duplicates
    assert_eq!(business_uuids(&frames), vec![event_uuid(1), event_uuid(2)]);
}

#[tokio::test]
async fn client_disconnect_mid_tail_terminates() {
    let harness = Harness::new(test_config());
    harness.publish(event(1, CurrentState::Processing)).await;

    let (tx, mut rx) = mpsc::channel(64);
    let run = tokio::spawn(harness.session(None).run(tx));

    // Consume the first frame, then vanish
    let first = rx.recv().await.unwrap();
    assert!(first.is_business());
    drop(rx);

    let result = run.await.unwrap();
    assert!(matches!(result, Err(StreamError::ClientDisconnected)));
}

#[tokio::test]
async fn keep_alives_interleave_without_reordering_business_events() {
    let mut config = test_config();
    config.keep_alive_interval = Duration::from_millis(25);
    let harness = Harness::new(config);
    harness.publish(event(1, CurrentState::Processing)).await;

    let (run, collect) = spawn_session(harness.session(None));

    // Quiet gap long enough for several keep-alive ticks
    tokio::time::sleep(Duration::from_millis(120)).await;
    harness.publish(event(2, CurrentState::Complete)).await;

    assert!(run.await.unwrap().is_ok());
    let frames = collect.await.unwrap();

    let keep_alives = names(&frames).iter().filter(|n| *n == "keep_alive").count();
    assert!(keep_alives >= 2, "expected keep-alives during the gap");
    assert_eq!(business_uuids(&frames), vec![event_uuid(1), event_uuid(2)]);
    assert_eq!(last_status(&frames), Some(StatusKind::Completed));

    // Keep-alives appear between the two business frames, never after status
    let frame_names = names(&frames);
    let first_business = frame_names
        .iter()
        .position(|n| n == "assistant_response")
        .unwrap();
    let last_frame = frame_names.len() - 1;
    assert_eq!(frame_names[last_frame], "status");
    assert!(first_business < last_frame);
}

#[tokio::test]
async fn keep_alive_ticks_drop_when_queue_is_full() {
    // Exercise the producer directly: a full queue must drop ticks
    // without blocking or erroring
    let (qtx, mut qrx) = mpsc::channel(1);
    qtx.try_send(QueueItem::KeepAlive).unwrap();

    let producer = tokio::spawn(keepalive_task(qtx, Duration::from_millis(10)));
    tokio::time::sleep(Duration::from_millis(50)).await;

    // Still exactly the one pre-filled item
    assert!(matches!(qrx.try_recv(), Ok(QueueItem::KeepAlive)));
    assert!(qrx.try_recv().is_err());

    // Once there is room again, ticks flow
    let next = tokio::time::timeout(Duration::from_millis(100), qrx.recv())
        .await
        .unwrap();
    assert!(matches!(next, Some(QueueItem::KeepAlive)));
    producer.abort();
}
