// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::log::EventLog;
use crate::notify::{Notifier, Wakeup};
use relay_core::event::test_support::{event, event_uuid};
use relay_core::{CurrentState, FakeClock};

fn config(max_len: usize, read_count: usize) -> StreamConfig {
    StreamConfig {
        max_log_length: max_len,
        read_count,
        ..StreamConfig::default()
    }
}

fn thread(name: &str) -> ThreadId {
    ThreadId::new(name)
}

#[tokio::test]
async fn exists_false_until_first_append() {
    let log = ListLog::new(&config(100, 100));
    let t = thread("thread-a");
    assert!(!log.exists(&t).await.unwrap());
    log.append(&t, event(1, CurrentState::Init)).await.unwrap();
    assert!(log.exists(&t).await.unwrap());
}

#[tokio::test]
async fn positions_are_zero_based_indices() {
    let log = ListLog::new(&config(100, 100));
    let t = thread("thread-a");

    let c0 = log.append(&t, event(1, CurrentState::Init)).await.unwrap();
    let c1 = log
        .append(&t, event(2, CurrentState::Processing))
        .await
        .unwrap();
    assert_eq!(c0.as_str(), "0");
    assert_eq!(c1.as_str(), "1");
    assert_eq!(log.len(&t).await.unwrap(), 2);
}

#[tokio::test]
async fn range_resumes_strictly_after_index() {
    let log = ListLog::new(&config(100, 100));
    let t = thread("thread-a");
    for n in 1..=4 {
        log.append(&t, event(n, CurrentState::Processing))
            .await
            .unwrap();
    }

    let rest = log.range(&t, Some(&Cursor::new("1"))).await.unwrap();
    assert_eq!(rest.len(), 2);
    assert_eq!(rest[0].cursor.as_str(), "2");
    assert_eq!(rest[0].event().unwrap().uuid, event_uuid(3));
}

#[tokio::test]
async fn upsert_overwrites_in_place_and_preserves_create_at() {
    let log = ListLog::new(&config(100, 100));
    let t = thread("thread-a");

    let mut first = event(1, CurrentState::Init);
    first.create_at = Some(chrono::Utc::now());
    let original_create = first.create_at;
    let c0 = log.append(&t, first).await.unwrap();
    log.append(&t, event(2, CurrentState::Init)).await.unwrap();

    let c0_again = log
        .append(&t, event(1, CurrentState::Complete))
        .await
        .unwrap();
    assert_eq!(c0, c0_again);
    assert_eq!(log.len(&t).await.unwrap(), 2);

    let all = log.range(&t, None).await.unwrap();
    let stored = all[0].event().unwrap();
    assert_eq!(stored.current_state, CurrentState::Complete);
    assert_eq!(stored.create_at, original_create);
}

#[tokio::test]
async fn trim_preserves_absolute_indices() {
    let log = ListLog::new(&config(3, 100));
    let t = thread("thread-a");

    for n in 1..=5 {
        log.append(&t, event(n, CurrentState::Processing))
            .await
            .unwrap();
    }
    // Elements 0 and 1 were trimmed; survivors keep positions 2..=4
    assert_eq!(log.len(&t).await.unwrap(), 5);
    let all = log.range(&t, None).await.unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[0].cursor.as_str(), "2");
    assert_eq!(all[0].event().unwrap().uuid, event_uuid(3));

    // A stale cursor receives the surviving suffix only
    let suffix = log.range(&t, Some(&Cursor::new("0"))).await.unwrap();
    assert_eq!(suffix.len(), 3);
    assert_eq!(suffix[0].cursor.as_str(), "2");

    // New appends continue the absolute index space
    let c = log.append(&t, event(9, CurrentState::Processing)).await.unwrap();
    assert_eq!(c.as_str(), "5");
}

#[tokio::test]
async fn read_count_caps_each_batch() {
    let log = ListLog::new(&config(100, 2));
    let t = thread("thread-a");
    for n in 1..=5 {
        log.append(&t, event(n, CurrentState::Processing))
            .await
            .unwrap();
    }
    let batch = log.range(&t, None).await.unwrap();
    assert_eq!(batch.len(), 2);
    let next = log.range(&t, Some(&batch[1].cursor)).await.unwrap();
    assert_eq!(next.len(), 2);
}

#[tokio::test]
async fn invalid_cursor_is_rejected() {
    let log = ListLog::new(&config(100, 100));
    let t = thread("thread-a");
    let err = log
        .range(&t, Some(&Cursor::new("abc")))
        .await
        .unwrap_err();
    assert!(matches!(err, LogError::InvalidCursor { .. }));
}

#[tokio::test]
async fn tail_wakes_on_append() {
    let log = ListLog::new(&config(100, 100));
    let t = thread("thread-a");

    let tail_log = log.clone();
    let tail_thread = t.clone();
    let waiter = tokio::spawn(async move {
        tail_log
            .tail(&tail_thread, None, Duration::from_secs(5))
            .await
    });

    tokio::time::sleep(Duration::from_millis(20)).await;
    log.append(&t, event(1, CurrentState::Init)).await.unwrap();

    let got = waiter.await.unwrap().unwrap();
    assert_eq!(got.len(), 1);
}

#[tokio::test]
async fn expire_stale_drops_idle_threads() {
    let clock = FakeClock::new();
    let mut cfg = config(100, 100);
    cfg.thread_ttl = Duration::from_secs(60);
    let log = ListLog::with_clock(&cfg, clock.clone());
    let t = thread("thread-a");

    log.append(&t, event(1, CurrentState::Init)).await.unwrap();
    clock.advance(Duration::from_secs(61));
    log.expire_stale(clock.now());
    assert!(!log.exists(&t).await.unwrap());
}

#[tokio::test]
async fn notifier_delivers_data_wakeups() {
    let notifier = ListNotifier::new();
    let t = thread("thread-a");

    let mut sub = notifier.subscribe(&t).await.unwrap();
    assert_eq!(sub.next(Duration::from_millis(20)).await, Wakeup::Timeout);

    notifier.publish_data(&t).await.unwrap();
    assert_eq!(sub.next(Duration::from_secs(1)).await, Wakeup::Data);
}

#[tokio::test]
async fn notifier_delivers_control_to_current_subscribers_only() {
    let notifier = ListNotifier::new();
    let t = thread("thread-a");

    let mut sub = notifier.subscribe(&t).await.unwrap();
    notifier
        .publish_control(&t, ControlSignal::EndStream)
        .await
        .unwrap();
    assert_eq!(
        sub.next(Duration::from_secs(1)).await,
        Wakeup::Control(ControlSignal::EndStream)
    );

    // A subscriber joining after the publish never sees the signal
    let mut late = notifier.subscribe(&t).await.unwrap();
    assert_eq!(late.next(Duration::from_millis(20)).await, Wakeup::Timeout);
}

#[tokio::test]
async fn publish_without_subscribers_is_not_an_error() {
    let notifier = ListNotifier::new();
    let t = thread("thread-a");
    notifier.publish_data(&t).await.unwrap();
    notifier
        .publish_control(&t, ControlSignal::Stop)
        .await
        .unwrap();
}
