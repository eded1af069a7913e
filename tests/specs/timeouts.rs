// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Timeout behavior: await-log ceiling, keep-alive interleaving, and
//! business-clock resets.

use crate::support::*;
use relay_core::{CurrentState, StatusKind};
use std::time::Duration;

#[tokio::test]
async fn await_log_times_out_with_a_single_waiting_frame() {
    let mut config = scenario_config();
    config.business_timeout = Duration::from_millis(150);
    config.stream_check_interval = Duration::from_millis(20);
    let stack = list_stack(config);

    let (run, collect) = stack.spawn(None);
    let result = run.await.unwrap();
    assert!(matches!(
        result,
        Err(relay_engine::StreamError::TimeoutExceeded)
    ));

    // One waiting frame, then nothing; timeouts close silently
    let frames = collect.await.unwrap();
    assert_eq!(frame_names(&frames), vec!["waiting"]);
    assert!(last_status(&frames).is_none());
}

#[tokio::test]
async fn keep_alives_interleave_between_business_events() {
    let mut config = scenario_config();
    config.keep_alive_interval = Duration::from_millis(30);
    let stack = list_stack(config);
    stack.publish(ev(1, CurrentState::Processing)).await;

    let (run, collect) = stack.spawn(None);

    // Quiet gap spanning several keep-alive periods
    tokio::time::sleep(Duration::from_millis(130)).await;
    stack.publish(ev(2, CurrentState::Complete)).await;

    assert!(run.await.unwrap().is_ok());
    let frames = collect.await.unwrap();

    let names = frame_names(&frames);
    let keep_alives = names.iter().filter(|n| **n == "keep_alive").count();
    assert!(
        keep_alives >= 2,
        "expected at least two keep-alives in the gap, saw {keep_alives}"
    );

    // Keep-alives never reorder business events
    assert_eq!(business_uuids(&frames), vec![uuid(1), uuid(2)]);
    assert_eq!(last_status(&frames), Some(StatusKind::Completed));

    // All keep-alives sit strictly between the two business frames here
    let first_business = names.iter().position(|n| *n == "assistant_response").unwrap();
    let last_business = names.iter().rposition(|n| *n == "assistant_response").unwrap();
    for (i, name) in names.iter().enumerate() {
        if *name == "keep_alive" {
            assert!(i > first_business && i < last_business);
        }
    }
}

#[tokio::test]
async fn fresh_business_events_keep_the_session_alive() {
    let mut config = scenario_config();
    config.business_timeout = Duration::from_millis(200);
    let stack = list_stack(config);
    stack.publish(ev(1, CurrentState::Processing)).await;

    let (run, collect) = stack.spawn(None);

    // Each publish lands inside the previous inactivity window
    for n in 2..=4 {
        tokio::time::sleep(Duration::from_millis(120)).await;
        let state = if n == 4 {
            CurrentState::Complete
        } else {
            CurrentState::Processing
        };
        stack.publish(ev(n, state)).await;
    }

    // 3 × 120ms > 200ms total, but no single gap exceeded the ceiling
    assert!(run.await.unwrap().is_ok());
    let frames = collect.await.unwrap();
    assert_eq!(
        business_uuids(&frames),
        vec![uuid(1), uuid(2), uuid(3), uuid(4)]
    );
}

#[tokio::test]
async fn business_silence_ends_the_session_despite_keep_alives() {
    let mut config = scenario_config();
    config.business_timeout = Duration::from_millis(150);
    config.keep_alive_interval = Duration::from_millis(25);
    let stack = list_stack(config);
    stack.publish(ev(1, CurrentState::Processing)).await;

    let (run, collect) = stack.spawn(None);
    let result = run.await.unwrap();
    assert!(matches!(
        result,
        Err(relay_engine::StreamError::TimeoutExceeded)
    ));

    let frames = collect.await.unwrap();
    assert_eq!(business_uuids(&frames), vec![uuid(1)]);
    assert!(
        frame_names(&frames).contains(&"keep_alive"),
        "keep-alives flowed but did not reset the business clock"
    );
    assert!(last_status(&frames).is_none(), "timeout closes silently");
}
