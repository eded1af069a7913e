// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control signals: STOP / END_STREAM / ERROR terminate the stream with
//! the mapped status frame, which is always the last frame.

use crate::support::*;
use relay_core::{ControlSignal, CurrentState, StatusKind};
use std::time::Duration;

#[tokio::test]
async fn stop_after_processing_event() {
    let stack = list_stack(scenario_config());
    stack.publish(ev(1, CurrentState::Processing)).await;

    let (run, collect) = stack.spawn(None);
    tokio::time::sleep(Duration::from_millis(50)).await;
    stack.control(ControlSignal::Stop).await;

    assert!(run.await.unwrap().is_ok());
    let frames = collect.await.unwrap();
    assert_eq!(business_uuids(&frames), vec![uuid(1)]);
    assert_eq!(last_status(&frames), Some(StatusKind::Stopped));
}

#[tokio::test]
async fn end_stream_maps_to_completed() {
    let stack = list_stack(scenario_config());
    stack.publish(ev(1, CurrentState::Processing)).await;

    let (run, collect) = stack.spawn(None);
    tokio::time::sleep(Duration::from_millis(50)).await;
    stack.control(ControlSignal::EndStream).await;

    assert!(run.await.unwrap().is_ok());
    assert_eq!(
        last_status(&collect.await.unwrap()),
        Some(StatusKind::Completed)
    );
}

#[tokio::test]
async fn error_maps_to_failed() {
    let stack = list_stack(scenario_config());
    stack.publish(ev(1, CurrentState::Processing)).await;

    let (run, collect) = stack.spawn(None);
    tokio::time::sleep(Duration::from_millis(50)).await;
    stack.control(ControlSignal::Error).await;

    assert!(run.await.unwrap().is_ok());
    assert_eq!(
        last_status(&collect.await.unwrap()),
        Some(StatusKind::Failed)
    );
}

#[tokio::test]
async fn control_on_stream_backend_terminates_too() {
    let dir = tempfile::tempdir().unwrap();
    let stack = stream_stack(dir.path(), scenario_config());
    stack.publish(ev(1, CurrentState::Processing)).await;

    let (run, collect) = stack.spawn(None);
    tokio::time::sleep(Duration::from_millis(50)).await;
    stack.control(ControlSignal::Stop).await;

    assert!(run.await.unwrap().is_ok());
    assert_eq!(
        last_status(&collect.await.unwrap()),
        Some(StatusKind::Stopped)
    );
}

#[tokio::test]
async fn late_subscriber_still_terminates_via_the_log() {
    // Controls are lost to late subscribers; the terminal event written
    // before the control keeps them correct
    let stack = list_stack(scenario_config());
    stack.publish(ev(1, CurrentState::Processing)).await;
    stack.publish(ev(2, CurrentState::Complete)).await;
    stack.control(ControlSignal::EndStream).await;

    // Connect after everything already happened
    let (run, collect) = stack.spawn(None);
    assert!(run.await.unwrap().is_ok());
    let frames = collect.await.unwrap();
    assert_eq!(business_uuids(&frames), vec![uuid(1), uuid(2)]);
    assert_eq!(last_status(&frames), Some(StatusKind::Completed));
}
