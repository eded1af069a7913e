// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn timers_at(clock: &FakeClock) -> SessionTimers {
    SessionTimers::new(clock.now())
}

#[test]
fn no_timeout_within_ceilings() {
    let clock = FakeClock::new();
    let timers = timers_at(&clock);
    let config = test_config();

    clock.advance(Duration::from_secs(60));
    assert!(timers.check(clock.now(), &config).is_none());
}

#[test]
fn business_inactivity_fires() {
    let clock = FakeClock::new();
    let timers = timers_at(&clock);
    let config = test_config();

    clock.advance(config.business_timeout + Duration::from_secs(1));
    assert!(matches!(
        timers.check(clock.now(), &config),
        Some(StreamError::TimeoutExceeded)
    ));
}

#[test]
fn business_event_resets_the_inactivity_clock() {
    let clock = FakeClock::new();
    let timers = timers_at(&clock);
    let config = test_config();

    clock.advance(Duration::from_secs(100));
    timers.business_event(clock.now());
    clock.advance(Duration::from_secs(100));

    // 200s total but only 100s since the last business event
    assert!(timers.check(clock.now(), &config).is_none());
}

#[test]
fn absolute_ceiling_fires_despite_business_activity() {
    let clock = FakeClock::new();
    let timers = timers_at(&clock);
    let config = test_config();

    // Stay busy past the absolute connection ceiling
    let step = Duration::from_secs(60);
    let steps = config.connection_max_duration.as_secs() / step.as_secs() + 1;
    for _ in 0..steps {
        clock.advance(step);
        timers.business_event(clock.now());
    }
    assert!(matches!(
        timers.check(clock.now(), &config),
        Some(StreamError::TimeoutExceeded)
    ));
}

#[tokio::test]
async fn keep_alives_do_not_reset_the_business_clock() {
    // Keep-alives flow every 20ms while no business event arrives after
    // the first; the business-inactivity ceiling must still fire.
    let mut config = test_config();
    config.keep_alive_interval = Duration::from_millis(20);
    let harness = Harness::new(config);
    harness.publish(event(1, CurrentState::Processing)).await;

    let (run, collect) = spawn_session(harness.session(None));

    // Let keep-alives tick in real time, then push the fake clock past
    // the business ceiling
    tokio::time::sleep(Duration::from_millis(70)).await;
    harness
        .clock
        .advance(harness.config.business_timeout + Duration::from_secs(1));

    let result = run.await.unwrap();
    assert!(matches!(result, Err(StreamError::TimeoutExceeded)));

    let frames = collect.await.unwrap();
    assert!(
        names(&frames).iter().filter(|n| *n == "keep_alive").count() >= 2,
        "keep-alives flowed before the timeout"
    );
    // Timeouts close silently: no status frame
    assert!(last_status(&frames).is_none());
}

#[tokio::test]
async fn absolute_ceiling_terminates_a_busy_session() {
    let harness = Harness::new(test_config());
    harness.publish(event(1, CurrentState::Processing)).await;

    let (run, _collect) = spawn_session(harness.session(None));
    tokio::time::sleep(Duration::from_millis(40)).await;

    harness
        .clock
        .advance(harness.config.connection_max_duration + Duration::from_secs(1));
    // A business event right before the check does not save the session
    harness.publish(event(2, CurrentState::Processing)).await;

    let result = run.await.unwrap();
    assert!(matches!(result, Err(StreamError::TimeoutExceeded)));
}
