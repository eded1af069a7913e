// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use relay_core::{validate_prefixed_id, Domain, FakeClock, RunStatus, SequentialIdGen, ThreadStatus};

type TestRegistry = ThreadRegistry<FakeClock, SequentialIdGen>;

fn registry() -> (TestRegistry, FakeClock) {
    let clock = FakeClock::new();
    let registry = ThreadRegistry::new(clock.clone(), SequentialIdGen::new());
    (registry, clock)
}

fn pending_run(registry: &TestRegistry, thread: &ThreadId, clock: &FakeClock) -> RunRecord {
    RunRecord::pending(
        thread.clone(),
        registry.next_run_id(),
        "summarize",
        clock.now(),
    )
}

#[test]
fn create_thread_yields_validated_id() {
    let (registry, _clock) = registry();
    let thread = registry.create_thread(HashMap::new(), None);

    assert!(validate_prefixed_id(Domain::Thread, thread.as_str()).is_ok());
    assert!(registry.validate(&thread));

    let meta = registry.metadata(&thread).unwrap();
    assert_eq!(meta.status, ThreadStatus::Active);
    assert_eq!(meta.run_count, 0);
    assert!(meta.last_run_id.is_none());
    assert_eq!(meta.created_at, meta.updated_at);
}

#[test]
fn context_is_stored_when_supplied() {
    let (registry, _clock) = registry();
    let thread = registry.create_thread(HashMap::new(), Some(serde_json::json!({"doc": "d-1"})));
    assert_eq!(
        registry.context(&thread),
        Some(serde_json::json!({"doc": "d-1"}))
    );

    let bare = registry.create_thread(HashMap::new(), None);
    assert_eq!(registry.context(&bare), None);
}

#[test]
fn unknown_thread_fails_validation() {
    let (registry, _clock) = registry();
    assert!(!registry.validate(&ThreadId::new("thread-nope")));
}

#[test]
fn inactive_thread_fails_validation() {
    let (registry, _clock) = registry();
    let thread = registry.create_thread(HashMap::new(), None);
    registry
        .update_thread_status(&thread, ThreadStatus::Archived)
        .unwrap();
    assert!(!registry.validate(&thread));
}

#[test]
fn record_run_updates_thread_bookkeeping() {
    let (registry, clock) = registry();
    let thread = registry.create_thread(HashMap::new(), None);

    clock.advance(Duration::from_secs(5));
    let run = pending_run(&registry, &thread, &clock);
    let run_id = run.run_id.clone();
    registry.record_run(run).unwrap();

    let meta = registry.metadata(&thread).unwrap();
    assert_eq!(meta.run_count, 1);
    assert_eq!(meta.last_run_id, Some(run_id.clone()));
    assert!(meta.updated_at > meta.created_at);

    let runs = registry.runs(&thread, 10);
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].run_id, run_id);
}

#[test]
fn record_run_on_unknown_thread_fails() {
    let (registry, clock) = registry();
    let ghost = ThreadId::new("thread-ghost");
    let run = RunRecord::pending(ghost.clone(), RunId::new("run-1"), "task", clock.now());
    assert!(matches!(
        registry.record_run(run),
        Err(RegistryError::UnknownThread(t)) if t == ghost
    ));
}

#[test]
fn runs_come_back_newest_first() {
    let (registry, clock) = registry();
    let thread = registry.create_thread(HashMap::new(), None);

    let first = pending_run(&registry, &thread, &clock);
    let second = pending_run(&registry, &thread, &clock);
    let second_id = second.run_id.clone();
    registry.record_run(first).unwrap();
    registry.record_run(second).unwrap();

    let runs = registry.runs(&thread, 10);
    assert_eq!(runs[0].run_id, second_id);
    assert_eq!(registry.runs(&thread, 1).len(), 1);
}

#[test]
fn update_run_status_stamps_transitions() {
    let (registry, clock) = registry();
    let thread = registry.create_thread(HashMap::new(), None);
    let run = pending_run(&registry, &thread, &clock);
    let run_id = run.run_id.clone();
    registry.record_run(run).unwrap();

    clock.advance(Duration::from_secs(1));
    registry
        .update_run_status(&thread, &run_id, RunStatus::Processing, None)
        .unwrap();
    let record = registry.run(&thread, &run_id).unwrap();
    assert_eq!(record.status, RunStatus::Processing);
    assert_eq!(record.started_at, Some(clock.now()));
    assert!(record.completed_at.is_none());

    clock.advance(Duration::from_secs(3));
    registry
        .update_run_status(
            &thread,
            &run_id,
            RunStatus::Failed,
            Some("sandbox died".to_string()),
        )
        .unwrap();
    let record = registry.run(&thread, &run_id).unwrap();
    assert_eq!(record.status, RunStatus::Failed);
    assert_eq!(record.completed_at, Some(clock.now()));
    assert_eq!(record.error.as_deref(), Some("sandbox died"));
}

#[test]
fn update_unknown_run_fails() {
    let (registry, _clock) = registry();
    let thread = registry.create_thread(HashMap::new(), None);
    let err = registry
        .update_run_status(&thread, &RunId::new("run-ghost"), RunStatus::Completed, None)
        .unwrap_err();
    assert!(matches!(err, RegistryError::UnknownRun { .. }));
}

#[test]
fn expire_stale_uses_clock() {
    let (registry, clock) = registry();
    let thread = registry.create_thread(HashMap::new(), None);

    clock.advance(Duration::from_secs(8 * 24 * 3600));
    registry.expire_stale(
        Duration::from_secs(7 * 24 * 3600),
        Duration::from_secs(24 * 3600),
    );
    assert!(!registry.validate(&thread));
}

#[test]
fn snapshot_state_round_trips_into_new_registry() {
    let (registry, clock) = registry();
    let thread = registry.create_thread(HashMap::new(), None);
    registry
        .record_run(pending_run(&registry, &thread, &clock))
        .unwrap();

    let state = registry.snapshot_state();
    let restored = ThreadRegistry::with_state(state, clock.clone(), SequentialIdGen::new());
    assert!(restored.validate(&thread));
    assert_eq!(restored.runs(&thread, 10).len(), 1);
}
