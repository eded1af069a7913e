// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use relay_core::{RunId, ThreadId};
use std::collections::HashMap;

fn job(n: u32) -> DispatchJob {
    DispatchJob {
        thread_id: ThreadId::new("thread-a"),
        run_id: RunId::new(format!("run-{n}")),
        user_id: "anonymous".to_string(),
        task: "do something".to_string(),
        context_data: Vec::new(),
        parameters: HashMap::new(),
    }
}

#[tokio::test]
async fn enqueued_jobs_arrive_in_order() {
    let (queue, mut rx) = ChannelTaskQueue::new(4);
    queue.enqueue(job(1)).await.unwrap();
    queue.enqueue(job(2)).await.unwrap();

    assert_eq!(rx.recv().await.unwrap().run_id, "run-1");
    assert_eq!(rx.recv().await.unwrap().run_id, "run-2");
}

#[tokio::test]
async fn full_queue_rejects_without_blocking() {
    let (queue, _rx) = ChannelTaskQueue::new(1);
    queue.enqueue(job(1)).await.unwrap();
    assert!(matches!(
        queue.enqueue(job(2)).await,
        Err(QueueError::Full)
    ));
}

#[tokio::test]
async fn closed_queue_reports_closed() {
    let (queue, rx) = ChannelTaskQueue::new(1);
    drop(rx);
    assert!(matches!(
        queue.enqueue(job(1)).await,
        Err(QueueError::Closed)
    ));
}

#[test]
fn job_serializes_with_defaults() {
    let json = serde_json::to_value(job(1)).unwrap();
    assert_eq!(json["thread_id"], "thread-a");
    assert_eq!(json["user_id"], "anonymous");

    let minimal = serde_json::json!({
        "thread_id": "thread-b",
        "run_id": "run-9",
        "user_id": "u",
        "task": "t",
    });
    let back: DispatchJob = serde_json::from_value(minimal).unwrap();
    assert!(back.context_data.is_empty());
    assert!(back.parameters.is_empty());
}
