// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Strict FIFO dispatch and live queue positions.

use crate::prelude::Stack;
use serde_json::json;

async fn committed_run(stack: &Stack) -> String {
    let id = stack.create_run(json!({})).await;
    stack
        .upload(
            &format!("/api/pipeline/{id}/file/upload/input_file_path"),
            "genes.xlsx",
            b"table",
        )
        .await;
    stack
        .post_empty(&format!("/api/pipeline/{id}/run/single_input_genes"))
        .await;
    id
}

#[tokio::test]
async fn earlier_commits_dispatch_first() {
    let stack = Stack::new();
    stack.engine.write_output_file("map.pdf", b"pdf");

    let first = committed_run(&stack).await;
    let second = committed_run(&stack).await;

    let (_, run) = stack.status(&first).await;
    assert_eq!(run["state"], "queued");
    assert_eq!(run["place_in_queue"], 1);
    let (_, run) = stack.status(&second).await;
    assert_eq!(run["state"], "queued");
    assert_eq!(run["place_in_queue"], 2);

    // One tick: only the first run executes; the second never overtakes.
    stack.tick().await;
    assert_eq!(stack.state_of(&first).await, "success");
    let (_, run) = stack.status(&second).await;
    assert_eq!(run["state"], "queued");
    assert_eq!(run["place_in_queue"], 1);

    stack.tick().await;
    assert_eq!(stack.state_of(&second).await, "success");
}

#[tokio::test]
async fn at_most_one_run_is_running() {
    let stack = Stack::new();
    stack.engine.write_output_file("map.pdf", b"pdf");
    for _ in 0..3 {
        committed_run(&stack).await;
    }

    for _ in 0..3 {
        stack.tick().await;
        let runs = stack.manager.get_all_pipeline_run_definitions().await.unwrap();
        let running = runs
            .iter()
            .filter(|r| r.state == mekewe_core::RunState::Running)
            .count();
        assert!(running <= 1);
    }
}
