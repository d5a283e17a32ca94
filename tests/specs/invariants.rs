// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cross-cutting invariants of the run lifecycle.

use crate::prelude::Stack;
use mekewe_store::{keys, StateStore};
use poem::http::StatusCode;
use serde_json::json;

/// The recorded filename map always matches the basenames on disk.
#[tokio::test]
async fn file_map_matches_disk_after_every_mutation() {
    let stack = Stack::new();
    let id = stack.create_run(json!({})).await;
    let input_dir = stack
        .cache_dir()
        .join(&id)
        .join("input")
        .join("input_file_path");

    let assert_in_sync = |run: &serde_json::Value| {
        let recorded: Vec<String> = run["pipeline_input_file_names"]["input_file_path"]
            .as_array()
            .map(|names| {
                names
                    .iter()
                    .map(|n| n.as_str().unwrap().to_string())
                    .collect()
            })
            .unwrap_or_default();
        let mut on_disk: Vec<String> = match std::fs::read_dir(&input_dir) {
            Ok(entries) => entries
                .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
                .collect(),
            Err(_) => Vec::new(),
        };
        on_disk.sort();
        let mut recorded_sorted = recorded;
        recorded_sorted.sort();
        assert_eq!(recorded_sorted, on_disk);
    };

    let (_, run) = stack
        .upload(
            &format!("/api/pipeline/{id}/file/upload/input_file_path"),
            "a.xlsx",
            b"a",
        )
        .await;
    assert_in_sync(&run);

    let (_, run) = stack
        .upload(
            &format!("/api/pipeline/{id}/file/upload/input_file_path"),
            "b.xlsx",
            b"b",
        )
        .await;
    assert_in_sync(&run);

    // Re-upload of the same name neither duplicates nor diverges.
    let (_, run) = stack
        .upload(
            &format!("/api/pipeline/{id}/file/upload/input_file_path"),
            "a.xlsx",
            b"a2",
        )
        .await;
    assert_in_sync(&run);
    assert_eq!(
        run["pipeline_input_file_names"]["input_file_path"],
        json!(["a.xlsx", "b.xlsx"])
    );

    let (_, run) = stack
        .delete(&format!("/api/pipeline/{id}/file/remove/input_file_path/a.xlsx"))
        .await;
    assert_in_sync(&run);
}

/// A ticket sits on the dispatch queue iff its record is `queued`.
#[tokio::test]
async fn queue_membership_tracks_queued_state() {
    let stack = Stack::new();
    stack.engine.write_output_file("map.pdf", b"pdf");
    let id = stack.create_run(json!({})).await;
    stack
        .upload(
            &format!("/api/pipeline/{id}/file/upload/input_file_path"),
            "genes.xlsx",
            b"table",
        )
        .await;

    let queue_holds = |stack: &Stack, id: &str| {
        let store = stack.manager.store().clone();
        let id = id.to_string();
        async move {
            store
                .list_range(keys::PIPELINE_QUEUE)
                .await
                .unwrap()
                .contains(&id)
        }
    };

    assert!(!queue_holds(&stack, &id).await);
    stack
        .post_empty(&format!("/api/pipeline/{id}/run/single_input_genes"))
        .await;
    assert_eq!(stack.state_of(&id).await, "queued");
    assert!(queue_holds(&stack, &id).await);

    stack.tick().await;
    assert_eq!(stack.state_of(&id).await, "success");
    assert!(!queue_holds(&stack, &id).await);
}

/// Timestamps are monotone: queued ≤ started ≤ finished.
#[tokio::test]
async fn timestamps_never_decrease() {
    let stack = Stack::new();
    stack.engine.write_output_file("map.pdf", b"pdf");
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
    stack.clock.advance_minutes(1);
    stack.tick().await;

    let (_, run) = stack.status(&id).await;
    let queued = run["queued_at_utc"].as_str().unwrap().to_string();
    let started = run["started_at_utc"].as_str().unwrap().to_string();
    let finished = run["finished_at_utc"].as_str().unwrap().to_string();
    assert!(queued <= started);
    assert!(started <= finished);
}

/// init → wipe → delete leaves neither record nor files behind.
#[tokio::test]
async fn init_wipe_delete_leaves_nothing() {
    let stack = Stack::new();
    let id = stack.create_run(json!({})).await;
    stack
        .upload(
            &format!("/api/pipeline/{id}/file/upload/input_file_path"),
            "genes.xlsx",
            b"table",
        )
        .await;

    let ticket = mekewe_core::Ticket::parse(&id).unwrap();
    let wiped = stack.manager.wipe_pipeline_run(&ticket).await.unwrap();
    assert_eq!(wiped.state, mekewe_core::RunState::Expired);
    assert!(wiped.pipeline_output_zip_file_name.is_none());
    assert!(!stack.cache_dir().join(&id).exists());

    stack.manager.delete_pipeline_status(&ticket).await.unwrap();
    let (status, _) = stack.status(&id).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

/// The worker failure counter is reset by clean ticks.
#[tokio::test]
async fn exception_counter_is_zero_after_clean_boot() {
    let stack = Stack::new();
    stack.worker.boot().await.unwrap();
    assert_eq!(
        stack
            .manager
            .store()
            .counter_get(keys::WORKER_EXCEPTION_COUNT)
            .await
            .unwrap(),
        Some(0)
    );
}
