// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cache directories without a record are swept; everything else stays.

use crate::prelude::Stack;
use serde_json::json;

#[tokio::test]
async fn ticket_shaped_directory_without_record_is_removed() {
    let stack = Stack::new();
    let zombie = stack
        .cache_dir()
        .join(uuid::Uuid::new_v4().simple().to_string());
    std::fs::create_dir_all(zombie.join("input").join("x")).unwrap();

    stack.tick().await;
    assert!(!zombie.exists());
}

#[tokio::test]
async fn non_ticket_directories_are_preserved() {
    let stack = Stack::new();
    let unrelated = stack.cache_dir().join("lost+found");
    std::fs::create_dir_all(&unrelated).unwrap();

    stack.tick().await;
    assert!(unrelated.exists());
}

#[tokio::test]
async fn directories_of_live_records_survive_the_sweep() {
    let stack = Stack::new();
    let id = stack.create_run(json!({})).await;
    stack
        .upload(
            &format!("/api/pipeline/{id}/file/upload/input_file_path"),
            "genes.xlsx",
            b"table",
        )
        .await;
    let ticket_dir = stack.cache_dir().join(&id);
    assert!(ticket_dir.exists());

    stack.tick().await;
    assert!(ticket_dir.exists());
}
