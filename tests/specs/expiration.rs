// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Finished runs expire, lose their files, and are eventually deleted.

use crate::prelude::Stack;
use poem::http::StatusCode;
use serde_json::json;

async fn successful_run(stack: &Stack) -> String {
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
    stack.tick().await;
    assert_eq!(stack.state_of(&id).await, "success");
    id
}

#[tokio::test]
async fn finished_run_expires_and_files_are_wiped() {
    let stack = Stack::new();
    stack.engine.write_output_file("map.pdf", b"pdf");
    let id = successful_run(&stack).await;
    let ticket_dir = stack.cache_dir().join(&id);
    assert!(ticket_dir.exists());

    // Default retention keeps results for 1440 minutes.
    stack.clock.advance_minutes(1441);
    stack.tick().await;

    let (_, run) = stack.status(&id).await;
    assert_eq!(run["state"], "expired");
    assert!(run["pipeline_output_zip_file_name"].is_null());
    assert_eq!(run["pipeline_input_file_names"], json!({}));
    assert!(!ticket_dir.exists());

    let (status, _) = stack.get(&format!("/api/pipeline/{id}/result")).await;
    assert_eq!(status, StatusCode::GONE);
}

#[tokio::test]
async fn expired_result_is_gone_even_if_a_zip_lingers_on_disk() {
    let stack = Stack::new();
    stack.engine.write_output_file("map.pdf", b"pdf");
    let id = successful_run(&stack).await;

    stack.clock.advance_minutes(1441);
    stack.tick().await;

    // Recreate a stray archive; the recorded name was cleared, so the
    // result stays gone.
    let output_dir = stack.cache_dir().join(&id).join("output");
    std::fs::create_dir_all(&output_dir).unwrap();
    std::fs::write(output_dir.join("stray.zip"), b"zombie bytes").unwrap();

    let (status, _) = stack.get(&format!("/api/pipeline/{id}/result")).await;
    assert_eq!(status, StatusCode::GONE);
}

#[tokio::test]
async fn expired_record_is_deleted_after_the_grace_period() {
    let stack = Stack::new();
    stack.engine.write_output_file("map.pdf", b"pdf");
    let id = successful_run(&stack).await;

    stack.clock.advance_minutes(1441);
    stack.tick().await;
    assert_eq!(stack.state_of(&id).await, "expired");

    // Another 1440 minutes of grace before the record itself goes.
    stack.clock.advance_minutes(1441);
    stack.tick().await;
    let (status, _) = stack.status(&id).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // The statistics survive the record.
    let (_, report) = stack.get("/api/statistics").await;
    assert_eq!(report["total_runs"], 1);
}
