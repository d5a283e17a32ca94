// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A failed run keeps its record for inspection and can be re-committed.

use crate::prelude::Stack;
use poem::http::StatusCode;
use serde_json::json;

#[tokio::test]
async fn failed_run_is_inspectable_and_recommittable() {
    let stack = Stack::new();
    stack.engine.fail_with("missing required column 'logFC'");

    let id = stack.create_run(json!({})).await;
    stack
        .upload(
            &format!("/api/pipeline/{id}/file/upload/input_file_path"),
            "broken.xlsx",
            b"not quite a gene table",
        )
        .await;
    stack
        .post_empty(&format!("/api/pipeline/{id}/run/single_input_genes"))
        .await;
    stack.tick().await;

    // The failure is on the record, not an HTTP error.
    let (status, run) = stack.status(&id).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(run["state"], "failed");
    assert!(run["error"].as_str().unwrap().contains("logFC"));
    assert!(run["error_traceback"].as_str().unwrap().contains("PipelineDefinition"));

    // The result endpoint reports the failed dependency.
    let (status, _) = stack.get(&format!("/api/pipeline/{id}/result")).await;
    assert_eq!(status, StatusCode::FAILED_DEPENDENCY);

    // Fix the input and re-commit: error fields reset, run succeeds.
    stack.engine.succeed();
    stack.engine.write_output_file("map.pdf", b"pdf");
    stack
        .upload(
            &format!("/api/pipeline/{id}/file/upload/input_file_path"),
            "fixed.xlsx",
            b"a proper gene table",
        )
        .await;
    let (status, run) = stack
        .post_empty(&format!("/api/pipeline/{id}/run/single_input_genes"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(run["state"], "queued");
    assert!(run["error"].is_null());

    stack.tick().await;
    let (_, run) = stack.status(&id).await;
    assert_eq!(run["state"], "success");
    assert!(run["error"].is_null());
    assert!(run["pipeline_output_zip_file_name"].is_string());
}

#[tokio::test]
async fn delete_is_rejected_while_queued_or_running() {
    let stack = Stack::new();
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

    let (status, _) = stack.delete(&format!("/api/pipeline/{id}")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
