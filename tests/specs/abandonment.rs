// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Uncommitted definitions are dropped after the abandonment timeout.

use crate::prelude::Stack;
use poem::http::StatusCode;
use serde_json::json;

#[tokio::test]
async fn uncommitted_run_is_dropped_after_timeout() {
    let stack = Stack::with_config(|config| {
        config.pipeline_abandoned_definition_deleted_after_min = 30;
    });
    let id = stack.create_run(json!({})).await;

    // Still there right before the configured timeout.
    stack.clock.advance_minutes(29);
    stack.tick().await;
    let (status, _) = stack.status(&id).await;
    assert_eq!(status, StatusCode::OK);

    stack.clock.advance_minutes(2);
    stack.tick().await;
    let (status, _) = stack.status(&id).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn committed_runs_are_not_abandoned() {
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
    stack.tick().await;

    stack.clock.advance_minutes(300);
    stack.tick().await;
    let (status, _) = stack.status(&id).await;
    assert_eq!(status, StatusCode::OK);
}
