// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Happy path: define, upload, commit, poll, download.

use crate::prelude::Stack;
use poem::http::StatusCode;
use serde_json::json;
use std::io::Read;

#[tokio::test]
async fn single_input_run_end_to_end() {
    let stack = Stack::new();
    stack.engine.emit_line("collecting pathways");
    stack
        .engine
        .write_output_file("single_input_genes.pdf", b"%PDF map");

    // Define a run with initial parameters.
    let id = stack
        .create_run(json!({
            "global_params": {"sheet_name_paths": "pathways", "count_threshold": 3}
        }))
        .await;

    // Adjust a parameter afterwards.
    let (status, run) = stack
        .patch(
            &format!("/api/pipeline/{id}"),
            json!({"global_params": {"count_threshold": 2}}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(run["pipeline_params"]["global_params"]["count_threshold"], 2);

    // Attach the input spreadsheet.
    let (status, _) = stack
        .upload(
            &format!("/api/pipeline/{id}/file/upload/input_file_path"),
            "single_input_genes.xlsx",
            b"gene table",
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stack.state_of(&id).await, "initialized");

    // Commit to a method.
    let (status, run) = stack
        .post_empty(&format!("/api/pipeline/{id}/run/single_input_genes"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(run["state"], "queued");
    assert_eq!(run["place_in_queue"], 1);

    // One worker tick dispatches and finishes it.
    stack.tick().await;
    let (_, run) = stack.status(&id).await;
    assert_eq!(run["state"], "success");
    assert_eq!(run["output_log"], "collecting pathways\n");
    let zip_name = run["pipeline_output_zip_file_name"].as_str().unwrap().to_string();

    // The download carries the archive under its recorded name.
    let (status, headers, bytes) = stack
        .download(&format!("/api/pipeline/{id}/result"))
        .await;
    assert_eq!(status, StatusCode::OK);
    let disposition = headers
        .get("content-disposition")
        .unwrap()
        .to_str()
        .unwrap();
    assert!(disposition.contains(&zip_name));

    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
    let mut content = String::new();
    archive
        .by_name("single_input_genes.pdf")
        .unwrap()
        .read_to_string(&mut content)
        .unwrap();
    assert_eq!(content, "%PDF map");
}

#[tokio::test]
async fn engine_parameters_reach_the_invocation() {
    let stack = Stack::new();
    let id = stack
        .create_run(json!({"global_params": {"count_threshold": 3}}))
        .await;
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

    let invocations = stack.engine.invocations();
    assert_eq!(invocations.len(), 1);
    assert_eq!(invocations[0].global_params["count_threshold"], json!(3));
    let input = invocations[0].global_params["input_file_path"].as_str().unwrap();
    assert!(input.ends_with("genes.xlsx"));
}
