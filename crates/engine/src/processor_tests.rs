// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::fake::FakeAnalysisEngine;
use crate::manager::RetentionPolicy;
use mekewe_core::{FakeClock, FileLayout, PipelineParams};
use mekewe_store::MemoryStore;
use serde_json::json;

struct Harness {
    manager: StateManager<FakeClock>,
    processor: PipelineProcessor<FakeClock>,
    engine: FakeAnalysisEngine,
    _cache: tempfile::TempDir,
}

fn harness() -> Harness {
    let cache = tempfile::tempdir().expect("tempdir");
    let clock = FakeClock::new();
    let manager = StateManager::new(
        std::sync::Arc::new(MemoryStore::new()),
        FileLayout::new(cache.path()),
        clock.clone(),
        RetentionPolicy::default(),
    );
    let engine = FakeAnalysisEngine::new();
    let processor = PipelineProcessor::new(
        manager.clone(),
        std::sync::Arc::new(engine.clone()),
        clock,
    );
    Harness {
        manager,
        processor,
        engine,
        _cache: cache,
    }
}

async fn committed_run(h: &Harness, method: &str) -> PipelineRun {
    let run = h
        .manager
        .init_new_pipeline_run(PipelineParams::default())
        .await
        .unwrap();
    h.manager
        .attach_pipeline_run_input_file(
            &run.ticket,
            "input_file_path",
            Some("genes.xlsx"),
            b"gene table",
        )
        .await
        .unwrap();
    h.manager
        .set_pipeline_run_as_queued(&run.ticket, method)
        .await
        .unwrap();
    h.manager
        .get_next_pipeline_run_from_queue(true)
        .await
        .unwrap()
        .unwrap()
}

#[tokio::test]
async fn successful_run_zips_output_and_sets_name() {
    let h = harness();
    h.engine.emit_line("mapping genes");
    h.engine.write_output_file("pathway_map.pdf", b"pdf bytes");
    let run = committed_run(&h, "single_input_genes").await;

    let processed = h.processor.process(run.clone()).await;
    assert!(processed.error.is_none());
    let zip_name = processed.pipeline_output_zip_file_name.clone().unwrap();
    assert!(zip_name.starts_with("output-metakegg-single_input_genes_"));
    assert!(zip_name.ends_with(".zip"));

    // The archive exists and the loose output file is gone.
    let zip_path = h.manager.layout().output_zip_path(&run.ticket, &zip_name);
    assert!(zip_path.exists());
    assert!(!h
        .manager
        .layout()
        .output_dir(&run.ticket)
        .join("pathway_map.pdf")
        .exists());

    // Engine prints became part of the record.
    assert_eq!(processed.output_log.as_deref(), Some("mapping genes\n"));
}

#[tokio::test]
async fn single_method_gets_bare_input_path() {
    let h = harness();
    let run = committed_run(&h, "single_input_genes").await;
    h.processor.process(run.clone()).await;

    let invocations = h.engine.invocations();
    assert_eq!(invocations.len(), 1);
    let input = &invocations[0].global_params["input_file_path"];
    let expected = h
        .manager
        .layout()
        .input_file_path(&run.ticket, "input_file_path", "genes.xlsx");
    assert_eq!(input, &json!(expected.to_string_lossy()));
}

#[tokio::test]
async fn multiple_inputs_method_gets_path_list() {
    let h = harness();
    let run = h
        .manager
        .init_new_pipeline_run(PipelineParams::default())
        .await
        .unwrap();
    for name in ["a.xlsx", "b.xlsx"] {
        h.manager
            .attach_pipeline_run_input_file(&run.ticket, "input_file_path", Some(name), b"x")
            .await
            .unwrap();
    }
    h.manager
        .set_pipeline_run_as_queued(&run.ticket, "multiple_inputs")
        .await
        .unwrap();
    let dispatched = h
        .manager
        .get_next_pipeline_run_from_queue(true)
        .await
        .unwrap()
        .unwrap();

    h.processor.process(dispatched).await;
    let invocations = h.engine.invocations();
    let input = invocations[0].global_params["input_file_path"]
        .as_array()
        .unwrap();
    assert_eq!(input.len(), 2);
}

#[tokio::test]
async fn empty_string_values_are_treated_absent() {
    let h = harness();
    let run = h
        .manager
        .init_new_pipeline_run(PipelineParams::default())
        .await
        .unwrap();
    let mut globals = std::collections::BTreeMap::new();
    globals.insert("input_label".to_string(), json!(""));
    globals.insert("sheet_name_paths".to_string(), json!("pathways"));
    h.manager
        .update_pipeline_run_params(&run.ticket, &globals, &std::collections::BTreeMap::new())
        .await
        .unwrap();
    h.manager
        .attach_pipeline_run_input_file(&run.ticket, "input_file_path", Some("g.xlsx"), b"x")
        .await
        .unwrap();
    h.manager
        .set_pipeline_run_as_queued(&run.ticket, "single_input_genes")
        .await
        .unwrap();
    let dispatched = h
        .manager
        .get_next_pipeline_run_from_queue(true)
        .await
        .unwrap()
        .unwrap();

    h.processor.process(dispatched).await;
    let invocation = &h.engine.invocations()[0];
    assert!(!invocation.global_params.contains_key("input_label"));
    assert_eq!(invocation.global_params["sheet_name_paths"], json!("pathways"));
}

#[tokio::test]
async fn engine_failure_is_recorded_not_propagated() {
    let h = harness();
    h.engine.emit_line("reading sheet");
    h.engine.fail_with("missing required column 'logFC'");
    let run = committed_run(&h, "single_input_genes").await;

    let processed = h.processor.process(run).await;
    assert_eq!(
        processed.error.as_deref(),
        Some("analysis engine failed: missing required column 'logFC'")
    );
    let traceback = processed.error_traceback.unwrap();
    assert!(traceback.contains("PipelineDefinition"));
    assert!(traceback.contains("AnalysisInvocation"));
    // Output captured before the failure stays for diagnosis.
    assert_eq!(processed.output_log.as_deref(), Some("reading sheet\n"));
    assert!(processed.pipeline_output_zip_file_name.is_none());
}

#[tokio::test]
async fn missing_required_input_file_fails_before_invocation() {
    let h = harness();
    let run = h
        .manager
        .init_new_pipeline_run(PipelineParams::default())
        .await
        .unwrap();
    h.manager
        .set_pipeline_run_as_queued(&run.ticket, "single_input_genes")
        .await
        .unwrap();
    let dispatched = h
        .manager
        .get_next_pipeline_run_from_queue(true)
        .await
        .unwrap()
        .unwrap();

    let processed = h.processor.process(dispatched).await;
    assert!(processed
        .error
        .as_deref()
        .unwrap()
        .contains("input_file_path"));
    assert!(h.engine.invocations().is_empty());
}

#[tokio::test]
async fn method_file_param_is_marshalled() {
    let h = harness();
    let run = h
        .manager
        .init_new_pipeline_run(PipelineParams::default())
        .await
        .unwrap();
    h.manager
        .attach_pipeline_run_input_file(&run.ticket, "input_file_path", Some("g.xlsx"), b"x")
        .await
        .unwrap();
    h.manager
        .attach_pipeline_run_input_file(&run.ticket, "methylation_path", Some("m.csv"), b"y")
        .await
        .unwrap();
    h.manager
        .set_pipeline_run_as_queued(&run.ticket, "single_input_with_methylation")
        .await
        .unwrap();
    let dispatched = h
        .manager
        .get_next_pipeline_run_from_queue(true)
        .await
        .unwrap()
        .unwrap();

    h.processor.process(dispatched).await;
    let invocation = &h.engine.invocations()[0];
    let methylation = invocation.method_params["methylation_path"].as_str().unwrap();
    assert!(methylation.ends_with("m.csv"));
}

#[tokio::test]
async fn run_can_be_reprocessed_after_failure() {
    let h = harness();
    h.engine.fail_with("transient engine trouble");
    let run = committed_run(&h, "single_input_genes").await;
    let failed = h.processor.process(run).await;
    h.manager
        .set_pipeline_state_as_finished(&failed.ticket)
        .await
        .unwrap();

    // Re-commit with a fixed engine.
    h.engine.succeed();
    h.engine.write_output_file("map.pdf", b"pdf");
    h.manager
        .set_pipeline_run_as_queued(&failed.ticket, "single_input_genes")
        .await
        .unwrap();
    let dispatched = h
        .manager
        .get_next_pipeline_run_from_queue(true)
        .await
        .unwrap()
        .unwrap();
    assert!(dispatched.error.is_none());

    let processed = h.processor.process(dispatched).await;
    assert!(processed.error.is_none());
    assert!(processed.pipeline_output_zip_file_name.is_some());
}
