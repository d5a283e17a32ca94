// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Marshals one pipeline run into an analysis invocation, runs it, and
//! packs the result archive.
//!
//! Failures never escape to the worker loop: they are recorded on the
//! run (`error`, `error_traceback`) and the run's output files are left
//! in place for diagnosis.

use crate::analysis::{AnalysisEngine, AnalysisInvocation};
use crate::archive;
use crate::manager::StateManager;
use crate::output::RecordOutputSink;
use mekewe_core::{
    layout, params, AnalysisMethodName, Clock, ParamDescriptor, ParamFilter, ParamKind,
    PipelineRun, Ticket, Validator,
};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Runs queued pipeline runs through the analysis engine, one at a time.
pub struct PipelineProcessor<C: Clock> {
    manager: StateManager<C>,
    engine: Arc<dyn AnalysisEngine>,
    clock: C,
}

impl<C: Clock> PipelineProcessor<C> {
    pub fn new(manager: StateManager<C>, engine: Arc<dyn AnalysisEngine>, clock: C) -> Self {
        Self {
            manager,
            engine,
            clock,
        }
    }

    /// Execute the analysis for `run` exactly once. Always returns the
    /// resulting record; on failure the error is recorded instead of
    /// propagated, so the caller can finalize the run uniformly.
    pub async fn process(&self, run: PipelineRun) -> PipelineRun {
        let ticket = run.ticket.clone();
        let invocation = match self.marshal_invocation(&run) {
            Ok(invocation) => invocation,
            Err(message) => {
                return self.record_failure(&ticket, &run, &message, None).await;
            }
        };

        debug!(ticket = %ticket, method = %invocation.method, "invoking analysis engine");
        let sink = RecordOutputSink::new(self.manager.clone(), ticket.clone());
        if let Err(e) = self.engine.run(&invocation, &sink).await {
            return self
                .record_failure(&ticket, &run, &e.to_string(), Some(&invocation))
                .await;
        }

        // Reload: the sink has been appending output lines while the
        // engine was running.
        let mut finished = match self.manager.get_pipeline_run_definition(&ticket).await {
            Ok(run) => run,
            Err(e) => {
                error!(ticket = %ticket, error = %e, "run vanished during analysis");
                return run;
            }
        };
        let zip_name =
            layout::generate_output_zip_file_name(invocation.method, self.clock.now_utc());
        if let Err(e) = archive::pack_output_files(&invocation.output_dir, &zip_name) {
            return self
                .record_failure(&ticket, &finished, &e.to_string(), Some(&invocation))
                .await;
        }
        finished.pipeline_output_zip_file_name = Some(zip_name);
        if let Err(e) = self.manager.set_pipeline_run_definition(&finished).await {
            error!(ticket = %ticket, error = %e, "could not persist finished run");
        }
        info!(ticket = %ticket, "analysis completed");
        finished
    }

    fn marshal_invocation(&self, run: &PipelineRun) -> Result<AnalysisInvocation, String> {
        let method = run
            .pipeline_analyses_method
            .ok_or_else(|| "run was dispatched without an analysis method".to_string())?;

        let global_params = self.gather_params(
            run,
            method,
            &params::global_descriptors(),
            &run.pipeline_params.global_params,
        )?;

        let method_descriptors = params::method_descriptors(method);
        // Values stored for other methods' parameters are simply not
        // gathered; only keys this method recognizes are validated.
        let recognized: BTreeMap<String, Value> = run
            .pipeline_params
            .method_specific_params
            .iter()
            .filter(|(name, _)| {
                method_descriptors
                    .iter()
                    .any(|d| d.name.as_str() == name.as_str())
            })
            .filter(|(_, value)| value.as_str() != Some(""))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        let mut method_params = Validator::new(method_descriptors.clone(), ParamFilter::NonFile)
            .validate(&recognized)
            .map_err(|e| e.to_string())?;
        for descriptor in method_descriptors
            .iter()
            .filter(|d| d.kind == ParamKind::File)
        {
            match self.file_param_value(run, method, descriptor) {
                Some(value) => {
                    method_params.insert(descriptor.name.clone(), value);
                }
                None if descriptor.required => {
                    return Err(format!(
                        "missing required input file for parameter {}",
                        descriptor.name
                    ));
                }
                None => {}
            }
        }

        let output_dir = self.manager.layout().output_dir(&run.ticket);
        std::fs::create_dir_all(&output_dir).map_err(|e| e.to_string())?;

        Ok(AnalysisInvocation {
            method,
            output_dir,
            global_params,
            method_params,
        })
    }

    fn gather_params(
        &self,
        run: &PipelineRun,
        method: AnalysisMethodName,
        descriptors: &[ParamDescriptor],
        values: &BTreeMap<String, Value>,
    ) -> Result<BTreeMap<String, Value>, String> {
        let mut gathered = BTreeMap::new();
        for descriptor in descriptors {
            if descriptor.kind == ParamKind::File {
                match self.file_param_value(run, method, descriptor) {
                    Some(value) => {
                        gathered.insert(descriptor.name.clone(), value);
                    }
                    None if descriptor.required => {
                        return Err(format!(
                            "missing required input file for parameter {}",
                            descriptor.name
                        ));
                    }
                    None => {}
                }
                continue;
            }
            if let Some(value) = values.get(&descriptor.name) {
                // An empty string means the client cleared the value.
                if value.as_str() == Some("") {
                    continue;
                }
                gathered.insert(descriptor.name.clone(), value.clone());
            }
        }
        Ok(gathered)
    }

    /// Absolute paths of the files attached to one file parameter, or
    /// `None` when nothing is attached. Every method except
    /// `multiple_inputs` takes a single input path, so a one-element list
    /// collapses to the bare path.
    fn file_param_value(
        &self,
        run: &PipelineRun,
        method: AnalysisMethodName,
        descriptor: &ParamDescriptor,
    ) -> Option<Value> {
        let names = run.input_file_names(&descriptor.name);
        if names.is_empty() {
            return None;
        }
        let paths: Vec<String> = names
            .iter()
            .map(|name| {
                self.manager
                    .layout()
                    .input_file_path(&run.ticket, &descriptor.name, name)
                    .to_string_lossy()
                    .into_owned()
            })
            .collect();
        let wants_list = descriptor.is_list && method == AnalysisMethodName::MultipleInputs;
        if !wants_list && paths.len() == 1 {
            return paths.into_iter().next().map(Value::String);
        }
        Some(Value::Array(paths.into_iter().map(Value::String).collect()))
    }

    async fn record_failure(
        &self,
        ticket: &Ticket,
        fallback: &PipelineRun,
        message: &str,
        invocation: Option<&AnalysisInvocation>,
    ) -> PipelineRun {
        error!(ticket = %ticket, error = %message, "pipeline run failed");
        let mut run = match self.manager.get_pipeline_run_definition(ticket).await {
            Ok(run) => run,
            Err(_) => fallback.clone(),
        };
        run.error = Some(message.to_string());
        run.error_traceback = Some(failure_context(&run, message, invocation));
        if let Err(e) = self.manager.set_pipeline_run_definition(&run).await {
            error!(ticket = %ticket, error = %e, "could not persist failure");
        }
        run
    }
}

fn failure_context(
    run: &PipelineRun,
    message: &str,
    invocation: Option<&AnalysisInvocation>,
) -> String {
    let definition = serde_json::to_string_pretty(run).unwrap_or_else(|e| e.to_string());
    let invocation_dump = invocation
        .and_then(|i| serde_json::to_string_pretty(i).ok())
        .unwrap_or_else(|| "NotMarshalled".to_string());
    format!("{message}\n PipelineDefinition:\n {definition}\n AnalysisInvocation:\n {invocation_dump}")
}

impl<C: Clock> std::fmt::Debug for PipelineProcessor<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineProcessor").finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "processor_tests.rs"]
mod tests;
