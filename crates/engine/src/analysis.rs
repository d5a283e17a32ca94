// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The seam to the external analysis engine.
//!
//! The engine is opaque to this service: it receives a marshalled
//! invocation, writes result files into the run's output directory, and
//! prints progress lines. The production implementation runs the engine
//! as a child process and pipes its stdout into the output sink.

use crate::output::OutputSink;
use async_trait::async_trait;
use mekewe_core::AnalysisMethodName;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Stdio;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::debug;

/// One fully marshalled analysis call.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisInvocation {
    pub method: AnalysisMethodName,
    /// Directory the engine must write its result files into.
    pub output_dir: PathBuf,
    /// Constructor parameters; file parameters carry absolute paths.
    pub global_params: BTreeMap<String, Value>,
    /// Method parameters; file parameters carry absolute paths.
    pub method_params: BTreeMap<String, Value>,
}

/// Failures of an engine invocation. These never escape the worker loop;
/// the processor records them on the run instead.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("analysis engine failed: {0}")]
    Engine(String),
    #[error("could not launch analysis engine: {0}")]
    Launch(#[from] std::io::Error),
    #[error("could not capture engine output: {0}")]
    OutputCapture(String),
}

/// Executes one analysis method to completion.
#[async_trait]
pub trait AnalysisEngine: Send + Sync {
    async fn run(
        &self,
        invocation: &AnalysisInvocation,
        output: &dyn OutputSink,
    ) -> Result<(), AnalysisError>;
}

/// Runs the engine as a child process.
///
/// The invocation is passed as one JSON argument; the child's stdout is
/// forwarded line by line into the output sink, so progress becomes
/// visible to polling clients while the analysis runs.
pub struct SubprocessEngine {
    program: String,
}

impl SubprocessEngine {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl AnalysisEngine for SubprocessEngine {
    async fn run(
        &self,
        invocation: &AnalysisInvocation,
        output: &dyn OutputSink,
    ) -> Result<(), AnalysisError> {
        let payload = serde_json::to_string(invocation)
            .map_err(|e| AnalysisError::Engine(e.to_string()))?;
        debug!(program = %self.program, method = %invocation.method, "spawning analysis engine");

        let mut child = Command::new(&self.program)
            .arg("run")
            .arg("--invocation")
            .arg(&payload)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        if let Some(stdout) = child.stdout.take() {
            let mut lines = BufReader::new(stdout).lines();
            while let Some(line) = lines.next_line().await? {
                output.emit_line(&line).await?;
            }
        }

        let exit = child.wait().await?;
        if !exit.success() {
            let mut stderr_tail = String::new();
            if let Some(stderr) = child.stderr.take() {
                let mut lines = BufReader::new(stderr).lines();
                while let Some(line) = lines.next_line().await? {
                    stderr_tail.push_str(&line);
                    stderr_tail.push('\n');
                }
            }
            return Err(AnalysisError::Engine(format!(
                "engine exited with {exit}: {}",
                stderr_tail.trim_end()
            )));
        }
        Ok(())
    }
}
