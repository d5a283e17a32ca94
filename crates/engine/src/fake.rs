// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scriptable analysis engine for tests.

use crate::analysis::{AnalysisEngine, AnalysisError, AnalysisInvocation};
use crate::output::OutputSink;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

/// Test double for the external analysis engine.
///
/// Emits the scripted output lines, writes the scripted result files into
/// the invocation's output directory, and optionally fails. Every
/// invocation is recorded for assertions.
#[derive(Clone, Default)]
pub struct FakeAnalysisEngine {
    inner: Arc<Mutex<FakeState>>,
}

#[derive(Default)]
struct FakeState {
    output_lines: Vec<String>,
    output_files: Vec<(String, Vec<u8>)>,
    fail_with: Option<String>,
    invocations: Vec<AnalysisInvocation>,
}

impl FakeAnalysisEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a progress line the engine will print.
    pub fn emit_line(&self, line: &str) -> &Self {
        self.inner.lock().output_lines.push(line.to_string());
        self
    }

    /// Script a result file the engine will write.
    pub fn write_output_file(&self, name: &str, bytes: &[u8]) -> &Self {
        self.inner
            .lock()
            .output_files
            .push((name.to_string(), bytes.to_vec()));
        self
    }

    /// Make the next invocations fail with `message` (after emitting any
    /// scripted lines).
    pub fn fail_with(&self, message: &str) -> &Self {
        self.inner.lock().fail_with = Some(message.to_string());
        self
    }

    /// Clear a scripted failure.
    pub fn succeed(&self) -> &Self {
        self.inner.lock().fail_with = None;
        self
    }

    /// Invocations seen so far.
    pub fn invocations(&self) -> Vec<AnalysisInvocation> {
        self.inner.lock().invocations.clone()
    }
}

#[async_trait]
impl AnalysisEngine for FakeAnalysisEngine {
    async fn run(
        &self,
        invocation: &AnalysisInvocation,
        output: &dyn OutputSink,
    ) -> Result<(), AnalysisError> {
        let (lines, files, fail_with) = {
            let mut state = self.inner.lock();
            state.invocations.push(invocation.clone());
            (
                state.output_lines.clone(),
                state.output_files.clone(),
                state.fail_with.clone(),
            )
        };
        for line in &lines {
            output.emit_line(line).await?;
        }
        if let Some(message) = fail_with {
            return Err(AnalysisError::Engine(message));
        }
        std::fs::create_dir_all(&invocation.output_dir)?;
        for (name, bytes) in &files {
            std::fs::write(invocation.output_dir.join(name), bytes)?;
        }
        Ok(())
    }
}
