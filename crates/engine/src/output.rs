// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Capture of analysis progress output onto the run record.

use crate::analysis::AnalysisError;
use crate::manager::StateManager;
use async_trait::async_trait;
use mekewe_core::{Clock, Ticket};

/// Receives the engine's textual output one complete line at a time.
#[async_trait]
pub trait OutputSink: Send + Sync {
    async fn emit_line(&self, line: &str) -> Result<(), AnalysisError>;
}

/// Appends each line to the record's `output_log` and persists it
/// immediately, so polling clients see engine progress while the run is
/// still executing.
pub struct RecordOutputSink<C: Clock> {
    manager: StateManager<C>,
    ticket: Ticket,
}

impl<C: Clock> RecordOutputSink<C> {
    pub fn new(manager: StateManager<C>, ticket: Ticket) -> Self {
        Self { manager, ticket }
    }
}

#[async_trait]
impl<C: Clock> OutputSink for RecordOutputSink<C> {
    async fn emit_line(&self, line: &str) -> Result<(), AnalysisError> {
        let mut run = self
            .manager
            .get_pipeline_run_definition(&self.ticket)
            .await
            .map_err(|e| AnalysisError::OutputCapture(e.to_string()))?;
        run.append_output_line(line);
        self.manager
            .set_pipeline_run_definition(&run)
            .await
            .map_err(|e| AnalysisError::OutputCapture(e.to_string()))
    }
}

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;
