// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The pipeline-run record and its state machine.

use crate::clock::Clock;
use crate::method::AnalysisMethodName;
use crate::ticket::Ticket;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Lifecycle state of a pipeline run. Single source of truth; transitions
/// are monotone along `initialized → queued → running → success|failed →
/// expired`, with a re-commit edge from `success`/`failed` back to `queued`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Initialized,
    Queued,
    Running,
    Success,
    Failed,
    Expired,
}

impl RunState {
    /// States in which the definition may still be edited (params patched,
    /// files attached or removed, the run committed or deleted).
    pub fn is_editable(&self) -> bool {
        !matches!(self, RunState::Queued | RunState::Running | RunState::Expired)
    }

    /// The run has been executed to completion, successfully or not.
    pub fn is_finished(&self) -> bool {
        matches!(self, RunState::Success | RunState::Failed)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Initialized => write!(f, "initialized"),
            RunState::Queued => write!(f, "queued"),
            RunState::Running => write!(f, "running"),
            RunState::Success => write!(f, "success"),
            RunState::Failed => write!(f, "failed"),
            RunState::Expired => write!(f, "expired"),
        }
    }
}

/// Parameter values supplied by the client, keyed by descriptor name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineParams {
    #[serde(default)]
    pub global_params: BTreeMap<String, Value>,
    #[serde(default)]
    pub method_specific_params: BTreeMap<String, Value>,
}

/// Persisted metadata about one pipeline run, keyed by ticket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    pub ticket: Ticket,
    pub state: RunState,
    /// Derived from the dispatch queue; only meaningful while `queued`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place_in_queue: Option<u64>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_traceback: Option<String>,
    /// Captured engine output, appended line by line while running.
    #[serde(default)]
    pub output_log: Option<String>,
    pub pipeline_params: PipelineParams,
    #[serde(default)]
    pub pipeline_analyses_method: Option<AnalysisMethodName>,
    /// Parameter name → ordered basenames currently on disk under
    /// `input/<param>/`.
    #[serde(default)]
    pub pipeline_input_file_names: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub pipeline_output_zip_file_name: Option<String>,
    pub created_at_utc: DateTime<Utc>,
    #[serde(default)]
    pub queued_at_utc: Option<DateTime<Utc>>,
    #[serde(default)]
    pub started_at_utc: Option<DateTime<Utc>>,
    #[serde(default)]
    pub finished_at_utc: Option<DateTime<Utc>>,
}

impl PipelineRun {
    /// Create a fresh record with a new ticket in state `initialized`.
    pub fn new(params: PipelineParams, clock: &impl Clock) -> Self {
        Self {
            ticket: Ticket::generate(),
            state: RunState::Initialized,
            place_in_queue: None,
            error: None,
            error_traceback: None,
            output_log: None,
            pipeline_params: params,
            pipeline_analyses_method: None,
            pipeline_input_file_names: BTreeMap::new(),
            pipeline_output_zip_file_name: None,
            created_at_utc: clock.now_utc(),
            queued_at_utc: None,
            started_at_utc: None,
            finished_at_utc: None,
        }
    }

    /// Filenames currently attached under one parameter.
    pub fn input_file_names(&self, param_name: &str) -> &[String] {
        self.pipeline_input_file_names
            .get(param_name)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Total number of attached input files across all parameters.
    pub fn input_file_count(&self) -> u64 {
        self.pipeline_input_file_names
            .values()
            .map(|names| names.len() as u64)
            .sum()
    }

    /// Append one captured engine output line.
    pub fn append_output_line(&mut self, line: &str) {
        let log = self.output_log.get_or_insert_with(String::new);
        log.push_str(line);
        log.push('\n');
    }

    /// Seconds spent waiting in the queue, once dispatched.
    pub fn waiting_time_sec(&self) -> Option<i64> {
        match (self.queued_at_utc, self.started_at_utc) {
            (Some(queued), Some(started)) => Some((started - queued).num_seconds()),
            _ => None,
        }
    }

    /// Seconds spent executing, once finished.
    pub fn running_time_sec(&self) -> Option<i64> {
        match (self.started_at_utc, self.finished_at_utc) {
            (Some(started), Some(finished)) => Some((finished - started).num_seconds()),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
