// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! mekewe-engine: the ticketed job-lifecycle engine.
//!
//! The [`StateManager`] owns every mutation of pipeline-run records, the
//! dispatch queue, and the statistics list. The [`MaintenanceWorker`] is
//! the single background loop that dispatches queued runs to the analysis
//! engine and performs lifecycle housekeeping.

pub mod analysis;
pub mod archive;
pub mod manager;
pub mod output;
pub mod processor;
pub mod worker;

pub use analysis::{AnalysisEngine, AnalysisError, AnalysisInvocation, SubprocessEngine};
pub use manager::{validate_params_patch, RetentionPolicy, StateManager};
pub use output::{OutputSink, RecordOutputSink};
pub use processor::PipelineProcessor;
pub use worker::{MaintenanceWorker, StopHandle, WorkerConfig, WorkerError};

#[cfg(any(test, feature = "test-support"))]
pub mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeAnalysisEngine;
