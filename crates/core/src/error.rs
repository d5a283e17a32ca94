// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error kinds shared by the state manager, the worker, and the HTTP layer.

use crate::run::RunState;
use thiserror::Error;

/// Everything that can go wrong with a pipeline-run operation. The HTTP
/// layer maps each kind to one status code; the worker treats store and
/// filesystem kinds as retryable tick failures.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Pipeline-run could not be found.")]
    RecordNotFound,

    #[error("Operation not allowed while pipeline-run is {state}.")]
    BadState { state: RunState },

    #[error("{0}")]
    BadParameter(String),

    #[error("Storage limit of the pipeline cache is exhausted.")]
    OutOfStorage,

    #[error("Uploaded file exceeds the configured size limit.")]
    UploadTooLarge,

    #[error("Pipeline-run is not finished.")]
    NotReady,

    #[error("Pipeline-run expired and result is cleaned.")]
    Gone,

    #[error("Pipeline-run failed. Check the status endpoint for details: {0}")]
    DependencyFailed(String),

    #[error("State store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Stored pipeline-run record is not decodable: {0}")]
    InvalidRecord(String),

    #[error("Filesystem error: {0}")]
    Filesystem(#[from] std::io::Error),
}

impl PipelineError {
    pub fn bad_state(state: RunState) -> Self {
        PipelineError::BadState { state }
    }

    /// Wrap a state-store failure.
    pub fn store(err: impl std::fmt::Display) -> Self {
        PipelineError::StoreUnavailable(err.to_string())
    }
}
