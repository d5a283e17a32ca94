// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mapping of pipeline errors onto HTTP responses.

use mekewe_core::PipelineError;
use poem::http::StatusCode;
use poem::Response;
use serde_json::json;

fn status_for(error: &PipelineError) -> StatusCode {
    match error {
        PipelineError::RecordNotFound => StatusCode::NOT_FOUND,
        PipelineError::BadState { .. } => StatusCode::BAD_REQUEST,
        PipelineError::BadParameter(_) => StatusCode::UNPROCESSABLE_ENTITY,
        PipelineError::OutOfStorage => StatusCode::INSUFFICIENT_STORAGE,
        PipelineError::UploadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        PipelineError::NotReady => {
            StatusCode::from_u16(425).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
        }
        PipelineError::Gone => StatusCode::GONE,
        PipelineError::DependencyFailed(_) => StatusCode::FAILED_DEPENDENCY,
        PipelineError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        PipelineError::InvalidRecord(_) | PipelineError::Filesystem(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Translate a pipeline error into a poem error carrying a
/// `{"detail": …}` body.
pub fn api_error(error: PipelineError) -> poem::Error {
    detail_error(status_for(&error), &error.to_string())
}

/// A poem error with an explicit status and `{"detail": …}` body.
pub fn detail_error(status: StatusCode, detail: &str) -> poem::Error {
    let body = json!({ "detail": detail });
    poem::Error::from_response(
        Response::builder()
            .status(status)
            .content_type("application/json")
            .body(body.to_string()),
    )
}

#[cfg(test)]
#[path = "http_error_tests.rs"]
mod tests;
