// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP handlers mapping the REST contract onto the state manager.

use crate::app::AppContext;
use crate::http_error::{api_error, detail_error};
use mekewe_core::{
    params, AnalysisMethod, AnalysisMethodName, InfoLink, ParamDescriptor, PipelineError,
    PipelineRun, RunState, StatisticsReport, Ticket,
};
use mekewe_engine::validate_params_patch;
use poem::http::StatusCode;
use poem::web::{Data, Json, Multipart, Path, Query};
use poem::{handler, Body, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Partial parameter values as sent by clients.
#[derive(Debug, Default, Deserialize)]
pub struct ParamsPatch {
    #[serde(default)]
    pub global_params: BTreeMap<String, Value>,
    #[serde(default)]
    pub method_specific_params: BTreeMap<String, Value>,
}

#[derive(Debug, Serialize)]
pub struct TicketResponse {
    pub id: String,
}

#[derive(Debug, Serialize)]
pub struct MethodParams {
    pub global_params: Vec<ParamDescriptor>,
    pub method_specific_params: Vec<ParamDescriptor>,
}

#[derive(Debug, Serialize)]
pub struct ModuleHealthState {
    pub name: String,
    pub healthy: bool,
}

#[derive(Debug, Serialize)]
pub struct HealthState {
    pub healthy: bool,
    pub dependencies: Vec<ModuleHealthState>,
}

#[derive(Debug, Serialize)]
pub struct ClientConfig {
    pub contact_email: Option<String>,
    pub bug_report_email: Option<String>,
    pub entry_text: Option<String>,
    pub terms_and_conditions: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatisticsQuery {
    pub days_limit: Option<u32>,
    #[serde(default)]
    pub days_offset: u32,
}

fn parse_ticket(raw: &str) -> poem::Result<Ticket> {
    Ticket::parse(raw).map_err(|_| api_error(PipelineError::RecordNotFound))
}

#[handler]
pub async fn list_analysis_methods() -> Json<Vec<AnalysisMethod>> {
    Json(
        AnalysisMethodName::ALL
            .iter()
            .map(AnalysisMethodName::describe)
            .collect(),
    )
}

#[handler]
pub async fn method_params(Path(method): Path<String>) -> poem::Result<Json<MethodParams>> {
    let method = AnalysisMethodName::from_name(&method).ok_or_else(|| {
        detail_error(StatusCode::NOT_FOUND, "Analysis method could not be found.")
    })?;
    Ok(Json(MethodParams {
        global_params: params::global_descriptors(),
        method_specific_params: params::method_descriptors(method),
    }))
}

#[handler]
pub async fn create_pipeline_run(
    data: Data<&AppContext>,
    Json(patch): Json<ParamsPatch>,
) -> poem::Result<Json<TicketResponse>> {
    let params = validate_params_patch(&patch.global_params, &patch.method_specific_params)
        .map_err(api_error)?;
    let run = data
        .manager
        .init_new_pipeline_run(params)
        .await
        .map_err(api_error)?;
    Ok(Json(TicketResponse {
        id: run.ticket.to_string(),
    }))
}

#[handler]
pub async fn update_pipeline_run(
    data: Data<&AppContext>,
    Path(id): Path<String>,
    Json(patch): Json<ParamsPatch>,
) -> poem::Result<Json<PipelineRun>> {
    let ticket = parse_ticket(&id)?;
    let run = data
        .manager
        .update_pipeline_run_params(&ticket, &patch.global_params, &patch.method_specific_params)
        .await
        .map_err(api_error)?;
    Ok(Json(run))
}

#[handler]
pub async fn delete_pipeline_run(
    data: Data<&AppContext>,
    Path(id): Path<String>,
) -> poem::Result<StatusCode> {
    let ticket = parse_ticket(&id)?;
    data.manager
        .discard_pipeline_run(&ticket)
        .await
        .map_err(api_error)?;
    Ok(StatusCode::NO_CONTENT)
}

#[handler]
pub async fn upload_input_file(
    data: Data<&AppContext>,
    Path((id, param)): Path<(String, String)>,
    mut multipart: Multipart,
) -> poem::Result<Json<PipelineRun>> {
    let ticket = parse_ticket(&id)?;
    let mut upload: Option<(Option<String>, Vec<u8>)> = None;
    while let Some(field) = multipart.next_field().await? {
        if upload.is_none() {
            let file_name = field.file_name().map(str::to_string);
            let bytes = field
                .bytes()
                .await
                .map_err(|e| detail_error(StatusCode::BAD_REQUEST, &e.to_string()))?;
            upload = Some((file_name, bytes));
        }
    }
    let Some((file_name, bytes)) = upload else {
        return Err(detail_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "A multipart file field is required.",
        ));
    };
    if let Some(limit) = data.config.max_file_size_upload_limit_bytes {
        if bytes.len() as u64 > limit {
            return Err(api_error(PipelineError::UploadTooLarge));
        }
    }
    let run = data
        .manager
        .attach_pipeline_run_input_file(&ticket, &param, file_name.as_deref(), &bytes)
        .await
        .map_err(api_error)?;
    Ok(Json(run))
}

#[handler]
pub async fn remove_input_file(
    data: Data<&AppContext>,
    Path((id, param, filename)): Path<(String, String, String)>,
) -> poem::Result<Json<PipelineRun>> {
    let ticket = parse_ticket(&id)?;
    let run = data
        .manager
        .remove_pipeline_run_input_file(&ticket, &param, &filename)
        .await
        .map_err(api_error)?;
    Ok(Json(run))
}

#[handler]
pub async fn commit_pipeline_run(
    data: Data<&AppContext>,
    Path((id, method)): Path<(String, String)>,
) -> poem::Result<Json<PipelineRun>> {
    let ticket = parse_ticket(&id)?;
    let run = data
        .manager
        .set_pipeline_run_as_queued(&ticket, &method)
        .await
        .map_err(api_error)?;
    Ok(Json(run))
}

#[handler]
pub async fn pipeline_run_status(
    data: Data<&AppContext>,
    Path(id): Path<String>,
) -> poem::Result<Json<PipelineRun>> {
    let ticket = parse_ticket(&id)?;
    let run = data
        .manager
        .get_pipeline_run_definition(&ticket)
        .await
        .map_err(api_error)?;
    Ok(Json(run))
}

#[handler]
pub async fn pipeline_run_result(
    data: Data<&AppContext>,
    Path(id): Path<String>,
) -> poem::Result<Response> {
    let ticket = parse_ticket(&id)?;
    let run = data
        .manager
        .get_pipeline_run_definition(&ticket)
        .await
        .map_err(api_error)?;
    match run.state {
        RunState::Failed => Err(api_error(PipelineError::DependencyFailed(format!(
            "/api/pipeline/{id}/status"
        )))),
        RunState::Initialized | RunState::Queued | RunState::Running => {
            Err(api_error(PipelineError::NotReady))
        }
        RunState::Expired => Err(api_error(PipelineError::Gone)),
        RunState::Success => {
            // The recorded name is authoritative: once expiration cleared
            // it, the result is gone even if a file still lingers.
            let Some(zip_name) = run.pipeline_output_zip_file_name else {
                return Err(api_error(PipelineError::Gone));
            };
            let path = data.manager.layout().output_zip_path(&ticket, &zip_name);
            let file = tokio::fs::File::open(&path)
                .await
                .map_err(|e| api_error(PipelineError::Filesystem(e)))?;
            Ok(Response::builder()
                .content_type("application/zip")
                .header(
                    "Content-Disposition",
                    format!("attachment; filename=\"{zip_name}\""),
                )
                .body(Body::from_async_read(file)))
        }
    }
}

#[handler]
pub async fn statistics(
    data: Data<&AppContext>,
    Query(query): Query<StatisticsQuery>,
) -> poem::Result<Json<StatisticsReport>> {
    let report = data
        .manager
        .calculate_pipeline_run_statistics(query.days_limit, query.days_offset)
        .await
        .map_err(api_error)?;
    Ok(Json(report))
}

#[handler]
pub async fn health(data: Data<&AppContext>) -> Response {
    let cache_db_healthy = data.store.ping().await.is_ok();
    let worker_healthy = data.worker_health.is_alive();
    let state = HealthState {
        healthy: cache_db_healthy && worker_healthy,
        dependencies: vec![
            ModuleHealthState {
                name: "cache_db".to_string(),
                healthy: cache_db_healthy,
            },
            ModuleHealthState {
                name: "background_worker".to_string(),
                healthy: worker_healthy,
            },
        ],
    };
    let status = if state.healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    Response::builder()
        .status(status)
        .content_type("application/json")
        .body(serde_json::to_string(&state).unwrap_or_default())
}

#[handler]
pub async fn client_config(data: Data<&AppContext>) -> Json<ClientConfig> {
    Json(ClientConfig {
        contact_email: data.config.client_contact_email.clone(),
        bug_report_email: data.config.client_bug_report_email.clone(),
        entry_text: data.config.client_entry_text.clone(),
        terms_and_conditions: data.config.client_terms_and_conditions.clone(),
    })
}

#[handler]
pub async fn info_links(data: Data<&AppContext>) -> Json<Vec<InfoLink>> {
    Json(data.config.client_link_list.clone())
}

#[cfg(test)]
#[path = "routes_tests.rs"]
mod tests;
