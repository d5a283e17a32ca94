// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Application context and route assembly.

use crate::routes;
use mekewe_core::{Config, DynClock};
use mekewe_engine::StateManager;
use mekewe_store::StateStore;
use poem::middleware::{Cors, Tracing};
use poem::{delete, get, patch, post, EndpointExt, Route};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Liveness flag of the background worker, shared with the health
/// endpoint.
#[derive(Clone)]
pub struct WorkerHealth {
    alive: Arc<AtomicBool>,
}

impl WorkerHealth {
    pub fn new() -> Self {
        Self {
            alive: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn mark_dead(&self) {
        self.alive.store(false, Ordering::Relaxed);
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Relaxed)
    }
}

impl Default for WorkerHealth {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything the HTTP handlers need, threaded through poem's `Data`.
#[derive(Clone)]
pub struct AppContext {
    pub manager: StateManager<DynClock>,
    pub store: Arc<dyn StateStore>,
    pub config: Config,
    pub worker_health: WorkerHealth,
}

/// Assemble the full route tree with CORS and request tracing.
pub fn build_route(ctx: AppContext) -> impl poem::Endpoint<Output = poem::Response> {
    Route::new()
        .at("/api/analysis", get(routes::list_analysis_methods))
        .at("/api/:method/params", get(routes::method_params))
        .at("/api/pipeline", post(routes::create_pipeline_run))
        .at(
            "/api/pipeline/:id",
            patch(routes::update_pipeline_run).delete(routes::delete_pipeline_run),
        )
        .at(
            "/api/pipeline/:id/file/upload/:param",
            post(routes::upload_input_file),
        )
        .at(
            "/api/pipeline/:id/file/remove/:param/:filename",
            delete(routes::remove_input_file),
        )
        .at("/api/pipeline/:id/run/:method", post(routes::commit_pipeline_run))
        .at("/api/pipeline/:id/status", get(routes::pipeline_run_status))
        .at("/api/pipeline/:id/result", get(routes::pipeline_run_result))
        .at("/api/statistics", get(routes::statistics))
        .at("/health", get(routes::health))
        .at("/config", get(routes::client_config))
        .at("/info-links", get(routes::info_links))
        .with(Cors::new())
        .with(Tracing)
        .data(ctx)
}
