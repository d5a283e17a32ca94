// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared harness for the behavioral specs.

use mekewe_core::{Config, DynClock, FakeClock, FileLayout};
use mekewe_engine::{
    FakeAnalysisEngine, MaintenanceWorker, RetentionPolicy, StateManager, WorkerConfig,
};
use mekewe_server::{build_route, AppContext, WorkerHealth};
use mekewe_store::MemoryStore;
use poem::http::{HeaderMap, Method, StatusCode};
use poem::{Endpoint, EndpointExt, Request};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

const BOUNDARY: &str = "mekewe-specs-boundary";

/// The whole service in one process: HTTP app, manager, and a manually
/// ticked maintenance worker over shared fakes.
pub struct Stack {
    pub clock: FakeClock,
    pub engine: FakeAnalysisEngine,
    pub manager: StateManager<DynClock>,
    pub worker: MaintenanceWorker<DynClock>,
    ep: poem::endpoint::BoxEndpoint<'static>,
    _cache: tempfile::TempDir,
    cache_dir: PathBuf,
}

impl Stack {
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    pub fn with_config(mutate: impl FnOnce(&mut Config)) -> Self {
        let cache = tempfile::tempdir().expect("tempdir");
        let mut config = Config::default();
        config.pipeline_runs_cache_dir = cache.path().to_path_buf();
        mutate(&mut config);
        let cache_dir = config.pipeline_runs_cache_dir.clone();

        let clock = FakeClock::new();
        let dyn_clock = DynClock::new(clock.clone());
        let store = Arc::new(MemoryStore::new());
        let manager = StateManager::new(
            store.clone(),
            FileLayout::new(&cache_dir),
            dyn_clock.clone(),
            RetentionPolicy::from_config(&config),
        );
        let engine = FakeAnalysisEngine::new();
        let worker = MaintenanceWorker::new(
            manager.clone(),
            Arc::new(engine.clone()),
            dyn_clock,
            WorkerConfig {
                restart_budget: config.restart_background_worker_on_exception_n_times,
                ..WorkerConfig::default()
            },
        );
        let ctx = AppContext {
            manager: manager.clone(),
            store,
            config,
            worker_health: WorkerHealth::new(),
        };
        Self {
            clock,
            engine,
            manager,
            worker,
            ep: build_route(ctx).boxed(),
            _cache: cache,
            cache_dir,
        }
    }

    pub fn cache_dir(&self) -> &PathBuf {
        &self.cache_dir
    }

    /// One maintenance pass.
    pub async fn tick(&self) {
        self.worker.tick().await.expect("worker tick");
    }

    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(path.parse().expect("uri"));
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(body.to_string()),
            None => builder.finish(),
        };
        let mut response = self.ep.get_response(request).await;
        let status = response.status();
        let text = response.take_body().into_string().await.unwrap_or_default();
        let value = serde_json::from_str(&text).unwrap_or(Value::Null);
        (status, value)
    }

    pub async fn get(&self, path: &str) -> (StatusCode, Value) {
        self.request(Method::GET, path, None).await
    }

    pub async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, path, Some(body)).await
    }

    pub async fn post_empty(&self, path: &str) -> (StatusCode, Value) {
        self.request(Method::POST, path, None).await
    }

    pub async fn patch(&self, path: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::PATCH, path, Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> (StatusCode, Value) {
        self.request(Method::DELETE, path, None).await
    }

    pub async fn upload(&self, path: &str, filename: &str, bytes: &[u8]) -> (StatusCode, Value) {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; \
                 filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        let request = Request::builder()
            .method(Method::POST)
            .uri(path.parse().expect("uri"))
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(body);
        let mut response = self.ep.get_response(request).await;
        let status = response.status();
        let text = response.take_body().into_string().await.unwrap_or_default();
        let value = serde_json::from_str(&text).unwrap_or(Value::Null);
        (status, value)
    }

    /// Raw download of a path, returning headers and body bytes.
    pub async fn download(&self, path: &str) -> (StatusCode, HeaderMap, Vec<u8>) {
        let request = Request::builder()
            .method(Method::GET)
            .uri(path.parse().expect("uri"))
            .finish();
        let mut response = self.ep.get_response(request).await;
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response
            .take_body()
            .into_vec()
            .await
            .unwrap_or_default();
        (status, headers, bytes)
    }

    /// Create a run via the API and return its ticket id.
    pub async fn create_run(&self, body: Value) -> String {
        let (status, response) = self.post("/api/pipeline", body).await;
        assert_eq!(status, StatusCode::OK);
        response["id"].as_str().expect("ticket id").to_string()
    }

    /// Poll the status endpoint.
    pub async fn status(&self, id: &str) -> (StatusCode, Value) {
        self.get(&format!("/api/pipeline/{id}/status")).await
    }

    /// The state string of a run.
    pub async fn state_of(&self, id: &str) -> String {
        let (status, run) = self.status(id).await;
        assert_eq!(status, StatusCode::OK);
        run["state"].as_str().expect("state").to_string()
    }
}
