// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! All mutations of pipeline-run records, the dispatch queue, attached
//! files, lifecycle scans, and the statistics list.
//!
//! The manager is shared by the HTTP front-end and the maintenance worker;
//! both go through the same state store, so there is no in-memory state
//! here beyond configuration.

use chrono::Duration;
use mekewe_core::{
    layout, params, stats, AnalysisMethodName, Clock, Config, FileLayout, ParamFilter,
    PipelineError, PipelineParams, PipelineRun, RunState, StatisticPoint, StatisticsReport,
    Ticket, Validator,
};
use mekewe_store::{keys, StateStore};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Lifecycle timing and storage limits, extracted from [`Config`].
#[derive(Debug, Clone)]
pub struct RetentionPolicy {
    pub abandoned_after_min: i64,
    pub expired_after_min: i64,
    pub deleted_after_min: i64,
    pub max_statistics_age_days: u32,
    pub max_cache_size_bytes: Option<u64>,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl RetentionPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            abandoned_after_min: config.pipeline_abandoned_definition_deleted_after_min,
            expired_after_min: config.pipeline_result_expired_after_min,
            deleted_after_min: config.pipeline_result_deleted_after_min,
            max_statistics_age_days: config.max_statistics_age_days,
            max_cache_size_bytes: config.max_cache_size_bytes,
        }
    }
}

/// Owner of every pipeline-run record mutation.
#[derive(Clone)]
pub struct StateManager<C: Clock> {
    store: Arc<dyn StateStore>,
    layout: FileLayout,
    clock: C,
    retention: RetentionPolicy,
}

impl<C: Clock> StateManager<C> {
    pub fn new(
        store: Arc<dyn StateStore>,
        layout: FileLayout,
        clock: C,
        retention: RetentionPolicy,
    ) -> Self {
        Self {
            store,
            layout,
            clock,
            retention,
        }
    }

    pub fn layout(&self) -> &FileLayout {
        &self.layout
    }

    pub fn store(&self) -> &Arc<dyn StateStore> {
        &self.store
    }

    /// Create a record with a fresh ticket in state `initialized`.
    pub async fn init_new_pipeline_run(
        &self,
        params: PipelineParams,
    ) -> Result<PipelineRun, PipelineError> {
        let run = PipelineRun::new(params, &self.clock);
        self.set_pipeline_run_definition(&run).await?;
        debug!(ticket = %run.ticket, "initialized new pipeline run");
        Ok(run)
    }

    /// Load a record, or `None` if the ticket is unknown. For queued runs
    /// the live queue position is filled in.
    pub async fn try_get_pipeline_run_definition(
        &self,
        ticket: &Ticket,
    ) -> Result<Option<PipelineRun>, PipelineError> {
        let raw = self
            .store
            .hash_get(keys::PIPELINE_STATES, ticket.as_str())
            .await
            .map_err(PipelineError::store)?;
        let Some(raw) = raw else {
            return Ok(None);
        };
        let mut run: PipelineRun =
            serde_json::from_str(&raw).map_err(|e| PipelineError::InvalidRecord(e.to_string()))?;
        if run.state == RunState::Queued {
            run.place_in_queue = self.place_in_queue(ticket).await?;
        }
        Ok(Some(run))
    }

    /// Load a record, failing with `RecordNotFound` for unknown tickets.
    pub async fn get_pipeline_run_definition(
        &self,
        ticket: &Ticket,
    ) -> Result<PipelineRun, PipelineError> {
        self.try_get_pipeline_run_definition(ticket)
            .await?
            .ok_or(PipelineError::RecordNotFound)
    }

    /// Overwrite the stored record. The derived queue position is never
    /// persisted.
    pub async fn set_pipeline_run_definition(
        &self,
        run: &PipelineRun,
    ) -> Result<(), PipelineError> {
        let mut stored = run.clone();
        stored.place_in_queue = None;
        let raw = serde_json::to_string(&stored)
            .map_err(|e| PipelineError::InvalidRecord(e.to_string()))?;
        self.store
            .hash_set(keys::PIPELINE_STATES, run.ticket.as_str(), &raw)
            .await
            .map_err(PipelineError::store)
    }

    /// 1-based position in the dispatch queue, counted from the next run
    /// to be dispatched.
    async fn place_in_queue(&self, ticket: &Ticket) -> Result<Option<u64>, PipelineError> {
        let position = self
            .store
            .list_position(keys::PIPELINE_QUEUE, ticket.as_str())
            .await
            .map_err(PipelineError::store)?;
        let Some(index) = position else {
            return Ok(None);
        };
        let length = self
            .store
            .list_length(keys::PIPELINE_QUEUE)
            .await
            .map_err(PipelineError::store)?;
        // The queue is pushed on the left and popped on the right, so the
        // element closest to the tail is dispatched first.
        Ok(Some(length.saturating_sub(index)))
    }

    /// Merge non-file parameter values into the record (PATCH semantics).
    pub async fn update_pipeline_run_params(
        &self,
        ticket: &Ticket,
        global_params: &BTreeMap<String, Value>,
        method_specific_params: &BTreeMap<String, Value>,
    ) -> Result<PipelineRun, PipelineError> {
        let mut run = self.get_pipeline_run_definition(ticket).await?;
        if !run.state.is_editable() {
            return Err(PipelineError::bad_state(run.state));
        }

        for (name, value) in global_params {
            let coerced = coerce_non_file_param(name, value, ParamScope::Global)?;
            merge_param(&mut run.pipeline_params.global_params, name, coerced);
        }
        for (name, value) in method_specific_params {
            let coerced = coerce_non_file_param(name, value, ParamScope::MethodSpecific)?;
            merge_param(&mut run.pipeline_params.method_specific_params, name, coerced);
        }

        self.set_pipeline_run_definition(&run).await?;
        Ok(run)
    }

    /// Store an uploaded file under a file-typed parameter.
    pub async fn attach_pipeline_run_input_file(
        &self,
        ticket: &Ticket,
        param_name: &str,
        filename: Option<&str>,
        bytes: &[u8],
    ) -> Result<PipelineRun, PipelineError> {
        let mut run = self.get_pipeline_run_definition(ticket).await?;
        if !run.state.is_editable() {
            return Err(PipelineError::bad_state(run.state));
        }
        let descriptor = params::find(param_name).ok_or_else(|| {
            PipelineError::BadParameter(format!("unknown parameter: {param_name}"))
        })?;
        if descriptor.kind != params::ParamKind::File {
            return Err(PipelineError::BadParameter(format!(
                "parameter {param_name} does not take a file"
            )));
        }

        let mut clean_name = layout::sanitize_filename(filename.unwrap_or_default());
        if clean_name.is_empty() {
            let suffix = Uuid::new_v4().simple().to_string();
            clean_name = format!("upload-{}", &suffix[..8]);
        }

        // A non-list parameter holds at most one file; drop any previous
        // one (re-uploads of the same name just overwrite).
        if !descriptor.is_list {
            let previous: Vec<String> = run
                .input_file_names(param_name)
                .iter()
                .filter(|name| *name != &clean_name)
                .cloned()
                .collect();
            for name in previous {
                run = self
                    .remove_pipeline_run_input_file(ticket, param_name, &name)
                    .await?;
            }
        }

        let input_dir = self.layout.input_dir(ticket, param_name);
        std::fs::create_dir_all(&input_dir)?;
        let file_path = self.layout.input_file_path(ticket, param_name, &clean_name);
        std::fs::write(&file_path, bytes)?;

        if let Some(max_bytes) = self.retention.max_cache_size_bytes {
            let total = self.layout.cache_size_bytes()?;
            if total > max_bytes {
                std::fs::remove_file(&file_path)?;
                warn!(
                    ticket = %ticket,
                    total_bytes = total,
                    "upload rejected, cache size limit exhausted"
                );
                return Err(PipelineError::OutOfStorage);
            }
        }

        let names = run
            .pipeline_input_file_names
            .entry(param_name.to_string())
            .or_default();
        if !names.contains(&clean_name) {
            names.push(clean_name);
        }
        self.set_pipeline_run_definition(&run).await?;
        Ok(run)
    }

    /// Remove an attached file from disk and from the record. A missing
    /// file is not an error.
    pub async fn remove_pipeline_run_input_file(
        &self,
        ticket: &Ticket,
        param_name: &str,
        filename: &str,
    ) -> Result<PipelineRun, PipelineError> {
        let mut run = self.get_pipeline_run_definition(ticket).await?;
        if !run.state.is_editable() {
            return Err(PipelineError::bad_state(run.state));
        }

        let file_path = self.layout.input_file_path(ticket, param_name, filename);
        match std::fs::remove_file(&file_path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(ticket = %ticket, file = %file_path.display(), "input file already gone");
            }
            Err(e) => return Err(e.into()),
        }

        if let Some(names) = run.pipeline_input_file_names.get_mut(param_name) {
            names.retain(|name| name != filename);
            if names.is_empty() {
                run.pipeline_input_file_names.remove(param_name);
            }
        }
        self.set_pipeline_run_definition(&run).await?;
        Ok(run)
    }

    /// Commit the run to the named analysis method and enqueue it.
    pub async fn set_pipeline_run_as_queued(
        &self,
        ticket: &Ticket,
        analysis_method_name: &str,
    ) -> Result<PipelineRun, PipelineError> {
        let method = AnalysisMethodName::from_name(analysis_method_name)
            .ok_or_else(|| {
                PipelineError::BadParameter(format!(
                    "unknown analysis method: {analysis_method_name}"
                ))
            })?;
        let mut run = self.get_pipeline_run_definition(ticket).await?;
        if !run.state.is_editable() {
            return Err(PipelineError::bad_state(run.state));
        }

        // A re-commit after failure starts from a clean slate.
        run.error = None;
        run.error_traceback = None;
        run.output_log = None;
        run.started_at_utc = None;
        run.finished_at_utc = None;
        if let Some(zip_name) = run.pipeline_output_zip_file_name.take() {
            let stale_zip = self.layout.output_zip_path(ticket, &zip_name);
            if stale_zip.exists() {
                std::fs::remove_file(&stale_zip)?;
            }
        }

        run.state = RunState::Queued;
        run.queued_at_utc = Some(self.clock.now_utc());
        run.pipeline_analyses_method = Some(method);

        let queue_length = self
            .store
            .list_length(keys::PIPELINE_QUEUE)
            .await
            .map_err(PipelineError::store)?;
        self.set_pipeline_run_definition(&run).await?;
        self.store
            .list_push_left(keys::PIPELINE_QUEUE, ticket.as_str())
            .await
            .map_err(PipelineError::store)?;

        run.place_in_queue = Some(queue_length + 1);
        info!(ticket = %ticket, method = %method, place = queue_length + 1, "pipeline run queued");
        Ok(run)
    }

    /// Flip a record to `running`.
    pub async fn set_pipeline_state_as_running(
        &self,
        ticket: &Ticket,
    ) -> Result<PipelineRun, PipelineError> {
        let mut run = self.get_pipeline_run_definition(ticket).await?;
        run.state = RunState::Running;
        run.started_at_utc = Some(self.clock.now_utc());
        self.set_pipeline_run_definition(&run).await?;
        Ok(run)
    }

    /// Finalize a dispatched run: `failed` if an error was recorded,
    /// `success` otherwise. Appends a statistic point either way.
    pub async fn set_pipeline_state_as_finished(
        &self,
        ticket: &Ticket,
    ) -> Result<PipelineRun, PipelineError> {
        let mut run = self.get_pipeline_run_definition(ticket).await?;
        run.state = if run.error.is_some() {
            RunState::Failed
        } else {
            RunState::Success
        };
        run.finished_at_utc = Some(self.clock.now_utc());
        self.set_pipeline_run_definition(&run).await?;
        self.create_pipeline_run_statistic_point(&run).await?;
        info!(ticket = %ticket, state = %run.state, "pipeline run finished");
        Ok(run)
    }

    /// Delete the ticket's files and mark the record `expired`.
    pub async fn wipe_pipeline_run(&self, ticket: &Ticket) -> Result<PipelineRun, PipelineError> {
        let mut run = self.get_pipeline_run_definition(ticket).await?;
        let base_dir = self.layout.files_base_dir(ticket);
        if base_dir.exists() {
            std::fs::remove_dir_all(&base_dir)?;
        }
        run.state = RunState::Expired;
        run.pipeline_input_file_names.clear();
        run.pipeline_output_zip_file_name = None;
        self.set_pipeline_run_definition(&run).await?;
        Ok(run)
    }

    /// Hash-delete the record. Files are not touched.
    pub async fn delete_pipeline_status(&self, ticket: &Ticket) -> Result<(), PipelineError> {
        self.store
            .hash_delete(keys::PIPELINE_STATES, ticket.as_str())
            .await
            .map_err(PipelineError::store)
    }

    /// Client-requested teardown: files and record both go away. Rejected
    /// while the run is queued or running.
    pub async fn discard_pipeline_run(&self, ticket: &Ticket) -> Result<(), PipelineError> {
        let run = self.get_pipeline_run_definition(ticket).await?;
        if matches!(run.state, RunState::Queued | RunState::Running) {
            return Err(PipelineError::bad_state(run.state));
        }
        let base_dir = self.layout.files_base_dir(ticket);
        if base_dir.exists() {
            std::fs::remove_dir_all(&base_dir)?;
        }
        self.delete_pipeline_status(ticket).await
    }

    /// Pop the next queued ticket. Returns `None` on an empty queue.
    pub async fn get_next_pipeline_run_from_queue(
        &self,
        set_status_running: bool,
    ) -> Result<Option<PipelineRun>, PipelineError> {
        let popped = self
            .store
            .list_pop_right(keys::PIPELINE_QUEUE)
            .await
            .map_err(PipelineError::store)?;
        let Some(raw_ticket) = popped else {
            return Ok(None);
        };
        let ticket = Ticket::parse(&raw_ticket)
            .map_err(|e| PipelineError::InvalidRecord(e.to_string()))?;
        let Some(run) = self.try_get_pipeline_run_definition(&ticket).await? else {
            warn!(ticket = %ticket, "queued ticket has no record, dropping");
            return Ok(None);
        };
        if set_status_running {
            return Ok(Some(self.set_pipeline_state_as_running(&ticket).await?));
        }
        Ok(Some(run))
    }

    /// Every stored record. Undecodable entries are skipped with a warning
    /// so one corrupt record cannot wedge the maintenance loop.
    pub async fn get_all_pipeline_run_definitions(
        &self,
    ) -> Result<Vec<PipelineRun>, PipelineError> {
        let entries = self
            .store
            .hash_get_all(keys::PIPELINE_STATES)
            .await
            .map_err(PipelineError::store)?;
        let mut runs = Vec::with_capacity(entries.len());
        for (field, raw) in entries {
            match serde_json::from_str::<PipelineRun>(&raw) {
                Ok(run) => runs.push(run),
                Err(e) => warn!(ticket = %field, error = %e, "skipping undecodable record"),
            }
        }
        Ok(runs)
    }

    /// First finished record past its retention window and not yet
    /// expired. O(n) over all records, which is fine at this scale.
    pub async fn get_next_pipeline_that_is_expired(
        &self,
        set_status_expired: bool,
    ) -> Result<Option<PipelineRun>, PipelineError> {
        let now = self.clock.now_utc();
        let cutoff = Duration::minutes(self.retention.expired_after_min);
        for run in self.get_all_pipeline_run_definitions().await? {
            if run.state == RunState::Expired {
                continue;
            }
            let Some(finished_at) = run.finished_at_utc else {
                continue;
            };
            if finished_at + cutoff < now {
                if set_status_expired {
                    let mut expired = run;
                    expired.state = RunState::Expired;
                    self.set_pipeline_run_definition(&expired).await?;
                    return Ok(Some(expired));
                }
                return Ok(Some(run));
            }
        }
        Ok(None)
    }

    /// First record past expiry plus the deletion grace period.
    pub async fn get_next_pipeline_that_is_deletable(
        &self,
    ) -> Result<Option<PipelineRun>, PipelineError> {
        let now = self.clock.now_utc();
        let cutoff = Duration::minutes(
            self.retention.expired_after_min + self.retention.deleted_after_min,
        );
        for run in self.get_all_pipeline_run_definitions().await? {
            let Some(finished_at) = run.finished_at_utc else {
                continue;
            };
            if finished_at + cutoff < now {
                return Ok(Some(run));
            }
        }
        Ok(None)
    }

    /// First record still `initialized` past the abandonment timeout.
    pub async fn get_next_pipeline_that_is_abandoned(
        &self,
    ) -> Result<Option<PipelineRun>, PipelineError> {
        let now = self.clock.now_utc();
        let cutoff = Duration::minutes(self.retention.abandoned_after_min);
        for run in self.get_all_pipeline_run_definitions().await? {
            if run.state == RunState::Initialized && run.created_at_utc + cutoff < now {
                return Ok(Some(run));
            }
        }
        Ok(None)
    }

    /// Recovery for a worker restart: anything still `running` cannot be,
    /// since there is exactly one worker. Returns how many records were
    /// failed.
    pub async fn fail_orphaned_running_runs(&self) -> Result<u64, PipelineError> {
        let mut failed = 0;
        for run in self.get_all_pipeline_run_definitions().await? {
            if run.state != RunState::Running {
                continue;
            }
            warn!(ticket = %run.ticket, "found orphaned running record, marking failed");
            let mut orphan = run;
            orphan.state = RunState::Failed;
            orphan.error = Some("worker restarted".to_string());
            orphan.finished_at_utc = Some(self.clock.now_utc());
            self.set_pipeline_run_definition(&orphan).await?;
            failed += 1;
        }
        Ok(failed)
    }

    /// Append the statistic point for a finished run.
    pub async fn create_pipeline_run_statistic_point(
        &self,
        run: &PipelineRun,
    ) -> Result<(), PipelineError> {
        let Some(method_name) = run.pipeline_analyses_method else {
            // Never committed; nothing worth counting.
            return Ok(());
        };
        let input_size_bytes = self.input_size_bytes(run)?;
        let result_size_bytes = match &run.pipeline_output_zip_file_name {
            Some(zip_name) => {
                let path = self.layout.output_zip_path(&run.ticket, zip_name);
                std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0)
            }
            None => 0,
        };
        let point = StatisticPoint {
            waiting_time_sec: run.waiting_time_sec().unwrap_or(0),
            running_time_sec: run.running_time_sec().unwrap_or(0),
            failed: run.state == RunState::Failed,
            method_name,
            finished_at_utc: run.finished_at_utc.unwrap_or_else(|| self.clock.now_utc()),
            input_file_count: run.input_file_count(),
            input_size_bytes,
            result_size_bytes,
        };
        let raw = serde_json::to_string(&point)
            .map_err(|e| PipelineError::InvalidRecord(e.to_string()))?;
        self.store
            .list_push_right(keys::PIPELINE_STATISTICS, &raw)
            .await
            .map_err(PipelineError::store)?;
        Ok(())
    }

    fn input_size_bytes(&self, run: &PipelineRun) -> Result<u64, PipelineError> {
        let mut total = 0;
        for (param_name, names) in &run.pipeline_input_file_names {
            for name in names {
                let path = self.layout.input_file_path(&run.ticket, param_name, name);
                if let Ok(metadata) = std::fs::metadata(&path) {
                    total += metadata.len();
                }
            }
        }
        Ok(total)
    }

    /// Aggregate the stored statistic points over an age window.
    pub async fn calculate_pipeline_run_statistics(
        &self,
        days_limit: Option<u32>,
        days_offset: u32,
    ) -> Result<StatisticsReport, PipelineError> {
        let points = self.load_statistic_points().await?;
        Ok(stats::calculate_report(
            &points,
            days_limit,
            days_offset,
            self.clock.now_utc(),
        ))
    }

    /// Drop statistic points older than the configured maximum age.
    pub async fn remove_expired_pipeline_run_statistic_points(
        &self,
    ) -> Result<u64, PipelineError> {
        let max_age = Duration::days(i64::from(self.retention.max_statistics_age_days));
        let now = self.clock.now_utc();
        let raw_points = self
            .store
            .list_range(keys::PIPELINE_STATISTICS)
            .await
            .map_err(PipelineError::store)?;
        let mut removed = 0;
        for raw in raw_points {
            let expired = match serde_json::from_str::<StatisticPoint>(&raw) {
                Ok(point) => point.age(now) > max_age,
                // Undecodable points can never be reported; drop them too.
                Err(_) => true,
            };
            if expired {
                removed += self
                    .store
                    .list_remove(keys::PIPELINE_STATISTICS, 0, &raw)
                    .await
                    .map_err(PipelineError::store)?;
            }
        }
        if removed > 0 {
            debug!(removed, "purged expired statistic points");
        }
        Ok(removed)
    }

    async fn load_statistic_points(&self) -> Result<Vec<StatisticPoint>, PipelineError> {
        let raw_points = self
            .store
            .list_range(keys::PIPELINE_STATISTICS)
            .await
            .map_err(PipelineError::store)?;
        let mut points = Vec::with_capacity(raw_points.len());
        for raw in raw_points {
            match serde_json::from_str(&raw) {
                Ok(point) => points.push(point),
                Err(e) => warn!(error = %e, "skipping undecodable statistic point"),
            }
        }
        Ok(points)
    }
}

/// Validate a client-supplied parameter patch into a fresh parameter
/// set, without touching any record. Used when a run is created with
/// initial parameters.
pub fn validate_params_patch(
    global_params: &BTreeMap<String, Value>,
    method_specific_params: &BTreeMap<String, Value>,
) -> Result<PipelineParams, PipelineError> {
    let mut params = PipelineParams::default();
    for (name, value) in global_params {
        let coerced = coerce_non_file_param(name, value, ParamScope::Global)?;
        merge_param(&mut params.global_params, name, coerced);
    }
    for (name, value) in method_specific_params {
        let coerced = coerce_non_file_param(name, value, ParamScope::MethodSpecific)?;
        merge_param(&mut params.method_specific_params, name, coerced);
    }
    Ok(params)
}

enum ParamScope {
    Global,
    MethodSpecific,
}

fn coerce_non_file_param(
    name: &str,
    value: &Value,
    scope: ParamScope,
) -> Result<Value, PipelineError> {
    let descriptor = params::find(name)
        .ok_or_else(|| PipelineError::BadParameter(format!("unknown parameter: {name}")))?;
    if descriptor.kind == params::ParamKind::File {
        return Err(PipelineError::BadParameter(format!(
            "parameter {name} takes file uploads, not values"
        )));
    }
    let in_globals = params::global_descriptors()
        .iter()
        .any(|d| d.name == name);
    match scope {
        ParamScope::Global if !in_globals => {
            return Err(PipelineError::BadParameter(format!(
                "{name} is not a global parameter"
            )));
        }
        ParamScope::MethodSpecific if in_globals => {
            return Err(PipelineError::BadParameter(format!(
                "{name} is a global parameter"
            )));
        }
        _ => {}
    }
    let validator = Validator::new(vec![descriptor], ParamFilter::All);
    let mut single = BTreeMap::new();
    single.insert(name.to_string(), value.clone());
    let mut coerced = validator
        .validate(&single)
        .map_err(|e| PipelineError::BadParameter(e.to_string()))?;
    Ok(coerced.remove(name).unwrap_or(Value::Null))
}

fn merge_param(target: &mut BTreeMap<String, Value>, name: &str, value: Value) {
    if value.is_null() {
        target.remove(name);
    } else {
        target.insert(name.to_string(), value);
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
