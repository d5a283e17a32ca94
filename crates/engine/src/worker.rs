// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The single background maintenance loop.
//!
//! Each tick runs, in order: zombie-file sweep, queue dispatch,
//! expiration, deletion, abandonment cleanup, statistics purge. The loop
//! is crash-isolated: tick failures are tolerated up to a consecutive
//! budget tracked in the state store, then the worker terminates for an
//! external supervisor to restart.

use crate::analysis::AnalysisEngine;
use crate::manager::StateManager;
use crate::processor::PipelineProcessor;
use mekewe_core::{Clock, PipelineError, RunState, Ticket};
use mekewe_store::{keys, StateStore};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};

/// Worker loop settings.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Pause between ticks.
    pub tick_pause: Duration,
    /// Consecutive tick failures tolerated before the worker gives up.
    pub restart_budget: i64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            tick_pause: Duration::from_secs(1),
            restart_budget: 3,
        }
    }
}

/// Terminal worker failures.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("worker exceeded its failure budget: {0}")]
    BudgetExhausted(#[source] PipelineError),
    #[error("worker cannot reach the state store: {0}")]
    StoreGone(#[source] PipelineError),
}

/// Requests the worker to stop after its current tick.
#[derive(Clone, Default)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    fn is_stopped(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// The background worker owning dispatch and lifecycle housekeeping.
pub struct MaintenanceWorker<C: Clock> {
    manager: StateManager<C>,
    processor: PipelineProcessor<C>,
    store: Arc<dyn StateStore>,
    config: WorkerConfig,
    stop: StopHandle,
}

impl<C: Clock> MaintenanceWorker<C> {
    pub fn new(
        manager: StateManager<C>,
        engine: Arc<dyn AnalysisEngine>,
        clock: C,
        config: WorkerConfig,
    ) -> Self {
        let store = Arc::clone(manager.store());
        let processor = PipelineProcessor::new(manager.clone(), engine, clock);
        Self {
            manager,
            processor,
            store,
            config,
            stop: StopHandle::default(),
        }
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Run until stopped. Returns `Err` only when the failure budget is
    /// exhausted or the budget counter itself is unreachable.
    pub async fn run(self) -> Result<(), WorkerError> {
        info!("maintenance worker started");
        self.boot().await?;
        while !self.stop.is_stopped() {
            match self.tick().await {
                Ok(()) => {
                    self.store
                        .counter_set(keys::WORKER_EXCEPTION_COUNT, 0)
                        .await
                        .map_err(|e| WorkerError::StoreGone(PipelineError::store(e)))?;
                }
                Err(e) => self.absorb_tick_failure(e).await?,
            }
            tokio::time::sleep(self.config.tick_pause).await;
        }
        info!("maintenance worker stopped");
        Ok(())
    }

    /// Reset the failure counter and fail any record left `running` by a
    /// previous worker incarnation.
    pub async fn boot(&self) -> Result<(), WorkerError> {
        self.store
            .counter_set(keys::WORKER_EXCEPTION_COUNT, 0)
            .await
            .map_err(|e| WorkerError::StoreGone(PipelineError::store(e)))?;
        match self.manager.fail_orphaned_running_runs().await {
            Ok(0) => {}
            Ok(n) => warn!(count = n, "failed orphaned running records from previous worker"),
            Err(e) => warn!(error = %e, "could not scan for orphaned running records"),
        }
        Ok(())
    }

    /// One maintenance pass. Public so tests (and the in-process test
    /// app) can drive the worker deterministically.
    pub async fn tick(&self) -> Result<(), PipelineError> {
        self.clean_zombie_files().await?;
        self.process_next_pipeline_in_queue().await?;
        self.process_next_expiring_pipeline().await?;
        self.process_next_deletable_pipeline().await?;
        self.process_next_abandoned_pipeline_def().await?;
        self.purge_old_statistics().await?;
        Ok(())
    }

    async fn absorb_tick_failure(&self, e: PipelineError) -> Result<(), WorkerError> {
        let count = match self.store.counter_get(keys::WORKER_EXCEPTION_COUNT).await {
            Ok(count) => count.unwrap_or(0),
            Err(store_err) => {
                // Can't even read the counter; treat the budget as spent.
                error!(error = %store_err, "state store offline while handling tick failure");
                return Err(WorkerError::BudgetExhausted(e));
            }
        };
        if count >= self.config.restart_budget {
            return Err(WorkerError::BudgetExhausted(e));
        }
        error!(error = %e, consecutive = count + 1, "maintenance tick failed");
        self.store
            .counter_incr(keys::WORKER_EXCEPTION_COUNT, 1)
            .await
            .map_err(|_| WorkerError::BudgetExhausted(e))?;
        Ok(())
    }

    /// Delete cache directories whose ticket-shaped name matches no known
    /// record. Directories with non-ticket names are preserved.
    async fn clean_zombie_files(&self) -> Result<(), PipelineError> {
        let cache_dir = self.manager.layout().cache_dir().to_path_buf();
        if !cache_dir.exists() {
            return Ok(());
        }
        let known: Vec<Ticket> = self
            .manager
            .get_all_pipeline_run_definitions()
            .await?
            .into_iter()
            .map(|run| run.ticket)
            .collect();
        for entry in std::fs::read_dir(&cache_dir)? {
            let entry = entry?;
            if !entry.path().is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            match Ticket::parse(&name) {
                Ok(ticket) => {
                    if !known.contains(&ticket) {
                        warn!(path = %entry.path().display(), "deleting zombie directory");
                        std::fs::remove_dir_all(entry.path())?;
                    }
                }
                Err(_) => {
                    warn!(
                        path = %entry.path().display(),
                        "non standard directory in the cache dir"
                    );
                }
            }
        }
        Ok(())
    }

    async fn process_next_pipeline_in_queue(&self) -> Result<(), PipelineError> {
        let Some(run) = self.manager.get_next_pipeline_run_from_queue(true).await? else {
            return Ok(());
        };
        let ticket = run.ticket.clone();
        self.processor.process(run).await;
        self.manager.set_pipeline_state_as_finished(&ticket).await?;
        Ok(())
    }

    async fn process_next_expiring_pipeline(&self) -> Result<(), PipelineError> {
        let Some(mut run) = self.manager.get_next_pipeline_that_is_expired(false).await? else {
            return Ok(());
        };
        info!(ticket = %run.ticket, "expiring pipeline run");
        // The state flips first so no reader can hand out a result path
        // while the files are being deleted.
        run.state = RunState::Expired;
        run.pipeline_input_file_names.clear();
        run.pipeline_output_zip_file_name = None;
        self.manager.set_pipeline_run_definition(&run).await?;

        let base_dir = self.manager.layout().files_base_dir(&run.ticket);
        if base_dir.exists() {
            std::fs::remove_dir_all(&base_dir)?;
        }
        Ok(())
    }

    async fn process_next_deletable_pipeline(&self) -> Result<(), PipelineError> {
        let Some(run) = self.manager.get_next_pipeline_that_is_deletable().await? else {
            return Ok(());
        };
        info!(ticket = %run.ticket, "deleting pipeline run record because of age");
        self.manager.delete_pipeline_status(&run.ticket).await
    }

    async fn process_next_abandoned_pipeline_def(&self) -> Result<(), PipelineError> {
        let Some(run) = self.manager.get_next_pipeline_that_is_abandoned().await? else {
            return Ok(());
        };
        info!(ticket = %run.ticket, "deleting abandoned pipeline definition");
        let base_dir = self.manager.layout().files_base_dir(&run.ticket);
        if base_dir.exists() {
            std::fs::remove_dir_all(&base_dir)?;
        }
        self.manager.delete_pipeline_status(&run.ticket).await
    }

    async fn purge_old_statistics(&self) -> Result<(), PipelineError> {
        self.manager
            .remove_expired_pipeline_run_statistic_points()
            .await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
