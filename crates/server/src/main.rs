// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! mekewed: the MetaKEGG pipeline web service.
//!
//! One process hosts the HTTP front-end and spawns the single background
//! maintenance worker; both share the same state store.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use clap::Parser;
use mekewe_core::{Config, DynClock, FileLayout, SystemClock};
use mekewe_engine::{
    MaintenanceWorker, RetentionPolicy, StateManager, SubprocessEngine, WorkerConfig,
};
use mekewe_server::{build_route, AppContext, WorkerHealth};
use mekewe_store::{MemoryStore, RedisStore, StateStore};
use poem::listener::TcpListener;
use poem::Server;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about = "MetaKEGG pipeline web service", long_about = None)]
struct Args {
    /// Address the HTTP server binds to
    #[arg(long, default_value = "0.0.0.0", env = "LISTENING_ADDRESS")]
    address: String,

    /// Port the HTTP server binds to
    #[arg(long, default_value_t = 8282, env = "LISTENING_PORT")]
    port: u16,

    /// Pause between maintenance worker ticks, in seconds
    #[arg(long, default_value_t = 1, env = "WORKER_TICK_PAUSE_SEC")]
    tick_pause_sec: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = Config::from_env()?;
    info!(cache_dir = %config.pipeline_runs_cache_dir.display(), "starting mekewe server");

    let store = connect_store(&config).await?;
    store.ping().await?;
    info!("state store reachable");

    let clock = DynClock::new(SystemClock);
    let manager = StateManager::new(
        Arc::clone(&store),
        FileLayout::new(&config.pipeline_runs_cache_dir),
        clock.clone(),
        RetentionPolicy::from_config(&config),
    );

    let engine = Arc::new(SubprocessEngine::new(config.analysis_cmd.clone()));
    let worker = MaintenanceWorker::new(
        manager.clone(),
        engine,
        clock,
        WorkerConfig {
            tick_pause: Duration::from_secs(args.tick_pause_sec),
            restart_budget: config.restart_background_worker_on_exception_n_times,
        },
    );
    let stop_handle = worker.stop_handle();
    let worker_health = WorkerHealth::new();
    let worker_health_for_task = worker_health.clone();
    info!("starting background pipeline worker");
    tokio::spawn(async move {
        if let Err(e) = worker.run().await {
            error!(error = %e, "background worker terminated");
        }
        worker_health_for_task.mark_dead();
    });

    let ctx = AppContext {
        manager,
        store,
        config,
        worker_health,
    };
    let route = build_route(ctx);

    let bind = format!("{}:{}", args.address, args.port);
    info!("listening on {bind}");
    let result = Server::new(TcpListener::bind(bind))
        .run_with_graceful_shutdown(
            route,
            async {
                let _ = tokio::signal::ctrl_c().await;
                info!("shutdown signal received");
            },
            Some(Duration::from_secs(5)),
        )
        .await;

    // Let the worker finish its current tick before the process exits.
    stop_handle.stop();
    result?;
    Ok(())
}

/// Connect to the configured Redis server, or fall back to the in-process
/// store for development setups.
async fn connect_store(config: &Config) -> Result<Arc<dyn StateStore>, Box<dyn std::error::Error>> {
    match &config.redis_url {
        Some(url) => {
            let store = RedisStore::connect(url).await?;
            Ok(Arc::new(store))
        }
        None => {
            warn!(
                "No REDIS_URL configured; using the in-process state store. \
                 This must not be used in production!"
            );
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
