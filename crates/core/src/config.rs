// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Service configuration with environment-variable overrides.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// A titled link shown in the web client's info section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfoLink {
    pub title: String,
    pub link: String,
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

/// All recognized service options.
#[derive(Debug, Clone)]
pub struct Config {
    /// Drop uncommitted run definitions older than this (minutes).
    pub pipeline_abandoned_definition_deleted_after_min: i64,
    /// Transition finished runs to `expired` and wipe their files after
    /// this (minutes).
    pub pipeline_result_expired_after_min: i64,
    /// Additional grace after expiry before the record itself is deleted
    /// (minutes).
    pub pipeline_result_deleted_after_min: i64,
    /// Drop statistic points older than this (days).
    pub max_statistics_age_days: u32,
    /// Per-request upload cap (bytes); unlimited when unset.
    pub max_file_size_upload_limit_bytes: Option<u64>,
    /// Global cache cap (bytes); uploads fail once exceeded.
    pub max_cache_size_bytes: Option<u64>,
    /// Root of per-ticket storage.
    pub pipeline_runs_cache_dir: PathBuf,
    /// Consecutive worker-tick failures tolerated before the worker
    /// terminates for an external supervisor.
    pub restart_background_worker_on_exception_n_times: i64,
    /// HTTP rate limiter parameter (boundary concern).
    pub max_pipeline_runs_per_hour_per_ip: u32,
    /// Redis connection URL; the in-process store is used when unset.
    pub redis_url: Option<String>,
    /// Program the analysis engine adapter spawns.
    pub analysis_cmd: String,
    pub client_contact_email: Option<String>,
    pub client_bug_report_email: Option<String>,
    pub client_entry_text: Option<String>,
    pub client_terms_and_conditions: Option<String>,
    pub client_link_list: Vec<InfoLink>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pipeline_abandoned_definition_deleted_after_min: 240,
            pipeline_result_expired_after_min: 1440,
            pipeline_result_deleted_after_min: 1440,
            max_statistics_age_days: 365,
            max_file_size_upload_limit_bytes: None,
            max_cache_size_bytes: None,
            pipeline_runs_cache_dir: PathBuf::from("/tmp/mekewe_cache"),
            restart_background_worker_on_exception_n_times: 3,
            max_pipeline_runs_per_hour_per_ip: 5,
            redis_url: None,
            analysis_cmd: "metakegg".to_string(),
            client_contact_email: None,
            client_bug_report_email: None,
            client_entry_text: None,
            client_terms_and_conditions: None,
            client_link_list: Vec::new(),
        }
    }
}

impl Config {
    /// Build a config from the environment, falling back to defaults for
    /// anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Config::default();
        if let Some(v) = parse_env("PIPELINE_ABANDONED_DEFINITION_DELETED_AFTER")? {
            config.pipeline_abandoned_definition_deleted_after_min = v;
        }
        if let Some(v) = parse_env("PIPELINE_RESULT_EXPIRED_AFTER_MIN")? {
            config.pipeline_result_expired_after_min = v;
        }
        if let Some(v) = parse_env("PIPELINE_RESULT_DELETED_AFTER_MIN")? {
            config.pipeline_result_deleted_after_min = v;
        }
        if let Some(v) = parse_env("MAX_STATISTICS_AGE_DAYS")? {
            config.max_statistics_age_days = v;
        }
        config.max_file_size_upload_limit_bytes = parse_env("MAX_FILE_SIZE_UPLOAD_LIMIT_BYTES")?;
        config.max_cache_size_bytes = parse_env("MAX_CACHE_SIZE_BYTES")?;
        if let Ok(dir) = std::env::var("PIPELINE_RUNS_CACHE_DIR") {
            config.pipeline_runs_cache_dir = PathBuf::from(dir);
        }
        if let Some(v) = parse_env("RESTART_BACKGROUND_WORKER_ON_EXCEPTION_N_TIMES")? {
            config.restart_background_worker_on_exception_n_times = v;
        }
        if let Some(v) = parse_env("MAX_PIPELINE_RUNS_PER_HOUR_PER_IP")? {
            config.max_pipeline_runs_per_hour_per_ip = v;
        }
        config.redis_url = std::env::var("REDIS_URL").ok();
        if let Ok(cmd) = std::env::var("ANALYSIS_CMD") {
            config.analysis_cmd = cmd;
        }
        config.client_contact_email = std::env::var("CLIENT_CONTACT_EMAIL").ok();
        config.client_bug_report_email = std::env::var("CLIENT_BUG_REPORT_EMAIL").ok();
        config.client_entry_text = std::env::var("CLIENT_ENTRY_TEXT").ok();
        config.client_terms_and_conditions = std::env::var("CLIENT_TERMS_AND_CONDITIONS").ok();
        if let Ok(raw) = std::env::var("CLIENT_LINK_LIST") {
            config.client_link_list =
                serde_json::from_str(&raw).map_err(|_| ConfigError::Invalid {
                    key: "CLIENT_LINK_LIST",
                    value: raw,
                })?;
        }
        Ok(config)
    }
}

fn parse_env<T: std::str::FromStr>(key: &'static str) -> Result<Option<T>, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
