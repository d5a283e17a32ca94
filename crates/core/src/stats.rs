// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Usage statistics for finished pipeline runs.

use crate::method::AnalysisMethodName;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Immutable datum appended when a run finishes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticPoint {
    pub waiting_time_sec: i64,
    pub running_time_sec: i64,
    pub failed: bool,
    pub method_name: AnalysisMethodName,
    pub finished_at_utc: DateTime<Utc>,
    pub input_file_count: u64,
    pub input_size_bytes: u64,
    pub result_size_bytes: u64,
}

impl StatisticPoint {
    /// Age relative to `now`.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.finished_at_utc
    }
}

/// Aggregation over a window of statistic points.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatisticsReport {
    pub days_limit: Option<u32>,
    pub days_offset: u32,
    pub total_runs: u64,
    pub failed_runs: u64,
    pub runs_per_method: BTreeMap<String, u64>,
    pub avg_waiting_time_sec: f64,
    pub avg_running_time_sec: f64,
    pub avg_input_file_count: f64,
    pub avg_input_size_bytes: f64,
    pub avg_result_size_bytes: f64,
}

/// Compute the report for points finished within the window
/// `[now - (days_offset + days_limit), now - days_offset]`. A `days_limit`
/// of `None` extends the window arbitrarily far into the past.
pub fn calculate_report(
    points: &[StatisticPoint],
    days_limit: Option<u32>,
    days_offset: u32,
    now: DateTime<Utc>,
) -> StatisticsReport {
    let newest = now - Duration::days(i64::from(days_offset));
    let oldest = days_limit.map(|limit| newest - Duration::days(i64::from(limit)));

    let window: Vec<&StatisticPoint> = points
        .iter()
        .filter(|p| p.finished_at_utc <= newest)
        .filter(|p| oldest.map_or(true, |o| p.finished_at_utc >= o))
        .collect();

    let mut report = StatisticsReport {
        days_limit,
        days_offset,
        total_runs: window.len() as u64,
        ..StatisticsReport::default()
    };
    if window.is_empty() {
        return report;
    }

    let n = window.len() as f64;
    for point in &window {
        if point.failed {
            report.failed_runs += 1;
        }
        *report
            .runs_per_method
            .entry(point.method_name.as_str().to_string())
            .or_insert(0) += 1;
        report.avg_waiting_time_sec += point.waiting_time_sec as f64;
        report.avg_running_time_sec += point.running_time_sec as f64;
        report.avg_input_file_count += point.input_file_count as f64;
        report.avg_input_size_bytes += point.input_size_bytes as f64;
        report.avg_result_size_bytes += point.result_size_bytes as f64;
    }
    report.avg_waiting_time_sec /= n;
    report.avg_running_time_sec /= n;
    report.avg_input_file_count /= n;
    report.avg_input_size_bytes /= n;
    report.avg_result_size_bytes /= n;
    report
}

#[cfg(test)]
#[path = "stats_tests.rs"]
mod tests;
