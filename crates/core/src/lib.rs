// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! mekewe-core: domain types for the MetaKEGG pipeline-run service

pub mod clock;
pub mod config;
pub mod error;
pub mod layout;
pub mod method;
pub mod params;
pub mod run;
pub mod stats;
pub mod ticket;
pub mod validate;

pub use clock::{Clock, DynClock, SystemClock};
pub use config::{Config, ConfigError, InfoLink};
pub use error::PipelineError;
pub use layout::{sanitize_filename, FileLayout};
pub use method::{AnalysisMethod, AnalysisMethodName};
pub use params::{global_descriptors, method_descriptors, ParamDescriptor, ParamKind};
pub use run::{PipelineParams, PipelineRun, RunState};
pub use stats::{StatisticPoint, StatisticsReport};
pub use ticket::Ticket;
pub use validate::{ParamFilter, ValidationError, Validator};

#[cfg(any(test, feature = "test-support"))]
pub use clock::FakeClock;
