//! Measurement reconstruction and derived metrics.
//!
//! This module turns the raw text a scenario leaves behind (sampled socket
//! statistics, structured traffic reports) into per-flow time series and
//! summary metrics.

pub mod cwnd_log;
pub mod fairness;
pub mod iperf;
pub mod report;
pub mod selector;
pub mod summary;
pub mod types;

pub use cwnd_log::parse_log;
pub use fairness::jain_fairness;
pub use iperf::parse_report;
pub use selector::{parse_flow_series, primary_series, FinalBytesSelector, FlowSelector};
pub use summary::{summarize_scenario, ScenarioResults};
pub use types::*;
