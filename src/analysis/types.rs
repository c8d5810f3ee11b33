//! Core data types for congestion-window and throughput analysis.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Wall-clock timestamp in seconds since the Unix epoch.
pub type WallTime = f64;

/// Remote-peer port distinguishing connections observed concurrently in one
/// monitored log.
pub type ConnectionKey = u16;

/// One parsed socket-statistics observation. Immutable once created.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub timestamp: WallTime,
    /// Congestion window, in packets.
    pub cwnd: f64,
    /// Smoothed round-trip time in milliseconds, when reported.
    pub rtt_ms: Option<f64>,
    /// Cumulative bytes sent on the connection, when reported.
    pub bytes_sent: Option<u64>,
}

/// The chosen flow's series, rebased so elapsed time starts at zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlowSeries {
    /// Elapsed seconds, one entry per sample.
    pub times: Vec<f64>,
    /// Congestion window per sample, parallel to `times`.
    pub cwnd: Vec<f64>,
    /// (elapsed seconds, rtt ms) for the samples that carried an rtt value.
    pub rtt: Vec<(f64, f64)>,
}

impl FlowSeries {
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}

/// One throughput interval from the traffic generator's report, in seconds
/// relative to traffic start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntervalMetric {
    pub start: f64,
    pub end: f64,
    pub bits_per_second: f64,
    pub retransmits: Option<u64>,
}

/// End-of-run metrics for a single flow.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowReport {
    pub intervals: Vec<IntervalMetric>,
    pub average_bps: Option<f64>,
    pub bytes: Option<u64>,
    pub seconds: Option<f64>,
    pub retransmits: Option<u64>,
}

/// Per-flow reports of one scenario: a single flow, or competing flows
/// keyed by their labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScenarioFlows {
    Single(FlowReport),
    Competing(BTreeMap<String, FlowReport>),
}

/// Summary record persisted for each scenario run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSummary {
    pub scenario: String,
    pub description: String,
    pub iperf: ScenarioFlows,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fairness_index: Option<f64>,
}
