//! Primary-flow selection and time rebasing.
//!
//! A monitored host can expose several connections at once: the traffic
//! generator's control connection, a competing flow's return path, or
//! leftovers from a previous poll. The selection heuristic lives behind a
//! narrow trait so alternative policies can be substituted without touching
//! the parser.

use super::cwnd_log::SampleAccumulator;
use super::types::{ConnectionKey, FlowSeries, Sample};

/// Strategy for picking the flow of interest among observed connections.
pub trait FlowSelector {
    /// Returns `None` only when the accumulator is empty.
    fn select(&self, acc: &SampleAccumulator) -> Option<ConnectionKey>;
}

/// Default heuristic: the connection whose last reported `bytes_sent` is
/// largest wins, since the data-bearing flow dwarfs control traffic. When
/// no connection ever reported a byte count, the one with the most samples
/// wins. Ties go to the first-observed key.
#[derive(Debug, Default, Clone, Copy)]
pub struct FinalBytesSelector;

impl FinalBytesSelector {
    fn final_bytes(acc: &SampleAccumulator, key: ConnectionKey) -> Option<u64> {
        acc.samples(key).iter().rev().find_map(|s| s.bytes_sent)
    }
}

impl FlowSelector for FinalBytesSelector {
    fn select(&self, acc: &SampleAccumulator) -> Option<ConnectionKey> {
        let any_bytes = acc.keys().any(|key| Self::final_bytes(acc, key).is_some());
        let mut best: Option<(ConnectionKey, u64)> = None;
        for key in acc.keys() {
            let metric = if any_bytes {
                // Connections that never reported bytes compete as zero.
                Self::final_bytes(acc, key).unwrap_or(0)
            } else {
                acc.samples(key).len() as u64
            };
            // Strict comparison keeps the first-observed key on ties.
            if best.map_or(true, |(_, current)| metric > current) {
                best = Some((key, metric));
            }
        }
        best.map(|(key, _)| key)
    }
}

/// Shift a series so elapsed time starts at zero. The rtt subsequence uses
/// the same base so both series share one time axis.
pub fn rebase(samples: &[Sample]) -> FlowSeries {
    let Some(first) = samples.first() else {
        return FlowSeries::default();
    };
    let base = first.timestamp;
    FlowSeries {
        times: samples.iter().map(|s| s.timestamp - base).collect(),
        cwnd: samples.iter().map(|s| s.cwnd).collect(),
        rtt: samples
            .iter()
            .filter_map(|s| s.rtt_ms.map(|rtt| (s.timestamp - base, rtt)))
            .collect(),
    }
}

/// Select the primary connection and rebase its series. An empty
/// accumulator yields an empty series.
pub fn primary_series(acc: &SampleAccumulator, selector: &dyn FlowSelector) -> FlowSeries {
    match selector.select(acc) {
        Some(key) => rebase(acc.samples(key)),
        None => FlowSeries::default(),
    }
}

/// Full chain with the default heuristic: parse a sampled log, pick the
/// primary connection, rebase. A nonexistent path yields an empty series.
pub fn parse_flow_series(path: &std::path::Path) -> FlowSeries {
    let acc = super::cwnd_log::parse_log(path);
    primary_series(&acc, &FinalBytesSelector)
}
