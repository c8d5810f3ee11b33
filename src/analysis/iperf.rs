//! Extraction of throughput intervals and end-of-run totals from iperf3
//! JSON reports.
//!
//! A server restart mid-run can leave two complete top-level documents
//! concatenated in one report file; only the last document is trusted.

use std::fs;
use std::path::Path;

use color_eyre::eyre::{Context, Result};
use serde_json::Value;

use super::types::{FlowReport, IntervalMetric};

/// Parse a traffic-generator report file into a [`FlowReport`].
pub fn parse_report(path: &Path) -> Result<FlowReport> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read traffic report {}", path.display()))?;
    parse_report_str(&raw)
        .with_context(|| format!("Malformed traffic report {}", path.display()))
}

/// Parse raw report text, keeping only the last complete document when a
/// restarted server produced back-to-back concatenated documents.
pub fn parse_report_str(raw: &str) -> Result<FlowReport> {
    let data: Value = serde_json::from_str(last_document(raw.trim()))
        .context("Failed to parse report JSON")?;

    let intervals = data["intervals"]
        .as_array()
        .map(|entries| entries.iter().filter_map(interval_metric).collect())
        .unwrap_or_default();

    // Prefer the receiver-side aggregate; the sender side still counts
    // bytes the network dropped. An empty receiver object counts as
    // absent. Neither being present is not an error, the metric fields
    // simply stay unset.
    let end = &data["end"];
    let sum = if end["sum_received"]
        .as_object()
        .is_some_and(|fields| !fields.is_empty())
    {
        &end["sum_received"]
    } else {
        &end["sum_sent"]
    };

    Ok(FlowReport {
        intervals,
        average_bps: sum["bits_per_second"].as_f64(),
        bytes: sum["bytes"].as_u64(),
        seconds: sum["seconds"].as_f64(),
        retransmits: sum["retransmits"].as_u64(),
    })
}

/// Retain the last top-level document of possibly concatenated JSON text.
/// The boundary is the literal closing-brace/newline/opening-brace
/// adjacency a restarted writer leaves behind.
fn last_document(raw: &str) -> &str {
    match raw.rfind("}\n{") {
        Some(idx) => &raw[idx + 2..],
        None => raw,
    }
}

fn interval_metric(entry: &Value) -> Option<IntervalMetric> {
    let sum = &entry["sum"];
    Some(IntervalMetric {
        start: sum["start"].as_f64()?,
        end: sum["end"].as_f64()?,
        bits_per_second: sum["bits_per_second"].as_f64()?,
        retransmits: entry["streams"]
            .get(0)
            .and_then(|stream| stream["retransmits"].as_u64()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_document_keeps_final_object() {
        assert_eq!(last_document("{\"a\":1}\n{\"b\":2}"), "{\"b\":2}");
        assert_eq!(last_document("{\"a\":1}"), "{\"a\":1}");
        // Three concatenated documents: still only the last one.
        assert_eq!(last_document("{\"a\":1}\n{\"b\":2}\n{\"c\":3}"), "{\"c\":3}");
    }

    #[test]
    fn test_concatenated_report_uses_last_document() {
        let raw = concat!(
            "{\"intervals\":[{\"streams\":[],\"sum\":{\"start\":0.0,\"end\":1.0,\"bits_per_second\":1.0}}],\"end\":{}}",
            "\n",
            "{\"end\":{\"sum_received\":{\"bits_per_second\":9.5e6,\"bytes\":71250000,\"seconds\":60.0,\"retransmits\":12}}}",
        );
        let report = parse_report_str(raw).unwrap();
        // Intervals of the discarded first document are gone.
        assert!(report.intervals.is_empty());
        assert_eq!(report.average_bps, Some(9.5e6));
        assert_eq!(report.bytes, Some(71250000));
        assert_eq!(report.seconds, Some(60.0));
        assert_eq!(report.retransmits, Some(12));
    }

    #[test]
    fn test_intervals_with_stream_retransmits() {
        let raw = r#"{
            "intervals": [
                {"streams": [{"retransmits": 3}],
                 "sum": {"start": 0.0, "end": 1.0, "bits_per_second": 8.0e6}},
                {"streams": [],
                 "sum": {"start": 1.0, "end": 2.0, "bits_per_second": 9.0e6}}
            ],
            "end": {"sum_sent": {"bits_per_second": 8.5e6, "bytes": 2125000, "seconds": 2.0, "retransmits": 3}}
        }"#;
        let report = parse_report_str(raw).unwrap();
        assert_eq!(report.intervals.len(), 2);
        assert_eq!(report.intervals[0].retransmits, Some(3));
        assert_eq!(report.intervals[1].retransmits, None);
        // sum_received absent, sum_sent used instead.
        assert_eq!(report.average_bps, Some(8.5e6));
    }

    #[test]
    fn test_empty_received_aggregate_falls_back_to_sent() {
        let raw = r#"{
            "intervals": [],
            "end": {
                "sum_received": {},
                "sum_sent": {"bits_per_second": 7.0e6, "bytes": 875000, "seconds": 1.0, "retransmits": 4}
            }
        }"#;
        let report = parse_report_str(raw).unwrap();
        assert_eq!(report.average_bps, Some(7.0e6));
        assert_eq!(report.bytes, Some(875000));
        assert_eq!(report.retransmits, Some(4));
    }

    #[test]
    fn test_missing_aggregates_yield_nulls() {
        let report = parse_report_str("{\"intervals\":[],\"end\":{}}").unwrap();
        assert!(report.intervals.is_empty());
        assert_eq!(report.average_bps, None);
        assert_eq!(report.bytes, None);
        assert_eq!(report.seconds, None);
        assert_eq!(report.retransmits, None);
    }

    #[test]
    fn test_malformed_interval_is_skipped() {
        let raw = r#"{
            "intervals": [
                {"sum": {"start": 0.0}},
                {"streams": [], "sum": {"start": 0.0, "end": 1.0, "bits_per_second": 5.0e6}}
            ],
            "end": {}
        }"#;
        let report = parse_report_str(raw).unwrap();
        assert_eq!(report.intervals.len(), 1);
        assert_eq!(report.intervals[0].bits_per_second, 5.0e6);
    }
}
