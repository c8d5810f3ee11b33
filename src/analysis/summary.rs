//! Assembly of one scenario's summary from its collected artifacts.
//!
//! Used both by the live orchestrator right after a run and by the offline
//! `analyze` path re-reading a results directory.

use std::collections::BTreeMap;
use std::path::Path;

use color_eyre::eyre::{Context, Result};

use crate::config::ScenarioSpec;

use super::cwnd_log;
use super::fairness::jain_fairness;
use super::iperf;
use super::selector::{primary_series, FinalBytesSelector, FlowSelector};
use super::types::{FlowSeries, ScenarioFlows, ScenarioSummary};

/// A scenario's reconstructed results: the persisted summary plus the
/// per-flow cwnd/RTT series consumed by plot generation.
#[derive(Debug, Clone)]
pub struct ScenarioResults {
    pub summary: ScenarioSummary,
    /// Rebased series keyed by flow label, for flows that were monitored.
    pub series: BTreeMap<String, FlowSeries>,
}

/// Reconstruct a scenario's summary from the artifacts in `scenario_dir`,
/// using the default primary-flow heuristic.
pub fn summarize_scenario(spec: &ScenarioSpec, scenario_dir: &Path) -> Result<ScenarioResults> {
    summarize_scenario_with(spec, scenario_dir, &FinalBytesSelector)
}

/// Reconstruct a scenario's summary with an explicit selection heuristic.
pub fn summarize_scenario_with(
    spec: &ScenarioSpec,
    scenario_dir: &Path,
    selector: &dyn FlowSelector,
) -> Result<ScenarioResults> {
    let mut reports = Vec::with_capacity(spec.flows.len());
    let mut series = BTreeMap::new();

    for flow in &spec.flows {
        let report = iperf::parse_report(&scenario_dir.join(flow.client_report_name()))
            .with_context(|| format!("Flow '{}' of scenario '{}'", flow.label, spec.name))?;
        log::debug!(
            "Flow '{}': {} intervals, average {:?} bps",
            flow.label,
            report.intervals.len(),
            report.average_bps
        );
        reports.push((flow.label.clone(), report));

        if flow.monitor.is_some() {
            let acc = cwnd_log::parse_log(&scenario_dir.join(flow.sample_log_name()));
            series.insert(flow.label.clone(), primary_series(&acc, selector));
        }
    }

    // Jain's index applies to exactly two concurrent flows.
    let fairness_index = if spec.is_competing() && reports.len() == 2 {
        let throughputs: Vec<_> = reports.iter().map(|(_, r)| r.average_bps).collect();
        jain_fairness(&throughputs)
    } else {
        None
    };

    let iperf = if reports.len() == 1 {
        let (_, report) = reports.pop().expect("one report");
        ScenarioFlows::Single(report)
    } else {
        ScenarioFlows::Competing(reports.into_iter().collect())
    };

    Ok(ScenarioResults {
        summary: ScenarioSummary {
            scenario: spec.name.clone(),
            description: spec.description.clone(),
            iperf,
            fairness_index,
        },
        series,
    })
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::time::Duration;

    use crate::config::{FlowSpec, ScenarioSpec};

    use super::*;

    fn report_json(avg_bps: f64) -> String {
        format!(
            r#"{{
  "intervals": [{{"streams": [{{"retransmits": 1}}],
                  "sum": {{"start": 0.0, "end": 1.0, "bits_per_second": {avg_bps}}}}}],
  "end": {{"sum_received": {{"bits_per_second": {avg_bps}, "bytes": 1000, "seconds": 1.0, "retransmits": 1}}}}
}}"#
        )
    }

    fn two_flow_spec() -> ScenarioSpec {
        ScenarioSpec {
            name: "competing".to_string(),
            description: "two flows".to_string(),
            duration: Duration::from_secs(1),
            sample_interval: Duration::from_millis(100),
            hosts: vec!["h1".to_string(), "h2".to_string(), "h3".to_string()],
            switch: "s1".to_string(),
            links: Vec::new(),
            flows: vec![
                FlowSpec {
                    label: "h1".to_string(),
                    client: "h1".to_string(),
                    server: "h2".to_string(),
                    port: 5201,
                    start_offset: Duration::ZERO,
                    monitor: Some("h1".to_string()),
                },
                FlowSpec {
                    label: "h3".to_string(),
                    client: "h3".to_string(),
                    server: "h2".to_string(),
                    port: 5202,
                    start_offset: Duration::ZERO,
                    monitor: None,
                },
            ],
        }
    }

    #[test]
    fn test_two_flow_summary_with_fairness() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("h1_client.json"), report_json(6.0e6)).unwrap();
        fs::write(dir.path().join("h3_client.json"), report_json(6.0e6)).unwrap();
        fs::write(
            dir.path().join("h1_cwnd.log"),
            "100.0\nESTAB 0 0 10.0.0.1:53000 10.0.0.2:5201\n\t cwnd:10 rtt:20 bytes_sent:1000\n--\n",
        )
        .unwrap();

        let results = summarize_scenario(&two_flow_spec(), dir.path()).unwrap();
        assert_eq!(results.summary.fairness_index, Some(1.0));
        match &results.summary.iperf {
            ScenarioFlows::Competing(flows) => {
                assert_eq!(flows.len(), 2);
                assert_eq!(flows["h1"].average_bps, Some(6.0e6));
            }
            ScenarioFlows::Single(_) => panic!("expected competing flows"),
        }
        // Only the monitored flow has a series; it is non-empty.
        assert_eq!(results.series.len(), 1);
        assert!(!results.series["h1"].is_empty());
    }

    #[test]
    fn test_missing_sample_log_yields_empty_series() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("h1_client.json"), report_json(6.0e6)).unwrap();
        fs::write(dir.path().join("h3_client.json"), report_json(6.0e6)).unwrap();

        let results = summarize_scenario(&two_flow_spec(), dir.path()).unwrap();
        assert!(results.series["h1"].is_empty());
    }

    #[test]
    fn test_missing_client_report_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        assert!(summarize_scenario(&two_flow_spec(), dir.path()).is_err());
    }

    #[test]
    fn test_summary_serialization_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("h1_client.json"), report_json(8.0e6)).unwrap();
        fs::write(dir.path().join("h3_client.json"), report_json(2.0e6)).unwrap();

        let results = summarize_scenario(&two_flow_spec(), dir.path()).unwrap();
        let json = serde_json::to_string_pretty(&results.summary).unwrap();
        let back: crate::analysis::types::ScenarioSummary = serde_json::from_str(&json).unwrap();
        assert_eq!(back, results.summary);
        assert!(json.contains("fairness_index"));
    }
}
