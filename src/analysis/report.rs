//! Persistence of scenario summaries.
//!
//! Each scenario's summary is flushed to its own JSON file as soon as the
//! run completes, and the whole suite is additionally written as one
//! collection so downstream rendering consumes a single document.

use std::fs;
use std::path::{Path, PathBuf};

use color_eyre::eyre::{Context, Result};

use super::types::{ScenarioFlows, ScenarioSummary};

/// Write one scenario's summary to `<dir>/<scenario>_summary.json`.
pub fn write_scenario_summary(dir: &Path, summary: &ScenarioSummary) -> Result<PathBuf> {
    let path = dir.join(format!("{}_summary.json", summary.scenario));
    let json = serde_json::to_string_pretty(summary)
        .context("Failed to serialize scenario summary to JSON")?;
    fs::write(&path, json)
        .with_context(|| format!("Failed to write scenario summary to {}", path.display()))?;
    log::info!("Scenario summary written to {}", path.display());
    Ok(path)
}

/// Write the suite-wide collection to `<dir>/summary.json`.
pub fn write_collection(dir: &Path, summaries: &[ScenarioSummary]) -> Result<PathBuf> {
    let path = dir.join("summary.json");
    let json = serde_json::to_string_pretty(summaries)
        .context("Failed to serialize summary collection to JSON")?;
    fs::write(&path, json)
        .with_context(|| format!("Failed to write summary collection to {}", path.display()))?;
    log::info!(
        "Summary collection ({} scenarios) written to {}",
        summaries.len(),
        path.display()
    );
    Ok(path)
}

/// Load a previously written suite-wide collection.
pub fn load_collection(path: &Path) -> Result<Vec<ScenarioSummary>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read summary collection {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse summary collection {}", path.display()))
}

/// Print a scenario summary to stdout.
pub fn print_summary(summary: &ScenarioSummary) {
    println!("\n=== {} ===", summary.scenario);
    println!("{}", summary.description);
    match &summary.iperf {
        ScenarioFlows::Single(report) => print_flow("flow", report),
        ScenarioFlows::Competing(flows) => {
            for (label, report) in flows {
                print_flow(label, report);
            }
        }
    }
    if let Some(index) = summary.fairness_index {
        println!("  Jain fairness index: {:.3}", index);
    }
}

fn print_flow(label: &str, report: &super::types::FlowReport) {
    match report.average_bps {
        Some(bps) => println!("  {}: {:.2} Mbps average", label, bps / 1e6),
        None => println!("  {}: average throughput unavailable", label),
    }
    if let Some(retransmits) = report.retransmits {
        println!("    retransmits: {}", retransmits);
    }
    println!("    intervals: {}", report.intervals.len());
}
