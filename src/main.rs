//! Offline analysis CLI for collected congestion-control experiments.
//!
//! Reconstructs per-scenario summaries (throughput, retransmits, fairness)
//! from an already-collected results directory, and can emit the built-in
//! baseline scenario suite as a YAML config.

use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Context, Result};
use rayon::prelude::*;

use renolab::analysis::summary::summarize_scenario;
use renolab::analysis::{report, ScenarioSummary};
use renolab::config;

#[derive(Parser)]
#[command(name = "renolab")]
#[command(about = "TCP congestion-control experiment analysis")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Rebuild scenario summaries from collected logs and traffic reports
    Analyze {
        /// Directory holding per-scenario artifact directories
        #[arg(short, long, default_value = "results")]
        results_dir: PathBuf,

        /// Scenario suite YAML; the built-in baseline suite when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Number of parallel workers (0 = auto-detect)
        #[arg(short = 'j', long, default_value = "0")]
        threads: usize,

        /// Skip the per-scenario stdout summaries
        #[arg(long)]
        quiet: bool,
    },

    /// Write the built-in baseline scenario suite as a YAML config
    InitConfig {
        /// Output path for the generated config
        #[arg(short, long, default_value = "scenarios.yaml")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&cli.log_level))
        .init();

    match cli.command {
        Commands::Analyze {
            results_dir,
            config,
            threads,
            quiet,
        } => analyze(results_dir, config, threads, quiet),
        Commands::InitConfig { output } => init_config(output),
    }
}

fn analyze(
    results_dir: PathBuf,
    config_path: Option<PathBuf>,
    threads: usize,
    quiet: bool,
) -> Result<()> {
    if threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("Failed to configure thread pool")?;
    }

    let scenarios = match config_path {
        Some(path) => config::load_suite(&path)?.scenarios,
        None => {
            log::info!("No config given, using the built-in baseline suite");
            config::baseline_suite()
        }
    };

    log::info!(
        "Analyzing {} scenarios under {}",
        scenarios.len(),
        results_dir.display()
    );

    let summaries: Vec<ScenarioSummary> = scenarios
        .par_iter()
        .map(|spec| {
            let scenario_dir = results_dir.join(&spec.name);
            let results = summarize_scenario(spec, &scenario_dir)?;
            log::debug!(
                "Reconstructed {}: {} monitored series",
                spec.name,
                results.series.len()
            );
            Ok(results.summary)
        })
        .collect::<Result<_>>()?;

    for summary in &summaries {
        report::write_scenario_summary(&results_dir, summary)?;
        if !quiet {
            report::print_summary(summary);
        }
    }
    report::write_collection(&results_dir, &summaries)?;

    Ok(())
}

fn init_config(output: PathBuf) -> Result<()> {
    let suite = config::SuiteConfig {
        scenarios: config::baseline_suite(),
    };
    let yaml = serde_yaml::to_string(&suite).context("Failed to serialize baseline suite")?;
    fs::write(&output, yaml)
        .with_context(|| format!("Failed to write config to {}", output.display()))?;
    log::info!("Baseline suite written to {}", output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from(["renolab", "analyze", "--results-dir", "run1"]);
        match cli.command {
            Commands::Analyze {
                results_dir,
                config,
                threads,
                quiet,
            } => {
                assert_eq!(results_dir, PathBuf::from("run1"));
                assert!(config.is_none());
                assert_eq!(threads, 0);
                assert!(!quiet);
            }
            _ => panic!("expected analyze subcommand"),
        }
    }

    #[test]
    fn test_init_config_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scenarios.yaml");
        init_config(path.clone()).unwrap();

        let suite = config::load_suite(&path).unwrap();
        assert_eq!(suite.scenarios.len(), 5);
        assert_eq!(suite.scenarios[0].name, "scenario1_basic_aimd");
    }
}
