//! Scenario configuration.
//!
//! Per-scenario topology, flow layout and labels live in explicit
//! configuration structures loaded from YAML. The built-in
//! [`baseline_suite`] reproduces the five standard link conditions used to
//! characterize TCP Reno.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use color_eyre::eyre::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::emulation::LinkParams;

/// Default traffic-generator server port.
pub const DEFAULT_SERVER_PORT: u16 = 5201;

/// One traffic flow: a client/server process pair plus an optional
/// monitored host whose socket statistics are sampled while it runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowSpec {
    /// Label used for artifact file names and summary keys.
    pub label: String,
    /// Host running the traffic-generator client.
    pub client: String,
    /// Host running the traffic-generator server.
    pub server: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Delay before launching this flow's client, staggering competing
    /// flows.
    #[serde(default, with = "humantime_serde")]
    pub start_offset: Duration,
    /// Host to sample socket statistics on; `None` disables sampling for
    /// this flow.
    #[serde(default)]
    pub monitor: Option<String>,
}

impl FlowSpec {
    pub fn client_report_name(&self) -> String {
        format!("{}_client.json", self.label)
    }

    pub fn server_log_name(&self) -> String {
        format!("{}_server.log", self.label)
    }

    pub fn sample_log_name(&self) -> String {
        format!("{}_cwnd.log", self.label)
    }
}

/// One shaped link between two endpoints (hosts or the switch).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkSpec {
    pub from: String,
    pub to: String,
    #[serde(flatten)]
    pub params: LinkParams,
}

/// A complete scenario: topology, traffic layout and sampling cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioSpec {
    pub name: String,
    pub description: String,
    /// Traffic duration per flow.
    #[serde(with = "humantime_serde")]
    pub duration: Duration,
    /// Polling interval for the socket-statistics samplers.
    #[serde(default = "default_sample_interval", with = "humantime_serde")]
    pub sample_interval: Duration,
    pub hosts: Vec<String>,
    #[serde(default = "default_switch")]
    pub switch: String,
    pub links: Vec<LinkSpec>,
    pub flows: Vec<FlowSpec>,
}

fn default_port() -> u16 {
    DEFAULT_SERVER_PORT
}

fn default_sample_interval() -> Duration {
    Duration::from_millis(500)
}

fn default_switch() -> String {
    "s1".to_string()
}

/// Scenario configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Scenario '{0}' defines no flows")]
    NoFlows(String),
    #[error("Scenario '{scenario}' flow '{flow}' references unknown host '{host}'")]
    UnknownHost {
        scenario: String,
        flow: String,
        host: String,
    },
    #[error("Scenario '{scenario}' link references unknown endpoint '{endpoint}'")]
    UnknownEndpoint { scenario: String, endpoint: String },
    #[error("Scenario '{scenario}' reuses server port {port} across flows on host '{host}'")]
    DuplicatePort {
        scenario: String,
        host: String,
        port: u16,
    },
    #[error("Scenario '{scenario}' reuses flow label '{label}'")]
    DuplicateLabel { scenario: String, label: String },
}

impl ScenarioSpec {
    /// Whether the scenario runs competing flows (fairness applies).
    pub fn is_competing(&self) -> bool {
        self.flows.len() > 1
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.flows.is_empty() {
            return Err(ValidationError::NoFlows(self.name.clone()));
        }
        let hosts: HashSet<&str> = self.hosts.iter().map(String::as_str).collect();

        for link in &self.links {
            for endpoint in [&link.from, &link.to] {
                if !hosts.contains(endpoint.as_str()) && *endpoint != self.switch {
                    return Err(ValidationError::UnknownEndpoint {
                        scenario: self.name.clone(),
                        endpoint: endpoint.clone(),
                    });
                }
            }
        }

        let mut labels = HashSet::new();
        let mut server_ports = HashSet::new();
        for flow in &self.flows {
            for host in [Some(&flow.client), Some(&flow.server), flow.monitor.as_ref()]
                .into_iter()
                .flatten()
            {
                if !hosts.contains(host.as_str()) {
                    return Err(ValidationError::UnknownHost {
                        scenario: self.name.clone(),
                        flow: flow.label.clone(),
                        host: host.clone(),
                    });
                }
            }
            if !labels.insert(flow.label.clone()) {
                return Err(ValidationError::DuplicateLabel {
                    scenario: self.name.clone(),
                    label: flow.label.clone(),
                });
            }
            if !server_ports.insert((flow.server.clone(), flow.port)) {
                return Err(ValidationError::DuplicatePort {
                    scenario: self.name.clone(),
                    host: flow.server.clone(),
                    port: flow.port,
                });
            }
        }
        Ok(())
    }
}

/// Top-level suite configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteConfig {
    pub scenarios: Vec<ScenarioSpec>,
}

/// Load and validate a scenario suite from a YAML file.
pub fn load_suite(path: &Path) -> Result<SuiteConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read scenario config '{}'", path.display()))?;
    let suite: SuiteConfig = serde_yaml::from_str(&raw)
        .with_context(|| format!("Failed to parse scenario config '{}'", path.display()))?;
    for scenario in &suite.scenarios {
        scenario.validate().with_context(|| {
            format!("Invalid scenario '{}' in '{}'", scenario.name, path.display())
        })?;
    }
    log::info!(
        "Loaded {} scenarios from {}",
        suite.scenarios.len(),
        path.display()
    );
    Ok(suite)
}

fn symmetric_star(hosts: &[&str], params: LinkParams) -> (Vec<String>, Vec<LinkSpec>) {
    let links = hosts
        .iter()
        .map(|host| LinkSpec {
            from: host.to_string(),
            to: default_switch(),
            params: params.clone(),
        })
        .collect();
    (hosts.iter().map(|h| h.to_string()).collect(), links)
}

fn single_flow(monitor: &str) -> Vec<FlowSpec> {
    vec![FlowSpec {
        label: "flow".to_string(),
        client: "h1".to_string(),
        server: "h2".to_string(),
        port: DEFAULT_SERVER_PORT,
        start_offset: Duration::ZERO,
        monitor: Some(monitor.to_string()),
    }]
}

/// The five baseline link conditions used for Reno characterization.
pub fn baseline_suite() -> Vec<ScenarioSpec> {
    let mut scenarios = Vec::new();

    // Single flow through a 10 Mbps bottleneck: slow start, then AIMD.
    let (hosts, links) = symmetric_star(
        &["h1", "h2"],
        LinkParams {
            bandwidth_mbps: 10.0,
            delay: Duration::from_millis(30),
            loss_pct: 0.0,
            max_queue: 100,
        },
    );
    scenarios.push(ScenarioSpec {
        name: "scenario1_basic_aimd".to_string(),
        description: "Baseline AIMD over single bottleneck".to_string(),
        duration: Duration::from_secs(60),
        sample_interval: default_sample_interval(),
        hosts,
        switch: default_switch(),
        links,
        flows: single_flow("h1"),
    });

    // 5% random loss: Reno treats every loss as congestion.
    let (hosts, links) = symmetric_star(
        &["h1", "h2"],
        LinkParams {
            bandwidth_mbps: 10.0,
            delay: Duration::from_millis(20),
            loss_pct: 5.0,
            max_queue: 100,
        },
    );
    scenarios.push(ScenarioSpec {
        name: "scenario2_lossy_link".to_string(),
        description: "Random loss (5%)".to_string(),
        duration: Duration::from_secs(60),
        sample_interval: default_sample_interval(),
        hosts,
        switch: default_switch(),
        links,
        flows: single_flow("h1"),
    });

    // High bandwidth-delay product: linear growth is too slow to fill the
    // pipe. Longer run and coarser sampling.
    let (hosts, links) = symmetric_star(
        &["h1", "h2"],
        LinkParams {
            bandwidth_mbps: 100.0,
            delay: Duration::from_millis(150),
            loss_pct: 0.0,
            max_queue: 2000,
        },
    );
    scenarios.push(ScenarioSpec {
        name: "scenario3_high_bdp".to_string(),
        description: "High BDP path (100 Mbps, 150 ms RTT)".to_string(),
        duration: Duration::from_secs(90),
        sample_interval: Duration::from_millis(750),
        hosts,
        switch: default_switch(),
        links,
        flows: single_flow("h1"),
    });

    // Two competing flows with different RTTs sharing one server host.
    let short = LinkParams {
        bandwidth_mbps: 20.0,
        delay: Duration::from_millis(10),
        loss_pct: 0.0,
        max_queue: 200,
    };
    let long = LinkParams {
        delay: Duration::from_millis(100),
        ..short.clone()
    };
    scenarios.push(ScenarioSpec {
        name: "scenario4_rtt_unfairness".to_string(),
        description: "RTT unfairness (short vs long RTT flows)".to_string(),
        duration: Duration::from_secs(60),
        sample_interval: default_sample_interval(),
        hosts: vec!["h1".to_string(), "h2".to_string(), "h3".to_string()],
        switch: default_switch(),
        links: vec![
            LinkSpec {
                from: "h1".to_string(),
                to: default_switch(),
                params: short.clone(),
            },
            LinkSpec {
                from: "h3".to_string(),
                to: default_switch(),
                params: long,
            },
            LinkSpec {
                from: "h2".to_string(),
                to: default_switch(),
                params: short,
            },
        ],
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
                start_offset: Duration::from_millis(500),
                monitor: Some("h3".to_string()),
            },
        ],
    });

    // Oversized queue: RTT inflates far beyond the propagation delay.
    let (hosts, links) = symmetric_star(
        &["h1", "h2"],
        LinkParams {
            bandwidth_mbps: 10.0,
            delay: Duration::from_millis(20),
            loss_pct: 0.0,
            max_queue: 2000,
        },
    );
    scenarios.push(ScenarioSpec {
        name: "scenario5_bufferbloat".to_string(),
        description: "Bufferbloat with oversized queue".to_string(),
        duration: Duration::from_secs(60),
        sample_interval: default_sample_interval(),
        hosts,
        switch: default_switch(),
        links,
        flows: single_flow("h1"),
    });

    scenarios
}
