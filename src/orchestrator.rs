//! Scenario orchestration.
//!
//! Runs scenarios strictly one at a time. Within a scenario the sequence is
//! fixed: bring the emulated network up, start the samplers, run the
//! traffic flows, stop and join every sampler, tear the network down, then
//! assemble the summary from the collected artifacts. Samplers are always
//! joined before teardown, whatever the traffic outcome, so no monitor
//! activity leaks into the next scenario.

use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use color_eyre::eyre::{Context, Result};

use crate::analysis::summary::{summarize_scenario, ScenarioResults};
use crate::analysis::{report, ScenarioSummary};
use crate::config::ScenarioSpec;
use crate::emulation::{ClientHandle, NetworkEmulator, ServerHandle, TrafficGenerator};
use crate::sampler::{snapshot_command, Sampler};

/// Settle time between server start and client launch, and again between
/// client completion and server teardown.
const TRAFFIC_GRACE: Duration = Duration::from_secs(1);

/// Drives scenario runs against a traffic-generator backend, writing all
/// artifacts and summaries under one output directory.
pub struct ScenarioOrchestrator<'a> {
    traffic: &'a mut dyn TrafficGenerator,
    output_dir: PathBuf,
}

impl<'a> ScenarioOrchestrator<'a> {
    pub fn new(traffic: &'a mut dyn TrafficGenerator, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            traffic,
            output_dir: output_dir.into(),
        }
    }

    /// Run every scenario in order, flushing each summary as soon as its
    /// scenario completes and the combined collection at the end. A
    /// scenario failure aborts the suite.
    pub fn run_suite<E, F>(
        &mut self,
        scenarios: &[ScenarioSpec],
        mut make_emulator: F,
    ) -> Result<Vec<ScenarioSummary>>
    where
        E: NetworkEmulator,
        F: FnMut() -> E,
    {
        let mut summaries = Vec::with_capacity(scenarios.len());
        for spec in scenarios {
            log::info!("Running {} ...", spec.name);
            let mut net = make_emulator();
            let results = self.run_scenario(spec, &mut net)?;
            report::write_scenario_summary(&self.output_dir, &results.summary)?;
            log::info!("Completed {}", spec.name);
            summaries.push(results.summary);
        }
        report::write_collection(&self.output_dir, &summaries)?;
        Ok(summaries)
    }

    /// Run one scenario against a freshly built emulator instance.
    pub fn run_scenario(
        &mut self,
        spec: &ScenarioSpec,
        net: &mut dyn NetworkEmulator,
    ) -> Result<ScenarioResults> {
        spec.validate()?;
        let scenario_dir = self.output_dir.join(&spec.name);
        fs::create_dir_all(&scenario_dir)
            .with_context(|| format!("Failed to create {}", scenario_dir.display()))?;

        // Idle -> NetworkUp
        let setup_result = (|| -> Result<()> {
            for host in &spec.hosts {
                net.add_host(host)?;
            }
            net.add_switch(&spec.switch)?;
            for link in &spec.links {
                net.add_link(&link.from, &link.to, &link.params)?;
            }
            net.start()
        })();

        // Everything from here must reach net.stop(), including a partially
        // failed construction or start, so results are captured rather than
        // returned early.
        let phase_result = if setup_result.is_ok() {
            self.run_traffic_phase(spec, net, &scenario_dir)
        } else {
            Ok(())
        };

        // SamplersStopped -> NetworkDown
        let stop_result = net.stop();
        setup_result?;
        phase_result?;
        stop_result?;

        // NetworkDown -> ReportAssembled
        summarize_scenario(spec, &scenario_dir)
    }

    /// NetworkUp -> SamplersRunning -> TrafficRunning -> SamplersStopped.
    fn run_traffic_phase(
        &mut self,
        spec: &ScenarioSpec,
        net: &dyn NetworkEmulator,
        scenario_dir: &Path,
    ) -> Result<()> {
        let mut samplers = Vec::new();
        let spawn_result = (|| -> Result<()> {
            for flow in &spec.flows {
                let Some(monitor) = &flow.monitor else {
                    continue;
                };
                let host = net.host(monitor)?;
                samplers.push(Sampler::spawn(
                    host,
                    snapshot_command(flow.port),
                    scenario_dir.join(flow.sample_log_name()),
                    spec.sample_interval,
                )?);
            }
            Ok(())
        })();

        let traffic_result = if spawn_result.is_ok() {
            self.run_flows(spec, net, scenario_dir)
        } else {
            Ok(())
        };

        // Signal and join every sampler before network teardown, even when
        // a later spawn or the traffic generator failed.
        let mut sampler_result = Ok(());
        for sampler in samplers {
            if let Err(e) = sampler.stop() {
                log::warn!("Sampler failed: {e:#}");
                sampler_result = Err(e);
            }
        }
        spawn_result?;
        traffic_result?;
        sampler_result
    }

    fn run_flows(
        &mut self,
        spec: &ScenarioSpec,
        net: &dyn NetworkEmulator,
        scenario_dir: &Path,
    ) -> Result<()> {
        // Servers started before a later start fails still reach teardown.
        let mut servers: Vec<Box<dyn ServerHandle>> = Vec::with_capacity(spec.flows.len());
        let mut start_result = Ok(());
        for flow in &spec.flows {
            let started = net.host(&flow.server).and_then(|host| {
                self.traffic.start_server(
                    host.as_ref(),
                    flow.port,
                    &scenario_dir.join(flow.server_log_name()),
                )
            });
            match started {
                Ok(server) => servers.push(server),
                Err(e) => {
                    start_result = Err(e);
                    break;
                }
            }
        }

        let mut run_result = Ok(());
        if start_result.is_ok() {
            thread::sleep(TRAFFIC_GRACE);
            run_result = (|| -> Result<()> {
                let mut clients: Vec<Box<dyn ClientHandle>> =
                    Vec::with_capacity(spec.flows.len());
                for flow in &spec.flows {
                    thread::sleep(flow.start_offset);
                    let client_host = net.host(&flow.client)?;
                    let server_addr = net.host(&flow.server)?.address();
                    clients.push(self.traffic.start_client(
                        client_host.as_ref(),
                        &server_addr,
                        flow.port,
                        spec.duration,
                        &scenario_dir.join(flow.client_report_name()),
                    )?);
                }
                for client in &mut clients {
                    client.wait()?;
                }
                Ok(())
            })();
            thread::sleep(TRAFFIC_GRACE);
        }

        // Teardown is idempotent: only still-live servers are signalled,
        // and it runs even when a server start or a client failed.
        let mut stop_result = Ok(());
        for server in &mut servers {
            if server.is_running() {
                if let Err(e) = server.terminate() {
                    log::warn!("Failed to terminate traffic server: {e:#}");
                    stop_result = Err(e);
                }
            }
        }
        start_result?;
        run_result?;
        stop_result
    }
}
