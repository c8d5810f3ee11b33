//! Collaborator interfaces for the network emulator and traffic generator.
//!
//! The experiment core drives these capabilities without depending on a
//! concrete backend. A Mininet-style emulator and iperf3 processes satisfy
//! the traits directly; the test suite substitutes in-process fakes.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use color_eyre::eyre::Result;
use serde::{Deserialize, Serialize};

/// A live emulated host that can execute commands.
pub trait Host: Send + Sync {
    fn name(&self) -> &str;

    /// Address peers use to reach this host.
    fn address(&self) -> String;

    /// Run a command on the host and return its captured output.
    fn command(&self, command: &str) -> Result<String>;
}

/// Shaping parameters for one emulated link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkParams {
    /// Link bandwidth in megabits per second.
    pub bandwidth_mbps: f64,
    /// One-way propagation delay.
    #[serde(with = "humantime_serde")]
    pub delay: Duration,
    /// Random loss percentage; 0 disables loss emulation.
    #[serde(default)]
    pub loss_pct: f64,
    /// Queue capacity in packets.
    pub max_queue: u32,
}

/// Capabilities required of the network emulator. One instance describes
/// one scenario's topology; build it, start it, tear it down.
pub trait NetworkEmulator {
    fn add_host(&mut self, name: &str) -> Result<()>;

    fn add_switch(&mut self, name: &str) -> Result<()>;

    fn add_link(&mut self, endpoint_a: &str, endpoint_b: &str, params: &LinkParams) -> Result<()>;

    fn start(&mut self) -> Result<()>;

    /// Tear down the emulated network. Must be safe to call after a
    /// partially failed start.
    fn stop(&mut self) -> Result<()>;

    /// Handle to a started host, usable from other threads.
    fn host(&self, name: &str) -> Result<Arc<dyn Host>>;
}

/// A running traffic-generator server process.
pub trait ServerHandle: Send {
    /// Whether the process is still alive. Checked before termination so
    /// that stopping an already-exited server stays a no-op.
    fn is_running(&mut self) -> bool;

    /// Terminate the process and reap it.
    fn terminate(&mut self) -> Result<()>;
}

/// A running traffic-generator client process.
pub trait ClientHandle: Send {
    /// Block until the client exits; a non-zero exit is an error. There is
    /// no built-in deadline: a hung client blocks the scenario (backends
    /// may enforce their own timeout).
    fn wait(&mut self) -> Result<()>;
}

/// Capabilities required of the traffic generator.
pub trait TrafficGenerator {
    /// Start a one-off server on `host` listening on `port`, logging to
    /// `log_path`.
    fn start_server(
        &mut self,
        host: &dyn Host,
        port: u16,
        log_path: &Path,
    ) -> Result<Box<dyn ServerHandle>>;

    /// Start a client on `host` targeting `server_addr:port` for
    /// `duration`, writing a structured JSON report to `report_path`.
    fn start_client(
        &mut self,
        host: &dyn Host,
        server_addr: &str,
        port: u16,
        duration: Duration,
        report_path: &Path,
    ) -> Result<Box<dyn ClientHandle>>;
}
