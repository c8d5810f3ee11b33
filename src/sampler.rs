//! Concurrent socket-statistics sampling.
//!
//! Each [`Sampler`] owns one thread, one monitored host and one log file;
//! samplers share nothing and need no locking. The loop appends one poll
//! block per interval: a wall-clock timestamp line, the raw snapshot text,
//! and a delimiter line. Cancellation is cooperative through a channel the
//! loop waits on between polls, and always produces exactly one terminal
//! block so the final connection counters survive teardown races.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use color_eyre::eyre::{eyre, Context, Result};

use crate::analysis::cwnd_log::BLOCK_DELIMITER;
use crate::emulation::Host;

/// Snapshot command polling per-connection TCP statistics for flows
/// targeting the given server port.
pub fn snapshot_command(server_port: u16) -> String {
    format!("ss -tin '( dport = :{server_port} )'")
}

/// Handle to a running sampler thread.
pub struct Sampler {
    stop_tx: Sender<()>,
    handle: JoinHandle<Result<()>>,
}

impl Sampler {
    /// Spawn a sampling loop against `host`, appending one poll block to
    /// `log_path` per `interval` until [`stop`](Self::stop) is called.
    pub fn spawn(
        host: Arc<dyn Host>,
        command: String,
        log_path: PathBuf,
        interval: Duration,
    ) -> Result<Self> {
        let (stop_tx, stop_rx) = mpsc::channel();
        let handle = thread::Builder::new()
            .name(format!("sampler-{}", host.name()))
            .spawn(move || sample_loop(host.as_ref(), &command, &log_path, interval, &stop_rx))
            .context("Failed to spawn sampler thread")?;
        Ok(Self { stop_tx, handle })
    }

    /// Signal cancellation, wait for the terminal sample to be written and
    /// the thread to exit. Returns the loop's result.
    pub fn stop(self) -> Result<()> {
        // A dropped sender is also treated as a stop signal, so a failed
        // send just means the loop already ended.
        let _ = self.stop_tx.send(());
        match self.handle.join() {
            Ok(result) => result,
            Err(_) => Err(eyre!("Sampler thread panicked")),
        }
    }
}

fn sample_loop(
    host: &dyn Host,
    command: &str,
    log_path: &Path,
    interval: Duration,
    stop_rx: &Receiver<()>,
) -> Result<()> {
    let mut log = File::create(log_path)
        .with_context(|| format!("Failed to create sample log {}", log_path.display()))?;
    log::debug!("Sampling '{}' on {} every {:?}", command, host.name(), interval);

    loop {
        append_block(host, command, &mut log)?;
        match stop_rx.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => continue,
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    // Terminal sample: the final retransmit/byte counters are captured
    // even when cancellation races traffic completion.
    append_block(host, command, &mut log)
}

fn append_block(host: &dyn Host, command: &str, log: &mut File) -> Result<()> {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64();
    let output = host
        .command(command)
        .with_context(|| format!("Snapshot command failed on {}", host.name()))?;
    writeln!(log, "{:.6}\n{}\n{}", timestamp, output.trim(), BLOCK_DELIMITER)?;
    log.flush()?;
    Ok(())
}
