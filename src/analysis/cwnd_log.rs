//! Parsing of sampled `ss -ti` output into per-connection time series.
//!
//! The sampler writes repeated poll blocks to one log file: a float
//! timestamp line, the raw snapshot output, and a `--` delimiter line.
//! Parsing is lenient by design: malformed lines are skipped, a statistics
//! line missing its required cwnd token suppresses that one sample, and a
//! missing log file yields an empty result rather than an error.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use super::types::{ConnectionKey, Sample};

/// Delimiter line written after each poll block.
pub const BLOCK_DELIMITER: &str = "--";

/// Connection-state tokens `ss` prints at the start of a connection line.
const TCP_STATES: &[&str] = &[
    "ESTAB",
    "SYN-SENT",
    "SYN-RECV",
    "FIN-WAIT-1",
    "FIN-WAIT-2",
    "TIME-WAIT",
    "CLOSE-WAIT",
    "LAST-ACK",
    "CLOSING",
];

/// Compiled regex patterns for statistics extraction
struct SsPatterns {
    /// Match: "cwnd:10"
    cwnd: Regex,
    /// Match: "rtt:203.825/62.959" (first number)
    rtt: Regex,
    /// Match: "bytes_sent:123456"
    bytes_sent: Regex,
    /// Match: "10.0.0.1:5201 10.0.0.2:44444" (local then remote endpoint)
    addr_pair: Regex,
}

static PATTERNS: LazyLock<SsPatterns> = LazyLock::new(|| SsPatterns {
    cwnd: Regex::new(r"cwnd:(\d+\.?\d*)").expect("Invalid cwnd regex"),
    rtt: Regex::new(r"rtt:(\d+\.?\d*)").expect("Invalid rtt regex"),
    bytes_sent: Regex::new(r"bytes_sent:(\d+)").expect("Invalid bytes_sent regex"),
    addr_pair: Regex::new(r"(\d+\.\d+\.\d+\.\d+):(\d+)\s+(\d+\.\d+\.\d+\.\d+):(\d+)")
        .expect("Invalid addr_pair regex"),
});

/// Kind of one raw line in a sampled log.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LineKind {
    Blank,
    /// End of a per-poll block; resets the current connection.
    Delimiter,
    /// Float timestamp opening a poll block. `None` when the digits do not
    /// form a parseable float (e.g. `1.2.3`).
    Timestamp(Option<f64>),
    /// Connection-state line; carries the remote peer's port when the
    /// embedded address pair could be extracted.
    ConnectionHeader(Option<ConnectionKey>),
    /// Line carrying a `cwnd:` token.
    Stats,
    Unrecognized,
}

/// Classify one line of raw sampled text.
pub fn classify_line(line: &str) -> LineKind {
    let line = line.trim();
    if line.is_empty() {
        return LineKind::Blank;
    }
    if line == BLOCK_DELIMITER {
        return LineKind::Delimiter;
    }
    if line.chars().all(|c| c.is_ascii_digit() || c == '.')
        && line.chars().any(|c| c.is_ascii_digit())
    {
        return LineKind::Timestamp(line.parse().ok());
    }
    if TCP_STATES.iter().any(|state| line.starts_with(state)) {
        let port = PATTERNS
            .addr_pair
            .captures(line)
            .and_then(|caps| caps.get(4))
            .and_then(|m| m.as_str().parse().ok());
        return LineKind::ConnectionHeader(port);
    }
    if line.contains("cwnd:") {
        return LineKind::Stats;
    }
    LineKind::Unrecognized
}

/// Per-connection sample store. Keys are retained in first-observed order
/// so selection tie-breaks stay deterministic for a given log.
#[derive(Debug, Default)]
pub struct SampleAccumulator {
    order: Vec<ConnectionKey>,
    series: HashMap<ConnectionKey, Vec<Sample>>,
}

impl SampleAccumulator {
    pub fn push(&mut self, key: ConnectionKey, sample: Sample) {
        if !self.series.contains_key(&key) {
            self.order.push(key);
        }
        self.series.entry(key).or_default().push(sample);
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Connection keys in first-observed order.
    pub fn keys(&self) -> impl Iterator<Item = ConnectionKey> + '_ {
        self.order.iter().copied()
    }

    /// Samples for one key, in observation order.
    pub fn samples(&self, key: ConnectionKey) -> &[Sample] {
        self.series.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn connection_count(&self) -> usize {
        self.order.len()
    }
}

/// Parse one sampled log into per-connection series.
///
/// A nonexistent path is not an error: the monitored host may simply have
/// produced nothing for this scenario.
pub fn parse_log(path: &Path) -> SampleAccumulator {
    let mut acc = SampleAccumulator::default();
    let file = match File::open(path) {
        Ok(file) => file,
        Err(_) => {
            log::debug!("No sample log at {}", path.display());
            return acc;
        }
    };
    let reader = BufReader::new(file);

    let mut timestamp: Option<f64> = None;
    let mut current_key: Option<ConnectionKey> = None;

    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(_) => continue,
        };
        match classify_line(&line) {
            LineKind::Blank | LineKind::Unrecognized => {}
            LineKind::Delimiter => current_key = None,
            LineKind::Timestamp(value) => timestamp = value,
            LineKind::ConnectionHeader(port) => current_key = port,
            LineKind::Stats => {
                let (Some(ts), Some(key)) = (timestamp, current_key) else {
                    continue;
                };
                if let Some(sample) = parse_stats_line(&line, ts) {
                    acc.push(key, sample);
                }
            }
        }
    }
    acc
}

/// Extract a sample from a statistics line. Returns `None` when the
/// required cwnd value is absent; rtt and bytes_sent are each optional.
fn parse_stats_line(line: &str, timestamp: f64) -> Option<Sample> {
    let cwnd = PATTERNS
        .cwnd
        .captures(line)?
        .get(1)?
        .as_str()
        .parse()
        .ok()?;
    let rtt_ms = PATTERNS
        .rtt
        .captures(line)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok());
    let bytes_sent = PATTERNS
        .bytes_sent
        .captures(line)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok());
    Some(Sample {
        timestamp,
        cwnd,
        rtt_ms,
        bytes_sent,
    })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    #[test]
    fn test_classify_blank_and_delimiter() {
        assert_eq!(classify_line(""), LineKind::Blank);
        assert_eq!(classify_line("   "), LineKind::Blank);
        assert_eq!(classify_line("--"), LineKind::Delimiter);
    }

    #[test]
    fn test_classify_timestamp() {
        assert_eq!(classify_line("100.0"), LineKind::Timestamp(Some(100.0)));
        assert_eq!(classify_line("1761700000"), LineKind::Timestamp(Some(1761700000.0)));
        // Digits and dots that fail float parsing still count as a
        // timestamp line, just without a value.
        assert_eq!(classify_line("1.2.3"), LineKind::Timestamp(None));
    }

    #[test]
    fn test_classify_connection_header() {
        let line = "ESTAB 0 36720 10.0.0.1:5201 10.0.0.2:44444";
        assert_eq!(classify_line(line), LineKind::ConnectionHeader(Some(44444)));
        // Header without an address pair leaves the key unset.
        assert_eq!(classify_line("ESTAB 0 0"), LineKind::ConnectionHeader(None));
    }

    #[test]
    fn test_classify_stats_and_unrecognized() {
        assert_eq!(classify_line("\t cubic rtt:20/10 cwnd:10"), LineKind::Stats);
        assert_eq!(
            classify_line("State Recv-Q Send-Q Local Address:Port"),
            LineKind::Unrecognized
        );
    }

    #[test]
    fn test_parse_single_poll_block() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "100.0").unwrap();
        writeln!(file, "ESTAB 0 36720 10.0.0.1:5201 10.0.0.2:44444").unwrap();
        writeln!(file, "\t cubic cwnd:10 rtt:20 bytes_sent:1000").unwrap();
        writeln!(file, "--").unwrap();

        let acc = parse_log(file.path());
        assert_eq!(acc.connection_count(), 1);
        let samples = acc.samples(44444);
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].timestamp, 100.0);
        assert_eq!(samples[0].cwnd, 10.0);
        assert_eq!(samples[0].rtt_ms, Some(20.0));
        assert_eq!(samples[0].bytes_sent, Some(1000));
    }

    #[test]
    fn test_missing_log_is_empty() {
        let acc = parse_log(Path::new("/nonexistent/cwnd.log"));
        assert!(acc.is_empty());
    }

    #[test]
    fn test_stats_without_context_is_skipped() {
        let mut file = NamedTempFile::new().unwrap();
        // No timestamp line before the block.
        writeln!(file, "ESTAB 0 0 10.0.0.1:5201 10.0.0.2:44444").unwrap();
        writeln!(file, "\t cwnd:10 rtt:20").unwrap();
        writeln!(file, "--").unwrap();
        // Timestamp but the delimiter already cleared the connection.
        writeln!(file, "100.0").unwrap();
        writeln!(file, "\t cwnd:11").unwrap();

        let acc = parse_log(file.path());
        assert!(acc.is_empty());
    }

    #[test]
    fn test_missing_cwnd_suppresses_sample() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "100.0").unwrap();
        writeln!(file, "ESTAB 0 0 10.0.0.1:5201 10.0.0.2:44444").unwrap();
        // cwnd token with no numeric value
        writeln!(file, "\t rtt:20 cwnd:").unwrap();
        writeln!(file, "\t cwnd:12").unwrap();
        writeln!(file, "--").unwrap();

        let acc = parse_log(file.path());
        let samples = acc.samples(44444);
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].cwnd, 12.0);
        assert_eq!(samples[0].rtt_ms, None);
        assert_eq!(samples[0].bytes_sent, None);
    }

    #[test]
    fn test_demultiplexes_concurrent_connections() {
        let mut file = NamedTempFile::new().unwrap();
        for (ts, bytes_a, bytes_b) in [(100.0, 500u64, 900u64), (100.5, 800, 1200)] {
            writeln!(file, "{ts}").unwrap();
            writeln!(file, "ESTAB 0 0 10.0.0.2:5201 10.0.0.1:40001").unwrap();
            writeln!(file, "\t cwnd:10 bytes_sent:{bytes_a}").unwrap();
            writeln!(file, "ESTAB 0 0 10.0.0.2:5201 10.0.0.3:40002").unwrap();
            writeln!(file, "\t cwnd:20 bytes_sent:{bytes_b}").unwrap();
            writeln!(file, "--").unwrap();
        }

        let acc = parse_log(file.path());
        assert_eq!(acc.connection_count(), 2);
        assert_eq!(acc.keys().collect::<Vec<_>>(), vec![40001, 40002]);
        assert_eq!(acc.samples(40001).len(), 2);
        assert_eq!(acc.samples(40002).last().unwrap().bytes_sent, Some(1200));
    }
}
