//! # Renolab - Experiment harness for TCP Reno congestion-control studies
//!
//! This library automates controlled network experiments that characterize a
//! loss-based congestion-control algorithm under different link conditions,
//! then reconstructs per-flow congestion-window and round-trip-time behavior
//! from raw measurement text and derives summary metrics.
//!
//! ## Overview
//!
//! A scenario brings up an emulated network, runs one or more traffic flows
//! against it while sampler threads poll socket statistics on the involved
//! hosts, and finally turns the collected text into a
//! [`ScenarioSummary`](analysis::types::ScenarioSummary): throughput
//! intervals, retransmit counts, per-flow cwnd/RTT series and, for competing
//! flows, a Jain fairness index.
//!
//! The emulator and traffic generator themselves are collaborators supplied
//! by the caller through the traits in [`emulation`]; a Mininet-style
//! backend driving iperf3 fits the interfaces directly.
//!
//! ## Architecture
//!
//! - `config`: scenario-suite configuration structures, YAML loading, and
//!   the built-in baseline suite of five link conditions
//! - `emulation`: collaborator interfaces for the network emulator and the
//!   traffic generator
//! - `sampler`: concurrent, cancellable socket-statistics sampling loop
//! - `analysis`: reconstruction pipeline (line classification, connection
//!   demultiplexing, primary-flow selection, time rebasing, structured
//!   report parsing, fairness, and summary persistence)
//! - `orchestrator`: sequences network, samplers and traffic for each
//!   scenario and assembles the results
//!
//! ## Error Handling
//!
//! The library uses `color_eyre` for error reporting with context. Log
//! parsing is deliberately lenient and never fails on malformed input;
//! collaborator failures propagate as fatal scenario errors.

pub mod analysis;
pub mod config;
pub mod emulation;
pub mod orchestrator;
pub mod sampler;
