//! Runs a script on an interval and exposes its `system, subsystem, metric, value`
//! output lines as Prometheus gauges.

pub mod cli;
pub mod config;
pub mod exporter;
pub mod logging;
pub mod server;
