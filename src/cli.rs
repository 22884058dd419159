use std::net::IpAddr;
use std::path::PathBuf;

use clap::Parser;
use clap::ValueHint;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Script or command to execute
    ///
    /// Every line the command prints must look like: system, subsystem, metric, value
    #[arg(short, long, env="PROM_SCRIPT", value_hint=ValueHint::CommandName)]
    pub script: String,

    /// Arguments passed verbatim to the script
    #[arg(last = true, value_hint=ValueHint::Other)]
    pub script_args: Vec<String>,

    /// Port to expose the metrics on
    #[arg(short, long, env="PROM_PORT", value_hint=ValueHint::Other, default_value="9300")]
    pub port: u16,

    /// Address to bind the HTTP listener to
    #[arg(short, long, env="PROM_ADDRESS", value_hint=ValueHint::Other, default_value="0.0.0.0")]
    pub address: IpAddr,

    /// Refresh interval in seconds
    ///
    /// The time between the end of one script run and the start of the next one.
    #[arg(short, long, visible_alias="timeout", env="PROM_REFRESH_INTERVAL", value_hint=ValueHint::Other, default_value="15")]
    pub interval: u64,

    /// Maximum run time of the script in seconds
    ///
    /// The script is killed when it runs longer than this. Defaults to the refresh interval.
    #[arg(long, env="PROM_COMMAND_TIMEOUT", value_hint=ValueHint::Other)]
    pub command_timeout: Option<u64>,

    /// Exit if the first run of the script fails
    #[arg(long, env="PROM_STRICT_STARTUP")]
    pub strict_startup: bool,

    /// HTTP path the metrics are served on
    #[arg(long, env="PROM_METRICS_PATH", value_hint=ValueHint::Other, default_value="/metrics")]
    pub metrics_path: String,

    /// Set the logging level
    #[arg(short, long, env="LOG_LEVEL", value_hint=ValueHint::Other, default_value="INFO")]
    pub loglevel: log::LevelFilter,

    /// Also write the log to this file
    #[arg(long, env="LOG_FILE", value_hint=ValueHint::FilePath)]
    pub log_file: Option<PathBuf>,
}
