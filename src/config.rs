use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

use crate::cli::Cli;

/// Startup-time configuration problems. Always fatal.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("the refresh interval must be at least one second")]
    ZeroInterval,
    #[error("the command timeout must be at least one second")]
    ZeroTimeout,
    #[error("no script or command was given")]
    EmptyCommand,
    #[error("the metrics path {0:?} must start with '/' and contain no empty segments or route captures")]
    InvalidMetricsPath(String),
}

/// The external command run on every refresh cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        CommandSpec {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn to_command(&self) -> tokio::process::Command {
        let mut command = tokio::process::Command::new(&self.program);
        command.args(&self.args);
        command
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.contains(char::is_whitespace) {
                write!(f, " {arg:?}")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// A literal HTTP route: absolute, no `//`, none of the router's capture syntax.
fn is_plain_route(path: &str) -> bool {
    path.starts_with('/')
        && !path.contains("//")
        && !path.contains(['*', ':', '{', '}'])
}

/// Validated runtime configuration of the exporter.
#[derive(Debug, Clone)]
pub struct ExporterConfig {
    pub command: CommandSpec,
    pub listen: SocketAddr,
    pub interval: Duration,
    pub command_timeout: Duration,
    pub strict_startup: bool,
    pub metrics_path: String,
}

impl TryFrom<Cli> for ExporterConfig {
    type Error = ConfigError;

    fn try_from(cli: Cli) -> Result<Self, Self::Error> {
        if cli.interval == 0 {
            return Err(ConfigError::ZeroInterval);
        }
        if cli.command_timeout == Some(0) {
            return Err(ConfigError::ZeroTimeout);
        }
        let program = cli.script.trim();
        if program.is_empty() {
            return Err(ConfigError::EmptyCommand);
        }
        if !is_plain_route(&cli.metrics_path) {
            return Err(ConfigError::InvalidMetricsPath(cli.metrics_path));
        }

        Ok(ExporterConfig {
            command: CommandSpec::new(program).with_args(cli.script_args),
            listen: SocketAddr::new(cli.address, cli.port),
            interval: Duration::from_secs(cli.interval),
            command_timeout: Duration::from_secs(cli.command_timeout.unwrap_or(cli.interval)),
            strict_startup: cli.strict_startup,
            metrics_path: cli.metrics_path,
        })
    }
}
