use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{Child, ChildStdout};
use tokio::time::timeout;

use super::{parse_line, CollectorError, ParseError, RecordSet};
use crate::config::CommandSpec;

/// Longest accepted output line, newline excluded.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// A fully parsed cycle.
#[derive(Debug)]
pub struct Collected {
    pub records: RecordSet,
    /// Set when the command exited unsuccessfully after printing valid output.
    pub warning: Option<CollectorError>,
}

/// Runs the configured command once per call and parses its output.
#[derive(Debug, Clone)]
pub struct Collector {
    command: CommandSpec,
    budget: Duration,
}

impl Collector {
    pub fn new(command: CommandSpec, budget: Duration) -> Self {
        Collector { command, budget }
    }

    pub fn command(&self) -> &CommandSpec {
        &self.command
    }

    pub async fn collect(&self) -> Result<Collected, CollectorError> {
        let mut child = self
            .command
            .to_command()
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                CollectorError::ProcessFailed(format!("unable to start {}: {e}", self.command))
            })?;

        let stdout = match child.stdout.take() {
            Some(stdout) => stdout,
            None => {
                reap(&mut child).await;
                return Err(CollectorError::ProcessFailed(
                    "stdout of the command was not captured".to_string(),
                ));
            }
        };

        match timeout(self.budget, drain(&mut child, stdout)).await {
            Ok(Ok(collected)) => Ok(collected),
            Ok(Err(e)) => {
                reap(&mut child).await;
                Err(e)
            }
            Err(_) => {
                log::debug!("{} exceeded {:?}, killing it", self.command, self.budget);
                reap(&mut child).await;
                Err(CollectorError::Timeout(self.budget))
            }
        }
    }
}

/// Parses stdout line by line as it arrives, then waits for the exit status.
async fn drain(child: &mut Child, stdout: ChildStdout) -> Result<Collected, CollectorError> {
    let mut reader = BufReader::new(stdout);
    let mut buf = Vec::new();
    let mut records = RecordSet::new();
    let mut line_count = 0;

    loop {
        buf.clear();
        let read = (&mut reader)
            .take(MAX_LINE_BYTES as u64 + 1)
            .read_until(b'\n', &mut buf)
            .await
            .map_err(|e| CollectorError::ProcessFailed(format!("unable to read output: {e}")))?;
        if read == 0 {
            break;
        }
        line_count += 1;

        let malformed = |source| CollectorError::MalformedOutput {
            line: line_count,
            source,
        };
        if buf.last() == Some(&b'\n') {
            buf.pop();
        } else if buf.len() > MAX_LINE_BYTES {
            return Err(malformed(ParseError::LineTooLong(MAX_LINE_BYTES)));
        }
        let line = std::str::from_utf8(&buf).map_err(|_| malformed(ParseError::InvalidEncoding))?;
        records.insert(parse_line(line).map_err(malformed)?);
    }
    drop(reader);

    let status = child
        .wait()
        .await
        .map_err(|e| CollectorError::ProcessFailed(format!("unable to wait for exit: {e}")))?;

    let warning = (!status.success())
        .then(|| CollectorError::ProcessFailed(format!("command exited with {status}")));

    if line_count == 0 {
        if let Some(warning) = warning {
            log::warn!("{warning}");
        }
        return Err(CollectorError::EmptyOutput);
    }

    Ok(Collected { records, warning })
}

/// Kills the child if still running and reaps it.
async fn reap(child: &mut Child) {
    if let Err(e) = child.kill().await {
        log::debug!("kill on finished child: {e}");
    }
}
