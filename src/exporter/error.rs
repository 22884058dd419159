use std::time::Duration;

use thiserror::Error;

/// Why a single output line could not be turned into a record.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("expected 4 comma separated fields, found {0}")]
    FieldCountMismatch(usize),
    #[error("{0:?} is not a finite number")]
    InvalidValue(String),
    #[error("line is not valid UTF-8")]
    InvalidEncoding,
    #[error("line is longer than {0} bytes")]
    LineTooLong(usize),
}

/// Why a whole refresh cycle produced nothing publishable.
#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("malformed output on line {line}: {source}")]
    MalformedOutput {
        line: usize,
        #[source]
        source: ParseError,
    },
    #[error("the command produced no output")]
    EmptyOutput,
    #[error("process failed: {0}")]
    ProcessFailed(String),
    #[error("the command did not finish within {0:?}")]
    Timeout(Duration),
}

impl CollectorError {
    /// Stable label used when counting failures.
    pub fn reason(&self) -> &'static str {
        match self {
            CollectorError::MalformedOutput { .. } => "malformed_output",
            CollectorError::EmptyOutput => "empty_output",
            CollectorError::ProcessFailed(_) => "process_failed",
            CollectorError::Timeout(_) => "timeout",
        }
    }
}
