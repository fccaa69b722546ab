use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the analysis engine.
///
/// Worker-level failures (decode and IO) are contained by the scheduler and
/// never abort a run; configuration errors are fatal before any work starts.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to decode '{path}': {reason}")]
    Decode { path: PathBuf, reason: String },

    #[error("failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("frame index {index} out of range for {len} luminosity planes")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("no clip scores to aggregate")]
    EmptyAggregate,

    #[error("timed out acquiring {operation} after {waited_ms} ms")]
    Contention {
        operation: &'static str,
        waited_ms: u64,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
