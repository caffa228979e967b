//! Benchmark error types.

use crate::config::ConfigFileError;
use crate::runtime::RuntimeError;
use thiserror::Error;

/// Errors surfaced by [`ExecutionOrchestrator`](super::ExecutionOrchestrator).
#[derive(Debug, Error)]
pub enum BenchmarkError {
    /// The runtime failed while setting up or running the benchmark.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    /// The configuration file could not be used.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigFileError),
}

impl BenchmarkError {
    /// Returns true for errors that must abort the process rather than exit
    /// with a failure code.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Runtime(e) => e.is_fatal() || matches!(e, RuntimeError::Aborted(_)),
            Self::Config(_) => false,
        }
    }
}
