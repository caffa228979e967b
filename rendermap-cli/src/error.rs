//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and the exit policy: broken invariants and codec failures abort the
//! process, everything else exits with code 1.

use rendermap::bench::BenchmarkError;
use rendermap::config::ConfigFileError;
use rendermap::runtime::RuntimeError;
use std::fmt;
use std::process;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration file error
    Config(ConfigFileError),
    /// Failed to start the async runtime
    AsyncRuntime(std::io::Error),
    /// The region runtime could not be set up
    Runtime(RuntimeError),
    /// The benchmark failed
    Benchmark(BenchmarkError),
}

impl CliError {
    /// Whether the process must abort instead of exiting.
    pub fn is_fatal(&self) -> bool {
        match self {
            CliError::Runtime(e) => e.is_fatal(),
            CliError::Benchmark(e) => e.is_fatal(),
            _ => false,
        }
    }

    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        if self.is_fatal() {
            eprintln!("Aborting.");
            process::abort();
        }

        if let CliError::Config(ConfigFileError::InvalidValue { .. }) = self {
            eprintln!();
            eprintln!("Fix the value in the config file, or recreate it with:");
            eprintln!("  rendermap config init --force");
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(e) => write!(f, "Configuration error: {}", e),
            CliError::AsyncRuntime(e) => write!(f, "Failed to start async runtime: {}", e),
            CliError::Runtime(e) => write!(f, "Runtime error: {}", e),
            CliError::Benchmark(e) => write!(f, "Benchmark failed: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(e) => Some(e),
            CliError::AsyncRuntime(e) => Some(e),
            CliError::Runtime(e) => Some(e),
            CliError::Benchmark(e) => Some(e),
            CliError::LoggingInit(_) => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e)
    }
}

impl From<RuntimeError> for CliError {
    fn from(e: RuntimeError) -> Self {
        CliError::Runtime(e)
    }
}

impl From<BenchmarkError> for CliError {
    fn from(e: BenchmarkError) -> Self {
        CliError::Benchmark(e)
    }
}
