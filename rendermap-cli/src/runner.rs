//! CLI runner for common setup and operations.
//!
//! Encapsulates config loading, logging initialization and the async runtime
//! so command handlers only deal with their own work.

use crate::error::CliError;
use rendermap::config::ConfigFile;
use rendermap::logging::{init_logging, LoggingGuard, LoggingOptions};
use std::future::Future;
use std::path::Path;
use tracing::info;

/// Runner that manages CLI lifecycle and common operations.
pub struct CliRunner {
    /// Logging guard - keeps logging active while runner exists
    #[allow(dead_code)]
    logging_guard: LoggingGuard,
    /// Loaded configuration file
    config: ConfigFile,
}

impl CliRunner {
    /// Create a new CLI runner, loading config and initializing logging.
    ///
    /// # Arguments
    ///
    /// * `config_path` - Config file to load; `~/.rendermap/config.ini` when `None`
    /// * `debug_mode` - When true, enables debug-level logging regardless of RUST_LOG
    ///   and mirrors log output to the terminal
    pub fn new(config_path: Option<&Path>, debug_mode: bool) -> Result<Self, CliError> {
        // Load config file (or use defaults if not present)
        let config = match config_path {
            Some(path) => ConfigFile::load_from(path)?,
            None => ConfigFile::load()?,
        };

        let options = LoggingOptions {
            debug: debug_mode,
            console: debug_mode,
        };
        let logging_guard = init_logging(&config.logging.file, options)
            .map_err(|e| CliError::LoggingInit(e.to_string()))?;

        Ok(Self {
            logging_guard,
            config,
        })
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    /// Log startup information for a command.
    pub fn log_startup(&self, command: &str) {
        info!("rendermap v{}", rendermap::VERSION);
        info!(
            command = command,
            log_file = %self.logging_guard.path().display(),
            "rendermap CLI"
        );
    }

    /// Drive `future` to completion on a multi-threaded tokio runtime.
    pub fn block_on<F: Future>(&self, future: F) -> Result<F::Output, CliError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(CliError::AsyncRuntime)?;
        Ok(runtime.block_on(future))
    }
}
