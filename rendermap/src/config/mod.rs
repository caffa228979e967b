//! Configuration file for rendermap at `~/.rendermap/config.ini`.
//!
//! The file is optional. Missing sections and keys fall back to the
//! defaults in [`defaults`], and command-line runtime arguments override the
//! `[benchmark]` and `[machine]` values at launch.
//!
//! # Example
//!
//! ```no_run
//! use rendermap::config::ConfigFile;
//!
//! let config = ConfigFile::load()?;
//! println!("collection size: {}", config.benchmark.size);
//! # Ok::<(), rendermap::config::ConfigFileError>(())
//! ```

mod defaults;
mod file;
mod parser;
mod settings;
mod writer;

pub use defaults::*;
pub use file::{config_directory, config_file_path, ConfigFileError};
pub use settings::{BenchmarkSettings, ConfigFile, LoggingSettings, MachineSettings};
