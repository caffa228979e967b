//! Settings structs for each configuration section.
//!
//! Each struct represents one `[section]` of the INI config file. These are
//! pure data types with no parsing or serialization logic.

use std::path::PathBuf;

/// Complete configuration loaded from config.ini.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    /// Benchmark shape
    pub benchmark: BenchmarkSettings,
    /// Simulated machine shape
    pub machine: MachineSettings,
    /// Logging settings
    pub logging: LoggingSettings,
}

/// Benchmark configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchmarkSettings {
    /// Number of elements in the rendered collection (`-n`).
    pub size: i64,
    /// Dispatch rounds (`-i`).
    pub iterations: i64,
    /// Aliasing views handed to workers per round (`-p`).
    pub partitions: i64,
    /// Side length of each element's texture.
    pub texture_side: usize,
}

/// Simulated machine configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineSettings {
    /// Node count (`-ll:nodes`).
    pub nodes: u32,
    /// Application processors per node (`-ll:cpu`).
    pub cpus_per_node: u32,
    /// System memories per node. Placement requires exactly one.
    pub system_memories_per_node: u32,
    /// Leaf tasks a processor runs at once.
    pub processor_slots: usize,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    /// Log file path
    pub file: PathBuf,
}
