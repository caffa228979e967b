//! Default values for every configuration setting and the
//! `ConfigFile::default()` implementation.

use super::file::config_directory;
use super::settings::*;
use crate::machine::{DEFAULT_CPUS_PER_NODE, DEFAULT_NODES, DEFAULT_SYSTEM_MEMORIES_PER_NODE};
use crate::runtime::DEFAULT_PROCESSOR_SLOTS;
use crate::serdez::DEFAULT_TEXTURE_SIDE;

// =============================================================================
// Benchmark
// =============================================================================

/// Default collection size.
pub const DEFAULT_SIZE: i64 = 1024;

/// Default number of dispatch rounds.
pub const DEFAULT_ITERATIONS: i64 = 1;

/// Default number of partitions.
pub const DEFAULT_PARTITIONS: i64 = 4;

/// Largest accepted texture side. One element at this side is 24 MiB.
pub const MAX_TEXTURE_SIDE: usize = 1024;

// =============================================================================
// Logging
// =============================================================================

/// Default log file name inside the config directory.
pub const DEFAULT_LOG_FILE_NAME: &str = "rendermap.log";

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            benchmark: BenchmarkSettings {
                size: DEFAULT_SIZE,
                iterations: DEFAULT_ITERATIONS,
                partitions: DEFAULT_PARTITIONS,
                texture_side: DEFAULT_TEXTURE_SIDE,
            },
            machine: MachineSettings {
                nodes: DEFAULT_NODES,
                cpus_per_node: DEFAULT_CPUS_PER_NODE,
                system_memories_per_node: DEFAULT_SYSTEM_MEMORIES_PER_NODE,
                processor_slots: DEFAULT_PROCESSOR_SLOTS,
            },
            logging: LoggingSettings {
                file: config_directory().join(DEFAULT_LOG_FILE_NAME),
            },
        }
    }
}
