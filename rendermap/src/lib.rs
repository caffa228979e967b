//! rendermap - placement-governed rendering benchmark over a region runtime
//!
//! This library drives a partition-parallel "rendering" workload on top of a
//! small in-process region runtime. The interesting pieces are:
//!
//! - [`serdez`]: the codec contract for opaque, heap-owned element values
//! - [`mapper`]: the placement policy choosing memory and layout per task
//! - [`partition`]: the aliasing partition scheme handing views to workers
//! - [`bench`]: the acquire / dispatch / release orchestration and timing
//!
//! The [`runtime`] module is the region runtime those pieces plug into:
//! task registration, region trees, physical instances, futures and the
//! acquire/release coherence protocol.
//!
//! # Example
//!
//! ```ignore
//! use rendermap::bench::{BenchmarkConfig, ExecutionOrchestrator};
//! use rendermap::machine::MachineConfig;
//!
//! let orchestrator = ExecutionOrchestrator::new(BenchmarkConfig::default(), MachineConfig::default())
//!     .with_input_args(vec!["-n".into(), "256".into(), "-p".into(), "8".into()]);
//! let report = orchestrator.run().await?;
//! println!("{}", report);
//! ```

pub mod args;
pub mod bench;
pub mod config;
pub mod logging;
pub mod machine;
pub mod mapper;
pub mod partition;
pub mod region;
pub mod runtime;
pub mod serdez;
pub mod transfer;

/// Version of the rendermap library and CLI.
///
/// This is synchronized across all components in the workspace.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
