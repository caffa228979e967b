//! CLI command implementations.
//!
//! # Command Modules
//!
//! - [`config`] - Configuration management (path, init, show)
//! - [`run`] - Run the benchmark
//! - [`topology`] - Show the simulated machine and placement

pub mod config;
pub mod run;
pub mod topology;
