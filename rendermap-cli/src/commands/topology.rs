//! Topology command - show the simulated machine and its placement.

use std::path::Path;
use std::sync::Arc;

use rendermap::bench::machine_config;
use rendermap::config::ConfigFile;
use rendermap::machine::{Machine, ProcessorKind};
use rendermap::mapper::PlacementMapper;
use rendermap::region::Layout;

use crate::error::CliError;

/// Print the machine built from config plus `args`, and the memory every
/// application processor's regions would be placed in.
pub fn run(config_path: Option<&Path>, args: &[String]) -> Result<(), CliError> {
    let config = match config_path {
        Some(path) => ConfigFile::load_from(path)?,
        None => ConfigFile::load()?,
    };
    let machine = Arc::new(Machine::build(
        &machine_config(&config.machine).with_input_args(args),
    ));

    print!("{}", machine);
    println!();
    println!("Placement");
    println!("=========");

    let procs = machine.processors_of_kind(ProcessorKind::LocProc);
    let Some(first) = procs.first() else {
        println!("  (no application processors)");
        return Ok(());
    };
    let mapper = PlacementMapper::new(Arc::clone(&machine), *first)?;

    for proc in procs {
        match mapper.system_memory(proc) {
            Some(memory) => {
                let affinity = machine.affinity(proc, memory);
                println!(
                    "  {} -> {} ({}, bandwidth {}, latency {})",
                    proc,
                    memory,
                    Layout::StructureOfArrays,
                    affinity.map(|a| a.bandwidth).unwrap_or(0),
                    affinity.map(|a| a.latency).unwrap_or(0),
                );
            }
            None => println!("  {} -> (no system memory)", proc),
        }
    }
    Ok(())
}
