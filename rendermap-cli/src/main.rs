//! rendermap CLI - Command-line interface
//!
//! This binary runs the rendering benchmark and inspects the simulated
//! machine and configuration it runs on.

mod commands;
mod error;
mod runner;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use commands::config::ConfigCommands;

#[derive(Parser)]
#[command(name = "rendermap")]
#[command(version = rendermap::VERSION)]
#[command(about = "Placement-governed rendering benchmark over a simulated region runtime", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the benchmark
    ///
    /// Everything after the options is handed to the runtime unchanged:
    /// -n <size>, -i <iterations>, -p <partitions>, -ll:cpu <count> and
    /// -ll:nodes <count> are recognised, anything else passes through.
    Run {
        /// Config file to use instead of ~/.rendermap/config.ini
        #[arg(long)]
        config: Option<PathBuf>,

        /// Enable debug logging and mirror log output to the terminal
        #[arg(long)]
        debug: bool,

        /// Runtime and benchmark arguments
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Show the simulated machine and where each processor places data
    Topology {
        /// Config file to use instead of ~/.rendermap/config.ini
        #[arg(long)]
        config: Option<PathBuf>,

        /// Runtime arguments (-ll:cpu, -ll:nodes)
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            config,
            debug,
            args,
        } => commands::run::run(commands::run::RunArgs {
            config,
            debug,
            args,
        }),
        Commands::Topology { config, args } => commands::topology::run(config.as_deref(), &args),
        Commands::Config { command } => commands::config::run(command),
    };

    if let Err(e) = result {
        e.exit();
    }
}
