//! Run command - execute the rendering benchmark.

use std::path::PathBuf;

use rendermap::bench::ExecutionOrchestrator;

use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the run command.
pub struct RunArgs {
    pub config: Option<PathBuf>,
    pub debug: bool,
    /// Raw runtime and benchmark arguments.
    pub args: Vec<String>,
}

/// Run the benchmark and print its report.
pub fn run(args: RunArgs) -> Result<(), CliError> {
    let runner = CliRunner::new(args.config.as_deref(), args.debug)?;
    runner.log_startup("run");

    let orchestrator =
        ExecutionOrchestrator::from_config_file(runner.config()).with_input_args(args.args);
    let config = orchestrator.effective_config();
    tracing::info!(
        nsize = config.nsize,
        niter = config.niter,
        npar = config.npar,
        texture_side = config.texture_side,
        "Starting benchmark"
    );

    let report = runner.block_on(orchestrator.run())??;
    println!("{}", report);
    Ok(())
}
