//! The partition-parallel rendering benchmark.
//!
//! A collection of `nsize` textures is created and filled, then the main task
//! acquires it and runs `niter` rounds of `npar` read-only workers, each over
//! an aliasing view spanning the whole collection, before releasing it. The
//! time from acquire to completed release is the benchmark result.
//!
//! # Phases
//!
//! | Phase      | What happens                                           |
//! |------------|--------------------------------------------------------|
//! | `INIT`     | region created, init task writes every slot            |
//! | `ACQUIRE`  | partition built, clock started, acquire issued         |
//! | `DISPATCH` | one index launch of workers, waited on (× `niter`)     |
//! | `RELEASE`  | release issued and waited on                           |
//! | `DONE`     | clock stopped, report returned, region torn down       |

mod config;
mod error;
mod orchestrator;
mod phase;
mod report;
mod tasks;

pub use config::BenchmarkConfig;
pub use error::BenchmarkError;
pub use orchestrator::{machine_config, ExecutionOrchestrator};
pub use phase::{Phase, PhaseTracker};
pub use report::BenchmarkReport;
pub use tasks::{
    InitTask, MainTask, TopLevelTask, WorkerArgs, WorkerTask, FID_VAL, INIT_TASK_ID, MAIN_TASK_ID,
    SERDEZ_ID, TOP_LEVEL_TASK_ID, WORKER_TASK_ID,
};
