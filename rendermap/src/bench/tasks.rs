//! The four benchmark tasks.
//!
//! ```text
//! top_level ──► init   (WRITE_DISCARD, EXCLUSIVE)   fill every slot
//!           └─► main   (READ_WRITE, SIMULTANEOUS)   acquire
//!                 └─► worker × npar × niter          (READ_ONLY, EXCLUSIVE)
//!                                                    release
//! ```

use super::config::BenchmarkConfig;
use super::phase::{Phase, PhaseTracker};
use super::report::BenchmarkReport;
use crate::partition::AliasedPartitionScheme;
use crate::region::{
    Coherence, FieldId, PhysicalRegion, Privilege, Rect1, RegionRequirement,
};
use crate::runtime::{
    run_blocking, AcquireLauncher, ArgumentMap, IndexLauncher, ReleaseLauncher, RuntimeError, Task,
    TaskArgument, TaskBody, TaskContext, TaskId, TaskLauncher, TaskValue,
};
use crate::serdez::{SerdezId, TextureObject};
use std::time::Instant;

pub const TOP_LEVEL_TASK_ID: TaskId = TaskId(0);
pub const INIT_TASK_ID: TaskId = TaskId(1);
pub const MAIN_TASK_ID: TaskId = TaskId(2);
pub const WORKER_TASK_ID: TaskId = TaskId(3);

/// The collection's only field.
pub const FID_VAL: FieldId = FieldId(0);

/// Codec id the collection's field is allocated with.
pub const SERDEZ_ID: SerdezId = SerdezId(123);

/// Per-round argument of the worker index launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerArgs {
    pub round: i64,
}

// =============================================================================
// Top-level task
// =============================================================================

/// Creates the collection, runs init and main over it, then tears it down.
///
/// Returns the main task's [`BenchmarkReport`].
pub struct TopLevelTask {
    defaults: BenchmarkConfig,
}

impl TopLevelTask {
    /// `defaults` are overridden by `-n`, `-i` and `-p` in the input args.
    pub fn new(defaults: BenchmarkConfig) -> Self {
        Self { defaults }
    }
}

impl Task for TopLevelTask {
    fn name(&self) -> &str {
        "top_level_task"
    }

    fn execute<'a>(&'a self, ctx: &'a mut TaskContext) -> TaskBody<'a> {
        Box::pin(async move {
            let config = self.defaults.with_input_args(ctx.input_args());
            tracing::debug!(
                nsize = config.nsize,
                niter = config.niter,
                npar = config.npar,
                "Benchmark configuration"
            );

            let index_space = ctx.create_index_space(Rect1::from_size(config.nsize));
            let field_space = ctx.create_field_space();
            ctx.field_allocator(field_space).allocate_field(
                std::mem::size_of::<Box<TextureObject>>(),
                FID_VAL,
                SERDEZ_ID,
            )?;
            let region = ctx.create_logical_region(index_space, field_space)?;

            let init = TaskLauncher::new(INIT_TASK_ID, TaskArgument::none()).add_region_requirement(
                RegionRequirement::region(region, Privilege::WriteDiscard, Coherence::Exclusive, region)
                    .add_field(FID_VAL),
            );
            ctx.execute_task(init)?;

            let main = TaskLauncher::new(MAIN_TASK_ID, TaskArgument::new(config)).add_region_requirement(
                RegionRequirement::region(region, Privilege::ReadWrite, Coherence::Simultaneous, region)
                    .add_field(FID_VAL),
            );
            let report = ctx.execute_task(main)?;

            ctx.destroy_logical_region(region)?;
            ctx.destroy_field_space(field_space);
            ctx.destroy_index_space(index_space);

            let report: BenchmarkReport = report.get().await?;
            Ok(Box::new(report) as TaskValue)
        })
    }
}

// =============================================================================
// Init task
// =============================================================================

/// Writes a fresh texture into every slot of its region.
pub struct InitTask {
    side: usize,
}

impl InitTask {
    pub fn new(side: usize) -> Self {
        Self { side }
    }
}

impl Task for InitTask {
    fn name(&self) -> &str {
        "init_task"
    }

    fn execute<'a>(&'a self, ctx: &'a mut TaskContext) -> TaskBody<'a> {
        Box::pin(async move {
            let (region, fid) = single_region(ctx)?;
            let region = region.clone();
            let side = self.side;
            let written = run_blocking("init_task", move || fill_textures(&region, fid, side)).await?;
            tracing::debug!(elements = written, side = self.side, "Initialized collection");
            Ok(Box::new(written) as TaskValue)
        })
    }
}

fn fill_textures(region: &PhysicalRegion, fid: FieldId, side: usize) -> Result<u64, RuntimeError> {
    let mut accessor = region.accessor::<TextureObject>(fid)?;
    let mut written = 0u64;
    for point in accessor.domain().points() {
        accessor.write(point, TextureObject::new(side))?;
        written += 1;
    }
    Ok(written)
}

// =============================================================================
// Main task
// =============================================================================

/// Acquires the collection, dispatches `niter` rounds of workers over an
/// aliasing partition and releases it again, timing the whole sequence.
pub struct MainTask;

impl Task for MainTask {
    fn name(&self) -> &str {
        "main_task"
    }

    fn execute<'a>(&'a self, ctx: &'a mut TaskContext) -> TaskBody<'a> {
        Box::pin(async move {
            let (physical, _) = single_region(ctx)?;
            let physical = physical.clone();
            let config = *ctx.args::<BenchmarkConfig>()?;
            let region = physical.logical_region();
            let domain = region.domain();

            tracing::info!(
                nsize = domain.volume(),
                niter = config.niter,
                npar = config.npar,
                "Running graph rendering"
            );

            let mut phases = PhaseTracker::new(config.niter);
            let scheme = AliasedPartitionScheme::new(config.npar)?;
            let color_space = scheme.color_space();
            let index_partition = ctx.create_index_partition(
                region.index_space,
                color_space,
                &scheme.coloring(domain),
                AliasedPartitionScheme::DISJOINT,
            )?;
            let partition = ctx.get_logical_partition(region, index_partition)?;

            let started = Instant::now();
            phases.advance(Phase::Acquire)?;
            ctx.issue_acquire(AcquireLauncher::new(region, region, &physical).add_field(FID_VAL))?;

            let mut elements_read = 0u64;
            for round in 0..config.niter {
                phases.advance(Phase::Dispatch { round })?;
                let launcher = IndexLauncher::new(
                    WORKER_TASK_ID,
                    color_space,
                    TaskArgument::new(WorkerArgs { round }),
                    ArgumentMap::new(),
                )
                .add_region_requirement(
                    RegionRequirement::partition(partition, 0, Privilege::ReadOnly, Coherence::Exclusive, region)
                        .add_field(FID_VAL),
                );
                let futures = ctx.execute_index_space(launcher)?;
                futures.wait_all_results().await?;
                for point in color_space.points() {
                    elements_read += futures.get_result::<u64>(point).await?;
                }
            }

            phases.advance(Phase::Release)?;
            ctx.issue_release(ReleaseLauncher::new(region, region, &physical).add_field(FID_VAL))?
                .wait()
                .await?;
            let elapsed = started.elapsed();
            phases.advance(Phase::Done)?;

            let report = BenchmarkReport {
                nsize: domain.volume(),
                niter: config.niter,
                npar: config.npar,
                elapsed,
                elements_read,
            };
            tracing::info!(
                elapsed_s = report.elapsed.as_secs_f64(),
                elements_read,
                "Benchmark finished"
            );
            Ok(Box::new(report) as TaskValue)
        })
    }
}

// =============================================================================
// Worker task
// =============================================================================

/// Reads every element of its view. Returns the number of elements read.
pub struct WorkerTask;

impl Task for WorkerTask {
    fn name(&self) -> &str {
        "worker_task"
    }

    fn execute<'a>(&'a self, ctx: &'a mut TaskContext) -> TaskBody<'a> {
        Box::pin(async move {
            let round = ctx.args::<WorkerArgs>()?.round;
            let node = ctx.machine().node_of(ctx.processor());
            tracing::debug!(
                node = ?node,
                point = ?ctx.index_point(),
                round,
                processor = %ctx.processor(),
                "Worker task"
            );
            let (region, fid) = single_region(ctx)?;
            let region = region.clone();
            let read = run_blocking("worker_task", move || read_textures(&region, fid)).await?;
            Ok(Box::new(read) as TaskValue)
        })
    }
}

fn read_textures(region: &PhysicalRegion, fid: FieldId) -> Result<u64, RuntimeError> {
    let accessor = region.accessor::<TextureObject>(fid)?;
    let mut read = 0u64;
    for point in accessor.domain().points() {
        let texture = accessor.read(point)?;
        std::hint::black_box(texture.texel(0, 0));
        read += 1;
    }
    Ok(read)
}

/// The task's only physical region and the only field it was granted.
fn single_region(ctx: &TaskContext) -> Result<(&PhysicalRegion, FieldId), RuntimeError> {
    let name = &ctx.task_info().name;
    if ctx.regions().len() != 1 || ctx.task_info().regions.len() != 1 {
        return Err(RuntimeError::invariant(format!(
            "{} expects exactly one region, got {}",
            name,
            ctx.regions().len()
        )));
    }
    let region = ctx.region(0)?;
    match region.privilege_fields() {
        [fid] => Ok((region, *fid)),
        fields => Err(RuntimeError::invariant(format!(
            "{} expects exactly one field, got {}",
            name,
            fields.len()
        ))),
    }
}
