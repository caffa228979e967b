//! The runtime handle and task execution pipeline.
//!
//! Every launched task becomes a tokio task that walks the same pipeline:
//!
//! 1. wait for the operations it depends on
//! 2. ask the target processor's mapper to map its regions
//! 3. materialise instances (copying through codecs where needed)
//! 4. take a processor slot if it is a leaf
//! 5. run the body with a fresh [`TaskContext`]
//! 6. wait for every child operation the body issued
//!
//! A failure anywhere fails the task's completion, and with it every
//! operation that depends on it. Fatal failures also latch the runtime's
//! abort token so nothing new starts.

use super::context::TaskContext;
use super::error::RuntimeError;
use super::forest::{MapRequest, RegionForest};
use super::future::{completion_of, run_blocking, Completion, Outcome, TaskFuture};
use super::launcher::TaskArgument;
use super::processor_pool::ProcessorPool;
use super::task::{TaskId, TaskInfo, TaskRegistry, TaskVariant};
use super::telemetry::{EventSink, IndexLaunchId, RuntimeEvent};
use crate::machine::{Machine, MemoryId, ProcessorId, ProcessorKind};
use crate::mapper::{Mapper, MapperRegistry, PlacementDecision, RegionMapping};
use crate::region::{Coherence, PhysicalRegion, RegionTreeId};
use std::any::Any;
use std::sync::atomic::AtomicU64;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// A task ready to be spawned: resolved, validated and placed.
pub(crate) struct PreparedTask {
    pub variant: TaskVariant,
    pub info: TaskInfo,
    pub args: TaskArgument,
    pub local_args: TaskArgument,
    pub mappings: Vec<RegionMapping>,
    pub preconditions: Vec<Completion>,
    pub target: ProcessorId,
    pub profile: bool,
    pub index_launch: Option<IndexLaunchId>,
}

pub(crate) struct RuntimeInner {
    pub machine: Arc<Machine>,
    pub tasks: TaskRegistry,
    pub mappers: MapperRegistry,
    pub forest: RegionForest,
    pub pool: ProcessorPool,
    pub sink: Arc<dyn EventSink>,
    pub input_args: Vec<String>,
    pub top_level: TaskId,
    pub abort: CancellationToken,
    pub failure: Mutex<Option<RuntimeError>>,
    pub index_launches: AtomicU64,
}

/// Handle to a running region runtime. Cheap to clone.
#[derive(Clone)]
pub struct Runtime {
    inner: Arc<RuntimeInner>,
}

impl Runtime {
    pub(crate) fn from_inner(inner: RuntimeInner) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    pub(crate) fn inner(&self) -> &RuntimeInner {
        &self.inner
    }

    pub fn machine(&self) -> &Arc<Machine> {
        &self.inner.machine
    }

    /// Raw input arguments the runtime was started with.
    pub fn input_args(&self) -> &[String] {
        &self.inner.input_args
    }

    pub fn is_aborted(&self) -> bool {
        self.inner.abort.is_cancelled()
    }

    /// First fatal error recorded, if any.
    pub fn failure(&self) -> Option<RuntimeError> {
        self.inner.failure.lock().ok().and_then(|f| f.clone())
    }

    pub(crate) fn abort(&self, error: &RuntimeError) {
        if let Ok(mut failure) = self.inner.failure.lock() {
            if failure.is_none() {
                tracing::error!(error = %error, "Fatal runtime error, aborting");
                *failure = Some(error.clone());
            }
        }
        self.inner.abort.cancel();
        self.inner.pool.close();
    }

    pub(crate) fn check_not_aborted(&self) -> Result<(), RuntimeError> {
        if self.is_aborted() {
            let reason = self
                .failure()
                .map(|e| e.to_string())
                .unwrap_or_else(|| "aborted".to_string());
            return Err(RuntimeError::Aborted(reason));
        }
        Ok(())
    }

    pub(crate) fn mapper(&self, processor: ProcessorId) -> Result<Arc<dyn Mapper>, RuntimeError> {
        self.inner.mappers.get(processor)
    }

    // =========================================================================
    // Top-level entry
    // =========================================================================

    /// Launches the top-level task on the first application processor of
    /// node 0.
    pub fn launch_top_level(&self) -> Result<TaskFuture, RuntimeError> {
        self.check_not_aborted()?;
        let variant = self.inner.tasks.get(self.inner.top_level)?.clone();
        let proc = self
            .inner
            .machine
            .processors()
            .iter()
            .find(|p| p.node == 0 && p.kind == ProcessorKind::LocProc)
            .map(|p| p.id)
            .ok_or_else(|| RuntimeError::invariant("node 0 has no application processor"))?;

        let info = TaskInfo {
            task_id: variant.id(),
            name: variant.name().to_string(),
            leaf: variant.is_leaf(),
            index_point: None,
            index_domain: None,
            parent_processor: None,
            regions: Vec::new(),
        };
        let options = self.mapper(proc)?.select_task_options(&info);
        check_variant_kind(self.machine(), &variant, options.target_proc)?;

        tracing::info!(task = %info.name, processor = %options.target_proc, "Starting top-level task");
        let completion = self.spawn_task(PreparedTask {
            variant,
            info,
            args: TaskArgument::none(),
            local_args: TaskArgument::none(),
            mappings: Vec::new(),
            preconditions: Vec::new(),
            target: options.target_proc,
            profile: options.profile_task,
            index_launch: None,
        });
        Ok(TaskFuture::new(completion))
    }

    /// Runs the top-level task to completion and returns its value as `T`.
    ///
    /// Regions the application never destroyed are reclaimed afterwards so
    /// that every stored value goes back through its codec.
    pub async fn start<T: Any + Clone>(&self) -> Result<T, RuntimeError> {
        let future = self.launch_top_level()?;
        let result = future.get::<T>().await;
        self.reclaim_leaked_regions();
        match (result, self.failure()) {
            (Ok(_), Some(fatal)) => Err(fatal),
            (result, _) => result,
        }
    }

    fn reclaim_leaked_regions(&self) {
        for tree in self.inner.forest.live_trees() {
            tracing::warn!(tree = %tree, "Region leaked by application, destroying");
            if let Err(e) = self.inner.forest.destroy_tree(tree) {
                tracing::error!(tree = %tree, error = %e, "Failed to reclaim region");
            }
        }
    }

    // =========================================================================
    // Spawning
    // =========================================================================

    pub(crate) fn spawn_task(&self, task: PreparedTask) -> Completion {
        self.inner.sink.emit(RuntimeEvent::TaskLaunched {
            task_id: task.info.task_id,
            name: task.info.name.clone(),
            point: task.info.index_point,
            index_launch: task.index_launch,
        });
        let name = task.info.name.clone();
        let runtime = self.clone();
        let handle = tokio::spawn(async move {
            let result = runtime.run_task(task).await;
            runtime.note_failure(&result);
            result
        });
        completion_of(name, handle)
    }

    /// Spawns a runtime operation (acquire, release, destroy) ordered after
    /// `preconditions`.
    pub(crate) fn spawn_operation<F>(&self, name: &str, preconditions: Vec<Completion>, op: F) -> Completion
    where
        F: FnOnce(&Runtime) -> Result<(), RuntimeError> + Send + 'static,
    {
        let runtime = self.clone();
        let op_name = name.to_string();
        let handle = tokio::spawn(async move {
            let result: Outcome = async {
                for pre in preconditions {
                    pre.await?;
                }
                runtime.check_not_aborted()?;
                // Release flushes copy through the codec.
                let op_runtime = runtime.clone();
                run_blocking(&op_name, move || op(&op_runtime)).await?;
                Ok(Arc::new(()) as Arc<dyn Any + Send + Sync>)
            }
            .await;
            runtime.note_failure(&result);
            result
        });
        completion_of(name.to_string(), handle)
    }

    fn note_failure(&self, result: &Outcome) {
        if let Err(e) = result {
            if e.is_fatal() {
                self.abort(e);
            }
        }
    }

    async fn run_task(&self, task: PreparedTask) -> Outcome {
        for pre in &task.preconditions {
            pre.clone().await?;
        }
        self.check_not_aborted()?;

        let PreparedTask {
            variant,
            info,
            args,
            local_args,
            mut mappings,
            target,
            profile,
            index_launch,
            ..
        } = task;

        self.mapper(target)?.map_task(&info, target, &mut mappings)?;

        // Materialising may copy the whole collection through the codec.
        let runtime = self.clone();
        let mapped_info = info.clone();
        let Materialized {
            regions,
            decisions,
            restrictions,
        } = run_blocking(&info.name, move || runtime.materialize(&mapped_info, target, &mappings)).await?;
        self.inner.sink.emit(RuntimeEvent::TaskMapped {
            name: info.name.clone(),
            point: info.index_point,
            processor: target,
            decisions,
        });

        let permit = if variant.is_leaf() {
            Some(self.inner.pool.acquire(target).await?)
        } else {
            None
        };

        self.inner.sink.emit(RuntimeEvent::TaskStarted {
            name: info.name.clone(),
            point: info.index_point,
            processor: target,
            index_launch,
        });
        let started = Instant::now();

        let name = info.name.clone();
        let point = info.index_point;
        let leaf = variant.is_leaf();
        let mut ctx = TaskContext::new(self.clone(), info, target, regions, args, local_args, leaf);
        let body = variant.body();
        let result = body.execute(&mut ctx).await;
        drop(permit);
        let drained = ctx.finish().await;
        drop(ctx);

        for (tree, memory) in restrictions {
            self.inner.forest.unrestrict(tree, memory)?;
        }

        let duration = started.elapsed();
        if profile {
            tracing::info!(task = %name, point = ?point, duration_us = duration.as_micros() as u64, "Task profile");
        }
        let outcome = match (result, drained) {
            (Ok(value), Ok(())) => Ok(Arc::<dyn Any + Send + Sync>::from(value)),
            (Err(e), _) | (Ok(_), Err(e)) => Err(e),
        };
        self.inner.sink.emit(RuntimeEvent::TaskCompleted {
            name,
            point,
            processor: target,
            index_launch,
            duration,
            success: outcome.is_ok(),
        });
        outcome
    }

    /// Maps every region of a task onto an instance in the memory its mapper
    /// picked, copying data in where that memory is stale.
    fn materialize(
        &self,
        info: &TaskInfo,
        target: ProcessorId,
        mappings: &[RegionMapping],
    ) -> Result<Materialized, RuntimeError> {
        let mut materialized = Materialized {
            regions: Vec::with_capacity(mappings.len()),
            decisions: Vec::with_capacity(mappings.len()),
            restrictions: Vec::new(),
        };
        for (index, mapping) in mappings.iter().enumerate() {
            if mapping.virtual_map {
                return Err(RuntimeError::invariant(format!(
                    "{} region {} was virtually mapped",
                    info.name, index
                )));
            }
            let requirement = &mapping.requirement;
            let layout = mapping.layout();
            let mapped = self.inner.forest.map_region(MapRequest {
                region: mapping.region,
                privilege: requirement.privilege,
                coherence: requirement.coherence,
                fields: &requirement.fields,
                ranking: &mapping.target_ranking,
                layout,
            })?;
            let memory = mapped.physical.memory();
            if requirement.coherence == Coherence::Simultaneous && !mapped.restricted {
                materialized.restrictions.push((mapping.region.tree, memory));
            }
            materialized.decisions.push(PlacementDecision {
                task: info.name.clone(),
                point: info.index_point,
                processor: target,
                region_index: index,
                target_memory: memory,
                layout,
                coherence: requirement.coherence,
                war_optimization: mapping.enable_war_optimization,
                reduction_list: mapping.reduction_list,
                virtual_map: mapping.virtual_map,
            });
            materialized.regions.push(mapped.physical);
        }
        Ok(materialized)
    }
}

/// Regions a task runs with, plus what its mapping decided.
struct Materialized {
    regions: Vec<PhysicalRegion>,
    decisions: Vec<PlacementDecision>,
    /// Trees this task restricted to its instance, cleared when it finishes.
    restrictions: Vec<(RegionTreeId, MemoryId)>,
}

/// Fails unless `variant` can run on the kind of processor `target` is.
pub(crate) fn check_variant_kind(
    machine: &Machine,
    variant: &TaskVariant,
    target: ProcessorId,
) -> Result<(), RuntimeError> {
    let kind = machine
        .processor(target)
        .map(|p| p.kind)
        .ok_or_else(|| RuntimeError::invariant(format!("mapper chose unknown {}", target)))?;
    if kind != variant.kind() {
        return Err(RuntimeError::NoVariant {
            task: variant.id(),
            kind,
        });
    }
    Ok(())
}
