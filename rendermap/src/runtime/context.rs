//! The API a running task body sees.

use super::core::{check_variant_kind, PreparedTask, Runtime};
use super::dependence::{AccessKind, DependenceTracker};
use super::error::RuntimeError;
use super::forest::RegionForest;
use super::future::{join_completions, Completion, FutureMap, OperationHandle, TaskFuture};
use super::launcher::{AcquireLauncher, IndexLauncher, ReleaseLauncher, TaskArgument, TaskLauncher};
use super::task::{TaskId, TaskInfo, TaskVariant};
use super::telemetry::IndexLaunchId;
use crate::machine::{Machine, MemoryId, ProcessorId};
use crate::mapper::RegionMapping;
use crate::partition::DomainColoring;
use crate::region::{
    Coherence, FieldId, FieldInfo, FieldSpace, IndexPartition, IndexSpace, LogicalPartition,
    LogicalRegion, PhysicalRegion, Point1, Rect1, RegionRequirement, RegionTarget, RegionTreeId,
};
use crate::serdez::SerdezId;
use std::any::Any;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// Allocates fields in one field space.
pub struct FieldAllocator<'a> {
    forest: &'a RegionForest,
    space: FieldSpace,
}

impl FieldAllocator<'_> {
    /// Allocates `fid` with elements of `size` bytes stored through the
    /// codec registered as `serdez`.
    pub fn allocate_field(&self, size: usize, fid: FieldId, serdez: SerdezId) -> Result<FieldId, RuntimeError> {
        self.forest
            .allocate_field(self.space, fid, FieldInfo { size, serdez })
    }
}

/// Execution context of one task instance.
///
/// Operations issued through the context are ordered against each other per
/// region tree and awaited before the task is considered complete.
pub struct TaskContext {
    runtime: Runtime,
    info: TaskInfo,
    processor: ProcessorId,
    regions: Vec<PhysicalRegion>,
    args: TaskArgument,
    local_args: TaskArgument,
    leaf: bool,
    deps: DependenceTracker,
    children: Vec<Completion>,
    created_trees: HashSet<RegionTreeId>,
    acquired: HashSet<RegionTreeId>,
}

impl TaskContext {
    pub(crate) fn new(
        runtime: Runtime,
        info: TaskInfo,
        processor: ProcessorId,
        regions: Vec<PhysicalRegion>,
        args: TaskArgument,
        local_args: TaskArgument,
        leaf: bool,
    ) -> Self {
        Self {
            runtime,
            info,
            processor,
            regions,
            args,
            local_args,
            leaf,
            deps: DependenceTracker::new(),
            children: Vec::new(),
            created_trees: HashSet::new(),
            acquired: HashSet::new(),
        }
    }

    // =========================================================================
    // Task metadata
    // =========================================================================

    pub fn processor(&self) -> ProcessorId {
        self.processor
    }

    pub fn task_info(&self) -> &TaskInfo {
        &self.info
    }

    pub fn index_point(&self) -> Option<Point1> {
        self.info.index_point
    }

    pub fn machine(&self) -> &Arc<Machine> {
        self.runtime.machine()
    }

    pub fn input_args(&self) -> &[String] {
        self.runtime.input_args()
    }

    /// Physical regions, in requirement order.
    pub fn regions(&self) -> &[PhysicalRegion] {
        &self.regions
    }

    pub fn region(&self, index: usize) -> Result<&PhysicalRegion, RuntimeError> {
        self.regions.get(index).ok_or_else(|| {
            RuntimeError::invariant(format!(
                "{} has {} region(s), asked for #{}",
                self.info.name,
                self.regions.len(),
                index
            ))
        })
    }

    /// The launcher's argument, which must be a `T`.
    pub fn args<T: Any>(&self) -> Result<&T, RuntimeError> {
        self.args.get::<T>().ok_or_else(|| {
            RuntimeError::invariant(format!(
                "{} expected a {} argument",
                self.info.name,
                std::any::type_name::<T>()
            ))
        })
    }

    /// This point's entry of the index launch argument map.
    pub fn local_args<T: Any>(&self) -> Result<&T, RuntimeError> {
        self.local_args.get::<T>().ok_or_else(|| {
            RuntimeError::invariant(format!(
                "{} expected a {} point argument",
                self.info.name,
                std::any::type_name::<T>()
            ))
        })
    }

    fn forest(&self) -> &RegionForest {
        &self.runtime.inner().forest
    }

    // =========================================================================
    // Region forest
    // =========================================================================

    pub fn create_index_space(&mut self, domain: Rect1) -> IndexSpace {
        self.forest().create_index_space(domain)
    }

    pub fn create_field_space(&mut self) -> FieldSpace {
        self.forest().create_field_space()
    }

    pub fn field_allocator(&self, space: FieldSpace) -> FieldAllocator<'_> {
        FieldAllocator {
            forest: self.forest(),
            space,
        }
    }

    /// Creates a region tree. This task holds full privileges on it until
    /// it destroys it.
    pub fn create_logical_region(&mut self, index_space: IndexSpace, field_space: FieldSpace) -> Result<LogicalRegion, RuntimeError> {
        let region = self.forest().create_logical_region(index_space, field_space)?;
        self.created_trees.insert(region.tree);
        tracing::debug!(task = %self.info.name, region = %region, "Created logical region");
        Ok(region)
    }

    pub fn create_index_partition(
        &mut self,
        parent: IndexSpace,
        color_space: Rect1,
        coloring: &DomainColoring,
        disjoint: bool,
    ) -> Result<IndexPartition, RuntimeError> {
        self.forest()
            .create_index_partition(parent, color_space, coloring, disjoint)
    }

    pub fn get_logical_partition(&self, parent: LogicalRegion, partition: IndexPartition) -> Result<LogicalPartition, RuntimeError> {
        if partition.parent.id != parent.index_space.id {
            return Err(RuntimeError::invariant(format!(
                "{} does not partition {}",
                partition.id, parent
            )));
        }
        Ok(LogicalPartition {
            tree: parent.tree,
            index_partition: partition,
            field_space: parent.field_space,
        })
    }

    pub fn get_logical_subregion_by_color(&self, partition: LogicalPartition, color: Point1) -> Result<LogicalRegion, RuntimeError> {
        let index_space = self.forest().subspace(partition.index_partition, color)?;
        Ok(LogicalRegion {
            tree: partition.tree,
            index_space,
            field_space: partition.field_space,
        })
    }

    /// Destroys a region this task created, once every earlier operation on
    /// it has finished. All stored values go through their codec's destroy.
    pub fn destroy_logical_region(&mut self, region: LogicalRegion) -> Result<OperationHandle, RuntimeError> {
        if !self.created_trees.remove(&region.tree) {
            return Err(RuntimeError::invariant(format!(
                "{} did not create {}",
                self.info.name, region
            )));
        }
        let tree = region.tree;
        let preconditions = self.deps.preconditions(tree, AccessKind::Write);
        let completion = self.runtime.spawn_operation("destroy region", preconditions, move |rt| {
            let destroyed = rt.inner().forest.destroy_tree(tree)?;
            tracing::debug!(tree = %tree, values = destroyed, "Destroyed region tree");
            Ok(())
        });
        Ok(self.track(tree, AccessKind::Write, completion))
    }

    /// Destroys a field space after every operation issued so far.
    pub fn destroy_field_space(&mut self, space: FieldSpace) -> OperationHandle {
        let after = self.children.clone();
        let completion = self.runtime.spawn_operation("destroy field space", after, move |rt| {
            rt.inner().forest.destroy_field_space(space)
        });
        self.children.push(completion.clone());
        OperationHandle::new(completion)
    }

    /// Destroys an index space after every operation issued so far.
    pub fn destroy_index_space(&mut self, space: IndexSpace) -> OperationHandle {
        let after = self.children.clone();
        let completion = self.runtime.spawn_operation("destroy index space", after, move |rt| {
            rt.inner().forest.destroy_index_space(space)
        });
        self.children.push(completion.clone());
        OperationHandle::new(completion)
    }

    // =========================================================================
    // Launches
    // =========================================================================

    /// Launches one task instance.
    pub fn execute_task(&mut self, launcher: TaskLauncher) -> Result<TaskFuture, RuntimeError> {
        self.check_can_launch()?;
        let variant = self.variant(launcher.task_id)?;
        if !variant.is_single() {
            return Err(RuntimeError::invariant(format!(
                "{} has no single-task variant",
                variant.name()
            )));
        }

        let mut mappings = Vec::with_capacity(launcher.requirements.len());
        for req in &launcher.requirements {
            self.check_privileges(req)?;
            mappings.push(RegionMapping::new(req.clone(), self.resolve(req, None)?));
        }

        let info = TaskInfo {
            task_id: variant.id(),
            name: variant.name().to_string(),
            leaf: variant.is_leaf(),
            index_point: None,
            index_domain: None,
            parent_processor: Some(self.processor),
            regions: launcher.requirements.clone(),
        };
        let options = self.runtime.mapper(self.processor)?.select_task_options(&info);
        check_variant_kind(self.machine(), &variant, options.target_proc)?;

        let preconditions = self.preconditions_for(&launcher.requirements);
        let completion = self.runtime.spawn_task(PreparedTask {
            variant,
            info,
            args: launcher.argument,
            local_args: TaskArgument::none(),
            mappings,
            preconditions,
            target: options.target_proc,
            profile: options.profile_task,
            index_launch: None,
        });
        self.record(&launcher.requirements, &completion);
        self.children.push(completion.clone());
        Ok(TaskFuture::new(completion))
    }

    /// Launches one task instance per point of the launch domain.
    ///
    /// Partition requirements resolve to the subregion whose color equals
    /// the point. Every point is validated before any is spawned.
    pub fn execute_index_space(&mut self, launcher: IndexLauncher) -> Result<FutureMap, RuntimeError> {
        self.check_can_launch()?;
        let variant = self.variant(launcher.task_id)?;
        if !variant.is_index() {
            return Err(RuntimeError::invariant(format!(
                "{} has no index-space variant",
                variant.name()
            )));
        }

        for req in &launcher.requirements {
            self.check_privileges(req)?;
            if let RegionTarget::Partition { partition, .. } = req.target {
                if req.privilege.writes() && !partition.index_partition.disjoint {
                    return Err(RuntimeError::invariant(format!(
                        "{} writes through aliased {}; point tasks would interfere",
                        variant.name(),
                        partition
                    )));
                }
            }
        }

        let domain = launcher.launch_domain;
        let launch = IndexLaunchId::next(&self.runtime.inner().index_launches);
        let mapper = self.runtime.mapper(self.processor)?;
        let preconditions = self.preconditions_for(&launcher.requirements);

        let mut prepared = Vec::with_capacity(domain.volume() as usize);
        for point in domain.points() {
            let mut mappings = Vec::with_capacity(launcher.requirements.len());
            for req in &launcher.requirements {
                mappings.push(RegionMapping::new(req.clone(), self.resolve(req, Some(point))?));
            }
            let info = TaskInfo {
                task_id: variant.id(),
                name: variant.name().to_string(),
                leaf: variant.is_leaf(),
                index_point: Some(point),
                index_domain: Some(domain),
                parent_processor: Some(self.processor),
                regions: launcher.requirements.clone(),
            };
            let options = mapper.select_task_options(&info);
            check_variant_kind(self.machine(), &variant, options.target_proc)?;
            prepared.push((point, PreparedTask {
                variant: variant.clone(),
                info,
                args: launcher.global_argument.clone(),
                local_args: launcher.argument_map.get(point),
                mappings,
                preconditions: preconditions.clone(),
                target: options.target_proc,
                profile: options.profile_task,
                index_launch: Some(launch),
            }));
        }

        tracing::debug!(
            task = %variant.name(),
            launch = %launch,
            points = prepared.len(),
            "Index launch"
        );
        let points: BTreeMap<Point1, Completion> = prepared
            .into_iter()
            .map(|(point, task)| (point, self.runtime.spawn_task(task)))
            .collect();

        let whole = join_completions(points.values().cloned().collect());
        self.record(&launcher.requirements, &whole);
        self.children.push(whole);
        Ok(FutureMap::new(points))
    }

    // =========================================================================
    // Coherence
    // =========================================================================

    /// Lifts the simultaneous restriction on a region this task holds, so
    /// sub-tasks may map it wherever their mapper chooses.
    pub fn issue_acquire(&mut self, launcher: AcquireLauncher) -> Result<OperationHandle, RuntimeError> {
        self.check_can_launch()?;
        self.check_coherence_target(&launcher.region, &launcher.parent, launcher.memory, &launcher.fields)?;
        let tree = launcher.region.tree;
        if !self.acquired.insert(tree) {
            return Err(RuntimeError::invariant(format!(
                "{} acquired twice by {}",
                launcher.region, self.info.name
            )));
        }

        let memory = launcher.memory;
        let preconditions = self.deps.preconditions(tree, AccessKind::Write);
        let completion = self
            .runtime
            .spawn_operation("acquire", preconditions, move |rt| rt.inner().forest.acquire(tree, memory));
        Ok(self.track(tree, AccessKind::Write, completion))
    }

    /// Ends an acquire, flushing newer data back into the held instance once
    /// every earlier operation on the region has finished.
    pub fn issue_release(&mut self, launcher: ReleaseLauncher) -> Result<OperationHandle, RuntimeError> {
        self.check_can_launch()?;
        self.check_coherence_target(&launcher.region, &launcher.parent, launcher.memory, &launcher.fields)?;
        let tree = launcher.region.tree;
        if !self.acquired.remove(&tree) {
            return Err(RuntimeError::invariant(format!(
                "release of {} without a matching acquire",
                launcher.region
            )));
        }

        let memory = launcher.memory;
        let fields = launcher.fields;
        let preconditions = self.deps.preconditions(tree, AccessKind::Write);
        let completion = self.runtime.spawn_operation("release", preconditions, move |rt| {
            let flushed = rt.inner().forest.release(tree, memory, &fields)?;
            tracing::debug!(tree = %tree, flushed, "Released region");
            Ok(())
        });
        Ok(self.track(tree, AccessKind::Write, completion))
    }

    fn check_coherence_target(
        &self,
        region: &LogicalRegion,
        parent: &LogicalRegion,
        memory: MemoryId,
        fields: &[FieldId],
    ) -> Result<(), RuntimeError> {
        if region.tree != parent.tree {
            return Err(RuntimeError::invariant(format!(
                "{} is not in the tree of {}",
                region, parent
            )));
        }
        if fields.is_empty() {
            return Err(RuntimeError::invariant(format!("coherence operation on {} names no fields", region)));
        }
        let held = self
            .regions
            .iter()
            .zip(&self.info.regions)
            .find(|(physical, req)| {
                physical.logical_region() == *parent
                    && physical.memory() == memory
                    && req.coherence == Coherence::Simultaneous
            })
            .map(|(physical, _)| physical)
            .ok_or_else(|| {
                RuntimeError::invariant(format!(
                    "{} does not hold {} with simultaneous coherence in {}",
                    self.info.name, parent, memory
                ))
            })?;
        if let Some(fid) = fields.iter().find(|f| !held.privilege_fields().contains(f)) {
            return Err(RuntimeError::invariant(format!(
                "{} holds no privilege on {} of {}",
                self.info.name, fid, parent
            )));
        }
        Ok(())
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn check_can_launch(&self) -> Result<(), RuntimeError> {
        self.runtime.check_not_aborted()?;
        if self.leaf {
            return Err(RuntimeError::invariant(format!(
                "leaf task {} may not issue operations",
                self.info.name
            )));
        }
        Ok(())
    }

    fn variant(&self, id: TaskId) -> Result<TaskVariant, RuntimeError> {
        Ok(self.runtime.inner().tasks.get(id)?.clone())
    }

    /// A requirement must name fields of its tree and derive its privilege
    /// from a region this task created or holds with at least as much
    /// privilege on every requested field.
    fn check_privileges(&self, req: &RegionRequirement) -> Result<(), RuntimeError> {
        match req.target {
            RegionTarget::Region(region) => {
                if region.tree != req.parent.tree || !req.parent.domain().contains_rect(&region.domain()) {
                    return Err(RuntimeError::invariant(format!(
                        "{} is not a subregion of {}",
                        region, req.parent
                    )));
                }
            }
            RegionTarget::Partition { partition, .. } => {
                if partition.tree != req.parent.tree
                    || partition.index_partition.parent.id != req.parent.index_space.id
                {
                    return Err(RuntimeError::invariant(format!(
                        "{} does not partition {}",
                        partition, req.parent
                    )));
                }
            }
        }
        if req.fields.is_empty() {
            return Err(RuntimeError::invariant(format!(
                "requirement on {} names no fields",
                req.parent
            )));
        }
        for fid in &req.fields {
            self.forest().field_info(req.parent.field_space, *fid)?;
        }

        if self.created_trees.contains(&req.parent.tree) {
            return Ok(());
        }
        let held = self.regions.iter().any(|physical| {
            physical.logical_region() == req.parent
                && physical.privilege().subsumes(req.privilege)
                && req.fields.iter().all(|f| physical.privilege_fields().contains(f))
        });
        if !held {
            return Err(RuntimeError::invariant(format!(
                "{} lacks {} privilege on {} for the requested fields",
                self.info.name, req.privilege, req.parent
            )));
        }
        Ok(())
    }

    fn resolve(&self, req: &RegionRequirement, point: Option<Point1>) -> Result<LogicalRegion, RuntimeError> {
        match req.target {
            RegionTarget::Region(region) => Ok(region),
            RegionTarget::Partition {
                partition,
                projection,
            } => {
                if projection != 0 {
                    return Err(RuntimeError::invariant(format!(
                        "unknown projection functor {}",
                        projection
                    )));
                }
                let point = point.ok_or_else(|| {
                    RuntimeError::invariant(format!(
                        "partition requirement on {} outside an index launch",
                        partition
                    ))
                })?;
                self.get_logical_subregion_by_color(partition, point)
            }
        }
    }

    fn access_kind(req: &RegionRequirement) -> AccessKind {
        if req.privilege.writes() {
            AccessKind::Write
        } else {
            AccessKind::Read
        }
    }

    fn preconditions_for(&self, requirements: &[RegionRequirement]) -> Vec<Completion> {
        requirements
            .iter()
            .flat_map(|req| self.deps.preconditions(req.tree(), Self::access_kind(req)))
            .collect()
    }

    fn record(&mut self, requirements: &[RegionRequirement], completion: &Completion) {
        for req in requirements {
            self.deps
                .record(req.tree(), Self::access_kind(req), completion.clone());
        }
    }

    fn track(&mut self, tree: RegionTreeId, kind: AccessKind, completion: Completion) -> OperationHandle {
        self.deps.record(tree, kind, completion.clone());
        self.children.push(completion.clone());
        OperationHandle::new(completion)
    }

    /// Waits for every operation this task issued. Fails with the first
    /// child failure, or if the task left a region acquired.
    pub(crate) async fn finish(&mut self) -> Result<(), RuntimeError> {
        let children = std::mem::take(&mut self.children);
        let outcomes = futures::future::join_all(children).await;
        if let Some(e) = outcomes.into_iter().find_map(Result::err) {
            return Err(e);
        }
        if !self.acquired.is_empty() {
            return Err(RuntimeError::invariant(format!(
                "{} finished with {} region(s) still acquired",
                self.info.name,
                self.acquired.len()
            )));
        }
        for tree in &self.created_trees {
            tracing::warn!(task = %self.info.name, tree = %tree, "Task finished without destroying its region");
        }
        Ok(())
    }
}
