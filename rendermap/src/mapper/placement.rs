//! Placement policy for the rendering workload.
//!
//! Every region of every task is placed in the one system memory visible to
//! the task's processor, laid out fully contiguous, with every hazard
//! optimisation disabled.

use super::default::DefaultMapper;
use super::registry::MapperRegistry;
use super::traits::Mapper;
use super::types::{RegionMapping, TaskOptions};
use crate::machine::{Machine, MemoryId, ProcessorId, ProcessorKind};
use crate::runtime::{RuntimeError, TaskInfo};
use std::collections::HashMap;
use std::sync::Arc;

/// Mapper pinning every region to its processor's system memory.
///
/// Composes a delegate (the [`DefaultMapper`] unless given another) and
/// overrides its answers. The system memory of every processor is resolved
/// once at construction; a machine where some application processor does not
/// see exactly one system memory is rejected there, before any task runs.
pub struct PlacementMapper {
    delegate: Box<dyn Mapper>,
    system_memory: HashMap<ProcessorId, MemoryId>,
}

impl PlacementMapper {
    /// Creates the mapper for `local` over a default delegate.
    pub fn new(machine: Arc<Machine>, local: ProcessorId) -> Result<Self, RuntimeError> {
        let delegate = Box::new(DefaultMapper::new(Arc::clone(&machine), local));
        Self::with_delegate(&machine, delegate)
    }

    /// Creates the mapper over an explicit delegate.
    pub fn with_delegate(machine: &Machine, delegate: Box<dyn Mapper>) -> Result<Self, RuntimeError> {
        let mut system_memory = HashMap::new();
        for proc in machine.processors() {
            let visible: Vec<MemoryId> = machine
                .visible_memories(proc.id)
                .into_iter()
                .filter(|m| machine.memory(*m).map(|m| m.kind.is_system()).unwrap_or(false))
                .collect();
            match (proc.kind, visible.as_slice()) {
                (_, [only]) => {
                    system_memory.insert(proc.id, *only);
                }
                (ProcessorKind::LocProc, _) => {
                    return Err(RuntimeError::invariant(format!(
                        "{} sees {} system memories, expected exactly 1",
                        proc.id,
                        visible.len()
                    )));
                }
                _ => {}
            }
        }
        Ok(Self {
            delegate,
            system_memory,
        })
    }

    /// System memory cached for `proc`.
    pub fn system_memory(&self, proc: ProcessorId) -> Option<MemoryId> {
        self.system_memory.get(&proc).copied()
    }

    /// Per-point processor override for index launches. Points keep the
    /// processor the delegate proposed.
    fn point_processor(&self, _task: &TaskInfo, proposed: ProcessorId) -> ProcessorId {
        proposed
    }
}

impl Mapper for PlacementMapper {
    fn name(&self) -> &str {
        "placement"
    }

    fn local_processor(&self) -> ProcessorId {
        self.delegate.local_processor()
    }

    fn select_task_options(&self, task: &TaskInfo) -> TaskOptions {
        let mut options = self.delegate.select_task_options(task);
        if task.is_index_space() {
            options.target_proc = self.point_processor(task, options.target_proc);
        }
        options.profile_task = false;
        options
    }

    fn map_task(
        &self,
        task: &TaskInfo,
        target: ProcessorId,
        regions: &mut [RegionMapping],
    ) -> Result<(), RuntimeError> {
        self.delegate.map_task(task, target, regions)?;

        let memory = self.system_memory(target).ok_or_else(|| {
            RuntimeError::invariant(format!("{} has no unique system memory", target))
        })?;
        for mapping in regions.iter_mut() {
            mapping.target_ranking = vec![memory];
            mapping.virtual_map = false;
            mapping.enable_war_optimization = false;
            mapping.reduction_list = false;
            mapping.blocking_factor = mapping.max_blocking_factor;
        }
        Ok(())
    }
}

/// Registration callback installing a [`PlacementMapper`] on every local
/// processor in place of the default mapper.
pub fn register_placement_mappers(
    machine: &Arc<Machine>,
    mappers: &mut MapperRegistry,
    local_procs: &[ProcessorId],
) -> Result<(), RuntimeError> {
    for proc in local_procs {
        let mapper = PlacementMapper::new(Arc::clone(machine), *proc)?;
        mappers.replace_default_mapper(Arc::new(mapper), *proc);
    }
    tracing::debug!(processors = local_procs.len(), "Installed placement mappers");
    Ok(())
}
