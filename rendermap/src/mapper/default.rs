//! General-purpose mapper used when nothing else is installed.

use super::traits::Mapper;
use super::types::{RegionMapping, TaskOptions};
use crate::machine::{Machine, ProcessorId, ProcessorKind};
use crate::runtime::{RuntimeError, TaskInfo};
use std::sync::Arc;

/// Default placement:
///
/// - single tasks stay on the launching processor when it is an application
///   processor, otherwise go to the first application processor
/// - index points are dealt round-robin over every application processor
/// - regions rank visible memories by bandwidth, best first
/// - layout is fully interleaved and write-after-read optimisation is on
pub struct DefaultMapper {
    machine: Arc<Machine>,
    local: ProcessorId,
    cpus: Vec<ProcessorId>,
}

impl DefaultMapper {
    pub fn new(machine: Arc<Machine>, local: ProcessorId) -> Self {
        let cpus = machine.processors_of_kind(ProcessorKind::LocProc);
        Self {
            machine,
            local,
            cpus,
        }
    }

    pub fn machine(&self) -> &Arc<Machine> {
        &self.machine
    }

    fn pick_processor(&self, task: &TaskInfo) -> ProcessorId {
        if self.cpus.is_empty() {
            return self.local;
        }
        if let (Some(point), Some(domain)) = (task.index_point, task.index_domain) {
            let offset = (point.0 - domain.lo.0).rem_euclid(self.cpus.len() as i64) as usize;
            return self.cpus[offset];
        }
        let local_is_cpu = self
            .machine
            .processor(self.local)
            .map(|p| p.kind == ProcessorKind::LocProc)
            .unwrap_or(false);
        if local_is_cpu {
            self.local
        } else {
            self.cpus[0]
        }
    }
}

impl Mapper for DefaultMapper {
    fn name(&self) -> &str {
        "default"
    }

    fn local_processor(&self) -> ProcessorId {
        self.local
    }

    fn select_task_options(&self, task: &TaskInfo) -> TaskOptions {
        TaskOptions {
            target_proc: self.pick_processor(task),
            inline_task: false,
            spawn_task: false,
            map_locally: false,
            profile_task: task.leaf,
        }
    }

    fn map_task(
        &self,
        _task: &TaskInfo,
        target: ProcessorId,
        regions: &mut [RegionMapping],
    ) -> Result<(), RuntimeError> {
        let mut ranking: Vec<_> = self
            .machine
            .visible_memories(target)
            .into_iter()
            .filter_map(|m| self.machine.affinity(target, m).map(|a| (m, a.bandwidth)))
            .collect();
        if ranking.is_empty() {
            return Err(RuntimeError::invariant(format!(
                "no memory visible to {}",
                target
            )));
        }
        ranking.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        let ranking: Vec<_> = ranking.into_iter().map(|(m, _)| m).collect();

        for mapping in regions.iter_mut() {
            mapping.target_ranking = ranking.clone();
            mapping.virtual_map = false;
            mapping.enable_war_optimization = true;
            mapping.reduction_list = false;
            mapping.blocking_factor = 1;
        }
        Ok(())
    }
}
