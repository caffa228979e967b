//! Inputs and outputs of mapper calls.

use crate::machine::{MemoryId, ProcessorId};
use crate::region::{Coherence, Layout, LogicalRegion, Point1, RegionRequirement};
use std::fmt;

/// Options chosen for a task before it is mapped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TaskOptions {
    /// Processor the task will run on.
    pub target_proc: ProcessorId,
    pub inline_task: bool,
    pub spawn_task: bool,
    pub map_locally: bool,
    /// Whether the runtime should time the task body.
    pub profile_task: bool,
}

/// Per-region mapping request the mapper fills in.
#[derive(Clone, Debug)]
pub struct RegionMapping {
    /// Requirement as launched.
    pub requirement: RegionRequirement,
    /// Region the requirement resolved to for this task.
    pub region: LogicalRegion,
    /// Memories to try, best first. The runtime uses the first entry.
    pub target_ranking: Vec<MemoryId>,
    /// Defer mapping until the region is actually touched.
    pub virtual_map: bool,
    /// Allow a write-after-read to skip waiting by making a fresh instance.
    pub enable_war_optimization: bool,
    /// Accumulate reductions into a list instead of an instance.
    pub reduction_list: bool,
    /// Elements per layout block.
    pub blocking_factor: usize,
    /// Largest meaningful blocking factor; set by the runtime.
    pub max_blocking_factor: usize,
}

impl RegionMapping {
    /// A blank request for `requirement` resolved to `region`.
    pub fn new(requirement: RegionRequirement, region: LogicalRegion) -> Self {
        let max_blocking_factor = region.domain().volume().max(1) as usize;
        Self {
            requirement,
            region,
            target_ranking: Vec::new(),
            virtual_map: false,
            enable_war_optimization: false,
            reduction_list: false,
            blocking_factor: 1,
            max_blocking_factor,
        }
    }

    /// Layout implied by the blocking factor.
    pub fn layout(&self) -> Layout {
        Layout::from_blocking_factor(self.blocking_factor, self.max_blocking_factor)
    }
}

/// Where and how one region of one task instance ended up.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlacementDecision {
    pub task: String,
    pub point: Option<Point1>,
    pub processor: ProcessorId,
    pub region_index: usize,
    pub target_memory: MemoryId,
    pub layout: Layout,
    pub coherence: Coherence,
    pub war_optimization: bool,
    pub reduction_list: bool,
    pub virtual_map: bool,
}

impl PlacementDecision {
    /// True for a contiguous layout with every hazard option off.
    pub fn is_hazard_free_soa(&self) -> bool {
        self.layout == Layout::StructureOfArrays
            && !self.war_optimization
            && !self.reduction_list
            && !self.virtual_map
    }
}

impl fmt::Display for PlacementDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.task)?;
        if let Some(point) = self.point {
            write!(f, "{}", point)?;
        }
        write!(
            f,
            " region {} on {} -> {} {} {} war={} reduction_list={} virtual={}",
            self.region_index,
            self.processor,
            self.target_memory,
            self.layout,
            self.coherence,
            self.war_optimization,
            self.reduction_list,
            self.virtual_map
        )
    }
}
