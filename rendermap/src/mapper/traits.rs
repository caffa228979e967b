//! The mapper interface consulted by the runtime.

use super::types::{RegionMapping, TaskOptions};
use crate::machine::ProcessorId;
use crate::runtime::{RuntimeError, TaskInfo};

/// Placement strategy for tasks and their regions.
///
/// The runtime keeps one mapper per processor. The mapper of the launching
/// processor picks task options; the mapper of the chosen target processor
/// maps the task's regions.
pub trait Mapper: Send + Sync {
    fn name(&self) -> &str;

    /// Processor this mapper instance serves.
    fn local_processor(&self) -> ProcessorId;

    /// Chooses where and how a task will run.
    fn select_task_options(&self, task: &TaskInfo) -> TaskOptions;

    /// Fills in memory ranking and layout for every region of `task` once it
    /// is bound to `target`.
    fn map_task(
        &self,
        task: &TaskInfo,
        target: ProcessorId,
        regions: &mut [RegionMapping],
    ) -> Result<(), RuntimeError>;
}
