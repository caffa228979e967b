//! Launcher descriptors for tasks, index launches and coherence operations.

use super::task::TaskId;
use crate::machine::MemoryId;
use crate::region::{FieldId, LogicalRegion, PhysicalRegion, Point1, Rect1, RegionRequirement};
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// An opaque task argument, shared (not copied) with the launched task.
#[derive(Clone, Default)]
pub struct TaskArgument(Option<Arc<dyn Any + Send + Sync>>);

impl TaskArgument {
    pub fn none() -> Self {
        Self(None)
    }

    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Some(Arc::new(value)))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    /// Borrows the argument as `T`, if present and of that type.
    pub fn get<T: Any>(&self) -> Option<&T> {
        self.0.as_deref()?.downcast_ref::<T>()
    }
}

impl fmt::Debug for TaskArgument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(_) => write!(f, "TaskArgument(..)"),
            None => write!(f, "TaskArgument(none)"),
        }
    }
}

/// Per-point arguments of an index launch.
#[derive(Clone, Debug, Default)]
pub struct ArgumentMap {
    args: BTreeMap<Point1, TaskArgument>,
}

impl ArgumentMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_point(&mut self, point: Point1, arg: TaskArgument) {
        self.args.insert(point, arg);
    }

    /// Argument for `point`, empty if none was set.
    pub fn get(&self, point: Point1) -> TaskArgument {
        self.args.get(&point).cloned().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }
}

/// Launches one task.
#[derive(Clone, Debug)]
pub struct TaskLauncher {
    pub task_id: TaskId,
    pub argument: TaskArgument,
    pub requirements: Vec<RegionRequirement>,
}

impl TaskLauncher {
    pub fn new(task_id: TaskId, argument: TaskArgument) -> Self {
        Self {
            task_id,
            argument,
            requirements: Vec::new(),
        }
    }

    pub fn add_region_requirement(mut self, requirement: RegionRequirement) -> Self {
        self.requirements.push(requirement);
        self
    }
}

/// Launches one point task per point of a domain.
#[derive(Clone, Debug)]
pub struct IndexLauncher {
    pub task_id: TaskId,
    pub launch_domain: Rect1,
    pub global_argument: TaskArgument,
    pub argument_map: ArgumentMap,
    pub requirements: Vec<RegionRequirement>,
}

impl IndexLauncher {
    pub fn new(
        task_id: TaskId,
        launch_domain: Rect1,
        global_argument: TaskArgument,
        argument_map: ArgumentMap,
    ) -> Self {
        Self {
            task_id,
            launch_domain,
            global_argument,
            argument_map,
            requirements: Vec::new(),
        }
    }

    pub fn add_region_requirement(mut self, requirement: RegionRequirement) -> Self {
        self.requirements.push(requirement);
        self
    }
}

/// Grants external code access to a region mapped with simultaneous
/// coherence, lifting the restriction to the parent's instance.
#[derive(Clone, Debug)]
pub struct AcquireLauncher {
    pub region: LogicalRegion,
    pub parent: LogicalRegion,
    /// Memory of the parent's instance.
    pub memory: MemoryId,
    pub fields: Vec<FieldId>,
}

impl AcquireLauncher {
    pub fn new(region: LogicalRegion, parent: LogicalRegion, physical: &PhysicalRegion) -> Self {
        Self {
            region,
            parent,
            memory: physical.memory(),
            fields: Vec::new(),
        }
    }

    pub fn add_field(mut self, fid: FieldId) -> Self {
        if !self.fields.contains(&fid) {
            self.fields.push(fid);
        }
        self
    }
}

/// Ends external access started by an [`AcquireLauncher`], flushing newer
/// data back into the parent's instance.
#[derive(Clone, Debug)]
pub struct ReleaseLauncher {
    pub region: LogicalRegion,
    pub parent: LogicalRegion,
    pub memory: MemoryId,
    pub fields: Vec<FieldId>,
}

impl ReleaseLauncher {
    pub fn new(region: LogicalRegion, parent: LogicalRegion, physical: &PhysicalRegion) -> Self {
        Self {
            region,
            parent,
            memory: physical.memory(),
            fields: Vec::new(),
        }
    }

    pub fn add_field(mut self, fid: FieldId) -> Self {
        if !self.fields.contains(&fid) {
            self.fields.push(fid);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Config {
        size: i64,
    }

    #[test]
    fn test_argument_typed_access() {
        let arg = TaskArgument::new(Config { size: 8 });
        assert_eq!(arg.get::<Config>(), Some(&Config { size: 8 }));
        assert_eq!(arg.get::<u32>(), None);
        assert!(TaskArgument::none().get::<Config>().is_none());
    }

    #[test]
    fn test_argument_map_defaults_to_empty() {
        let mut map = ArgumentMap::new();
        map.set_point(Point1(1), TaskArgument::new(5u32));

        assert_eq!(map.get(Point1(1)).get::<u32>(), Some(&5));
        assert!(map.get(Point1(0)).is_empty());
    }
}
