//! Task trait, variants and registration.
//!
//! A task is a unit of work the runtime places on a processor. Bodies are
//! async so that non-leaf tasks can wait on their children; leaf bodies are
//! expected to run straight through.

use super::context::TaskContext;
use super::error::RuntimeError;
use crate::machine::{ProcessorId, ProcessorKind};
use crate::region::{Point1, Rect1, RegionRequirement};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Identifier a task is registered and launched under.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct TaskId(pub u32);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task#{}", self.0)
    }
}

/// Value a task body returns; surfaced through its future.
pub type TaskValue = Box<dyn Any + Send + Sync>;

/// Future returned by [`Task::execute`].
pub type TaskBody<'a> = Pin<Box<dyn Future<Output = Result<TaskValue, RuntimeError>> + Send + 'a>>;

/// A task body.
///
/// # Example
///
/// ```ignore
/// struct Hello;
///
/// impl Task for Hello {
///     fn name(&self) -> &str {
///         "hello"
///     }
///
///     fn execute<'a>(&'a self, ctx: &'a mut TaskContext) -> TaskBody<'a> {
///         Box::pin(async move {
///             tracing::info!(proc = %ctx.processor(), "hello");
///             Ok(Box::new(()) as TaskValue)
///         })
///     }
/// }
/// ```
pub trait Task: Send + Sync {
    /// Name used in telemetry and diagnostics.
    fn name(&self) -> &str;

    /// Runs the task.
    fn execute<'a>(&'a self, ctx: &'a mut TaskContext) -> TaskBody<'a>;
}

/// A registered task: its body plus the properties the runtime needs to
/// place and schedule it.
#[derive(Clone)]
pub struct TaskVariant {
    id: TaskId,
    name: String,
    proc_kind: ProcessorKind,
    single: bool,
    index: bool,
    leaf: bool,
    body: Arc<dyn Task>,
}

impl TaskVariant {
    /// Creates a single-launch, non-leaf variant for `LocProc` processors.
    pub fn new(id: TaskId, body: impl Task + 'static) -> Self {
        let name = body.name().to_string();
        Self {
            id,
            name,
            proc_kind: ProcessorKind::LocProc,
            single: true,
            index: false,
            leaf: false,
            body: Arc::new(body),
        }
    }

    pub fn proc_kind(mut self, kind: ProcessorKind) -> Self {
        self.proc_kind = kind;
        self
    }

    /// Whether the task may be launched as a single task.
    pub fn single(mut self, single: bool) -> Self {
        self.single = single;
        self
    }

    /// Whether the task may be launched over an index space.
    pub fn index(mut self, index: bool) -> Self {
        self.index = index;
        self
    }

    /// Leaf tasks launch no sub-operations and hold a processor slot while
    /// they run.
    pub fn leaf(mut self, leaf: bool) -> Self {
        self.leaf = leaf;
        self
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ProcessorKind {
        self.proc_kind
    }

    pub fn is_single(&self) -> bool {
        self.single
    }

    pub fn is_index(&self) -> bool {
        self.index
    }

    pub fn is_leaf(&self) -> bool {
        self.leaf
    }

    pub(crate) fn body(&self) -> Arc<dyn Task> {
        Arc::clone(&self.body)
    }
}

impl fmt::Debug for TaskVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskVariant")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("proc_kind", &self.proc_kind)
            .field("single", &self.single)
            .field("index", &self.index)
            .field("leaf", &self.leaf)
            .finish()
    }
}

/// All registered task variants.
#[derive(Clone, Debug, Default)]
pub struct TaskRegistry {
    variants: HashMap<TaskId, TaskVariant>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, variant: TaskVariant) -> Result<(), RuntimeError> {
        if self.variants.contains_key(&variant.id) {
            return Err(RuntimeError::invariant(format!(
                "{} registered twice",
                variant.id
            )));
        }
        tracing::debug!(
            task_id = variant.id.0,
            name = %variant.name,
            leaf = variant.leaf,
            single = variant.single,
            index = variant.index,
            "Registered task variant"
        );
        self.variants.insert(variant.id, variant);
        Ok(())
    }

    pub fn get(&self, id: TaskId) -> Result<&TaskVariant, RuntimeError> {
        self.variants.get(&id).ok_or(RuntimeError::UnknownTask(id))
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }
}

/// What a mapper is told about a task instance.
#[derive(Clone, Debug)]
pub struct TaskInfo {
    pub task_id: TaskId,
    pub name: String,
    pub leaf: bool,
    /// Point of this instance within an index launch.
    pub index_point: Option<Point1>,
    /// Full domain of the index launch this instance belongs to.
    pub index_domain: Option<Rect1>,
    /// Processor of the launching task; `None` for the top-level task.
    pub parent_processor: Option<ProcessorId>,
    pub regions: Vec<RegionRequirement>,
}

impl TaskInfo {
    pub fn is_index_space(&self) -> bool {
        self.index_point.is_some()
    }
}
