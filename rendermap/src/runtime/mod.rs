//! In-process region runtime.
//!
//! A small task-based runtime over logical regions, standing in for a
//! distributed one. Tasks run as tokio tasks bound to simulated processors,
//! region data lives in per-memory physical instances, and values cross
//! memories only through their registered codec.
//!
//! # Architecture
//!
//! ```text
//!  RuntimeBuilder ──build──► Runtime ──start──► top-level task
//!   │ tasks, codecs,            │                    │ TaskContext
//!   │ registration callbacks    │                    ▼
//!   ▼                           │        execute_task / execute_index_space
//!  MapperRegistry ◄─────────────┤        issue_acquire / issue_release
//!   (one mapper per processor)  │                    │
//!                               ▼                    ▼
//!                          RegionForest ◄──── map_region (per requirement)
//!                           trees, instances,        │
//!                           validity, restriction    ▼
//!                                               transfer::copy_field
//! ```
//!
//! Operations issued by one task are ordered per region tree by a
//! [`DependenceTracker`]: writers (and acquire, release, destroy) wait for
//! everything earlier, readers wait for the last writer. A task completes
//! only after every operation it issued has.
//!
//! Leaf tasks hold a slot of their processor in the [`ProcessorPool`] while
//! they run. Non-leaf tasks hold none, so a parent waiting on its children
//! never blocks them.

mod builder;
mod context;
mod core;
mod dependence;
mod error;
mod forest;
mod future;
mod launcher;
mod processor_pool;
mod task;
mod telemetry;

pub use builder::{RegistrationCallback, RuntimeBuilder};
pub use context::{FieldAllocator, TaskContext};
pub use core::Runtime;
pub use dependence::{AccessKind, DependenceTracker};
pub use error::RuntimeError;
pub use forest::TreeState;
pub use future::{run_blocking, Completion, FutureMap, OperationHandle, Outcome, TaskFuture};
pub use launcher::{AcquireLauncher, ArgumentMap, IndexLauncher, ReleaseLauncher, TaskArgument, TaskLauncher};
pub use processor_pool::{ProcessorPool, ProcessorSlots, SlotPermit, DEFAULT_PROCESSOR_SLOTS};
pub use task::{Task, TaskBody, TaskId, TaskInfo, TaskRegistry, TaskValue, TaskVariant};
pub use telemetry::{
    EventSink, IndexLaunchId, MultiplexEventSink, NullEventSink, RecordingEventSink, RuntimeEvent,
    TracingEventSink,
};
