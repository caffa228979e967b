//! Runtime events for observability and testing.
//!
//! The runtime emits a [`RuntimeEvent`] for every task and data-movement step
//! to a pluggable [`EventSink`]. The runtime never decides how events are
//! presented: the CLI logs them through [`TracingEventSink`], tests collect
//! them with [`RecordingEventSink`] and check ordering properties.

use super::task::TaskId;
use crate::machine::{MemoryId, ProcessorId};
use crate::mapper::PlacementDecision;
use crate::region::{FieldId, Layout, Point1, RegionTreeId};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// =============================================================================
// Index Launch Identity
// =============================================================================

/// Identifies one index launch; every point task of the launch carries it.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct IndexLaunchId(pub u64);

impl IndexLaunchId {
    /// Allocates the next launch id.
    pub(crate) fn next(counter: &AtomicU64) -> Self {
        Self(counter.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for IndexLaunchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "launch-{}", self.0)
    }
}

// =============================================================================
// Runtime Events
// =============================================================================

/// Events emitted while the runtime executes tasks and moves data.
#[derive(Clone, Debug)]
pub enum RuntimeEvent {
    // -------------------------------------------------------------------------
    // Task Lifecycle Events
    // -------------------------------------------------------------------------
    /// A task was launched by its parent.
    TaskLaunched {
        task_id: TaskId,
        name: String,
        point: Option<Point1>,
        index_launch: Option<IndexLaunchId>,
    },

    /// A task's regions were mapped.
    TaskMapped {
        name: String,
        point: Option<Point1>,
        processor: ProcessorId,
        decisions: Vec<PlacementDecision>,
    },

    /// A task body started running.
    TaskStarted {
        name: String,
        point: Option<Point1>,
        processor: ProcessorId,
        index_launch: Option<IndexLaunchId>,
    },

    /// A task body and all of its children finished.
    TaskCompleted {
        name: String,
        point: Option<Point1>,
        processor: ProcessorId,
        index_launch: Option<IndexLaunchId>,
        duration: Duration,
        success: bool,
    },

    // -------------------------------------------------------------------------
    // Data Movement Events
    // -------------------------------------------------------------------------
    /// A physical instance was created.
    InstanceCreated {
        tree: RegionTreeId,
        memory: MemoryId,
        layout: Layout,
    },

    /// A field was copied between memories through its codec.
    CopyIssued {
        tree: RegionTreeId,
        field: FieldId,
        src: MemoryId,
        dst: MemoryId,
        elements: usize,
        bytes: usize,
    },

    // -------------------------------------------------------------------------
    // Coherence Events
    // -------------------------------------------------------------------------
    /// External access to a region was acquired.
    Acquired { tree: RegionTreeId, memory: MemoryId },

    /// External access was released; `flushed` if data was copied back.
    Released {
        tree: RegionTreeId,
        memory: MemoryId,
        flushed: bool,
    },

    /// A region tree and all of its instances were destroyed.
    RegionDestroyed {
        tree: RegionTreeId,
        values_destroyed: usize,
    },
}

impl RuntimeEvent {
    /// Returns a short name for this event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::TaskLaunched { .. } => "task_launched",
            Self::TaskMapped { .. } => "task_mapped",
            Self::TaskStarted { .. } => "task_started",
            Self::TaskCompleted { .. } => "task_completed",
            Self::InstanceCreated { .. } => "instance_created",
            Self::CopyIssued { .. } => "copy_issued",
            Self::Acquired { .. } => "acquired",
            Self::Released { .. } => "released",
            Self::RegionDestroyed { .. } => "region_destroyed",
        }
    }

    /// Name of the task the event is about, if any.
    pub fn task_name(&self) -> Option<&str> {
        match self {
            Self::TaskLaunched { name, .. }
            | Self::TaskMapped { name, .. }
            | Self::TaskStarted { name, .. }
            | Self::TaskCompleted { name, .. } => Some(name),
            _ => None,
        }
    }
}

// =============================================================================
// Event Sink Trait
// =============================================================================

/// Receiver of runtime events.
///
/// Events are emitted from many tokio tasks at once, so implementations must
/// be thread-safe and should return quickly.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: RuntimeEvent);
}

// =============================================================================
// Built-in Sinks
// =============================================================================

/// Sink that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn emit(&self, _event: RuntimeEvent) {}
}

/// Sink that logs events with `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: RuntimeEvent) {
        match &event {
            RuntimeEvent::TaskLaunched {
                task_id,
                name,
                point,
                index_launch,
            } => {
                tracing::trace!(
                    task_id = task_id.0,
                    task = %name,
                    point = ?point,
                    index_launch = ?index_launch,
                    "Task launched"
                );
            }
            RuntimeEvent::TaskMapped {
                name,
                point,
                processor,
                decisions,
            } => {
                for decision in decisions {
                    tracing::debug!(
                        task = %name,
                        point = ?point,
                        processor = %processor,
                        memory = %decision.target_memory,
                        layout = %decision.layout,
                        coherence = %decision.coherence,
                        "Region placed"
                    );
                }
            }
            RuntimeEvent::TaskStarted {
                name,
                point,
                processor,
                ..
            } => {
                tracing::trace!(task = %name, point = ?point, processor = %processor, "Task started");
            }
            RuntimeEvent::TaskCompleted {
                name,
                point,
                duration,
                success,
                ..
            } => {
                tracing::debug!(
                    task = %name,
                    point = ?point,
                    duration_us = duration.as_micros() as u64,
                    success = success,
                    "Task completed"
                );
            }
            RuntimeEvent::InstanceCreated {
                tree,
                memory,
                layout,
            } => {
                tracing::debug!(tree = %tree, memory = %memory, layout = %layout, "Instance created");
            }
            RuntimeEvent::CopyIssued {
                tree,
                field,
                src,
                dst,
                elements,
                bytes,
            } => {
                tracing::debug!(
                    tree = %tree,
                    field = %field,
                    src = %src,
                    dst = %dst,
                    elements = elements,
                    bytes = bytes,
                    "Copy through serdez"
                );
            }
            RuntimeEvent::Acquired { tree, memory } => {
                tracing::debug!(tree = %tree, memory = %memory, "Region acquired");
            }
            RuntimeEvent::Released {
                tree,
                memory,
                flushed,
            } => {
                tracing::debug!(tree = %tree, memory = %memory, flushed = flushed, "Region released");
            }
            RuntimeEvent::RegionDestroyed {
                tree,
                values_destroyed,
            } => {
                tracing::debug!(tree = %tree, values_destroyed = values_destroyed, "Region destroyed");
            }
        }
    }
}

/// Sink that keeps every event in emission order.
#[derive(Debug, Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<RuntimeEvent>>,
}

impl RecordingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all events recorded so far.
    pub fn events(&self) -> Vec<RuntimeEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Number of recorded events matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&RuntimeEvent) -> bool) -> usize {
        self.events
            .lock()
            .map(|e| e.iter().filter(|ev| predicate(ev)).count())
            .unwrap_or(0)
    }
}

impl EventSink for RecordingEventSink {
    fn emit(&self, event: RuntimeEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

/// Sink that forwards events to several sinks.
pub struct MultiplexEventSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl MultiplexEventSink {
    pub fn new(sinks: Vec<Arc<dyn EventSink>>) -> Self {
        Self { sinks }
    }
}

impl EventSink for MultiplexEventSink {
    fn emit(&self, event: RuntimeEvent) {
        for sink in &self.sinks {
            sink.emit(event.clone());
        }
    }
}

impl std::fmt::Debug for MultiplexEventSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiplexEventSink")
            .field("sink_count", &self.sinks.len())
            .finish()
    }
}
