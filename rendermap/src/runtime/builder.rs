//! Runtime construction: task and codec registration, mapper installation.

use super::core::{Runtime, RuntimeInner};
use super::error::RuntimeError;
use super::forest::RegionForest;
use super::processor_pool::{ProcessorPool, DEFAULT_PROCESSOR_SLOTS};
use super::task::{TaskId, TaskRegistry, TaskVariant};
use super::telemetry::{EventSink, TracingEventSink};
use crate::machine::{Machine, MachineConfig, ProcessorId, ProcessorKind};
use crate::mapper::MapperRegistry;
use crate::serdez::{CustomSerdez, SerdezId, SerdezRegistry};
use std::sync::atomic::AtomicU64;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

/// Hook run once per node before the top-level task starts, with the
/// processors of that node. Installs mappers.
pub type RegistrationCallback = Box<
    dyn Fn(&Arc<Machine>, &mut MapperRegistry, &[ProcessorId]) -> Result<(), RuntimeError>
        + Send
        + Sync,
>;

/// Collects everything a [`Runtime`] needs before it starts.
///
/// # Example
///
/// ```ignore
/// let mut builder = RuntimeBuilder::new(MachineConfig::default());
/// builder.register_task(TaskVariant::new(TaskId(0), TopLevel).single(true))?;
/// builder.set_top_level_task_id(TaskId(0));
/// let runtime = builder.build()?;
/// let value: u64 = runtime.start().await?;
/// ```
pub struct RuntimeBuilder {
    machine: MachineConfig,
    tasks: TaskRegistry,
    serdez: SerdezRegistry,
    callbacks: Vec<RegistrationCallback>,
    sink: Arc<dyn EventSink>,
    processor_slots: usize,
    input_args: Vec<String>,
    top_level: Option<TaskId>,
}

impl RuntimeBuilder {
    pub fn new(machine: MachineConfig) -> Self {
        Self {
            machine,
            tasks: TaskRegistry::new(),
            serdez: SerdezRegistry::new(),
            callbacks: Vec::new(),
            sink: Arc::new(TracingEventSink),
            processor_slots: DEFAULT_PROCESSOR_SLOTS,
            input_args: Vec::new(),
            top_level: None,
        }
    }

    /// Raw input arguments. `-ll:cpu` and `-ll:nodes` reshape the machine;
    /// everything is visible to tasks through their context.
    pub fn with_input_args(mut self, args: Vec<String>) -> Self {
        self.input_args = args;
        self
    }

    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Concurrent leaf tasks per processor.
    pub fn with_processor_slots(mut self, slots: usize) -> Self {
        self.processor_slots = slots.max(1);
        self
    }

    pub fn register_task(&mut self, variant: TaskVariant) -> Result<(), RuntimeError> {
        tracing::debug!(task = %variant.name(), id = %variant.id(), "Registering task");
        self.tasks.register(variant)
    }

    pub fn register_custom_serdez<S: CustomSerdez>(&mut self, id: SerdezId, codec: S) -> Result<(), RuntimeError> {
        tracing::debug!(serdez = %id, codec = codec.name(), "Registering custom serdez");
        self.serdez.register(id, codec)?;
        Ok(())
    }

    pub fn set_registration_callback(&mut self, callback: RegistrationCallback) {
        self.callbacks.push(callback);
    }

    pub fn set_top_level_task_id(&mut self, id: TaskId) {
        self.top_level = Some(id);
    }

    /// Snapshots the machine, runs registration callbacks per node and
    /// returns a runtime ready to start.
    pub fn build(self) -> Result<Runtime, RuntimeError> {
        let top_level = self
            .top_level
            .ok_or_else(|| RuntimeError::invariant("no top-level task id set"))?;
        self.tasks.get(top_level)?;

        let config = self.machine.with_input_args(&self.input_args);
        let machine = Arc::new(Machine::build(&config));
        if machine.processors_of_kind(ProcessorKind::LocProc).is_empty() {
            return Err(RuntimeError::invariant("machine has no application processors"));
        }
        tracing::info!(
            nodes = machine.node_count(),
            processors = machine.processors().len(),
            memories = machine.memories().len(),
            "Machine configured"
        );

        let mut mappers = MapperRegistry::with_defaults(Arc::clone(&machine));
        for node in 0..machine.node_count() {
            let local: Vec<ProcessorId> = machine
                .processors()
                .iter()
                .filter(|p| p.node == node)
                .map(|p| p.id)
                .collect();
            for callback in &self.callbacks {
                callback(&machine, &mut mappers, &local)?;
            }
        }

        let pool = ProcessorPool::new(&machine, self.processor_slots);
        let forest = RegionForest::new(self.serdez, Arc::clone(&self.sink));
        Ok(Runtime::from_inner(RuntimeInner {
            machine,
            tasks: self.tasks,
            mappers,
            forest,
            pool,
            sink: self.sink,
            input_args: self.input_args,
            top_level,
            abort: CancellationToken::new(),
            failure: Mutex::new(None),
            index_launches: AtomicU64::new(0),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::register_placement_mappers;
    use crate::runtime::{Task, TaskBody, TaskContext, TaskValue};

    struct Noop;

    impl Task for Noop {
        fn name(&self) -> &str {
            "noop"
        }

        fn execute<'a>(&'a self, _ctx: &'a mut TaskContext) -> TaskBody<'a> {
            Box::pin(async { Ok(Box::new(()) as TaskValue) })
        }
    }

    fn builder() -> RuntimeBuilder {
        let mut builder = RuntimeBuilder::new(MachineConfig::default());
        builder
            .register_task(TaskVariant::new(TaskId(0), Noop))
            .unwrap();
        builder.set_top_level_task_id(TaskId(0));
        builder
    }

    #[test]
    fn test_build_requires_top_level() {
        let builder = RuntimeBuilder::new(MachineConfig::default());
        assert!(matches!(
            builder.build(),
            Err(RuntimeError::InvariantViolation(_))
        ));
    }

    #[test]
    fn test_input_args_reshape_machine() {
        let runtime = builder()
            .with_input_args(vec!["-ll:cpu".into(), "3".into(), "-ll:nodes".into(), "2".into()])
            .build()
            .unwrap();
        assert_eq!(runtime.machine().node_count(), 2);
        assert_eq!(
            runtime
                .machine()
                .processors_of_kind(ProcessorKind::LocProc)
                .len(),
            6
        );
    }

    #[test]
    fn test_callback_runs_per_node() {
        let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let mut builder = builder().with_input_args(vec!["-ll:nodes".into(), "3".into()]);
        builder.set_registration_callback(Box::new(
            move |_: &Arc<Machine>, _: &mut MapperRegistry, local: &[ProcessorId]| {
                assert!(!local.is_empty());
                seen.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                Ok(())
            },
        ));
        builder.build().unwrap();
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 3);
    }

    #[test]
    fn test_placement_callback_fails_on_ambiguous_memory() {
        let mut builder = RuntimeBuilder::new(MachineConfig {
            system_memories_per_node: 2,
            ..MachineConfig::default()
        });
        builder
            .register_task(TaskVariant::new(TaskId(0), Noop))
            .unwrap();
        builder.set_top_level_task_id(TaskId(0));
        builder.set_registration_callback(Box::new(register_placement_mappers));

        assert!(matches!(
            builder.build(),
            Err(RuntimeError::InvariantViolation(_))
        ));
    }

    #[tokio::test]
    async fn test_start_runs_top_level() {
        let runtime = builder().build().unwrap();
        runtime.start::<()>().await.unwrap();
        assert!(!runtime.is_aborted());
    }
}
