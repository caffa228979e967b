//! Wiring of the benchmark tasks, codec and placement policy into a runtime.

use super::config::BenchmarkConfig;
use super::error::BenchmarkError;
use super::report::BenchmarkReport;
use super::tasks::{
    InitTask, MainTask, TopLevelTask, WorkerTask, INIT_TASK_ID, MAIN_TASK_ID, SERDEZ_ID,
    TOP_LEVEL_TASK_ID, WORKER_TASK_ID,
};
use crate::config::{ConfigFile, MachineSettings};
use crate::machine::MachineConfig;
use crate::mapper::register_placement_mappers;
use crate::runtime::{
    EventSink, Runtime, RuntimeBuilder, TaskVariant, TracingEventSink, DEFAULT_PROCESSOR_SLOTS,
};
use crate::serdez::{CustomSerdez, TextureObject, TextureSerdez};
use std::sync::Arc;

/// Runs the rendering benchmark end to end.
///
/// # Example
///
/// ```ignore
/// let report = ExecutionOrchestrator::new(BenchmarkConfig::default(), MachineConfig::default())
///     .with_input_args(std::env::args().skip(1).collect())
///     .run()
///     .await?;
/// println!("{}", report);
/// ```
pub struct ExecutionOrchestrator {
    config: BenchmarkConfig,
    machine: MachineConfig,
    input_args: Vec<String>,
    sink: Arc<dyn EventSink>,
    processor_slots: usize,
}

impl ExecutionOrchestrator {
    pub fn new(config: BenchmarkConfig, machine: MachineConfig) -> Self {
        Self {
            config,
            machine,
            input_args: Vec::new(),
            sink: Arc::new(TracingEventSink),
            processor_slots: DEFAULT_PROCESSOR_SLOTS,
        }
    }

    /// Uses the `[benchmark]` and `[machine]` sections of `file`.
    pub fn from_config_file(file: &ConfigFile) -> Self {
        Self::new(BenchmarkConfig::from(&file.benchmark), machine_config(&file.machine))
            .with_processor_slots(file.machine.processor_slots)
    }

    /// Raw runtime input arguments. Benchmark flags (`-n`, `-i`, `-p`) and
    /// machine flags (`-ll:cpu`, `-ll:nodes`) override configured values.
    pub fn with_input_args(mut self, args: Vec<String>) -> Self {
        self.input_args = args;
        self
    }

    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_processor_slots(mut self, slots: usize) -> Self {
        self.processor_slots = slots;
        self
    }

    /// Configuration the top-level task will run with.
    pub fn effective_config(&self) -> BenchmarkConfig {
        self.config.with_input_args(&self.input_args)
    }

    /// A runtime builder with the benchmark tasks, `codec` under
    /// [`SERDEZ_ID`] and the placement policy installed on every processor.
    pub fn runtime_builder_with_codec<S>(&self, codec: S) -> Result<RuntimeBuilder, BenchmarkError>
    where
        S: CustomSerdez<Value = TextureObject>,
    {
        let mut builder = RuntimeBuilder::new(self.machine)
            .with_input_args(self.input_args.clone())
            .with_event_sink(Arc::clone(&self.sink))
            .with_processor_slots(self.processor_slots);

        builder.register_task(TaskVariant::new(TOP_LEVEL_TASK_ID, TopLevelTask::new(self.config)))?;
        builder.register_task(
            TaskVariant::new(INIT_TASK_ID, InitTask::new(self.config.texture_side)).leaf(true),
        )?;
        builder.register_task(TaskVariant::new(MAIN_TASK_ID, MainTask))?;
        builder.register_task(
            TaskVariant::new(WORKER_TASK_ID, WorkerTask)
                .single(true)
                .index(true)
                .leaf(true),
        )?;
        builder.register_custom_serdez(SERDEZ_ID, codec)?;
        builder.set_registration_callback(Box::new(register_placement_mappers));
        builder.set_top_level_task_id(TOP_LEVEL_TASK_ID);
        Ok(builder)
    }

    /// Builds the runtime with the texture codec sized for the configured
    /// texture side.
    pub fn build_runtime(&self) -> Result<Runtime, BenchmarkError> {
        let codec = TextureSerdez::new(self.config.texture_side);
        Ok(self.runtime_builder_with_codec(codec)?.build()?)
    }

    /// Runs the benchmark and returns its report.
    pub async fn run(&self) -> Result<BenchmarkReport, BenchmarkError> {
        let runtime = self.build_runtime()?;
        run_benchmark(&runtime).await
    }

    /// Runs the benchmark with a caller-supplied texture codec.
    pub async fn run_with_codec<S>(&self, codec: S) -> Result<BenchmarkReport, BenchmarkError>
    where
        S: CustomSerdez<Value = TextureObject>,
    {
        let runtime = self.runtime_builder_with_codec(codec)?.build()?;
        run_benchmark(&runtime).await
    }
}

async fn run_benchmark(runtime: &Runtime) -> Result<BenchmarkReport, BenchmarkError> {
    let report: BenchmarkReport = runtime.start().await?;
    Ok(report)
}

/// Machine shape described by a `[machine]` config section.
pub fn machine_config(settings: &MachineSettings) -> MachineConfig {
    MachineConfig {
        nodes: settings.nodes,
        cpus_per_node: settings.cpus_per_node,
        system_memories_per_node: settings.system_memories_per_node,
    }
}
