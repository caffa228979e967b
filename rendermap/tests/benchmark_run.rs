//! End-to-end properties of a full benchmark run.
//!
//! Every test runs the real orchestrator on a multi-threaded tokio runtime
//! with small textures and inspects the event stream it records.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rendermap::bench::{
    BenchmarkConfig, BenchmarkReport, ExecutionOrchestrator, InitTask, MainTask, TopLevelTask, WorkerArgs,
    FID_VAL, INIT_TASK_ID, MAIN_TASK_ID, SERDEZ_ID, TOP_LEVEL_TASK_ID, WORKER_TASK_ID,
};
use rendermap::machine::{MachineConfig, MemoryKind};
use rendermap::mapper::register_placement_mappers;
use rendermap::partition::AliasedPartitionScheme;
use rendermap::region::{Layout, Point1, Rect1};
use rendermap::runtime::{
    run_blocking, IndexLaunchId, RecordingEventSink, RuntimeBuilder, RuntimeEvent, Task, TaskBody, TaskContext,
    TaskValue, TaskVariant,
};
use rendermap::serdez::{CodecError, CustomSerdez, TextureObject, TextureSerdez};

const WORKER: &str = "worker_task";

fn config(nsize: i64, niter: i64, npar: i64) -> BenchmarkConfig {
    BenchmarkConfig {
        nsize,
        niter,
        npar,
        texture_side: 2,
    }
}

fn args(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

async fn run_recorded(
    config: BenchmarkConfig,
    input_args: Vec<String>,
) -> (BenchmarkReport, Vec<RuntimeEvent>) {
    let sink = Arc::new(RecordingEventSink::new());
    let report = ExecutionOrchestrator::new(config, MachineConfig::default())
        .with_input_args(input_args)
        .with_event_sink(sink.clone())
        .run()
        .await
        .expect("benchmark run failed");
    (report, sink.events())
}

fn worker_started(event: &RuntimeEvent) -> Option<(IndexLaunchId, Option<Point1>)> {
    match event {
        RuntimeEvent::TaskStarted {
            name,
            index_launch: Some(launch),
            point,
            ..
        } if name == WORKER => Some((*launch, *point)),
        _ => None,
    }
}

fn worker_completed(event: &RuntimeEvent) -> Option<IndexLaunchId> {
    match event {
        RuntimeEvent::TaskCompleted {
            name,
            index_launch: Some(launch),
            success: true,
            ..
        } if name == WORKER => Some(*launch),
        _ => None,
    }
}

// =============================================================================
// Codec accounting
// =============================================================================

/// Texture codec counting every value it produces and destroys.
struct CountingSerdez {
    inner: TextureSerdez,
    deserialized: Arc<AtomicUsize>,
    destroyed: Arc<AtomicUsize>,
}

impl CustomSerdez for CountingSerdez {
    type Value = TextureObject;

    fn name(&self) -> &str {
        "counting-texture"
    }

    fn max_serialized_size(&self) -> usize {
        self.inner.max_serialized_size()
    }

    fn serialized_size(&self, value: &TextureObject) -> usize {
        self.inner.serialized_size(value)
    }

    fn serialize(&self, value: &TextureObject, buf: &mut [u8]) -> Result<usize, CodecError> {
        self.inner.serialize(value, buf)
    }

    fn deserialize(&self, buf: &[u8]) -> Result<(Box<TextureObject>, usize), CodecError> {
        let result = self.inner.deserialize(buf)?;
        self.deserialized.fetch_add(1, Ordering::SeqCst);
        Ok(result)
    }

    fn destroy(&self, value: Box<TextureObject>) {
        self.destroyed.fetch_add(1, Ordering::SeqCst);
        drop(value);
    }
}

async fn run_counted(input_args: Vec<String>) -> (usize, usize, Vec<RuntimeEvent>) {
    let deserialized = Arc::new(AtomicUsize::new(0));
    let destroyed = Arc::new(AtomicUsize::new(0));
    let sink = Arc::new(RecordingEventSink::new());
    let codec = CountingSerdez {
        inner: TextureSerdez::new(2),
        deserialized: Arc::clone(&deserialized),
        destroyed: Arc::clone(&destroyed),
    };

    ExecutionOrchestrator::new(config(64, 2, 4), MachineConfig::default())
        .with_input_args(input_args)
        .with_event_sink(sink.clone())
        .run_with_codec(codec)
        .await
        .expect("benchmark run failed");

    (
        deserialized.load(Ordering::SeqCst),
        destroyed.load(Ordering::SeqCst),
        sink.events(),
    )
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_every_value_destroyed_once_on_one_node() {
    let (deserialized, destroyed, events) = run_counted(Vec::new()).await;

    assert_eq!(deserialized, 0);
    assert_eq!(destroyed, 64);
    assert!(!events
        .iter()
        .any(|e| matches!(e, RuntimeEvent::CopyIssued { .. })));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_every_value_destroyed_once_across_nodes() {
    let (deserialized, destroyed, events) =
        run_counted(args(&["-ll:nodes", "2", "-ll:cpu", "1"])).await;

    let copies = events
        .iter()
        .filter(|e| matches!(e, RuntimeEvent::CopyIssued { .. }))
        .count();
    assert!(copies >= 1);
    assert!(deserialized >= 64);
    assert_eq!(64 + deserialized, destroyed);
}

// =============================================================================
// Partition coverage
// =============================================================================

#[test]
fn test_views_cover_domain() {
    let domain = Rect1::from_size(1024);
    for parts in [1, 3, 4, 2000] {
        let coloring = AliasedPartitionScheme::new(parts).unwrap().coloring(domain);
        assert_eq!(coloring.len() as i64, parts);
        assert!(coloring.covers(domain));
        assert!(coloring.iter().all(|(_, rect)| rect == domain));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_every_worker_reads_whole_collection() {
    let (report, _) = run_recorded(config(48, 3, 5), Vec::new()).await;
    assert_eq!(report.elements_read, 48 * 5 * 3);
}

// =============================================================================
// Placement determinism
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_every_decision_uses_local_system_memory() {
    let sink = Arc::new(RecordingEventSink::new());
    let runtime = ExecutionOrchestrator::new(config(32, 2, 4), MachineConfig::default())
        .with_input_args(args(&["-ll:nodes", "2", "-ll:cpu", "2"]))
        .with_event_sink(sink.clone())
        .build_runtime()
        .unwrap();
    runtime.start::<BenchmarkReport>().await.unwrap();

    let machine = runtime.machine();
    let decisions: Vec<_> = sink
        .events()
        .into_iter()
        .filter_map(|e| match e {
            RuntimeEvent::TaskMapped { decisions, .. } => Some(decisions),
            _ => None,
        })
        .flatten()
        .collect();

    // init + main + 2 rounds of 4 workers
    assert_eq!(decisions.len(), 10);
    for decision in &decisions {
        let memory = machine.memory(decision.target_memory).unwrap();
        assert_eq!(memory.kind, MemoryKind::SystemMem);
        assert_eq!(memory.node, machine.node_of(decision.processor));
        assert_eq!(decision.layout, Layout::StructureOfArrays);
        assert!(decision.is_hazard_free_soa(), "{}", decision);
    }
}

// =============================================================================
// Ordering
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_rounds_do_not_overlap() {
    let (_, events) = run_recorded(config(32, 4, 3), Vec::new()).await;

    let mut launches: Vec<IndexLaunchId> = events
        .iter()
        .filter_map(worker_started)
        .map(|(launch, _)| launch)
        .collect();
    launches.sort();
    launches.dedup();
    assert_eq!(launches.len(), 4);

    for pair in launches.windows(2) {
        let (earlier, later) = (pair[0], pair[1]);
        let last_completed = events
            .iter()
            .rposition(|e| worker_completed(e) == Some(earlier))
            .unwrap();
        let first_started = events
            .iter()
            .position(|e| worker_started(e).map(|(l, _)| l) == Some(later))
            .unwrap();
        assert!(
            last_completed < first_started,
            "{} started before {} finished",
            later,
            earlier
        );
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_single_acquire_release_around_workers() {
    let (_, events) = run_recorded(config(32, 2, 4), Vec::new()).await;

    let acquires: Vec<usize> = events
        .iter()
        .enumerate()
        .filter(|(_, e)| matches!(e, RuntimeEvent::Acquired { .. }))
        .map(|(i, _)| i)
        .collect();
    let releases: Vec<usize> = events
        .iter()
        .enumerate()
        .filter(|(_, e)| matches!(e, RuntimeEvent::Released { .. }))
        .map(|(i, _)| i)
        .collect();
    assert_eq!(acquires.len(), 1);
    assert_eq!(releases.len(), 1);

    let first_worker = events.iter().position(|e| worker_started(e).is_some()).unwrap();
    let last_worker = events
        .iter()
        .rposition(|e| worker_completed(e).is_some())
        .unwrap();
    assert!(acquires[0] < first_worker);
    assert!(releases[0] > last_worker);
}

// =============================================================================
// Concurrency
// =============================================================================

/// Worker that keeps its read accessor open until every sibling of its round
/// has arrived, or a deadline passes. Returns 1 if the whole round met.
struct RendezvousWorker {
    npar: usize,
    arrived: Arc<AtomicUsize>,
}

impl Task for RendezvousWorker {
    fn name(&self) -> &str {
        WORKER
    }

    fn execute<'a>(&'a self, ctx: &'a mut TaskContext) -> TaskBody<'a> {
        Box::pin(async move {
            let round = ctx.args::<WorkerArgs>()?.round as usize;
            let region = ctx.region(0)?.clone();
            let arrived = Arc::clone(&self.arrived);
            let target = (round + 1) * self.npar;

            let met = run_blocking(WORKER, move || {
                let accessor = region.accessor::<TextureObject>(FID_VAL)?;
                accessor.read(Point1(0))?;
                arrived.fetch_add(1, Ordering::SeqCst);
                let deadline = Instant::now() + Duration::from_secs(5);
                while arrived.load(Ordering::SeqCst) < target && Instant::now() < deadline {
                    std::thread::sleep(Duration::from_millis(1));
                }
                Ok(arrived.load(Ordering::SeqCst) >= target)
            })
            .await?;
            Ok(Box::new(u64::from(met)) as TaskValue)
        })
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_round_workers_read_concurrently() {
    let config = config(64, 3, 4);
    let machine = MachineConfig {
        cpus_per_node: 4,
        ..MachineConfig::default()
    };
    let mut builder = RuntimeBuilder::new(machine);
    builder
        .register_task(TaskVariant::new(TOP_LEVEL_TASK_ID, TopLevelTask::new(config)))
        .unwrap();
    builder
        .register_task(TaskVariant::new(INIT_TASK_ID, InitTask::new(config.texture_side)).leaf(true))
        .unwrap();
    builder.register_task(TaskVariant::new(MAIN_TASK_ID, MainTask)).unwrap();
    builder
        .register_task(
            TaskVariant::new(
                WORKER_TASK_ID,
                RendezvousWorker {
                    npar: 4,
                    arrived: Arc::new(AtomicUsize::new(0)),
                },
            )
            .single(true)
            .index(true)
            .leaf(true),
        )
        .unwrap();
    builder
        .register_custom_serdez(SERDEZ_ID, TextureSerdez::new(config.texture_side))
        .unwrap();
    builder.set_registration_callback(Box::new(register_placement_mappers));
    builder.set_top_level_task_id(TOP_LEVEL_TASK_ID);

    let report: BenchmarkReport = builder.build().unwrap().start().await.unwrap();

    // every worker of every round saw all its siblings holding the region
    assert_eq!(report.elements_read, 4 * 3);
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_scenario_default_shape() {
    let (report, events) = run_recorded(config(1024, 1, 4), Vec::new()).await;

    assert_eq!(report.nsize, 1024);
    assert_eq!(report.niter, 1);
    assert_eq!(report.npar, 4);
    assert!(report.elapsed.as_nanos() > 0);
    assert!(report.to_string().contains("ELAPSED TIME = "));

    let mut points: Vec<i64> = events
        .iter()
        .filter_map(worker_started)
        .filter_map(|(_, point)| point.map(|p| p.0))
        .collect();
    points.sort();
    assert_eq!(points, vec![0, 1, 2, 3]);
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, RuntimeEvent::Acquired { .. }))
            .count(),
        1
    );
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, RuntimeEvent::Released { .. }))
            .count(),
        1
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_scenario_single_partition() {
    let (report, events) = run_recorded(config(100, 1, 4), args(&["-p", "1"])).await;

    assert_eq!(report.npar, 1);
    assert_eq!(report.elements_read, 100);
    assert_eq!(events.iter().filter_map(worker_started).count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_region_destroyed_at_end() {
    let (_, events) = run_recorded(config(16, 1, 2), Vec::new()).await;

    let destroyed: Vec<usize> = events
        .iter()
        .filter_map(|e| match e {
            RuntimeEvent::RegionDestroyed {
                values_destroyed, ..
            } => Some(*values_destroyed),
            _ => None,
        })
        .collect();
    assert_eq!(destroyed, vec![16]);
}
