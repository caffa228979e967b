//! Mappers: the placement policies the runtime consults per task.
//!
//! The runtime asks the mapper of the launching processor where a task
//! should run ([`Mapper::select_task_options`]), then asks the mapper of the
//! chosen processor where each region should live and how it should be laid
//! out ([`Mapper::map_task`]). Mappers are installed per processor through
//! the runtime's registration callback.

mod default;
mod placement;
mod registry;
mod traits;
mod types;

pub use default::DefaultMapper;
pub use placement::{register_placement_mappers, PlacementMapper};
pub use registry::MapperRegistry;
pub use traits::Mapper;
pub use types::{PlacementDecision, RegionMapping, TaskOptions};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::{Machine, MachineConfig, MemoryKind, ProcessorKind};
    use crate::region::{
        Coherence, FieldId, FieldSpace, FieldSpaceId, IndexSpace, IndexSpaceId, Layout,
        LogicalRegion, Point1, Privilege, Rect1, RegionRequirement, RegionTreeId,
    };
    use crate::runtime::{RuntimeError, TaskId, TaskInfo};
    use std::sync::Arc;

    fn region(size: i64) -> LogicalRegion {
        LogicalRegion {
            tree: RegionTreeId(1),
            index_space: IndexSpace {
                id: IndexSpaceId(1),
                domain: Rect1::from_size(size),
            },
            field_space: FieldSpace { id: FieldSpaceId(1) },
        }
    }

    fn worker_info(point: i64, parts: i64) -> TaskInfo {
        let r = region(64);
        TaskInfo {
            task_id: TaskId(3),
            name: "worker".into(),
            leaf: true,
            index_point: Some(Point1(point)),
            index_domain: Some(Rect1::from_size(parts)),
            parent_processor: None,
            regions: vec![RegionRequirement::region(r, Privilege::ReadOnly, Coherence::Exclusive, r)
                .add_field(FieldId(0))],
        }
    }

    fn mappings(info: &TaskInfo) -> Vec<RegionMapping> {
        info.regions
            .iter()
            .map(|req| RegionMapping::new(req.clone(), region(64)))
            .collect()
    }

    #[test]
    fn test_default_mapper_round_robins_points() {
        let machine = Arc::new(Machine::build(&MachineConfig::default()));
        let cpus = machine.processors_of_kind(ProcessorKind::LocProc);
        let mapper = DefaultMapper::new(machine.clone(), cpus[0]);

        let targets: Vec<_> = (0..8)
            .map(|p| mapper.select_task_options(&worker_info(p, 8)).target_proc)
            .collect();
        assert_eq!(targets[0], cpus[0]);
        assert_eq!(targets[1], cpus[1]);
        assert_eq!(targets[4], cpus[0]);
    }

    #[test]
    fn test_default_mapper_ranks_by_bandwidth() {
        let machine = Arc::new(Machine::build(&MachineConfig::default()));
        let cpu = machine.processors_of_kind(ProcessorKind::LocProc)[0];
        let mapper = DefaultMapper::new(machine.clone(), cpu);
        let info = worker_info(0, 1);
        let mut regions = mappings(&info);

        mapper.map_task(&info, cpu, &mut regions).unwrap();
        let first = regions[0].target_ranking[0];
        assert_eq!(machine.memory(first).unwrap().kind, MemoryKind::SystemMem);
        assert!(regions[0].enable_war_optimization);
        assert_eq!(regions[0].layout(), Layout::ArrayOfStructs);
    }

    #[test]
    fn test_placement_mapper_overrides_every_region() {
        let machine = Arc::new(Machine::build(&MachineConfig::default()));
        let cpu = machine.processors_of_kind(ProcessorKind::LocProc)[0];
        let sysmem = machine.memories_of_kind(MemoryKind::SystemMem)[0];
        let mapper = PlacementMapper::new(machine.clone(), cpu).unwrap();
        let info = worker_info(2, 4);
        let mut regions = mappings(&info);

        mapper.map_task(&info, cpu, &mut regions).unwrap();
        let mapping = &regions[0];
        assert_eq!(mapping.target_ranking, vec![sysmem]);
        assert!(!mapping.virtual_map);
        assert!(!mapping.enable_war_optimization);
        assert!(!mapping.reduction_list);
        assert_eq!(mapping.blocking_factor, mapping.max_blocking_factor);
        assert_eq!(mapping.layout(), Layout::StructureOfArrays);
    }

    #[test]
    fn test_placement_mapper_disables_profiling_and_keeps_point_target() {
        let machine = Arc::new(Machine::build(&MachineConfig::default()));
        let cpus = machine.processors_of_kind(ProcessorKind::LocProc);
        let default = DefaultMapper::new(machine.clone(), cpus[0]);
        let placement = PlacementMapper::new(machine.clone(), cpus[0]).unwrap();

        for point in 0..4 {
            let info = worker_info(point, 4);
            let expected = default.select_task_options(&info);
            let options = placement.select_task_options(&info);
            assert!(expected.profile_task);
            assert!(!options.profile_task);
            assert_eq!(options.target_proc, expected.target_proc);
        }
    }

    #[test]
    fn test_two_system_memories_rejected_at_construction() {
        let machine = Arc::new(Machine::build(&MachineConfig {
            system_memories_per_node: 2,
            ..MachineConfig::default()
        }));
        let cpu = machine.processors_of_kind(ProcessorKind::LocProc)[0];

        assert!(matches!(
            PlacementMapper::new(machine, cpu),
            Err(RuntimeError::InvariantViolation(_))
        ));
    }

    #[test]
    fn test_zero_system_memories_rejected_at_construction() {
        let machine = Arc::new(Machine::build(&MachineConfig {
            system_memories_per_node: 0,
            ..MachineConfig::default()
        }));
        let cpu = machine.processors_of_kind(ProcessorKind::LocProc)[0];

        assert!(PlacementMapper::new(machine, cpu).is_err());
    }

    #[test]
    fn test_registration_replaces_every_local_mapper() {
        let machine = Arc::new(Machine::build(&MachineConfig::default()));
        let mut registry = MapperRegistry::with_defaults(machine.clone());
        let procs: Vec<_> = machine.processors().iter().map(|p| p.id).collect();

        register_placement_mappers(&machine, &mut registry, &procs).unwrap();
        for proc in procs {
            assert_eq!(registry.get(proc).unwrap().name(), "placement");
        }
    }

    #[test]
    fn test_multi_node_targets_own_node_memory() {
        let machine = Arc::new(Machine::build(&MachineConfig {
            nodes: 2,
            ..MachineConfig::default()
        }));
        let cpus = machine.processors_of_kind(ProcessorKind::LocProc);
        let remote = *cpus.last().unwrap();
        let mapper = PlacementMapper::new(machine.clone(), remote).unwrap();
        let info = worker_info(0, 1);
        let mut regions = mappings(&info);

        mapper.map_task(&info, remote, &mut regions).unwrap();
        let chosen = machine.memory(regions[0].target_ranking[0]).unwrap();
        assert_eq!(chosen.kind, MemoryKind::SystemMem);
        assert_eq!(chosen.node, Some(1));
    }
}
