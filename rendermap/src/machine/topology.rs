//! Immutable machine topology snapshot.
//!
//! The [`Machine`] is built once from a [`MachineConfig`] before the runtime
//! starts and then shared read-only (`Arc<Machine>`) by the runtime and every
//! mapper. Nothing mutates it afterwards.

use super::types::{Affinity, Memory, MemoryId, MemoryKind, NodeId, Processor, ProcessorId, ProcessorKind};
use crate::args::{atoi, flag_values};
use std::fmt;

/// Default number of simulated nodes.
pub const DEFAULT_NODES: u32 = 1;

/// Default application processors per node.
pub const DEFAULT_CPUS_PER_NODE: u32 = 4;

/// Default system memories per node.
pub const DEFAULT_SYSTEM_MEMORIES_PER_NODE: u32 = 1;

const SYSTEM_MEM_BANDWIDTH: u32 = 100;
const SYSTEM_MEM_LATENCY: u32 = 5;
const REGDMA_MEM_BANDWIDTH: u32 = 80;
const REGDMA_MEM_LATENCY: u32 = 10;
const GLOBAL_MEM_BANDWIDTH: u32 = 10;
const GLOBAL_MEM_LATENCY: u32 = 100;

/// Shape of the simulated machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MachineConfig {
    /// Number of nodes (address spaces).
    pub nodes: u32,
    /// `LOC_PROC` processors per node.
    pub cpus_per_node: u32,
    /// `SYSTEM_MEM` memories per node.
    pub system_memories_per_node: u32,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            nodes: DEFAULT_NODES,
            cpus_per_node: DEFAULT_CPUS_PER_NODE,
            system_memories_per_node: DEFAULT_SYSTEM_MEMORIES_PER_NODE,
        }
    }
}

impl MachineConfig {
    /// Overlays runtime flags (`-ll:cpu`, `-ll:nodes`) found in `args`.
    ///
    /// Negative values clamp to zero; unrelated arguments are ignored.
    pub fn with_input_args(mut self, args: &[String]) -> Self {
        for (flag, value) in flag_values(args, &["-ll:cpu", "-ll:nodes"]) {
            let value = atoi(value).clamp(0, i64::from(u32::MAX)) as u32;
            match flag {
                "-ll:cpu" => self.cpus_per_node = value,
                "-ll:nodes" => self.nodes = value,
                _ => {}
            }
        }
        self
    }
}

/// Snapshot of processors, memories and their affinities.
#[derive(Clone, Debug)]
pub struct Machine {
    processors: Vec<Processor>,
    memories: Vec<Memory>,
    affinities: Vec<Affinity>,
    nodes: u32,
}

impl Machine {
    /// Builds the topology described by `config`.
    ///
    /// Every node gets one utility processor, `cpus_per_node` application
    /// processors, `system_memories_per_node` system memories and one
    /// registered-DMA memory. Multi-node machines also get one global memory
    /// visible from every processor.
    pub fn build(config: &MachineConfig) -> Self {
        let mut processors = Vec::new();
        let mut memories = Vec::new();
        let mut affinities = Vec::new();
        let mut next_proc = 0u32;
        let mut next_mem = 0u32;

        for node in 0..config.nodes {
            let first_proc = processors.len();
            processors.push(Processor {
                id: ProcessorId(next_proc),
                kind: ProcessorKind::UtilProc,
                node,
            });
            next_proc += 1;
            for _ in 0..config.cpus_per_node {
                processors.push(Processor {
                    id: ProcessorId(next_proc),
                    kind: ProcessorKind::LocProc,
                    node,
                });
                next_proc += 1;
            }

            let mut node_memories = Vec::new();
            for _ in 0..config.system_memories_per_node {
                node_memories.push((MemoryKind::SystemMem, SYSTEM_MEM_BANDWIDTH, SYSTEM_MEM_LATENCY));
            }
            node_memories.push((MemoryKind::RegDmaMem, REGDMA_MEM_BANDWIDTH, REGDMA_MEM_LATENCY));

            for (kind, bandwidth, latency) in node_memories {
                let memory = Memory {
                    id: MemoryId(next_mem),
                    kind,
                    node: Some(node),
                };
                next_mem += 1;
                for proc in &processors[first_proc..] {
                    affinities.push(Affinity {
                        processor: proc.id,
                        memory: memory.id,
                        bandwidth,
                        latency,
                    });
                }
                memories.push(memory);
            }
        }

        if config.nodes > 1 {
            let global = Memory {
                id: MemoryId(next_mem),
                kind: MemoryKind::GlobalMem,
                node: None,
            };
            for proc in &processors {
                affinities.push(Affinity {
                    processor: proc.id,
                    memory: global.id,
                    bandwidth: GLOBAL_MEM_BANDWIDTH,
                    latency: GLOBAL_MEM_LATENCY,
                });
            }
            memories.push(global);
        }

        Self {
            processors,
            memories,
            affinities,
            nodes: config.nodes,
        }
    }

    /// Returns the number of nodes.
    pub fn node_count(&self) -> u32 {
        self.nodes
    }

    /// Returns all processors in id order.
    pub fn processors(&self) -> &[Processor] {
        &self.processors
    }

    /// Returns all memories in id order.
    pub fn memories(&self) -> &[Memory] {
        &self.memories
    }

    /// Looks up a processor.
    pub fn processor(&self, id: ProcessorId) -> Option<&Processor> {
        self.processors.iter().find(|p| p.id == id)
    }

    /// Looks up a memory.
    pub fn memory(&self, id: MemoryId) -> Option<&Memory> {
        self.memories.iter().find(|m| m.id == id)
    }

    /// Returns ids of all processors of `kind`, in id order.
    pub fn processors_of_kind(&self, kind: ProcessorKind) -> Vec<ProcessorId> {
        self.processors
            .iter()
            .filter(|p| p.kind == kind)
            .map(|p| p.id)
            .collect()
    }

    /// Returns ids of all memories of `kind`, in id order.
    pub fn memories_of_kind(&self, kind: MemoryKind) -> Vec<MemoryId> {
        self.memories
            .iter()
            .filter(|m| m.kind == kind)
            .map(|m| m.id)
            .collect()
    }

    /// Returns the memories visible to `proc`, in id order.
    pub fn visible_memories(&self, proc: ProcessorId) -> Vec<MemoryId> {
        self.affinities
            .iter()
            .filter(|a| a.processor == proc)
            .map(|a| a.memory)
            .collect()
    }

    /// Returns the affinity between `proc` and `mem`, if `mem` is visible.
    pub fn affinity(&self, proc: ProcessorId, mem: MemoryId) -> Option<&Affinity> {
        self.affinities
            .iter()
            .find(|a| a.processor == proc && a.memory == mem)
    }

    /// Returns the node hosting `proc`.
    pub fn node_of(&self, proc: ProcessorId) -> Option<NodeId> {
        self.processor(proc).map(|p| p.node)
    }
}

impl fmt::Display for Machine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Machine: {} node(s)", self.nodes)?;
        for node in 0..self.nodes {
            writeln!(f, "  node {}:", node)?;
            for proc in self.processors.iter().filter(|p| p.node == node) {
                writeln!(f, "    {} {}", proc.id, proc.kind)?;
            }
            for mem in self.memories.iter().filter(|m| m.node == Some(node)) {
                writeln!(f, "    {} {}", mem.id, mem.kind)?;
            }
        }
        for mem in self.memories.iter().filter(|m| m.node.is_none()) {
            writeln!(f, "  global: {} {}", mem.id, mem.kind)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_single_node_layout() {
        let machine = Machine::build(&MachineConfig::default());

        assert_eq!(machine.node_count(), 1);
        assert_eq!(machine.processors_of_kind(ProcessorKind::LocProc).len(), 4);
        assert_eq!(machine.processors_of_kind(ProcessorKind::UtilProc).len(), 1);
        assert_eq!(machine.memories_of_kind(MemoryKind::SystemMem).len(), 1);
        assert_eq!(machine.memories_of_kind(MemoryKind::RegDmaMem).len(), 1);
        assert!(machine.memories_of_kind(MemoryKind::GlobalMem).is_empty());
    }

    #[test]
    fn test_multi_node_adds_global_memory() {
        let config = MachineConfig {
            nodes: 2,
            ..MachineConfig::default()
        };
        let machine = Machine::build(&config);

        let global = machine.memories_of_kind(MemoryKind::GlobalMem);
        assert_eq!(global.len(), 1);
        for proc in machine.processors() {
            assert!(machine.visible_memories(proc.id).contains(&global[0]));
        }
    }

    #[test]
    fn test_each_cpu_sees_only_its_node_system_memory() {
        let config = MachineConfig {
            nodes: 3,
            cpus_per_node: 2,
            system_memories_per_node: 1,
        };
        let machine = Machine::build(&config);

        for proc in machine.processors_of_kind(ProcessorKind::LocProc) {
            let node = machine.node_of(proc).unwrap();
            let sysmems: Vec<_> = machine
                .visible_memories(proc)
                .into_iter()
                .filter(|m| machine.memory(*m).unwrap().kind.is_system())
                .collect();
            assert_eq!(sysmems.len(), 1);
            assert_eq!(machine.memory(sysmems[0]).unwrap().node, Some(node));
        }
    }

    #[test]
    fn test_affinity_prefers_system_memory() {
        let machine = Machine::build(&MachineConfig::default());
        let proc = machine.processors_of_kind(ProcessorKind::LocProc)[0];
        let sysmem = machine.memories_of_kind(MemoryKind::SystemMem)[0];
        let regdma = machine.memories_of_kind(MemoryKind::RegDmaMem)[0];

        let sys = machine.affinity(proc, sysmem).unwrap();
        let reg = machine.affinity(proc, regdma).unwrap();
        assert!(sys.bandwidth > reg.bandwidth);
    }

    #[test]
    fn test_input_args_override() {
        let config = MachineConfig::default().with_input_args(&args(&[
            "-n", "10", "-ll:cpu", "8", "-ll:nodes", "2",
        ]));
        assert_eq!(config.cpus_per_node, 8);
        assert_eq!(config.nodes, 2);
    }

    #[test]
    fn test_input_args_negative_clamps_to_zero() {
        let config = MachineConfig::default().with_input_args(&args(&["-ll:cpu", "-3"]));
        assert_eq!(config.cpus_per_node, 0);
    }

    #[test]
    fn test_display_lists_memories() {
        let machine = Machine::build(&MachineConfig::default());
        let text = machine.to_string();
        assert!(text.contains("SYSTEM_MEM"));
        assert!(text.contains("LOC_PROC"));
    }
}
