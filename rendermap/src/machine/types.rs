//! Processor and memory descriptors.

use std::fmt;

/// Index of a simulated node (address space).
pub type NodeId = u32;

/// Identifier of a processor in the machine.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct ProcessorId(pub u32);

impl fmt::Display for ProcessorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "proc-{}", self.0)
    }
}

/// Identifier of a memory in the machine.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct MemoryId(pub u32);

impl fmt::Display for MemoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mem-{}", self.0)
    }
}

/// Processor kinds known to the runtime.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum ProcessorKind {
    /// Latency-optimised CPU running application tasks.
    LocProc,
    /// Utility processor reserved for runtime meta-work.
    UtilProc,
}

impl fmt::Display for ProcessorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LocProc => write!(f, "LOC_PROC"),
            Self::UtilProc => write!(f, "UTIL_PROC"),
        }
    }
}

/// Memory kinds known to the runtime.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum MemoryKind {
    /// Node-local system DRAM.
    SystemMem,
    /// Node-local DRAM registered for remote DMA.
    RegDmaMem,
    /// Machine-wide memory reachable from every node.
    GlobalMem,
}

impl MemoryKind {
    /// Returns true for system-class memories.
    pub fn is_system(&self) -> bool {
        matches!(self, Self::SystemMem)
    }
}

impl fmt::Display for MemoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SystemMem => write!(f, "SYSTEM_MEM"),
            Self::RegDmaMem => write!(f, "REGDMA_MEM"),
            Self::GlobalMem => write!(f, "GLOBAL_MEM"),
        }
    }
}

/// A processor and the node it lives on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Processor {
    pub id: ProcessorId,
    pub kind: ProcessorKind,
    pub node: NodeId,
}

/// A memory and, for node-local memories, the node it lives on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Memory {
    pub id: MemoryId,
    pub kind: MemoryKind,
    /// `None` for machine-wide memories.
    pub node: Option<NodeId>,
}

/// Processor-to-memory affinity. A memory is visible to a processor exactly
/// when an affinity between them exists.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Affinity {
    pub processor: ProcessorId,
    pub memory: MemoryId,
    /// Relative bandwidth; higher is better.
    pub bandwidth: u32,
    /// Relative latency; lower is better.
    pub latency: u32,
}
