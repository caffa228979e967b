//! Machine topology: processors, memories and affinities.
//!
//! The topology is captured once into an immutable [`Machine`] snapshot and
//! shared by reference with the runtime and every mapper.

mod topology;
mod types;

pub use topology::{
    Machine, MachineConfig, DEFAULT_CPUS_PER_NODE, DEFAULT_NODES, DEFAULT_SYSTEM_MEMORIES_PER_NODE,
};
pub use types::{Affinity, Memory, MemoryId, MemoryKind, NodeId, Processor, ProcessorId, ProcessorKind};
