//! Per-processor mapper table.

use super::default::DefaultMapper;
use super::traits::Mapper;
use crate::machine::{Machine, ProcessorId};
use crate::runtime::RuntimeError;
use std::collections::HashMap;
use std::sync::Arc;

/// One mapper per processor, [`DefaultMapper`] until replaced.
#[derive(Clone)]
pub struct MapperRegistry {
    machine: Arc<Machine>,
    mappers: HashMap<ProcessorId, Arc<dyn Mapper>>,
}

impl MapperRegistry {
    pub fn with_defaults(machine: Arc<Machine>) -> Self {
        let mappers = machine
            .processors()
            .iter()
            .map(|p| {
                let mapper: Arc<dyn Mapper> = Arc::new(DefaultMapper::new(Arc::clone(&machine), p.id));
                (p.id, mapper)
            })
            .collect();
        Self { machine, mappers }
    }

    pub fn machine(&self) -> &Arc<Machine> {
        &self.machine
    }

    /// Installs `mapper` for `proc`.
    pub fn replace_default_mapper(&mut self, mapper: Arc<dyn Mapper>, proc: ProcessorId) {
        tracing::trace!(processor = %proc, mapper = mapper.name(), "Replacing mapper");
        self.mappers.insert(proc, mapper);
    }

    pub fn get(&self, proc: ProcessorId) -> Result<Arc<dyn Mapper>, RuntimeError> {
        self.mappers
            .get(&proc)
            .cloned()
            .ok_or_else(|| RuntimeError::invariant(format!("no mapper for {}", proc)))
    }
}

impl std::fmt::Debug for MapperRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self
            .mappers
            .iter()
            .map(|(p, m)| (p.0, m.name().to_string()))
            .collect();
        names.sort();
        f.debug_struct("MapperRegistry").field("mappers", &names).finish()
    }
}
