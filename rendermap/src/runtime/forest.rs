//! The region forest: index spaces, field spaces, partitions and region
//! trees, plus the physical state of every tree.
//!
//! Each logical region created by a task roots its own tree. A tree keeps
//! one instance per memory, the set of memories holding current data, and
//! the restriction/acquire state of the simultaneous-coherence protocol.

use super::error::RuntimeError;
use super::telemetry::{EventSink, RuntimeEvent};
use crate::machine::MemoryId;
use crate::partition::DomainColoring;
use crate::region::{
    Coherence, FieldId, FieldInfo, FieldSpace, FieldSpaceId, IndexPartition, IndexPartitionId,
    IndexSpace, IndexSpaceId, Layout, LogicalRegion, PhysicalInstance, PhysicalRegion, Point1,
    Privilege, Rect1, RegionTreeId,
};
use crate::serdez::{SerdezId, SerdezRegistry};
use crate::transfer;
use dashmap::DashMap;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

/// Physical state of one region tree.
#[derive(Debug)]
pub struct TreeState {
    root: LogicalRegion,
    instances: BTreeMap<MemoryId, Arc<RwLock<PhysicalInstance>>>,
    /// Memories whose instance holds current data.
    validity: BTreeSet<MemoryId>,
    /// Instance sub-tasks are forced onto while the tree is not acquired.
    restricted_to: Option<MemoryId>,
    acquired: bool,
}

impl TreeState {
    pub fn root(&self) -> LogicalRegion {
        self.root
    }

    pub fn validity(&self) -> &BTreeSet<MemoryId> {
        &self.validity
    }

    pub fn restricted_to(&self) -> Option<MemoryId> {
        self.restricted_to
    }

    pub fn is_acquired(&self) -> bool {
        self.acquired
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }
}

struct PartitionEntry {
    handle: IndexPartition,
    subspaces: BTreeMap<Point1, IndexSpace>,
}

/// A region mapped for a task.
pub(crate) struct MappedRegion {
    pub physical: PhysicalRegion,
    /// Restriction overrode the mapper's choice of memory.
    pub restricted: bool,
}

/// What a task asks the forest to map.
pub(crate) struct MapRequest<'a> {
    pub region: LogicalRegion,
    pub privilege: Privilege,
    pub coherence: Coherence,
    pub fields: &'a [FieldId],
    pub ranking: &'a [MemoryId],
    pub layout: Layout,
}

pub(crate) struct RegionForest {
    serdez: SerdezRegistry,
    sink: Arc<dyn EventSink>,
    next_id: AtomicU64,
    index_spaces: DashMap<IndexSpaceId, Rect1>,
    field_spaces: DashMap<FieldSpaceId, BTreeMap<FieldId, FieldInfo>>,
    partitions: DashMap<IndexPartitionId, PartitionEntry>,
    trees: DashMap<RegionTreeId, Arc<Mutex<TreeState>>>,
}

fn lock(tree: &Mutex<TreeState>) -> Result<MutexGuard<'_, TreeState>, RuntimeError> {
    tree.lock()
        .map_err(|_| RuntimeError::invariant("region tree state poisoned"))
}

impl RegionForest {
    pub fn new(serdez: SerdezRegistry, sink: Arc<dyn EventSink>) -> Self {
        Self {
            serdez,
            sink,
            next_id: AtomicU64::new(1),
            index_spaces: DashMap::new(),
            field_spaces: DashMap::new(),
            partitions: DashMap::new(),
            trees: DashMap::new(),
        }
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    // =========================================================================
    // Index and field spaces
    // =========================================================================

    pub fn create_index_space(&self, domain: Rect1) -> IndexSpace {
        let id = IndexSpaceId(self.next_id());
        self.index_spaces.insert(id, domain);
        IndexSpace { id, domain }
    }

    pub fn destroy_index_space(&self, space: IndexSpace) -> Result<(), RuntimeError> {
        self.index_spaces
            .remove(&space.id)
            .map(|_| ())
            .ok_or_else(|| RuntimeError::invariant(format!("{} destroyed twice", space.id)))
    }

    pub fn create_field_space(&self) -> FieldSpace {
        let id = FieldSpaceId(self.next_id());
        self.field_spaces.insert(id, BTreeMap::new());
        FieldSpace { id }
    }

    pub fn destroy_field_space(&self, space: FieldSpace) -> Result<(), RuntimeError> {
        self.field_spaces
            .remove(&space.id)
            .map(|_| ())
            .ok_or_else(|| RuntimeError::invariant(format!("{} destroyed twice", space.id)))
    }

    /// Allocates `fid` in `space`. The field must name a registered codec.
    pub fn allocate_field(&self, space: FieldSpace, fid: FieldId, info: FieldInfo) -> Result<FieldId, RuntimeError> {
        if info.serdez == SerdezId::NONE || !self.serdez.contains(info.serdez) {
            return Err(RuntimeError::invariant(format!(
                "{} names unregistered serdez {}",
                fid, info.serdez
            )));
        }
        let mut fields = self
            .field_spaces
            .get_mut(&space.id)
            .ok_or_else(|| RuntimeError::invariant(format!("unknown {}", space.id)))?;
        if fields.contains_key(&fid) {
            return Err(RuntimeError::invariant(format!(
                "{} already allocated in {}",
                fid, space.id
            )));
        }
        fields.insert(fid, info);
        Ok(fid)
    }

    pub fn field_info(&self, space: FieldSpace, fid: FieldId) -> Result<FieldInfo, RuntimeError> {
        self.field_spaces
            .get(&space.id)
            .and_then(|fields| fields.get(&fid).copied())
            .ok_or_else(|| RuntimeError::invariant(format!("{} not allocated in {}", fid, space.id)))
    }

    // =========================================================================
    // Regions and partitions
    // =========================================================================

    pub fn create_logical_region(&self, index_space: IndexSpace, field_space: FieldSpace) -> Result<LogicalRegion, RuntimeError> {
        if !self.index_spaces.contains_key(&index_space.id) {
            return Err(RuntimeError::invariant(format!("unknown {}", index_space.id)));
        }
        if !self.field_spaces.contains_key(&field_space.id) {
            return Err(RuntimeError::invariant(format!("unknown {}", field_space.id)));
        }
        let root = LogicalRegion {
            tree: RegionTreeId(self.next_id()),
            index_space,
            field_space,
        };
        let state = TreeState {
            root,
            instances: BTreeMap::new(),
            validity: BTreeSet::new(),
            restricted_to: None,
            acquired: false,
        };
        self.trees.insert(root.tree, Arc::new(Mutex::new(state)));
        Ok(root)
    }

    /// Creates a partition of `parent` from `coloring`.
    ///
    /// Every color must lie in `color_space` and every rectangle in the
    /// parent domain. A partition claiming disjointness must not overlap.
    pub fn create_index_partition(
        &self,
        parent: IndexSpace,
        color_space: Rect1,
        coloring: &DomainColoring,
        disjoint: bool,
    ) -> Result<IndexPartition, RuntimeError> {
        if !self.index_spaces.contains_key(&parent.id) {
            return Err(RuntimeError::invariant(format!("unknown {}", parent.id)));
        }
        for (color, rect) in coloring.iter() {
            if !color_space.contains(color) {
                return Err(RuntimeError::invariant(format!(
                    "color {} outside color space {}",
                    color, color_space
                )));
            }
            if !parent.domain.contains_rect(&rect) {
                return Err(RuntimeError::invariant(format!(
                    "color {} maps {} outside parent domain {}",
                    color, rect, parent.domain
                )));
            }
        }
        if disjoint && !coloring.is_disjoint() {
            return Err(RuntimeError::invariant(
                "partition declared disjoint but colors overlap",
            ));
        }

        let handle = IndexPartition {
            id: IndexPartitionId(self.next_id()),
            parent,
            color_space,
            disjoint,
        };
        let subspaces = coloring
            .iter()
            .map(|(color, rect)| (color, self.create_index_space(rect)))
            .collect();
        self.partitions.insert(handle.id, PartitionEntry { handle, subspaces });
        Ok(handle)
    }

    pub fn subspace(&self, partition: IndexPartition, color: Point1) -> Result<IndexSpace, RuntimeError> {
        let entry = self
            .partitions
            .get(&partition.id)
            .ok_or_else(|| RuntimeError::invariant(format!("unknown {}", partition.id)))?;
        entry.subspaces.get(&color).copied().ok_or_else(|| {
            RuntimeError::invariant(format!(
                "color {} not in {} (color space {})",
                color, entry.handle.id, entry.handle.color_space
            ))
        })
    }

    // =========================================================================
    // Tree state
    // =========================================================================

    pub fn tree(&self, tree: RegionTreeId) -> Result<Arc<Mutex<TreeState>>, RuntimeError> {
        self.trees
            .get(&tree)
            .map(|t| Arc::clone(t.value()))
            .ok_or_else(|| RuntimeError::invariant(format!("{} does not exist", tree)))
    }

    pub fn live_trees(&self) -> Vec<RegionTreeId> {
        self.trees.iter().map(|t| *t.key()).collect()
    }

    /// Maps `request` onto an instance, creating or refreshing it as needed.
    pub fn map_region(&self, request: MapRequest<'_>) -> Result<MappedRegion, RuntimeError> {
        let tree_id = request.region.tree;
        let tree = self.tree(tree_id)?;
        let mut state = lock(&tree)?;

        let (memory, restricted) = match state.restricted_to {
            Some(memory) if !state.acquired => (memory, true),
            _ => {
                let memory = request.ranking.first().copied().ok_or_else(|| {
                    RuntimeError::invariant(format!("empty memory ranking for {}", request.region))
                })?;
                (memory, false)
            }
        };

        let instance = self.instance_for(&mut state, memory, request.layout, request.fields)?;

        if request.privilege.reads() && !state.validity.contains(&memory) {
            if let Some(src) = state.validity.iter().next().copied() {
                self.copy_between(&state, src, memory, request.fields)?;
                state.validity.insert(memory);
            }
        }
        if request.privilege.writes() {
            state.validity.clear();
            state.validity.insert(memory);
        }
        if request.coherence == Coherence::Simultaneous && !restricted {
            state.restricted_to = Some(memory);
        }

        let physical = PhysicalRegion::new(
            request.region,
            memory,
            request.layout,
            request.privilege,
            request.fields.to_vec(),
            instance,
        );
        Ok(MappedRegion { physical, restricted })
    }

    fn instance_for(
        &self,
        state: &mut TreeState,
        memory: MemoryId,
        layout: Layout,
        fields: &[FieldId],
    ) -> Result<Arc<RwLock<PhysicalInstance>>, RuntimeError> {
        let tree = state.root.tree;
        let domain = state.root.domain();
        let field_space = state.root.field_space;
        let instance = match state.instances.get(&memory) {
            Some(existing) => Arc::clone(existing),
            None => {
                let created = Arc::new(RwLock::new(PhysicalInstance::new(memory, domain, layout)));
                state.instances.insert(memory, Arc::clone(&created));
                self.sink.emit(RuntimeEvent::InstanceCreated { tree, memory, layout });
                created
            }
        };

        // Sibling readers map the same instance; only take the write lock
        // when the instance actually has to change.
        let guard = instance
            .read()
            .map_err(|_| RuntimeError::invariant("instance lock poisoned"))?;
        let current = guard.layout() == layout && fields.iter().all(|fid| guard.has_field(*fid));
        drop(guard);
        if current {
            return Ok(instance);
        }

        let mut guard = instance
            .write()
            .map_err(|_| RuntimeError::invariant("instance lock poisoned"))?;
        if guard.layout() != layout {
            tracing::debug!(tree = %tree, memory = %memory, from = %guard.layout(), to = %layout, "Relayout instance");
            guard.set_layout(layout);
        }
        for fid in fields {
            if !guard.has_field(*fid) {
                let info = self.field_info(field_space, *fid)?;
                let codec = self.serdez.get(info.serdez)?;
                guard.ensure_field(*fid, info.serdez, codec);
            }
        }
        drop(guard);
        Ok(instance)
    }

    fn copy_between(
        &self,
        state: &TreeState,
        src: MemoryId,
        dst: MemoryId,
        fields: &[FieldId],
    ) -> Result<(), RuntimeError> {
        let tree = state.root.tree;
        let domain = state.root.domain();
        let src_instance = state
            .instances
            .get(&src)
            .ok_or_else(|| RuntimeError::invariant(format!("no instance in {}", src)))?;
        let dst_instance = state
            .instances
            .get(&dst)
            .ok_or_else(|| RuntimeError::invariant(format!("no instance in {}", dst)))?;

        let src_guard = src_instance
            .read()
            .map_err(|_| RuntimeError::invariant("instance lock poisoned"))?;
        let mut dst_guard = dst_instance
            .write()
            .map_err(|_| RuntimeError::invariant("instance lock poisoned"))?;
        for fid in fields {
            if !src_guard.has_field(*fid) {
                continue;
            }
            let stats = transfer::copy_field(&src_guard, &mut dst_guard, *fid, domain)?;
            self.sink.emit(RuntimeEvent::CopyIssued {
                tree,
                field: *fid,
                src,
                dst,
                elements: stats.elements,
                bytes: stats.bytes,
            });
        }
        Ok(())
    }

    /// Lifts the restriction on a tree held simultaneously in `memory`.
    pub fn acquire(&self, tree_id: RegionTreeId, memory: MemoryId) -> Result<(), RuntimeError> {
        let tree = self.tree(tree_id)?;
        let mut state = lock(&tree)?;
        if state.restricted_to != Some(memory) {
            return Err(RuntimeError::invariant(format!(
                "acquire of {} in {} without a simultaneous mapping there",
                tree_id, memory
            )));
        }
        if state.acquired {
            return Err(RuntimeError::invariant(format!("{} acquired twice", tree_id)));
        }
        state.acquired = true;
        self.sink.emit(RuntimeEvent::Acquired { tree: tree_id, memory });
        Ok(())
    }

    /// Restores the restriction, flushing newer data into `memory`. Returns
    /// whether a flush copy was needed.
    pub fn release(&self, tree_id: RegionTreeId, memory: MemoryId, fields: &[FieldId]) -> Result<bool, RuntimeError> {
        let tree = self.tree(tree_id)?;
        let mut state = lock(&tree)?;
        if !state.acquired {
            return Err(RuntimeError::invariant(format!(
                "release of {} that is not acquired",
                tree_id
            )));
        }

        let mut flushed = false;
        if !state.validity.contains(&memory) {
            if let Some(src) = state.validity.iter().next().copied() {
                let layout = Layout::StructureOfArrays;
                self.instance_for(&mut state, memory, layout, fields)?;
                self.copy_between(&state, src, memory, fields)?;
                state.validity.insert(memory);
                flushed = true;
            }
        }
        state.acquired = false;
        self.sink.emit(RuntimeEvent::Released {
            tree: tree_id,
            memory,
            flushed,
        });
        Ok(flushed)
    }

    /// Clears the restriction a finished task placed on a tree.
    pub fn unrestrict(&self, tree_id: RegionTreeId, memory: MemoryId) -> Result<(), RuntimeError> {
        let Ok(tree) = self.tree(tree_id) else {
            return Ok(());
        };
        let mut state = lock(&tree)?;
        if state.restricted_to == Some(memory) {
            state.restricted_to = None;
            state.acquired = false;
        }
        Ok(())
    }

    /// Destroys a tree and every value in its instances.
    pub fn destroy_tree(&self, tree_id: RegionTreeId) -> Result<usize, RuntimeError> {
        let (_, tree) = self
            .trees
            .remove(&tree_id)
            .ok_or_else(|| RuntimeError::invariant(format!("{} destroyed twice", tree_id)))?;
        let mut state = lock(&tree)?;

        let mut values_destroyed = 0;
        for instance in std::mem::take(&mut state.instances).into_values() {
            let mut guard = instance
                .write()
                .map_err(|_| RuntimeError::invariant("instance lock poisoned"))?;
            values_destroyed += guard.destroy()?;
        }
        state.validity.clear();
        self.sink.emit(RuntimeEvent::RegionDestroyed {
            tree: tree_id,
            values_destroyed,
        });
        Ok(values_destroyed)
    }
}
