//! Region data model: domains, handles, requirements and physical instances.
//!
//! A logical region is an index space crossed with a field space. Logical
//! regions carry no data; tasks get at data through [`PhysicalRegion`]s the
//! runtime maps for them, backed by a [`PhysicalInstance`] in some memory.

mod accessor;
mod domain;
mod instance;
mod privilege;
mod space;

pub use accessor::{PhysicalRegion, RegionAccessor};
pub use domain::{Point1, Rect1};
pub use instance::{FieldStore, Layout, PhysicalInstance};
pub use privilege::{Coherence, Privilege, RegionRequirement, RegionTarget};
pub use space::{
    FieldId, FieldInfo, FieldSpace, FieldSpaceId, IndexPartition, IndexPartitionId, IndexSpace,
    IndexSpaceId, LogicalPartition, LogicalRegion, RegionTreeId,
};
