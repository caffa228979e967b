//! Partitioning of index domains into colored views.
//!
//! A [`DomainColoring`] assigns a rectangle of the parent domain to each
//! color; the runtime turns it into an index partition. The benchmark uses
//! [`AliasedPartitionScheme`], where every color spans the full domain.

mod coloring;
mod scheme;

pub use coloring::DomainColoring;
pub use scheme::AliasedPartitionScheme;
