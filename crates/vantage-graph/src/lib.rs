//! The discovery graph: typed asset nodes, typed directed edges, and the
//! append-only source-tagged properties attached to each.

mod asset;
mod edge;
mod error;
mod fingerprint;
mod graph;
mod memory_store;
mod property;
mod store;

pub use asset::{Asset, AssetKind, Family, IdentifierKind};
pub use edge::{EdgeRecord, RelationKind};
pub use error::{GraphError, GraphResult};
pub use fingerprint::Fingerprint;
pub use graph::AssetGraph;
pub use memory_store::InMemoryGraphStore;
pub use property::{Confidence, Property, PropertyValue};
pub use store::{EdgeId, GraphStore, NodeId, StoredEdge, StoredNode};
