use std::time::SystemTime;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::asset::{Asset, AssetKind};
use crate::edge::RelationKind;
use crate::error::GraphResult;
use crate::fingerprint::Fingerprint;
use crate::property::Property;

/// Opaque node handle, stable for the lifetime of a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u64);

/// Opaque edge handle, stable for the lifetime of a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeId(pub u64);

/// A node as stored: the asset payload plus its accumulated properties.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoredNode {
    pub id: NodeId,
    pub asset: Asset,
    pub properties: Vec<Property>,
    pub created_at: std::time::SystemTime,
    /// Updated to the current time on every repeat `upsert_node` observation;
    /// `since`-bounded reads filter on this field.
    pub last_seen: std::time::SystemTime,
}

/// An edge as stored: its endpoints, relation, and accumulated properties.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoredEdge {
    pub id: EdgeId,
    pub from: NodeId,
    pub to: NodeId,
    pub relation: RelationKind,
    pub properties: Vec<Property>,
    pub created_at: std::time::SystemTime,
    /// Updated to the current time on every repeat `upsert_edge` observation.
    pub last_seen: std::time::SystemTime,
}

/// Storage backend for the discovery graph. Mirrors the read/write/remove
/// shape of a generic key-value [Store], specialized to the graph's own
/// content-addressed keys (fingerprints) rather than opaque byte keys, since
/// the graph's operations and its storage API are the same surface.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Inserts a node if no node with this fingerprint exists yet, and
    /// returns its id either way (idempotent create, invariant I1).
    async fn upsert_node(&self, asset: Asset) -> GraphResult<NodeId>;

    /// Looks up a node by its content-fingerprint.
    async fn find_by_fingerprint(&self, fingerprint: &Fingerprint) -> GraphResult<Option<NodeId>>;

    /// Fetches a node by id.
    async fn get_node(&self, id: NodeId) -> GraphResult<Option<StoredNode>>;

    /// Fetches every node of the given kind currently in the graph, optionally
    /// bounded to those with `last_seen >= since`.
    async fn nodes_of_kind(
        &self,
        kind: AssetKind,
        since: Option<SystemTime>,
    ) -> GraphResult<Vec<StoredNode>>;

    /// Appends a property to an existing node. Errors with
    /// [crate::GraphError::MissingSource] if `property.source` is empty.
    async fn add_node_property(&self, id: NodeId, property: Property) -> GraphResult<()>;

    /// Creates an edge if one with this (from, to, relation) triple does not
    /// already exist, and returns its id either way. Errors with
    /// [crate::GraphError::MissingEndpoint] if either endpoint is unknown.
    async fn upsert_edge(
        &self,
        from: NodeId,
        to: NodeId,
        relation: RelationKind,
    ) -> GraphResult<EdgeId>;

    /// Appends a property to an existing edge.
    async fn add_edge_property(&self, id: EdgeId, property: Property) -> GraphResult<()>;

    /// Fetches an edge by id.
    async fn get_edge(&self, id: EdgeId) -> GraphResult<Option<StoredEdge>>;

    /// Edges directed away from `id`, optionally filtered to one relation and
    /// bounded to those with `last_seen >= since`.
    async fn outgoing(
        &self,
        id: NodeId,
        relation: Option<RelationKind>,
        since: Option<SystemTime>,
    ) -> GraphResult<Vec<StoredEdge>>;

    /// Edges directed into `id`, optionally filtered to one relation and
    /// bounded to those with `last_seen >= since`.
    async fn incoming(
        &self,
        id: NodeId,
        relation: Option<RelationKind>,
        since: Option<SystemTime>,
    ) -> GraphResult<Vec<StoredEdge>>;

    /// Total count of nodes currently stored, used for progress reporting.
    async fn node_count(&self) -> GraphResult<usize>;
}
