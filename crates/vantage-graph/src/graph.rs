use std::sync::Arc;
use std::time::SystemTime;

use crate::asset::{Asset, AssetKind};
use crate::edge::RelationKind;
use crate::error::GraphResult;
use crate::fingerprint::Fingerprint;
use crate::memory_store::InMemoryGraphStore;
use crate::property::{Confidence, Property, PropertyValue};
use crate::store::{EdgeId, GraphStore, NodeId, StoredEdge, StoredNode};

/// The discovery graph as handlers see it: a thin, cloneable façade over a
/// [GraphStore] backend. Defaults to [InMemoryGraphStore] but is generic so a
/// persistent backend can be swapped in without touching call sites.
#[derive(Clone)]
pub struct AssetGraph<S: GraphStore = InMemoryGraphStore> {
    store: Arc<S>,
    started_at: SystemTime,
}

impl AssetGraph<InMemoryGraphStore> {
    pub fn new() -> Self {
        AssetGraph {
            store: Arc::new(InMemoryGraphStore::new()),
            started_at: SystemTime::now(),
        }
    }
}

impl Default for AssetGraph<InMemoryGraphStore> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: GraphStore> AssetGraph<S> {
    pub fn with_store(store: S) -> Self {
        AssetGraph {
            store: Arc::new(store),
            started_at: SystemTime::now(),
        }
    }

    /// The time this graph (and so the owning session) began, used to
    /// timestamp TTL windows and the final report.
    pub fn start_time(&self) -> SystemTime {
        self.started_at
    }

    /// Creates an asset if it does not already exist (by fingerprint) and
    /// returns its id either way.
    pub async fn create_asset(&self, asset: Asset) -> GraphResult<NodeId> {
        self.store.upsert_node(asset).await
    }

    /// Creates a directed edge if it does not already exist and returns its
    /// id either way. Fails with [crate::GraphError::MissingEndpoint] if
    /// either endpoint is unknown to the graph.
    pub async fn create_edge(
        &self,
        from: NodeId,
        to: NodeId,
        relation: RelationKind,
    ) -> GraphResult<EdgeId> {
        self.store.upsert_edge(from, to, relation).await
    }

    /// Attaches a source-tagged property to a node.
    pub async fn create_entity_property(
        &self,
        id: NodeId,
        predicate: impl Into<String>,
        value: impl Into<PropertyValue>,
        source: impl Into<String>,
        confidence: Confidence,
    ) -> GraphResult<()> {
        let property = Property::new(predicate, value, source, confidence, SystemTime::now());
        self.store.add_node_property(id, property).await
    }

    /// Attaches a source-tagged property to an edge.
    pub async fn create_edge_property(
        &self,
        id: EdgeId,
        predicate: impl Into<String>,
        value: impl Into<PropertyValue>,
        source: impl Into<String>,
        confidence: Confidence,
    ) -> GraphResult<()> {
        let property = Property::new(predicate, value, source, confidence, SystemTime::now());
        self.store.add_edge_property(id, property).await
    }

    /// Looks up a node by its content-fingerprint, without creating it.
    pub async fn find_entity_by_fingerprint(
        &self,
        fingerprint: &Fingerprint,
    ) -> GraphResult<Option<NodeId>> {
        self.store.find_by_fingerprint(fingerprint).await
    }

    /// Fetches a node's current stored state.
    pub async fn get_entity(&self, id: NodeId) -> GraphResult<Option<StoredNode>> {
        self.store.get_node(id).await
    }

    /// Fetches every entity of a given kind, e.g. all discovered FQDNs,
    /// optionally bounded to those with `last_seen >= since`.
    pub async fn find_entities_by_kind(
        &self,
        kind: AssetKind,
        since: Option<SystemTime>,
    ) -> GraphResult<Vec<StoredNode>> {
        self.store.nodes_of_kind(kind, since).await
    }

    /// Outgoing edges from a node, optionally filtered to one relation and
    /// bounded to those with `last_seen >= since`.
    pub async fn outgoing_edges(
        &self,
        id: NodeId,
        relation: Option<RelationKind>,
        since: Option<SystemTime>,
    ) -> GraphResult<Vec<StoredEdge>> {
        self.store.outgoing(id, relation, since).await
    }

    /// Incoming edges into a node, optionally filtered to one relation and
    /// bounded to those with `last_seen >= since`.
    pub async fn incoming_edges(
        &self,
        id: NodeId,
        relation: Option<RelationKind>,
        since: Option<SystemTime>,
    ) -> GraphResult<Vec<StoredEdge>> {
        self.store.incoming(id, relation, since).await
    }

    /// Fetches a single edge's current stored state.
    pub async fn get_edge(&self, id: EdgeId) -> GraphResult<Option<StoredEdge>> {
        self.store.get_edge(id).await
    }

    /// All source names that have contributed a property to this entity,
    /// bounded to those observed at or after `since`, used by handlers
    /// deciding whether a finding is already well attested.
    pub async fn entity_tags(
        &self,
        id: NodeId,
        since: Option<SystemTime>,
    ) -> GraphResult<Vec<String>> {
        let node = self.store.get_node(id).await?;
        Ok(node
            .filter(|n| since.map_or(true, |s| n.last_seen >= s))
            .map(|n| {
                let mut sources: Vec<String> =
                    n.properties.into_iter().map(|p| p.source).collect();
                sources.sort();
                sources.dedup();
                sources
            })
            .unwrap_or_default())
    }

    /// All source names that have contributed a property to this edge,
    /// bounded to those observed at or after `since`.
    pub async fn edge_tags(
        &self,
        id: EdgeId,
        since: Option<SystemTime>,
    ) -> GraphResult<Vec<String>> {
        let edge = self.store.get_edge(id).await?;
        Ok(edge
            .filter(|e| since.map_or(true, |s| e.last_seen >= s))
            .map(|e| {
                let mut sources: Vec<String> =
                    e.properties.into_iter().map(|p| p.source).collect();
                sources.sort();
                sources.dedup();
                sources
            })
            .unwrap_or_default())
    }

    pub async fn node_count(&self) -> GraphResult<usize> {
        self.store.node_count().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_asset_is_idempotent_and_properties_accumulate() {
        let graph = AssetGraph::new();
        let id = graph.create_asset(Asset::fqdn("example.com")).await.unwrap();
        let id2 = graph.create_asset(Asset::fqdn("example.com")).await.unwrap();
        assert_eq!(id, id2);

        graph
            .create_entity_property(id, "ttl", "300", "dns", 100)
            .await
            .unwrap();
        graph
            .create_entity_property(id, "ttl", "300", "crtsh", 80)
            .await
            .unwrap();

        let tags = graph.entity_tags(id, None).await.unwrap();
        assert_eq!(tags, vec!["crtsh".to_string(), "dns".to_string()]);
    }

    #[tokio::test]
    async fn create_edge_between_known_nodes_succeeds() {
        let graph = AssetGraph::new();
        let a = graph.create_asset(Asset::fqdn("example.com")).await.unwrap();
        let b = graph
            .create_asset(Asset::fqdn("www.example.com"))
            .await
            .unwrap();
        let edge = graph
            .create_edge(a, b, RelationKind::CnameRecord)
            .await
            .unwrap();
        let outgoing = graph.outgoing_edges(a, None, None).await.unwrap();
        assert_eq!(outgoing.len(), 1);
        assert_eq!(outgoing[0].id, edge);
    }

    #[tokio::test]
    async fn edge_tags_reads_through_the_edge_id() {
        let graph = AssetGraph::new();
        let a = graph.create_asset(Asset::fqdn("example.com")).await.unwrap();
        let b = graph
            .create_asset(Asset::fqdn("www.example.com"))
            .await
            .unwrap();
        let edge = graph
            .create_edge(a, b, RelationKind::CnameRecord)
            .await
            .unwrap();
        graph
            .create_edge_property(edge, "observed", true, "dns", 100)
            .await
            .unwrap();
        let tags = graph.edge_tags(edge, None).await.unwrap();
        assert_eq!(tags, vec!["dns".to_string()]);
    }
}
