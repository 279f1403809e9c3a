use std::collections::HashMap;
use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::asset::{Asset, AssetKind};
use crate::edge::RelationKind;
use crate::error::{GraphError, GraphResult};
use crate::fingerprint::Fingerprint;
use crate::property::Property;
use crate::store::{EdgeId, GraphStore, NodeId, StoredEdge, StoredNode};

/// True if `target` is reachable from `start` by following only `subsidiary`
/// edges, used to reject an edge that would close a cycle (invariant I6).
fn subsidiary_path_exists(inner: &StoreInner, start: NodeId, target: NodeId) -> bool {
    let mut stack = vec![start];
    let mut visited = std::collections::HashSet::new();
    while let Some(node) = stack.pop() {
        if node == target {
            return true;
        }
        if !visited.insert(node) {
            continue;
        }
        if let Some(edge_ids) = inner.outgoing.get(&node) {
            for edge_id in edge_ids {
                if let Some(edge) = inner.edges.get(edge_id) {
                    if edge.relation == RelationKind::Subsidiary {
                        stack.push(edge.to);
                    }
                }
            }
        }
    }
    false
}

#[derive(Default)]
struct StoreInner {
    nodes: HashMap<NodeId, StoredNode>,
    fingerprint_index: HashMap<Fingerprint, NodeId>,
    edges: HashMap<EdgeId, StoredEdge>,
    edge_index: HashMap<(NodeId, NodeId, RelationKind), EdgeId>,
    outgoing: HashMap<NodeId, Vec<EdgeId>>,
    incoming: HashMap<NodeId, Vec<EdgeId>>,
    next_node_id: u64,
    next_edge_id: u64,
}

/// The default, single-process [GraphStore]: a mutex-guarded in-memory index,
/// adequate for a session confined to one host. A persistent backend (sled,
/// as the teacher uses elsewhere) can implement the same trait without
/// touching [crate::AssetGraph].
#[derive(Clone, Default)]
pub struct InMemoryGraphStore {
    inner: Arc<Mutex<StoreInner>>,
}

impl InMemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GraphStore for InMemoryGraphStore {
    async fn upsert_node(&self, asset: Asset) -> GraphResult<NodeId> {
        let fingerprint = asset.fingerprint();
        let mut inner = self.inner.lock().await;
        if let Some(id) = inner.fingerprint_index.get(&fingerprint) {
            let id = *id;
            if let Some(node) = inner.nodes.get_mut(&id) {
                node.last_seen = SystemTime::now();
            }
            return Ok(id);
        }
        let id = NodeId(inner.next_node_id);
        inner.next_node_id += 1;
        inner.fingerprint_index.insert(fingerprint, id);
        let now = SystemTime::now();
        inner.nodes.insert(
            id,
            StoredNode {
                id,
                asset,
                properties: Vec::new(),
                created_at: now,
                last_seen: now,
            },
        );
        Ok(id)
    }

    async fn find_by_fingerprint(&self, fingerprint: &Fingerprint) -> GraphResult<Option<NodeId>> {
        let inner = self.inner.lock().await;
        Ok(inner.fingerprint_index.get(fingerprint).copied())
    }

    async fn get_node(&self, id: NodeId) -> GraphResult<Option<StoredNode>> {
        let inner = self.inner.lock().await;
        Ok(inner.nodes.get(&id).cloned())
    }

    async fn nodes_of_kind(
        &self,
        kind: AssetKind,
        since: Option<SystemTime>,
    ) -> GraphResult<Vec<StoredNode>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .nodes
            .values()
            .filter(|node| node.asset.kind() == kind)
            .filter(|node| since.map_or(true, |s| node.last_seen >= s))
            .cloned()
            .collect())
    }

    async fn add_node_property(&self, id: NodeId, property: Property) -> GraphResult<()> {
        if property.source.is_empty() {
            return Err(GraphError::MissingSource);
        }
        let mut inner = self.inner.lock().await;
        let node = inner
            .nodes
            .get_mut(&id)
            .ok_or_else(|| GraphError::MissingEndpoint(id))?;
        node.properties.push(property);
        Ok(())
    }

    async fn upsert_edge(
        &self,
        from: NodeId,
        to: NodeId,
        relation: RelationKind,
    ) -> GraphResult<EdgeId> {
        let mut inner = self.inner.lock().await;
        if !inner.nodes.contains_key(&from) {
            return Err(GraphError::MissingEndpoint(from));
        }
        if !inner.nodes.contains_key(&to) {
            return Err(GraphError::MissingEndpoint(to));
        }
        let key = (from, to, relation.clone());
        if let Some(id) = inner.edge_index.get(&key) {
            let id = *id;
            if let Some(edge) = inner.edges.get_mut(&id) {
                edge.last_seen = SystemTime::now();
            }
            return Ok(id);
        }
        if relation == RelationKind::Subsidiary && subsidiary_path_exists(&inner, to, from) {
            return Err(GraphError::SubsidiaryCycle { from, to });
        }
        let id = EdgeId(inner.next_edge_id);
        inner.next_edge_id += 1;
        inner.edge_index.insert(key, id);
        let now = SystemTime::now();
        inner.edges.insert(
            id,
            StoredEdge {
                id,
                from,
                to,
                relation,
                properties: Vec::new(),
                created_at: now,
                last_seen: now,
            },
        );
        inner.outgoing.entry(from).or_default().push(id);
        inner.incoming.entry(to).or_default().push(id);
        Ok(id)
    }

    async fn get_edge(&self, id: EdgeId) -> GraphResult<Option<StoredEdge>> {
        let inner = self.inner.lock().await;
        Ok(inner.edges.get(&id).cloned())
    }

    async fn add_edge_property(&self, id: EdgeId, property: Property) -> GraphResult<()> {
        if property.source.is_empty() {
            return Err(GraphError::MissingSource);
        }
        let mut inner = self.inner.lock().await;
        let edge = inner.edges.get_mut(&id).ok_or_else(|| {
            GraphError::Other(anyhow::anyhow!("edge {:?} does not exist in the graph", id))
        })?;
        edge.properties.push(property);
        Ok(())
    }

    async fn outgoing(
        &self,
        id: NodeId,
        relation: Option<RelationKind>,
        since: Option<SystemTime>,
    ) -> GraphResult<Vec<StoredEdge>> {
        let inner = self.inner.lock().await;
        let ids = inner.outgoing.get(&id).cloned().unwrap_or_default();
        Ok(ids
            .into_iter()
            .filter_map(|edge_id| inner.edges.get(&edge_id).cloned())
            .filter(|edge| relation.as_ref().map_or(true, |r| *r == edge.relation))
            .filter(|edge| since.map_or(true, |s| edge.last_seen >= s))
            .collect())
    }

    async fn incoming(
        &self,
        id: NodeId,
        relation: Option<RelationKind>,
        since: Option<SystemTime>,
    ) -> GraphResult<Vec<StoredEdge>> {
        let inner = self.inner.lock().await;
        let ids = inner.incoming.get(&id).cloned().unwrap_or_default();
        Ok(ids
            .into_iter()
            .filter_map(|edge_id| inner.edges.get(&edge_id).cloned())
            .filter(|edge| relation.as_ref().map_or(true, |r| *r == edge.relation))
            .filter(|edge| since.map_or(true, |s| edge.last_seen >= s))
            .collect())
    }

    async fn node_count(&self) -> GraphResult<usize> {
        let inner = self.inner.lock().await;
        Ok(inner.nodes.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upsert_node_is_idempotent() {
        let store = InMemoryGraphStore::new();
        let a = store.upsert_node(Asset::fqdn("example.com")).await.unwrap();
        let b = store.upsert_node(Asset::fqdn("EXAMPLE.com.")).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(store.node_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn edge_with_missing_endpoint_errors() {
        let store = InMemoryGraphStore::new();
        let a = store.upsert_node(Asset::fqdn("example.com")).await.unwrap();
        let missing = NodeId(999);
        let result = store.upsert_edge(a, missing, RelationKind::CnameRecord).await;
        assert!(matches!(result, Err(GraphError::MissingEndpoint(_))));
    }

    #[tokio::test]
    async fn outgoing_filters_by_relation() {
        let store = InMemoryGraphStore::new();
        let a = store.upsert_node(Asset::fqdn("example.com")).await.unwrap();
        let b = store.upsert_node(Asset::fqdn("www.example.com")).await.unwrap();
        store
            .upsert_edge(a, b, RelationKind::CnameRecord)
            .await
            .unwrap();
        let matches = store
            .outgoing(a, Some(RelationKind::CnameRecord), None)
            .await
            .unwrap();
        assert_eq!(matches.len(), 1);
        let none = store
            .outgoing(a, Some(RelationKind::ARecord), None)
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn node_property_requires_source() {
        let store = InMemoryGraphStore::new();
        let a = store.upsert_node(Asset::fqdn("example.com")).await.unwrap();
        let prop = Property::new("ttl", "300", "", 100, SystemTime::now());
        let result = store.add_node_property(a, prop).await;
        assert!(matches!(result, Err(GraphError::MissingSource)));
    }

    #[tokio::test]
    async fn since_bound_excludes_edges_seen_before_it() {
        let store = InMemoryGraphStore::new();
        let a = store.upsert_node(Asset::fqdn("example.com")).await.unwrap();
        let b = store.upsert_node(Asset::fqdn("www.example.com")).await.unwrap();
        store
            .upsert_edge(a, b, RelationKind::CnameRecord)
            .await
            .unwrap();
        let future_bound = SystemTime::now() + std::time::Duration::from_secs(60);
        let matches = store.outgoing(a, None, Some(future_bound)).await.unwrap();
        assert!(matches.is_empty());
    }

    #[tokio::test]
    async fn subsidiary_edge_rejected_if_it_would_close_a_cycle() {
        let store = InMemoryGraphStore::new();
        let a = store
            .upsert_node(Asset::Organization {
                name: "a".into(),
                legal_name: None,
                jurisdiction: None,
                registration_id: None,
                active: true,
            })
            .await
            .unwrap();
        let b = store
            .upsert_node(Asset::Organization {
                name: "b".into(),
                legal_name: None,
                jurisdiction: None,
                registration_id: None,
                active: true,
            })
            .await
            .unwrap();
        store
            .upsert_edge(a, b, RelationKind::Subsidiary)
            .await
            .unwrap();
        let result = store.upsert_edge(b, a, RelationKind::Subsidiary).await;
        assert!(matches!(result, Err(GraphError::SubsidiaryCycle { .. })));
    }

    #[tokio::test]
    async fn get_edge_returns_the_stored_edge() {
        let store = InMemoryGraphStore::new();
        let a = store.upsert_node(Asset::fqdn("example.com")).await.unwrap();
        let b = store.upsert_node(Asset::fqdn("www.example.com")).await.unwrap();
        let edge_id = store
            .upsert_edge(a, b, RelationKind::CnameRecord)
            .await
            .unwrap();
        let edge = store.get_edge(edge_id).await.unwrap().unwrap();
        assert_eq!(edge.from, a);
        assert_eq!(edge.to, b);
    }
}
