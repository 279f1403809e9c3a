use vantage_graph::{Asset, AssetGraph, Confidence, EdgeId, NodeId, RelationKind};

/// Writes an edge from `from` to `to` with `relation`, tagging a source
/// property on both endpoint creation and the edge itself. Shared by every
/// handler that turns a resolved DNS answer into graph writes.
pub async fn link(
    graph: &AssetGraph,
    from: NodeId,
    to: NodeId,
    relation: RelationKind,
    source: &str,
    confidence: Confidence,
) -> Result<EdgeId, vantage_graph::GraphError> {
    let edge = graph.create_edge(from, to, relation).await?;
    graph
        .create_edge_property(edge, "observed", true, source, confidence)
        .await?;
    Ok(edge)
}

/// Ensures an FQDN exists in the graph and returns its id, tagging the
/// discovery source on the node.
pub async fn ensure_fqdn(
    graph: &AssetGraph,
    name: &str,
    source: &str,
    confidence: Confidence,
) -> Result<NodeId, vantage_graph::GraphError> {
    let id = graph.create_asset(Asset::fqdn(name)).await?;
    graph
        .create_entity_property(id, "source", source, source, confidence)
        .await?;
    Ok(id)
}

/// The subdomain "stem" of a name: everything but its leftmost label. Used
/// to detect newly discovered subdomain stems per §4.5 point 4.
pub fn subdomain_stem(name: &str) -> Option<&str> {
    name.split_once('.').map(|(_, rest)| rest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subdomain_stem_strips_leftmost_label() {
        assert_eq!(subdomain_stem("www.corp.example.com"), Some("corp.example.com"));
        assert_eq!(subdomain_stem("example.com"), Some("com"));
        assert_eq!(subdomain_stem("com"), None);
    }
}
