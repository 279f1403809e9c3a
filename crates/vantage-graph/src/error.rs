use thiserror::Error;

use crate::NodeId;

/// Errors surfaced by the [crate::AssetGraph] and its [crate::GraphStore]
/// backends.
#[derive(Error, Debug)]
pub enum GraphError {
    /// Any error not covered by the other variants.
    #[error("{0}")]
    Other(anyhow::Error),

    /// `CreateEdge` was attempted with an endpoint that does not (yet) exist
    /// in the graph. Corresponds to the `GraphConflict` error kind: the
    /// caller should abandon the finding rather than retry blindly.
    #[error("edge endpoint {0:?} does not exist in the graph")]
    MissingEndpoint(NodeId),

    /// An edge or entity property was attached without a source name, which
    /// would violate the "every edge carries at least one source property"
    /// invariant.
    #[error("property must carry a non-empty source name")]
    MissingSource,

    /// `CreateEdge` was attempted for a `subsidiary` relation that would
    /// close a cycle in the Organization subsidiary graph (invariant I6).
    #[error("edge from {from:?} to {to:?} would close a subsidiary cycle")]
    SubsidiaryCycle { from: NodeId, to: NodeId },
}

impl From<anyhow::Error> for GraphError {
    fn from(error: anyhow::Error) -> Self {
        GraphError::Other(error)
    }
}

/// Convenience alias used throughout this crate.
pub type GraphResult<T> = Result<T, GraphError>;
