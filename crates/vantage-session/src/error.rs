use thiserror::Error;

use vantage_dispatch::DispatchError;
use vantage_graph::GraphError;
use vantage_resolver::ResolverError;

/// The engine-wide error kind, mirroring the teacher's `NoosphereError`
/// shape: a catch-all `Other(anyhow::Error)` plus named variants for
/// conditions a caller actually branches on.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Any error not covered by the other variants.
    #[error("{0}")]
    Other(anyhow::Error),

    /// Timeout, connection refused, or reset: retried per the resolver's
    /// policy before ever reaching this variant.
    #[error("transient network error: {0}")]
    TransientNetwork(String),

    /// Malformed DNS/HTTP/JSON response.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// NXDOMAIN / HTTP 404 style negative answer: terminal for that query.
    #[error("authoritative negative answer: {0}")]
    AuthoritativeNegative(String),

    /// 429 or server-side throttle.
    #[error("rate limited by {source_name}")]
    RateLimited { source_name: String },

    /// Missing API key, unresolvable output directory: logged once at
    /// startup, the affected handler runs as a no-op.
    #[error("configuration error: {0}")]
    Config(String),

    /// The session's cancellation token fired.
    #[error("session cancelled")]
    Cancellation,

    /// A relation was attempted against a missing endpoint.
    #[error("graph conflict: {0}")]
    GraphConflict(String),
}

impl From<anyhow::Error> for EngineError {
    fn from(error: anyhow::Error) -> Self {
        EngineError::Other(error)
    }
}

impl From<DispatchError> for EngineError {
    fn from(error: DispatchError) -> Self {
        match error {
            DispatchError::Other(e) => EngineError::Other(e),
            other => EngineError::Other(anyhow::anyhow!(other)),
        }
    }
}

impl From<GraphError> for EngineError {
    fn from(error: GraphError) -> Self {
        match error {
            GraphError::Other(e) => EngineError::Other(e),
            GraphError::MissingEndpoint(id) => {
                EngineError::GraphConflict(format!("missing endpoint {id:?}"))
            }
            GraphError::MissingSource => {
                EngineError::GraphConflict("property missing source".to_string())
            }
        }
    }
}

impl From<ResolverError> for EngineError {
    fn from(error: ResolverError) -> Self {
        match error {
            ResolverError::Other(e) => EngineError::Other(e),
            ResolverError::TransientNetwork { server, source } => {
                EngineError::TransientNetwork(format!("{server}: {source}"))
            }
            ResolverError::Protocol { server } => EngineError::Protocol(server),
            ResolverError::AuthoritativeNegative { name, rcode } => {
                EngineError::AuthoritativeNegative(format!("{name} ({rcode})"))
            }
            ResolverError::PoolExhausted => {
                EngineError::TransientNetwork("resolver pool exhausted".to_string())
            }
            ResolverError::Cancelled => EngineError::Cancellation,
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
