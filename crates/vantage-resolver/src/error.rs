use thiserror::Error;

/// Errors surfaced by the resolver pool and wildcard detector.
#[derive(Error, Debug)]
pub enum ResolverError {
    /// Any error not covered by the other variants.
    #[error("{0}")]
    Other(anyhow::Error),

    /// Timeout, connection refused, or a reset read: retried per the
    /// resolver's retry-per-qtype table.
    #[error("transient network error talking to {server}: {source}")]
    TransientNetwork {
        server: String,
        #[source]
        source: anyhow::Error,
    },

    /// A malformed response that could not be decoded as a DNS message.
    #[error("malformed DNS response from {server}")]
    Protocol { server: String },

    /// NXDOMAIN or another authoritative negative answer. Terminal: the
    /// caller must not retry this query.
    #[error("{name} does not exist ({rcode})")]
    AuthoritativeNegative { name: String, rcode: String },

    /// No resolver in the pool currently has a free permit.
    #[error("no resolver available with a free permit")]
    PoolExhausted,

    /// The session's cancellation token fired mid-query.
    #[error("query cancelled")]
    Cancelled,
}

impl From<anyhow::Error> for ResolverError {
    fn from(error: anyhow::Error) -> Self {
        ResolverError::Other(error)
    }
}

impl ResolverError {
    /// Whether this error warrants a retry under the resolver's retry
    /// policy (§4.3's Rcode classification: NXDOMAIN is terminal, other
    /// non-success is retryable).
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            ResolverError::AuthoritativeNegative { .. } | ResolverError::Cancelled
        )
    }
}

pub type ResolverResult<T> = Result<T, ResolverError>;
