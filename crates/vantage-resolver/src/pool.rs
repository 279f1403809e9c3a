use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rand::seq::SliceRandom;
use tokio::sync::{RwLock, Semaphore};
use tokio::time::{sleep, Duration};
use trust_dns_resolver::proto::rr::RecordType;

use crate::blacklist::Blacklist;
use crate::error::{ResolverError, ResolverResult};
use crate::resolver::Resolver;
use crate::wire;

/// Minimum size of the global connection semaphore, regardless of the open
/// file descriptor ulimit (§4.3 pool-level policy).
pub const MIN_MAX_CONNECTIONS: usize = 10_000;

fn retries_for(qtype: RecordType) -> usize {
    match qtype {
        RecordType::TXT => 10,
        RecordType::NS | RecordType::MX | RecordType::SOA => 7,
        _ => 3,
    }
}

struct PoolInner {
    resolvers: Vec<Arc<Resolver>>,
    monitors: Vec<tokio::task::JoinHandle<()>>,
}

/// The pool of DNS resolvers backing every lookup in a session, plus the
/// global socket-concurrency gate (`MaxConnections`) shared by DNS, HTTP,
/// and AXFR alike.
pub struct ResolverPool {
    inner: RwLock<PoolInner>,
    max_connections: Arc<Semaphore>,
    blacklist: Blacklist,
    next_index: AtomicUsize,
}

impl ResolverPool {
    pub fn new(max_connections: usize, blacklist: Blacklist) -> Self {
        ResolverPool {
            inner: RwLock::new(PoolInner {
                resolvers: Vec::new(),
                monitors: Vec::new(),
            }),
            max_connections: Arc::new(Semaphore::new(max_connections.max(MIN_MAX_CONNECTIONS))),
            blacklist,
            next_index: AtomicUsize::new(0),
        }
    }

    /// Replaces the pool's resolver set, per `SetCustomResolvers`.
    pub async fn set_custom_resolvers(
        &self,
        servers: Vec<SocketAddr>,
        per_resolver_capacity: usize,
    ) -> anyhow::Result<()> {
        let mut built = Vec::with_capacity(servers.len());
        for server in servers {
            built.push(Arc::new(Resolver::new(server, per_resolver_capacity)?));
        }

        let mut inner = self.inner.write().await;
        for handle in inner.monitors.drain(..) {
            handle.abort();
        }
        inner.monitors = built.iter().map(|r| r.spawn_monitor()).collect();
        inner.resolvers = built;
        Ok(())
    }

    /// Picks a uniformly random resolver with a free permit, retrying with a
    /// small backoff if every resolver is currently saturated.
    async fn next_resolver(&self) -> ResolverResult<Arc<Resolver>> {
        for attempt in 0..50 {
            let resolvers = self.inner.read().await.resolvers.clone();
            if resolvers.is_empty() {
                return Err(ResolverError::Other(anyhow::anyhow!(
                    "resolver pool has no configured resolvers"
                )));
            }
            let mut candidates = resolvers.clone();
            candidates.shuffle(&mut rand::thread_rng());
            for resolver in &candidates {
                if resolver.has_free_permit() {
                    return Ok(Arc::clone(resolver));
                }
            }
            let backoff = Duration::from_millis(10 * (attempt + 1));
            sleep(backoff).await;
        }
        Err(ResolverError::PoolExhausted)
    }

    /// `Resolve(name, qtype)`: retries per the qtype-specific retry table,
    /// stopping early on a terminal (authoritative-negative) error.
    pub async fn resolve(&self, name: &str, qtype: RecordType) -> ResolverResult<Vec<String>> {
        let max_attempts = retries_for(qtype);
        let mut last_error = None;
        for _ in 0..max_attempts {
            let _permit = self
                .max_connections
                .acquire()
                .await
                .map_err(|_| ResolverError::PoolExhausted)?;
            let resolver = self.next_resolver().await?;
            match resolver.resolve(name, qtype).await {
                Ok(answers) => return Ok(answers),
                Err(error) if !error.is_retryable() => return Err(error),
                Err(error) => last_error = Some(error),
            }
        }
        Err(last_error.unwrap_or(ResolverError::PoolExhausted))
    }

    /// `Reverse(addr)`: a PTR lookup, filtering sinkhole-blacklisted answers
    /// before returning.
    pub async fn reverse(&self, addr: std::net::IpAddr) -> ResolverResult<Vec<String>> {
        if self.blacklist.contains(&addr) {
            return Ok(Vec::new());
        }
        let name = reverse_name(addr);
        self.resolve(&name, RecordType::PTR).await
    }

    /// `ZoneTransfer(domain, sub, server)`.
    pub async fn zone_transfer(&self, zone: &str, server: SocketAddr) -> ResolverResult<Vec<String>> {
        let _permit = self
            .max_connections
            .acquire()
            .await
            .map_err(|_| ResolverError::PoolExhausted)?;
        wire::axfr(server, zone).await
    }

    pub fn max_connections(&self) -> Arc<Semaphore> {
        Arc::clone(&self.max_connections)
    }

    /// Whether `addr` falls inside a configured sinkhole range, per §4.4's
    /// "additional guard" against accepting hijacked answers.
    pub fn blacklisted(&self, addr: &std::net::IpAddr) -> bool {
        self.blacklist.contains(addr)
    }
}

fn reverse_name(addr: std::net::IpAddr) -> String {
    match addr {
        std::net::IpAddr::V4(v4) => {
            let o = v4.octets();
            format!("{}.{}.{}.{}.in-addr.arpa.", o[3], o[2], o[1], o[0])
        }
        std::net::IpAddr::V6(v6) => {
            let mut nibbles = String::new();
            for byte in v6.octets().iter().rev() {
                nibbles.push_str(&format!("{:x}.{:x}.", byte & 0xf, byte >> 4));
            }
            format!("{nibbles}ip6.arpa.")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reverse_name_v4_is_dotted_reversed() {
        let addr: std::net::IpAddr = "93.184.216.34".parse().unwrap();
        assert_eq!(reverse_name(addr), "34.216.184.93.in-addr.arpa.");
    }

    #[test]
    fn retry_counts_match_the_qtype_table() {
        assert_eq!(retries_for(RecordType::TXT), 10);
        assert_eq!(retries_for(RecordType::NS), 7);
        assert_eq!(retries_for(RecordType::A), 3);
    }
}
