use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use vantage_dispatch::{Dispatcher, HandlerRegistry, SharedTtlCache, TtlCache};
use vantage_graph::AssetGraph;
use vantage_resolver::{Blacklist, ResolverPool, WildcardDetector};

use crate::config::Config;
use crate::output::OutputWriter;
use crate::rate_limit::SourceRateLimiter;
use crate::scope::Scope;

/// Everything a handler needs: the graph it reads/writes, the scope it
/// checks membership against, the resolver pool and wildcard detector it
/// queries, the cache it consults, and the cancellation token it must
/// observe. Cheap to clone; every field is already an `Arc`-backed handle.
#[derive(Clone)]
pub struct Session {
    pub graph: AssetGraph,
    pub scope: Arc<Scope>,
    pub resolver_pool: Arc<ResolverPool>,
    pub wildcard_detector: WildcardDetector,
    pub ttl_cache: SharedTtlCache,
    pub rate_limiter: Arc<SourceRateLimiter>,
    pub output: Option<Arc<OutputWriter>>,
    pub config: Arc<Config>,
    pub cancel: CancellationToken,
}

impl Session {
    /// Builds a session and its dispatcher from a resolved [Config]. The
    /// caller registers handlers on the returned [HandlerRegistry] before
    /// dispatch begins; see `vantage-handlers`.
    pub async fn new(config: Config) -> anyhow::Result<(Session, HandlerRegistry)> {
        let graph = AssetGraph::new();

        let scope = Arc::new(Scope::new(
            config.domains.clone(),
            config.cidrs.clone(),
            config.asns.clone(),
        ));

        let blacklist = Blacklist::new(config.blacklist_cidrs.clone());
        let max_connections = resolve_max_connections();
        let resolver_pool = Arc::new(ResolverPool::new(max_connections, blacklist));

        let resolver_addrs = if config.resolvers.is_empty() {
            default_resolvers()
        } else {
            config
                .resolvers
                .iter()
                .filter_map(|s| s.parse().ok())
                .collect()
        };
        resolver_pool
            .set_custom_resolvers(resolver_addrs, per_resolver_capacity())
            .await?;

        let wildcard_detector = WildcardDetector::spawn(Arc::clone(&resolver_pool));

        let ttl_cache: SharedTtlCache = Arc::new(TtlCache::new(ttl_windows_from_config(&config)));

        let rate_limiter = Arc::new(SourceRateLimiter::with_builtin_defaults());

        let output = match &config.output_file {
            Some(path) => Some(Arc::new(OutputWriter::create(path).await?)),
            None => None,
        };

        let cancel = CancellationToken::new();
        let config = Arc::new(config);

        let session = Session {
            graph,
            scope,
            resolver_pool,
            wildcard_detector,
            ttl_cache: Arc::clone(&ttl_cache),
            rate_limiter,
            output,
            config,
            cancel,
        };

        Ok((session, HandlerRegistry::new()))
    }

    /// Starts the dispatcher against the registered handlers. Returns the
    /// `Dispatcher` and its background join handle, matching the lifetime
    /// the caller (typically `vantage-cli`) manages.
    pub fn start_dispatch(
        &self,
        registry: HandlerRegistry,
    ) -> (Dispatcher, tokio::task::JoinHandle<()>) {
        Dispatcher::spawn(registry, Arc::clone(&self.ttl_cache), self.cancel.clone())
    }

    /// The session's start timestamp, used by handlers as the `since`
    /// filter bounding their reads.
    pub fn start_time(&self) -> std::time::SystemTime {
        self.graph.start_time()
    }
}

/// The config's flat `ttl_windows` table (a "from:to:source" string key to
/// seconds) is a serialization-friendly stand-in for [vantage_dispatch::TtlKey]'s
/// structured triple; this is where the two are reconciled.
fn ttl_windows_from_config(
    config: &Config,
) -> std::collections::HashMap<vantage_dispatch::TtlKey, std::time::Duration> {
    use vantage_dispatch::TtlKey;
    use vantage_graph::AssetKind;

    fn parse_kind(s: &str) -> Option<AssetKind> {
        Some(match s {
            "fqdn" => AssetKind::Fqdn,
            "ip_address" => AssetKind::IpAddress,
            "netblock" => AssetKind::Netblock,
            "autonomous_system" => AssetKind::AutonomousSystem,
            "service" => AssetKind::Service,
            _ => return None,
        })
    }

    config
        .ttl_windows
        .iter()
        .filter_map(|(key, seconds)| {
            let mut parts = key.splitn(3, ':');
            let from_type = parse_kind(parts.next()?)?;
            let to_type = parse_kind(parts.next()?)?;
            let source = parts.next()?.to_string();
            Some((
                TtlKey {
                    from_type,
                    to_type,
                    source,
                },
                std::time::Duration::from_secs(*seconds),
            ))
        })
        .collect()
}

fn resolve_max_connections() -> usize {
    #[cfg(unix)]
    {
        rlimit_based_max_connections().unwrap_or(vantage_resolver::MIN_MAX_CONNECTIONS)
    }
    #[cfg(not(unix))]
    {
        vantage_resolver::MIN_MAX_CONNECTIONS
    }
}

#[cfg(unix)]
fn rlimit_based_max_connections() -> Option<usize> {
    // Raising the soft limit to the hard limit happens once at process
    // startup (see vantage-cli's raise_fd_limit); here we just read whatever
    // is current.
    let mut limit = libc_rlimit_nofile()?;
    limit = (limit as f64 * 0.8) as u64;
    Some((limit as usize).max(vantage_resolver::MIN_MAX_CONNECTIONS))
}

#[cfg(unix)]
fn libc_rlimit_nofile() -> Option<u64> {
    let mut rlim = libc::rlimit {
        rlim_cur: 0,
        rlim_max: 0,
    };
    // SAFETY: `rlim` is sized and laid out by libc; getrlimit only writes into it.
    if unsafe { libc::getrlimit(libc::RLIMIT_NOFILE, &mut rlim) } != 0 {
        return None;
    }
    Some(rlim.rlim_cur as u64)
}

fn default_resolvers() -> Vec<std::net::SocketAddr> {
    vec![
        "1.1.1.1:53".parse().unwrap(),
        "8.8.8.8:53".parse().unwrap(),
        "9.9.9.9:53".parse().unwrap(),
    ]
}

fn per_resolver_capacity() -> usize {
    256
}
