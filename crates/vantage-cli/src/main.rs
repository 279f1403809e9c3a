mod cli;

use anyhow::Result;
use clap::Parser;
use tracing::*;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use vantage_dispatch::{Event, HandlerRegistry};
use vantage_graph::AssetKind;
use vantage_handlers::{DnsHandler, ReverseSweepHandler};
use vantage_session::{default_config_path, Config, Session};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    raise_fd_limit();

    let cli = cli::Cli::parse();
    let (config_path, overrides) = cli.into_overrides();
    let config_path = config_path.or_else(default_config_path);

    let base_config = match &config_path {
        Some(path) if path.exists() => Config::load_file(path).await?,
        _ => Config::default(),
    };
    let config = base_config.merge_cli(overrides);

    let domains = if let Some(path) = &config.domains_file {
        let mut domains = config.domains.clone();
        domains.extend(read_domains_file(path).await?);
        domains
    } else {
        config.domains.clone()
    };
    let mut config = config;
    config.domains = domains;

    if config.domains.is_empty() && config.asns.is_empty() && config.ips.is_empty() && config.cidrs.is_empty() {
        error!("no scope provided: pass -d, -df, --asn, --ip, or --cidr");
        std::process::exit(2);
    }

    let include_unresolvable = config.list_only;
    let (session, mut registry) = Session::new(config.clone()).await?;

    registry.register_handler(std::sync::Arc::new(DnsHandler::new(session.clone(), include_unresolvable)))?;
    registry.register_handler(std::sync::Arc::new(ReverseSweepHandler::new(session.clone())))?;

    let (dispatcher, _loop_handle) = session.start_dispatch(registry);

    for domain in &session.config.domains {
        let node_id = session.graph.create_asset(vantage_graph::Asset::fqdn(domain)).await?;
        dispatcher.dispatch_event(Event::new(domain.clone(), node_id, AssetKind::Fqdn))?;
    }

    let run = dispatcher.run_until_drained();
    match session.config.timeout_minutes {
        Some(minutes) => {
            let deadline = std::time::Duration::from_secs(minutes * 60);
            if tokio::time::timeout(deadline, run).await.is_err() {
                warn!(minutes, "session timed out before draining, shutting down");
            }
        }
        None => run.await,
    }

    dispatcher.shutdown().await?;

    info!(
        nodes = session.graph.node_count().await?,
        "session complete"
    );

    Ok(())
}

async fn read_domains_file(path: &std::path::Path) -> Result<Vec<String>> {
    let contents = tokio::fs::read_to_string(path).await?;
    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

/// Raises the soft open-file limit to the hard limit so `MaxConnections`
/// (derived from the soft limit) isn't artificially starved by a low
/// shell-inherited default.
#[cfg(unix)]
fn raise_fd_limit() {
    let mut rlim = libc::rlimit {
        rlim_cur: 0,
        rlim_max: 0,
    };
    // SAFETY: `rlim` is a plain-old-data struct sized and laid out by libc;
    // getrlimit only writes into it.
    if unsafe { libc::getrlimit(libc::RLIMIT_NOFILE, &mut rlim) } != 0 {
        debug!("getrlimit(RLIMIT_NOFILE) failed, leaving the inherited limit in place");
        return;
    }
    if rlim.rlim_cur >= rlim.rlim_max {
        return;
    }
    let previous = rlim.rlim_cur;
    rlim.rlim_cur = rlim.rlim_max;
    // SAFETY: same struct round-tripped from getrlimit, only rlim_cur changed.
    if unsafe { libc::setrlimit(libc::RLIMIT_NOFILE, &rlim) } != 0 {
        debug!("setrlimit(RLIMIT_NOFILE) failed, leaving the inherited limit in place");
    } else {
        debug!(from = previous, to = rlim.rlim_cur, "raised file descriptor limit");
    }
}

#[cfg(not(unix))]
fn raise_fd_limit() {}
