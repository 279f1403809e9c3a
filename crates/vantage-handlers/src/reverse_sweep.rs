use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use ipnetwork::IpNetwork;
use tokio_util::sync::CancellationToken;
use vantage_common::Filter;
use vantage_dispatch::{DispatchHandle, Event, EventTag, Handler};
use vantage_graph::{AssetKind, RelationKind};
use vantage_session::Session;

use crate::support::{ensure_fqdn, link};

/// How many neighboring addresses a passive session sweeps around a newly
/// discovered in-scope IP.
const PASSIVE_SWEEP_SIZE: u32 = 200;
/// The same, for an active session.
const ACTIVE_SWEEP_SIZE: u32 = 500;

/// PTR-sweeps the CIDR around every newly discovered in-scope IP address,
/// looking for sibling hosts a forward lookup never would have surfaced.
pub struct ReverseSweepHandler {
    session: Session,
    seen_addrs: Arc<Filter<IpAddr>>,
}

impl ReverseSweepHandler {
    pub fn new(session: Session) -> Self {
        ReverseSweepHandler {
            session,
            seen_addrs: Arc::new(Filter::default()),
        }
    }

    fn sweep_size(&self) -> u32 {
        if self.session.config.active {
            ACTIVE_SWEEP_SIZE
        } else {
            PASSIVE_SWEEP_SIZE
        }
    }
}

#[async_trait]
impl Handler for ReverseSweepHandler {
    fn plugin_name(&self) -> &str {
        "dns"
    }

    fn handler_name(&self) -> &str {
        "reverse_sweep"
    }

    fn priority(&self) -> u8 {
        4
    }

    fn event_type(&self) -> AssetKind {
        AssetKind::IpAddress
    }

    fn transforms(&self) -> Vec<AssetKind> {
        vec![AssetKind::Fqdn]
    }

    fn max_instances(&self) -> usize {
        64
    }

    async fn handle(
        &self,
        event: Event,
        dispatch: DispatchHandle,
        suppressed: bool,
        cancel: CancellationToken,
    ) -> anyhow::Result<()> {
        if suppressed {
            return Ok(());
        }
        let Ok(addr) = event.name.parse::<IpAddr>() else {
            return Ok(());
        };
        if self.session.scope.ip_confidence(addr) == 0 {
            return Ok(());
        }
        if self.seen_addrs.duplicate(addr).await {
            return Ok(());
        }

        let containing = match addr {
            IpAddr::V4(v4) => {
                let masked = IpNetwork::new(IpAddr::V4(v4), 24)?.network();
                IpNetwork::new(masked, 24)?
            }
            IpAddr::V6(v6) => {
                let masked = IpNetwork::new(IpAddr::V6(v6), 64)?.network();
                IpNetwork::new(masked, 64)?
            }
        };

        let sweep_size = self.sweep_size();
        for offset in 1..=sweep_size {
            if cancel.is_cancelled() {
                return Ok(());
            }
            let Some(candidate) = offset_addr(containing, offset) else {
                break;
            };
            if self.seen_addrs.duplicate(candidate).await {
                continue;
            }
            let Ok(names) = self.session.resolver_pool.reverse(candidate).await else {
                continue;
            };
            for name in names {
                if self.session.scope.fqdn_confidence(&name) == 0 {
                    continue;
                }
                let confidence = self.session.scope.fqdn_confidence(&name);
                let ip_id = self.session.graph.create_asset(vantage_graph::Asset::ip(candidate)).await?;
                let fqdn_id =
                    ensure_fqdn(&self.session.graph, &name, "reverse_sweep", confidence).await?;
                link(
                    &self.session.graph,
                    ip_id,
                    fqdn_id,
                    RelationKind::Other("ptr_record".to_string()),
                    "reverse_sweep",
                    confidence,
                )
                .await?;
                dispatch.dispatch_event(Event::new(name, fqdn_id, AssetKind::Fqdn).with_tag(EventTag::Normal))?;
            }
        }

        Ok(())
    }
}

/// The `offset`-th address after `network`'s base address, or `None` once the
/// offset runs past the network's own address space.
fn offset_addr(network: IpNetwork, offset: u32) -> Option<IpAddr> {
    match network.network() {
        IpAddr::V4(base) => {
            let base_bits = u32::from(base);
            let candidate_bits = base_bits.checked_add(offset)?;
            if !network.contains(IpAddr::V4(candidate_bits.into())) {
                return None;
            }
            Some(IpAddr::V4(candidate_bits.into()))
        }
        IpAddr::V6(base) => {
            let base_bits = u128::from(base);
            let candidate_bits = base_bits.checked_add(offset as u128)?;
            let candidate = IpAddr::V6(candidate_bits.into());
            if !network.contains(candidate) {
                return None;
            }
            Some(candidate)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_addr_walks_forward_within_the_network() {
        let net: IpNetwork = "203.0.113.0/24".parse().unwrap();
        assert_eq!(offset_addr(net, 1), Some("203.0.113.1".parse().unwrap()));
        assert_eq!(offset_addr(net, 255), None);
    }
}
