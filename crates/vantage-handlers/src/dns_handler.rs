use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use trust_dns_resolver::proto::rr::RecordType;
use vantage_common::Filter;
use vantage_dispatch::{DispatchHandle, Event, EventTag, Handler};
use vantage_graph::{Asset, AssetKind, IdentifierKind, RelationKind};
use vantage_session::{AddressRecord, FqdnRecord, Session};

use crate::support::{ensure_fqdn, link, subdomain_stem};

/// Number of query types acquired from `MaxConnections` up front per event,
/// per §4.5 point 2 (`InitialQueryTypes`).
const INITIAL_QUERY_TYPES: usize = 4;

fn to_record_type(tag: EventTag) -> vantage_resolver::RequestTag {
    match tag {
        EventTag::Axfr => vantage_resolver::RequestTag::Axfr,
        EventTag::Cert => vantage_resolver::RequestTag::Cert,
        EventTag::Normal => vantage_resolver::RequestTag::Normal,
    }
}

/// The main producer handler: resolves an FQDN, consults the wildcard
/// detector, writes DNS-record edges, and fans out subdomain-stem and AXFR
/// follow-up events.
pub struct DnsHandler {
    session: Session,
    seen_names: Arc<Filter<String>>,
    seen_stems: Arc<Filter<String>>,
    include_unresolvable: bool,
}

impl DnsHandler {
    pub fn new(session: Session, include_unresolvable: bool) -> Self {
        DnsHandler {
            session,
            seen_names: Arc::new(Filter::default()),
            seen_stems: Arc::new(Filter::default()),
            include_unresolvable,
        }
    }

    /// Queries TXT, then CNAME, then A/AAAA, stopping as soon as a CNAME is
    /// found: its target resolves through its own follow-up event instead of
    /// this name's A/AAAA lookups.
    async fn resolve_ordered(&self, name: &str) -> (Vec<(RecordType, Vec<String>)>, bool) {
        let mut results = Vec::new();
        let mut cname_hit = false;
        for qtype in [RecordType::TXT, RecordType::CNAME, RecordType::A, RecordType::AAAA] {
            if let Ok(answers) = self.session.resolver_pool.resolve(name, qtype).await {
                if !answers.is_empty() {
                    if qtype == RecordType::CNAME {
                        cname_hit = true;
                    }
                    results.push((qtype, answers));
                }
            }
            if cname_hit {
                break;
            }
        }
        (results, cname_hit)
    }

    /// Appends one `amass.json` line for `name`, if the session was started
    /// with an output file. `addresses` is empty for an unresolvable name
    /// kept only because `IncludeUnresolvable` is set.
    async fn write_output(&self, name: &str, addresses: Vec<AddressRecord>) -> anyhow::Result<()> {
        let Some(writer) = &self.session.output else {
            return Ok(());
        };
        let domain = self
            .session
            .scope
            .matching_domain(name)
            .unwrap_or_else(|| name.to_string());
        writer
            .write_fqdn(&FqdnRecord {
                name: name.to_string(),
                domain,
                addresses,
                tag: "dns".to_string(),
                sources: vec!["dns".to_string()],
            })
            .await
    }
}

/// The exchange hostname out of an MX answer's RDATA string, which trust-dns
/// renders as `"<preference> <exchange>."`.
fn mx_exchange_name(answer: &str) -> &str {
    answer.rsplit(' ').next().unwrap_or(answer)
}

#[async_trait]
impl Handler for DnsHandler {
    fn plugin_name(&self) -> &str {
        "dns"
    }

    fn handler_name(&self) -> &str {
        "dns_resolve"
    }

    fn priority(&self) -> u8 {
        9
    }

    fn event_type(&self) -> AssetKind {
        AssetKind::Fqdn
    }

    fn transforms(&self) -> Vec<AssetKind> {
        vec![AssetKind::Fqdn, AssetKind::IpAddress]
    }

    fn max_instances(&self) -> usize {
        256
    }

    async fn handle(
        &self,
        event: Event,
        dispatch: DispatchHandle,
        suppressed: bool,
        cancel: CancellationToken,
    ) -> anyhow::Result<()> {
        let name = event.name.clone();

        if self.seen_names.duplicate(name.clone()).await {
            return Ok(());
        }
        if self.session.scope.fqdn_confidence(&name) == 0 {
            return Ok(());
        }
        if suppressed {
            debug!(%name, "dns handler short-circuiting on TTL suppression");
            return Ok(());
        }
        if cancel.is_cancelled() {
            return Ok(());
        }

        let _permits = self
            .session
            .resolver_pool
            .max_connections()
            .acquire_many_owned(INITIAL_QUERY_TYPES as u32)
            .await?;

        let (records, _cname_hit) = self.resolve_ordered(&name).await;
        let confidence = self.session.scope.fqdn_confidence(&name);

        let any_answers = records.iter().any(|(_, a)| !a.is_empty());
        if !any_answers {
            if self.include_unresolvable {
                debug!(%name, "unresolvable name kept per IncludeUnresolvable");
                self.write_output(&name, Vec::new()).await?;
            }
            return Ok(());
        }

        let flat_answers: Vec<String> = records.iter().flat_map(|(_, a)| a.clone()).collect();
        let matched = self
            .session
            .wildcard_detector
            .matches(&name, &flat_answers, to_record_type(event.tag))
            .await?;
        if matched {
            debug!(%name, "dropping wildcard match");
            return Ok(());
        }

        let node_id = ensure_fqdn(&self.session.graph, &name, "dns", confidence).await?;
        let mut addresses = Vec::new();

        for (qtype, answers) in &records {
            let relation = match qtype {
                RecordType::CNAME => RelationKind::CnameRecord,
                RecordType::A => RelationKind::ARecord,
                RecordType::AAAA => RelationKind::AaaaRecord,
                RecordType::TXT => RelationKind::TxtRecord,
                other => RelationKind::Other(format!("{other:?}").to_ascii_lowercase()),
            };
            for answer in answers {
                match qtype {
                    RecordType::A | RecordType::AAAA => {
                        let Ok(addr) = answer.parse::<std::net::IpAddr>() else {
                            continue;
                        };
                        if self.session.resolver_pool.blacklisted(&addr) {
                            debug!(%name, %addr, "dropping sinkhole-blacklisted answer");
                            continue;
                        }
                        let ip_id = self
                            .session
                            .graph
                            .create_asset(Asset::ip(addr))
                            .await?;
                        link(&self.session.graph, node_id, ip_id, RelationKind::ResolvesTo, "dns", confidence)
                            .await?;
                        link(&self.session.graph, node_id, ip_id, relation.clone(), "dns", confidence)
                            .await?;
                        addresses.push(AddressRecord {
                            ip: addr,
                            cidr: None,
                            asn: None,
                            desc: None,
                        });
                    }
                    RecordType::CNAME => {
                        let target_id =
                            ensure_fqdn(&self.session.graph, answer, "dns", confidence).await?;
                        link(&self.session.graph, node_id, target_id, relation.clone(), "dns", confidence)
                            .await?;
                        dispatch.dispatch_event(Event::new(
                            answer.clone(),
                            target_id,
                            AssetKind::Fqdn,
                        ))?;
                    }
                    RecordType::TXT => {
                        let txt_id = self
                            .session
                            .graph
                            .create_asset(Asset::Identifier {
                                kind: IdentifierKind::Other("txt".to_string()),
                                value: answer.clone(),
                            })
                            .await?;
                        link(&self.session.graph, node_id, txt_id, relation.clone(), "dns", confidence)
                            .await?;
                    }
                    _ => {}
                }
            }
        }

        self.write_output(&name, addresses).await?;

        if let Some(stem) = subdomain_stem(&name) {
            if !self.seen_stems.duplicate(stem.to_string()).await {
                let stem_confidence = self.session.scope.fqdn_confidence(stem);
                let stem_id = ensure_fqdn(&self.session.graph, stem, "dns", stem_confidence).await?;
                for (qtype, relation) in [
                    (RecordType::NS, RelationKind::NsRecord),
                    (RecordType::MX, RelationKind::MxRecord),
                ] {
                    if let Ok(answers) = self.session.resolver_pool.resolve(stem, qtype).await {
                        for raw in answers {
                            let answer = mx_exchange_name(&raw).to_string();
                            let server_id =
                                ensure_fqdn(&self.session.graph, &answer, "dns", stem_confidence)
                                    .await?;
                            link(
                                &self.session.graph,
                                stem_id,
                                server_id,
                                relation.clone(),
                                "dns",
                                stem_confidence,
                            )
                            .await?;
                            dispatch.dispatch_event(Event::new(
                                answer,
                                server_id,
                                AssetKind::Fqdn,
                            ))?;
                        }
                    }
                }
                for qtype in [RecordType::SOA, RecordType::SRV] {
                    let _ = self.session.resolver_pool.resolve(stem, qtype).await;
                }
            }
        }

        if self.session.config.active {
            if let Ok(ns_records) = self.session.resolver_pool.resolve(&name, RecordType::NS).await {
                for ns in ns_records {
                    if let Ok(addr) = format!("{ns}:53").parse::<SocketAddr>() {
                        if let Ok(names) = self.session.resolver_pool.zone_transfer(&name, addr).await {
                            for discovered in names {
                                let discovered_id =
                                    ensure_fqdn(&self.session.graph, &discovered, "axfr", 100).await?;
                                dispatch.dispatch_event(
                                    Event::new(discovered, discovered_id, AssetKind::Fqdn)
                                        .with_tag(EventTag::Axfr),
                                )?;
                            }
                        }
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_tag_maps_onto_the_matching_request_tag() {
        assert_eq!(to_record_type(EventTag::Normal), vantage_resolver::RequestTag::Normal);
        assert_eq!(to_record_type(EventTag::Axfr), vantage_resolver::RequestTag::Axfr);
        assert_eq!(to_record_type(EventTag::Cert), vantage_resolver::RequestTag::Cert);
    }

    #[test]
    fn mx_exchange_name_strips_the_leading_preference() {
        assert_eq!(mx_exchange_name("10 mail.example.com."), "mail.example.com.");
        assert_eq!(mx_exchange_name("mail.example.com."), "mail.example.com.");
    }
}
