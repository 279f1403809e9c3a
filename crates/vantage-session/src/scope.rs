use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::RwLock;

use ipnetwork::IpNetwork;

/// An asset's in-scope confidence, 0-100. 0 means out of scope.
pub type Confidence = u8;

/// The set of domains, CIDRs, and ASNs a session is permitted to expand
/// into. `AddDomain` can grow this at runtime (used by federation-style
/// handlers), so the domain set is behind a lock rather than built once.
#[derive(Default)]
pub struct Scope {
    domains: RwLock<HashSet<String>>,
    netblocks: RwLock<Vec<IpNetwork>>,
    asns: RwLock<HashSet<u32>>,
}

impl Scope {
    pub fn new(domains: Vec<String>, netblocks: Vec<IpNetwork>, asns: Vec<u32>) -> Self {
        Scope {
            domains: RwLock::new(
                domains
                    .into_iter()
                    .map(|d| d.trim_end_matches('.').to_ascii_lowercase())
                    .collect(),
            ),
            netblocks: RwLock::new(netblocks),
            asns: RwLock::new(asns.into_iter().collect()),
        }
    }

    /// Dynamically expands scope at runtime with a new root domain.
    pub fn add_domain(&self, domain: &str) {
        let normalized = domain.trim_end_matches('.').to_ascii_lowercase();
        self.domains.write().unwrap().insert(normalized);
    }

    /// An FQDN is in scope when its second-level domain (or the name itself,
    /// for apex names) matches a configured domain.
    pub fn fqdn_confidence(&self, name: &str) -> Confidence {
        let name = name.trim_end_matches('.').to_ascii_lowercase();
        let domains = self.domains.read().unwrap();
        if domains.iter().any(|d| name == *d || name.ends_with(&format!(".{d}"))) {
            100
        } else {
            0
        }
    }

    /// An IP is in scope when it falls inside a configured netblock.
    pub fn ip_confidence(&self, addr: IpAddr) -> Confidence {
        let netblocks = self.netblocks.read().unwrap();
        if netblocks.iter().any(|net| net.contains(addr)) {
            100
        } else {
            0
        }
    }

    pub fn asn_confidence(&self, asn: u32) -> Confidence {
        if self.asns.read().unwrap().contains(&asn) {
            100
        } else {
            0
        }
    }

    pub fn domains(&self) -> Vec<String> {
        self.domains.read().unwrap().iter().cloned().collect()
    }

    /// The configured root domain `name` falls under, e.g. `www.example.com`
    /// matches `example.com`. Used to label output records; `None` if `name`
    /// is out of scope.
    pub fn matching_domain(&self, name: &str) -> Option<String> {
        let name = name.trim_end_matches('.').to_ascii_lowercase();
        self.domains
            .read()
            .unwrap()
            .iter()
            .find(|d| name == **d || name.ends_with(&format!(".{d}")))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subdomain_of_configured_domain_is_in_scope() {
        let scope = Scope::new(vec!["example.com".into()], Vec::new(), Vec::new());
        assert_eq!(scope.fqdn_confidence("www.example.com"), 100);
        assert_eq!(scope.fqdn_confidence("example.com"), 100);
        assert_eq!(scope.fqdn_confidence("example.com.evil.test"), 0);
    }

    #[test]
    fn add_domain_expands_scope_at_runtime() {
        let scope = Scope::new(vec!["example.com".into()], Vec::new(), Vec::new());
        assert_eq!(scope.fqdn_confidence("sub.other.org"), 0);
        scope.add_domain("other.org");
        assert_eq!(scope.fqdn_confidence("sub.other.org"), 100);
    }

    #[test]
    fn ip_in_configured_cidr_is_in_scope() {
        let scope = Scope::new(
            Vec::new(),
            vec!["192.0.2.0/24".parse().unwrap()],
            Vec::new(),
        );
        assert_eq!(scope.ip_confidence("192.0.2.10".parse().unwrap()), 100);
        assert_eq!(scope.ip_confidence("203.0.113.10".parse().unwrap()), 0);
    }
}
