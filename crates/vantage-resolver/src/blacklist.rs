use std::net::IpAddr;

use ipnetwork::IpNetwork;

/// Known DNS-hijack sinkhole ranges. Answers that fall inside any of these
/// are dropped before wildcard classification or acceptance (§4.4's
/// "additional guard").
#[derive(Clone, Debug, Default)]
pub struct Blacklist {
    networks: Vec<IpNetwork>,
}

impl Blacklist {
    pub fn new(networks: Vec<IpNetwork>) -> Self {
        Blacklist { networks }
    }

    pub fn contains(&self, addr: &IpAddr) -> bool {
        self.networks.iter().any(|net| net.contains(*addr))
    }

    pub fn push(&mut self, network: IpNetwork) {
        self.networks.push(network);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_addresses_inside_configured_ranges() {
        let mut blacklist = Blacklist::default();
        blacklist.push("198.51.100.0/24".parse().unwrap());
        assert!(blacklist.contains(&"198.51.100.7".parse().unwrap()));
        assert!(!blacklist.contains(&"203.0.113.7".parse().unwrap()));
    }
}
