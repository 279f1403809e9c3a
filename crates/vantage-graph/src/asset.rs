use std::net::IpAddr;

use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};

use crate::fingerprint::Fingerprint;

/// Address family of an [IpAddr] or [IpNetwork], surfaced as its own field
/// per the data model even though it is always derivable from the address.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Family {
    V4,
    V6,
}

impl Family {
    pub fn of(addr: &IpAddr) -> Self {
        match addr {
            IpAddr::V4(_) => Family::V4,
            IpAddr::V6(_) => Family::V6,
        }
    }
}

/// The kind of an [Identifier], left open for values this core does not
/// enumerate (the v5-style unified model chosen in the design notes' open
/// questions section, in place of separate `EmailAddress`-style variants).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdentifierKind {
    Lei,
    Ocid,
    Email,
    Other(String),
}

impl IdentifierKind {
    fn as_key(&self) -> &str {
        match self {
            IdentifierKind::Lei => "lei",
            IdentifierKind::Ocid => "ocid",
            IdentifierKind::Email => "email",
            IdentifierKind::Other(s) => s,
        }
    }
}

/// A typed node in the discovery graph. Each variant's doc comment names the
/// fields that make up its identity per §3 of the specification.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Asset {
    /// Identity: `name`, lowercase, trailing dot stripped.
    Fqdn { name: String },
    /// Identity: `addr`.
    IpAddress { addr: IpAddr },
    /// Identity: `cidr`.
    Netblock { cidr: IpNetwork },
    /// Identity: `number`.
    AutonomousSystem { number: u32 },
    /// Identity: `handle`.
    AutnumRecord {
        handle: String,
        name: Option<String>,
        whois_server: Option<String>,
        status: Vec<String>,
    },
    /// Identity: `handle`.
    IpNetRecord {
        handle: String,
        cidr: IpNetwork,
        start_addr: IpAddr,
        end_addr: IpAddr,
        country: Option<String>,
        whois_server: Option<String>,
    },
    /// Identity: `raw`.
    Url {
        raw: String,
        scheme: String,
        host: String,
        port: Option<u16>,
    },
    /// Identity: `serial` + `issuer`.
    TlsCertificate {
        serial: String,
        issuer: String,
        subject: String,
        sans: Vec<String>,
    },
    /// Identity: `id`, a session-scoped hash of endpoint + banner bytes.
    Service {
        id: String,
        banner: Option<String>,
        headers: Vec<(String, String)>,
    },
    /// Identity: the discovery `url`.
    ContactRecord { discovery_url: String },
    /// Identity: the `(name, legalName, registrationID)` triple.
    Organization {
        name: String,
        legal_name: Option<String>,
        jurisdiction: Option<String>,
        registration_id: Option<String>,
        active: bool,
    },
    /// Identity: the `(type, value)` pair.
    Identifier { kind: IdentifierKind, value: String },
    /// Identity: a canonicalized `(postalCode, city, country, street)` tuple.
    Location {
        postal_code: Option<String>,
        city: Option<String>,
        country: Option<String>,
        street: Option<String>,
    },
    /// Identity: the parsed `fullName`.
    Person { full_name: String },
}

fn normalize_fqdn(name: &str) -> String {
    name.trim().trim_end_matches('.').to_ascii_lowercase()
}

fn canonicalize_location_field(field: &Option<String>) -> String {
    field
        .as_deref()
        .map(|s| s.trim().to_ascii_lowercase())
        .unwrap_or_default()
}

impl Asset {
    /// Constructs an [Asset::Fqdn], normalizing the name per the identity
    /// rule (lowercase, no trailing dot).
    pub fn fqdn(name: impl AsRef<str>) -> Self {
        Asset::Fqdn {
            name: normalize_fqdn(name.as_ref()),
        }
    }

    /// Constructs an [Asset::IpAddress].
    pub fn ip(addr: IpAddr) -> Self {
        Asset::IpAddress { addr }
    }

    /// Constructs an [Asset::Netblock].
    pub fn netblock(cidr: IpNetwork) -> Self {
        Asset::Netblock { cidr }
    }

    /// A short, human-readable label for logging (not the fingerprint).
    pub fn label(&self) -> String {
        match self {
            Asset::Fqdn { name } => name.clone(),
            Asset::IpAddress { addr } => addr.to_string(),
            Asset::Netblock { cidr } => cidr.to_string(),
            Asset::AutonomousSystem { number } => format!("AS{number}"),
            Asset::AutnumRecord { handle, .. } => handle.clone(),
            Asset::IpNetRecord { handle, .. } => handle.clone(),
            Asset::Url { raw, .. } => raw.clone(),
            Asset::TlsCertificate { serial, issuer, .. } => format!("{serial}@{issuer}"),
            Asset::Service { id, .. } => id.clone(),
            Asset::ContactRecord { discovery_url } => discovery_url.clone(),
            Asset::Organization { name, .. } => name.clone(),
            Asset::Identifier { kind, value } => format!("{}:{}", kind.as_key(), value),
            Asset::Location { city, country, .. } => format!(
                "{}, {}",
                city.as_deref().unwrap_or("?"),
                country.as_deref().unwrap_or("?")
            ),
            Asset::Person { full_name } => full_name.clone(),
        }
    }

    /// The asset kind name, used for dispatch and logging.
    pub fn kind(&self) -> AssetKind {
        match self {
            Asset::Fqdn { .. } => AssetKind::Fqdn,
            Asset::IpAddress { .. } => AssetKind::IpAddress,
            Asset::Netblock { .. } => AssetKind::Netblock,
            Asset::AutonomousSystem { .. } => AssetKind::AutonomousSystem,
            Asset::AutnumRecord { .. } => AssetKind::AutnumRecord,
            Asset::IpNetRecord { .. } => AssetKind::IpNetRecord,
            Asset::Url { .. } => AssetKind::Url,
            Asset::TlsCertificate { .. } => AssetKind::TlsCertificate,
            Asset::Service { .. } => AssetKind::Service,
            Asset::ContactRecord { .. } => AssetKind::ContactRecord,
            Asset::Organization { .. } => AssetKind::Organization,
            Asset::Identifier { .. } => AssetKind::Identifier,
            Asset::Location { .. } => AssetKind::Location,
            Asset::Person { .. } => AssetKind::Person,
        }
    }

    /// Computes this asset's content-fingerprint per the identity column of
    /// the data model table.
    pub fn fingerprint(&self) -> Fingerprint {
        match self {
            Asset::Fqdn { name } => Fingerprint::new("fqdn", [name.as_str()]),
            Asset::IpAddress { addr } => Fingerprint::new("ip", [addr.to_string().as_str()]),
            Asset::Netblock { cidr } => Fingerprint::new("netblock", [cidr.to_string().as_str()]),
            Asset::AutonomousSystem { number } => {
                Fingerprint::new("asn", [number.to_string().as_str()])
            }
            Asset::AutnumRecord { handle, .. } => Fingerprint::new("autnum", [handle.as_str()]),
            Asset::IpNetRecord { handle, .. } => Fingerprint::new("ipnet", [handle.as_str()]),
            Asset::Url { raw, .. } => Fingerprint::new("url", [raw.as_str()]),
            Asset::TlsCertificate { serial, issuer, .. } => {
                Fingerprint::new("cert", [serial.as_str(), issuer.as_str()])
            }
            Asset::Service { id, .. } => Fingerprint::new("service", [id.as_str()]),
            Asset::ContactRecord { discovery_url } => {
                Fingerprint::new("contact", [discovery_url.as_str()])
            }
            Asset::Organization {
                name,
                legal_name,
                registration_id,
                ..
            } => Fingerprint::new(
                "org",
                [
                    name.as_str(),
                    legal_name.as_deref().unwrap_or(""),
                    registration_id.as_deref().unwrap_or(""),
                ],
            ),
            Asset::Identifier { kind, value } => {
                Fingerprint::new("identifier", [kind.as_key(), value.as_str()])
            }
            Asset::Location {
                postal_code,
                city,
                country,
                street,
            } => Fingerprint::new(
                "location",
                [
                    canonicalize_location_field(postal_code).as_str(),
                    canonicalize_location_field(city).as_str(),
                    canonicalize_location_field(country).as_str(),
                    canonicalize_location_field(street).as_str(),
                ],
            ),
            Asset::Person { full_name } => {
                let normalized = full_name.split_whitespace().collect::<Vec<_>>().join(" ");
                Fingerprint::new("person", [normalized.to_ascii_lowercase().as_str()])
            }
        }
    }
}

/// The tag half of [Asset]: what [crate::GraphStore] indexes handlers by and
/// what the dispatcher routes events on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetKind {
    Fqdn,
    IpAddress,
    Netblock,
    AutonomousSystem,
    AutnumRecord,
    IpNetRecord,
    Url,
    TlsCertificate,
    Service,
    ContactRecord,
    Organization,
    Identifier,
    Location,
    Person,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fqdn_identity_normalizes_case_and_trailing_dot() {
        let a = Asset::fqdn("Example.COM.");
        let b = Asset::fqdn("example.com");
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn distinct_kinds_with_same_label_do_not_collide() {
        let fqdn = Asset::fqdn("example.com");
        let url = Asset::Url {
            raw: "example.com".into(),
            scheme: "https".into(),
            host: "example.com".into(),
            port: None,
        };
        assert_ne!(fqdn.fingerprint(), url.fingerprint());
    }

    #[test]
    fn organization_identity_is_the_triple() {
        let a = Asset::Organization {
            name: "Acme".into(),
            legal_name: Some("Acme Corp".into()),
            jurisdiction: None,
            registration_id: Some("123".into()),
            active: true,
        };
        let b = Asset::Organization {
            name: "Acme".into(),
            legal_name: Some("Acme Corp".into()),
            jurisdiction: Some("US".into()), // not part of identity
            registration_id: Some("123".into()),
            active: false,
        };
        assert_eq!(a.fingerprint(), b.fingerprint());
    }
}
