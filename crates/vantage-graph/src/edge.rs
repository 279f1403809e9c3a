use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Reserved directed relation names. A handler may still attach an edge whose
/// predicate is not one of these (new sources add new relations over time);
/// the reserved set is what the core understands well enough to give special
/// handling to (e.g. subsidiary-cycle checks).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationKind {
    ARecord,
    AaaaRecord,
    CnameRecord,
    NsRecord,
    MxRecord,
    TxtRecord,
    Contains,
    ResolvesTo,
    Port,
    Certificate,
    IssuingCertificate,
    Registration,
    Id,
    Member,
    Location,
    LegalAddress,
    HqAddress,
    Subsidiary,
    /// Any relation name outside the reserved set.
    Other(String),
}

impl RelationKind {
    pub fn as_str(&self) -> &str {
        match self {
            RelationKind::ARecord => "a_record",
            RelationKind::AaaaRecord => "aaaa_record",
            RelationKind::CnameRecord => "cname_record",
            RelationKind::NsRecord => "ns_record",
            RelationKind::MxRecord => "mx_record",
            RelationKind::TxtRecord => "txt_record",
            RelationKind::Contains => "contains",
            RelationKind::ResolvesTo => "resolves_to",
            RelationKind::Port => "port",
            RelationKind::Certificate => "certificate",
            RelationKind::IssuingCertificate => "issuing_certificate",
            RelationKind::Registration => "registration",
            RelationKind::Id => "id",
            RelationKind::Member => "member",
            RelationKind::Location => "location",
            RelationKind::LegalAddress => "legal_address",
            RelationKind::HqAddress => "hq_address",
            RelationKind::Subsidiary => "subsidiary",
            RelationKind::Other(s) => s,
        }
    }
}

impl FromStr for RelationKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "a_record" => RelationKind::ARecord,
            "aaaa_record" => RelationKind::AaaaRecord,
            "cname_record" => RelationKind::CnameRecord,
            "ns_record" => RelationKind::NsRecord,
            "mx_record" => RelationKind::MxRecord,
            "txt_record" => RelationKind::TxtRecord,
            "contains" => RelationKind::Contains,
            "resolves_to" => RelationKind::ResolvesTo,
            "port" => RelationKind::Port,
            "certificate" => RelationKind::Certificate,
            "issuing_certificate" => RelationKind::IssuingCertificate,
            "registration" => RelationKind::Registration,
            "id" => RelationKind::Id,
            "member" => RelationKind::Member,
            "location" => RelationKind::Location,
            "legal_address" => RelationKind::LegalAddress,
            "hq_address" => RelationKind::HqAddress,
            "subsidiary" => RelationKind::Subsidiary,
            other => RelationKind::Other(other.to_string()),
        })
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A directed, typed edge between two nodes, identified by its own
/// fingerprint (from, to, relation) so that repeated discovery of the same
/// edge from different sources appends a property rather than duplicating
/// the edge.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub from: crate::NodeId,
    pub to: crate::NodeId,
    pub relation: RelationKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_reserved_names() {
        for name in [
            "a_record",
            "resolves_to",
            "port",
            "subsidiary",
            "hq_address",
        ] {
            let kind: RelationKind = name.parse().unwrap();
            assert_eq!(kind.as_str(), name);
        }
    }

    #[test]
    fn unknown_relation_round_trips_as_other() {
        let kind: RelationKind = "whois_contact".parse().unwrap();
        assert_eq!(kind, RelationKind::Other("whois_contact".to_string()));
        assert_eq!(kind.as_str(), "whois_contact");
    }
}
