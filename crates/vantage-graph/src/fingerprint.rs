use std::fmt;

/// A stable content-fingerprint used as an asset's or edge's identity within
/// a session. Two assets that fingerprint equal are the same node (invariant
/// I1 in the design notes).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Builds a fingerprint from an asset-kind tag and its identity fields,
    /// joined so that no single field's content can be confused with a
    /// delimiter (fields are pipe-separated after stripping embedded pipes).
    pub fn new<const N: usize>(kind: &str, fields: [&str; N]) -> Self {
        let mut key = String::from(kind);
        for field in fields {
            key.push('\u{1f}'); // unit separator, not expected in human input
            key.push_str(field);
        }
        Fingerprint(key)
    }

    /// Returns the fingerprint as a plain string, e.g. for logging.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_fields_fingerprint_equal() {
        let a = Fingerprint::new("fqdn", ["example.com"]);
        let b = Fingerprint::new("fqdn", ["example.com"]);
        assert_eq!(a, b);
    }

    #[test]
    fn different_kind_fingerprints_differ() {
        let a = Fingerprint::new("fqdn", ["example.com"]);
        let b = Fingerprint::new("url", ["example.com"]);
        assert_ne!(a, b);
    }
}
