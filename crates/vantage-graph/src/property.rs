use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A scalar or structured value attached to a node or edge property. Kept as
/// a thin wrapper over [JsonValue] rather than a bespoke enum so that
/// handler-specific properties never need a core change to be representable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PropertyValue(pub JsonValue);

impl PropertyValue {
    pub fn string(value: impl Into<String>) -> Self {
        PropertyValue(JsonValue::String(value.into()))
    }

    pub fn as_str(&self) -> Option<&str> {
        self.0.as_str()
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::string(value)
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::string(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue(JsonValue::Bool(value))
    }
}

/// A source's confidence in one observation, 0-100.
pub type Confidence = u8;

/// An append-only, source-tagged property attached to a node or an edge.
/// Nothing is ever overwritten in place: a new observation of the same
/// predicate from a new source is a new `Property`, and the caller reconciles
/// conflicting values by reading them all.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Property {
    pub predicate: String,
    pub value: PropertyValue,
    /// Name of the handler/source that produced this observation, e.g.
    /// `"dns"`, `"crtsh"`, `"whois"`. Never empty: see
    /// [crate::GraphError::MissingSource].
    pub source: String,
    /// The source's confidence in this observation, 0-100.
    pub confidence: Confidence,
    pub created_at: std::time::SystemTime,
}

impl Property {
    pub fn new(
        predicate: impl Into<String>,
        value: impl Into<PropertyValue>,
        source: impl Into<String>,
        confidence: Confidence,
        created_at: std::time::SystemTime,
    ) -> Self {
        Property {
            predicate: predicate.into(),
            value: value.into(),
            source: source.into(),
            confidence: confidence.min(100),
            created_at,
        }
    }
}
