use std::sync::Arc;

use serde_json::Value as JsonValue;
use vantage_graph::{AssetKind, NodeId};

/// A tag carried alongside a dispatched entity, distinguishing how it was
/// discovered (the CERT bypass in the wildcard match rule keys off this).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventTag {
    Normal,
    Axfr,
    Cert,
}

/// `{ name, entity, sessionRef, dispatcherRef, meta? }` from the handler
/// contract. `sessionRef`/`dispatcherRef` are implicit here: a [Handler]
/// receives them as separate arguments rather than embedded fields, since
/// Rust borrows them rather than threading opaque references through data.
#[derive(Clone, Debug)]
pub struct Event {
    pub name: String,
    pub entity: NodeId,
    pub entity_kind: AssetKind,
    pub tag: EventTag,
    pub meta: Option<Arc<JsonValue>>,
}

impl Event {
    pub fn new(name: impl Into<String>, entity: NodeId, entity_kind: AssetKind) -> Self {
        Event {
            name: name.into(),
            entity,
            entity_kind,
            tag: EventTag::Normal,
            meta: None,
        }
    }

    pub fn with_tag(mut self, tag: EventTag) -> Self {
        self.tag = tag;
        self
    }

    pub fn with_meta(mut self, meta: JsonValue) -> Self {
        self.meta = Some(Arc::new(meta));
        self
    }
}
