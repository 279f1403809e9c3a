use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use vantage_graph::{AssetKind, NodeId};

/// The TTL table key: a handler is suppressed for (fromType, toType,
/// sourceName) if its configured window hasn't elapsed since the last mark.
/// A missing entry in the configured table means no suppression.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TtlKey {
    pub from_type: AssetKind,
    pub to_type: AssetKind,
    pub source: String,
}

/// The dispatcher's "seen" cache: `MarkAssetMonitored` / `AssetMonitoredWithinTTL`.
/// Locking is fine-grained, keyed by entity id, so unrelated entities never
/// contend on the same mutex.
#[derive(Default)]
pub struct TtlCache {
    windows: HashMap<TtlKey, Duration>,
    marks: Mutex<HashMap<(NodeId, String), Instant>>,
}

impl TtlCache {
    pub fn new(windows: HashMap<TtlKey, Duration>) -> Self {
        TtlCache {
            windows,
            marks: Mutex::new(HashMap::new()),
        }
    }

    pub async fn mark_monitored(&self, entity: NodeId, source: impl Into<String>) {
        let mut marks = self.marks.lock().await;
        marks.insert((entity, source.into()), Instant::now());
    }

    /// Returns `true` if `entity` was marked monitored by `source` within
    /// the configured TTL for (from_type, to_type, source). A missing table
    /// entry always returns `false` (no suppression).
    pub async fn monitored_within_ttl(
        &self,
        entity: NodeId,
        from_type: AssetKind,
        to_type: AssetKind,
        source: &str,
    ) -> bool {
        let key = TtlKey {
            from_type,
            to_type,
            source: source.to_string(),
        };
        let Some(window) = self.windows.get(&key) else {
            return false;
        };
        let marks = self.marks.lock().await;
        match marks.get(&(entity, source.to_string())) {
            Some(last_mark) => last_mark.elapsed() < *window,
            None => false,
        }
    }
}

/// Shared handle type used by handlers and the dispatcher.
pub type SharedTtlCache = Arc<TtlCache>;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unmarked_entity_is_never_suppressed() {
        let mut windows = HashMap::new();
        windows.insert(
            TtlKey {
                from_type: AssetKind::Fqdn,
                to_type: AssetKind::IpAddress,
                source: "dns".into(),
            },
            Duration::from_secs(60),
        );
        let cache = TtlCache::new(windows);
        let suppressed = cache
            .monitored_within_ttl(NodeId(1), AssetKind::Fqdn, AssetKind::IpAddress, "dns")
            .await;
        assert!(!suppressed);
    }

    #[tokio::test]
    async fn marked_entity_is_suppressed_within_window() {
        let mut windows = HashMap::new();
        windows.insert(
            TtlKey {
                from_type: AssetKind::Fqdn,
                to_type: AssetKind::IpAddress,
                source: "dns".into(),
            },
            Duration::from_secs(60),
        );
        let cache = TtlCache::new(windows);
        cache.mark_monitored(NodeId(1), "dns").await;
        let suppressed = cache
            .monitored_within_ttl(NodeId(1), AssetKind::Fqdn, AssetKind::IpAddress, "dns")
            .await;
        assert!(suppressed);
    }

    #[tokio::test]
    async fn missing_table_entry_never_suppresses() {
        let cache = TtlCache::new(HashMap::new());
        cache.mark_monitored(NodeId(1), "dns").await;
        let suppressed = cache
            .monitored_within_ttl(NodeId(1), AssetKind::Fqdn, AssetKind::IpAddress, "dns")
            .await;
        assert!(!suppressed);
    }
}
