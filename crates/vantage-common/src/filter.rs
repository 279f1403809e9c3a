use std::collections::HashSet;
use std::hash::Hash;
use tokio::sync::Mutex;

/// An approximate "seen before" set: a `Duplicate(x)` predicate that inserts
/// `x` if absent and reports whether it already existed.
///
/// Backed by a plain bounded [HashSet]. A counting Bloom filter would bound
/// memory more tightly for the tens-of-millions-of-names case this is built
/// for, at the cost of a (small, constant) false-positive rate; this
/// implementation favors exactness, evicting arbitrarily once `capacity` is
/// exceeded so memory stays bounded under long-running sessions.
pub struct Filter<T> {
    seen: Mutex<HashSet<T>>,
    capacity: usize,
}

impl<T> Filter<T>
where
    T: Eq + Hash,
{
    /// Creates a new, empty filter that holds at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            seen: Mutex::new(HashSet::new()),
            capacity,
        }
    }

    /// Returns `true` if `value` was already present, inserting it if not.
    pub async fn duplicate(&self, value: T) -> bool {
        let mut seen = self.seen.lock().await;
        if seen.contains(&value) {
            return true;
        }
        if seen.len() >= self.capacity {
            // Bounded eviction: drop an arbitrary entry rather than grow
            // without bound. A false "not duplicate" on the evicted entry is
            // an accepted trade-off, same as a Bloom filter's false positive.
            if let Some(victim) = seen.iter().next().cloned() {
                seen.remove(&victim);
            }
        }
        seen.insert(value);
        false
    }

    /// Number of entries currently tracked.
    pub async fn len(&self) -> usize {
        self.seen.lock().await.len()
    }

    /// Whether the filter is currently empty.
    pub async fn is_empty(&self) -> bool {
        self.seen.lock().await.is_empty()
    }
}

impl<T> Default for Filter<T>
where
    T: Eq + Hash,
{
    fn default() -> Self {
        // 10 million names is a reasonable default upper bound for a single
        // enumeration session before eviction kicks in.
        Self::new(10_000_000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reports_duplicates() {
        let filter: Filter<String> = Filter::new(16);
        assert!(!filter.duplicate("a.example.com".to_string()).await);
        assert!(filter.duplicate("a.example.com".to_string()).await);
        assert!(!filter.duplicate("b.example.com".to_string()).await);
        assert_eq!(filter.len().await, 2);
    }

    #[tokio::test]
    async fn evicts_once_over_capacity() {
        let filter: Filter<u32> = Filter::new(4);
        for n in 0..8 {
            filter.duplicate(n).await;
        }
        assert!(filter.len().await <= 4);
    }
}
