use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// A single token bucket: capacity 1 refilled every `interval`, which is
/// enough to express "1/sec" or "1/5sec" style per-source defaults without
/// needing a burst parameter the sources in scope don't use.
struct Bucket {
    interval: Duration,
    available_at: Instant,
}

impl Bucket {
    fn new(interval: Duration) -> Self {
        Bucket {
            interval,
            available_at: Instant::now(),
        }
    }

    fn try_acquire(&mut self) -> bool {
        let now = Instant::now();
        if now >= self.available_at {
            self.available_at = now + self.interval;
            true
        } else {
            false
        }
    }

    fn wait_duration(&self) -> Duration {
        self.available_at.saturating_duration_since(Instant::now())
    }
}

/// Per-source outbound request throttling. Out-of-scope source adapters are
/// not shipped here, but the primitive and its default table are, ready for
/// handler implementations to consume.
pub struct SourceRateLimiter {
    defaults: HashMap<String, Duration>,
    buckets: Mutex<HashMap<String, Bucket>>,
}

impl SourceRateLimiter {
    pub fn new(defaults: HashMap<String, Duration>) -> Self {
        SourceRateLimiter {
            defaults,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// The commonly cited defaults (1/sec for GLEIF, 1/5sec for SiteDossier),
    /// kept as the config table's seed values.
    pub fn with_builtin_defaults() -> Self {
        let mut defaults = HashMap::new();
        defaults.insert("gleif".to_string(), Duration::from_secs(1));
        defaults.insert("sitedossier".to_string(), Duration::from_secs(5));
        Self::new(defaults)
    }

    /// Attempts to acquire a token for `source` without blocking, returning
    /// the wait duration on failure.
    pub fn try_acquire(&self, source: &str) -> Result<(), Duration> {
        let Some(interval) = self.defaults.get(source).copied() else {
            return Ok(());
        };
        let mut buckets = self.buckets.lock().unwrap();
        let bucket = buckets
            .entry(source.to_string())
            .or_insert_with(|| Bucket::new(interval));
        if bucket.try_acquire() {
            Ok(())
        } else {
            Err(bucket.wait_duration())
        }
    }

    /// Blocks until a token for `source` is available.
    pub async fn acquire(&self, source: &str) {
        loop {
            match self.try_acquire(source) {
                Ok(()) => return,
                Err(wait) => tokio::time::sleep(wait).await,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconfigured_source_is_never_limited() {
        let limiter = SourceRateLimiter::new(HashMap::new());
        assert!(limiter.try_acquire("anything").is_ok());
        assert!(limiter.try_acquire("anything").is_ok());
    }

    #[test]
    fn configured_source_throttles_after_first_token() {
        let mut defaults = HashMap::new();
        defaults.insert("gleif".to_string(), Duration::from_secs(60));
        let limiter = SourceRateLimiter::new(defaults);
        assert!(limiter.try_acquire("gleif").is_ok());
        assert!(limiter.try_acquire("gleif").is_err());
    }
}
