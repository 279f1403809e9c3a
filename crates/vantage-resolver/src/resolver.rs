use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, Semaphore};
use tokio::time::interval;
use trust_dns_resolver::proto::rr::RecordType;

use crate::error::ResolverResult;
use crate::wire;

const MONITOR_WINDOW: Duration = Duration::from_secs(1);
const MONITOR_MIN_SAMPLES: usize = 1000;

/// A single exchange outcome recorded for the rolling failure-rate window.
struct Sample {
    at: Instant,
    failed: bool,
}

struct Window {
    samples: VecDeque<Sample>,
}

impl Window {
    fn new() -> Self {
        Window {
            samples: VecDeque::new(),
        }
    }

    fn record(&mut self, failed: bool) {
        self.samples.push_back(Sample {
            at: Instant::now(),
            failed,
        });
    }

    /// Drops samples older than the window and returns (failures, total).
    fn evaluate(&mut self) -> (usize, usize) {
        let cutoff = Instant::now() - MONITOR_WINDOW;
        while matches!(self.samples.front(), Some(s) if s.at < cutoff) {
            self.samples.pop_front();
        }
        let total = self.samples.len();
        let failures = self.samples.iter().filter(|s| s.failed).count();
        (failures, total)
    }
}

/// One DNS server in the pool: an independent state machine with its own
/// concurrency semaphore, adapted every window by [Resolver::monitor_tick]
/// per the failure-fraction algorithm.
pub struct Resolver {
    pub server: SocketAddr,
    semaphore: Arc<Semaphore>,
    original_capacity: usize,
    held_permits: AtomicUsize,
    window: Mutex<Window>,
}

impl Resolver {
    pub fn new(server: SocketAddr, capacity: usize) -> anyhow::Result<Self> {
        Ok(Resolver {
            server,
            semaphore: Arc::new(Semaphore::new(capacity)),
            original_capacity: capacity,
            held_permits: AtomicUsize::new(0),
            window: Mutex::new(Window::new()),
        })
    }

    /// Issues one query, consuming a concurrency permit for its duration and
    /// recording its outcome in the rolling window.
    pub async fn resolve(&self, name: &str, qtype: RecordType) -> ResolverResult<Vec<String>> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| crate::error::ResolverError::PoolExhausted)?;

        let result = wire::resolve(self.server, name, qtype).await;

        let mut window = self.window.lock().await;
        window.record(result.is_err());
        result
    }

    /// One iteration of the monitor loop (§4.3): runs every `MONITOR_WINDOW`,
    /// adjusting available concurrency based on the observed failure
    /// fraction. Acquired-and-never-released permits model a temporary
    /// capacity reduction; they are released back as the failure fraction
    /// recovers.
    pub async fn monitor_tick(&self) {
        let (failures, total) = self.window.lock().await.evaluate();
        if total < MONITOR_MIN_SAMPLES {
            return;
        }
        let fraction = failures as f64 / total as f64;
        let step = (self.original_capacity / 10).max(16);

        if fraction >= 0.05 {
            if let Ok(permits) = self.semaphore.clone().try_acquire_many_owned(step as u32) {
                permits.forget();
                self.held_permits.fetch_add(step, Ordering::SeqCst);
                debug!(server = %self.server, fraction, "reducing resolver concurrency");
            }
        } else {
            let held = self.held_permits.load(Ordering::SeqCst);
            if held > 0 {
                let restore = step.min(held);
                self.semaphore.add_permits(restore);
                self.held_permits.fetch_sub(restore, Ordering::SeqCst);
                debug!(server = %self.server, fraction, "restoring resolver concurrency");
            }
        }
    }

    pub(crate) fn has_free_permit(&self) -> bool {
        self.semaphore.available_permits() > 0
    }

    /// Spawns the background monitor loop, returning a handle the pool keeps
    /// alive for the session's duration.
    pub fn spawn_monitor(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let resolver = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = interval(MONITOR_WINDOW);
            loop {
                ticker.tick().await;
                resolver.monitor_tick().await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_evaluate_drops_stale_samples() {
        let mut window = Window::new();
        window.samples.push_back(Sample {
            at: Instant::now() - Duration::from_secs(5),
            failed: true,
        });
        window.samples.push_back(Sample {
            at: Instant::now(),
            failed: false,
        });
        let (failures, total) = window.evaluate();
        assert_eq!(total, 1);
        assert_eq!(failures, 0);
    }

    #[test]
    fn window_below_threshold_reports_no_failures_needed() {
        let mut window = Window::new();
        for _ in 0..10 {
            window.record(true);
        }
        let (failures, total) = window.evaluate();
        assert_eq!(total, 10);
        assert_eq!(failures, 10);
    }
}
