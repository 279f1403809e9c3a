use anyhow::Result;
use std::future::Future;
use tokio::task::JoinSet;

/// An aggregator of spawned async work that can be joined once, used
/// wherever a component fans out a batch of suspendable tasks (probes,
/// sweeps) and needs to know when all of them have settled.
#[derive(Default)]
pub struct TaskQueue {
    tasks: JoinSet<Result<()>>,
}

impl TaskQueue {
    /// Queue a future to be spawned on the runtime. All queued futures are
    /// polled to completion before [TaskQueue::join] resolves.
    pub fn spawn<F>(&mut self, future: F)
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        self.tasks.spawn(future);
    }

    /// Resolves once every queued future has completed, propagating the
    /// first error encountered (if any) after all tasks have joined.
    pub async fn join(&mut self) -> Result<()> {
        let mut first_error = None;
        while let Some(result) = self.tasks.join_next().await {
            match result {
                Ok(Ok(())) => {}
                Ok(Err(error)) => {
                    warn!("Queued task returned an error: {}", error);
                    first_error.get_or_insert(error);
                }
                Err(join_error) => {
                    warn!("Queued task panicked or was cancelled: {}", join_error);
                }
            }
        }
        match first_error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn joins_all_queued_tasks() -> Result<()> {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut queue = TaskQueue::default();
        for _ in 0..10 {
            let counter = counter.clone();
            queue.spawn(async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
        }
        queue.join().await?;
        assert_eq!(counter.load(Ordering::SeqCst), 10);
        Ok(())
    }

    #[tokio::test]
    async fn surfaces_first_error_after_joining_all() {
        let mut queue = TaskQueue::default();
        queue.spawn(async { Ok(()) });
        queue.spawn(async { Err(anyhow::anyhow!("boom")) });
        assert!(queue.join().await.is_err());
    }
}
