use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Semaphore;
use vantage_graph::AssetKind;

use crate::error::{DispatchError, DispatchResult};
use crate::handler::Handler;

/// A registered handler plus the semaphore gating its `maxInstances`.
pub(crate) struct RegisteredHandler {
    pub handler: Arc<dyn Handler>,
    pub semaphore: Arc<Semaphore>,
}

/// Handlers registered for one event type, grouped into descending-priority
/// buckets so the dispatcher can run a whole bucket to completion before
/// starting the next.
#[derive(Default)]
pub(crate) struct PriorityBuckets {
    // Sorted descending by priority; each inner Vec shares one priority.
    pub buckets: Vec<(u8, Vec<RegisteredHandler>)>,
}

impl PriorityBuckets {
    fn insert(&mut self, priority: u8, registered: RegisteredHandler) {
        match self.buckets.iter_mut().find(|(p, _)| *p == priority) {
            Some((_, handlers)) => handlers.push(registered),
            None => {
                self.buckets.push((priority, vec![registered]));
                self.buckets.sort_by(|a, b| b.0.cmp(&a.0));
            }
        }
    }
}

/// Registry of every handler in the session, indexed by the entity kind it
/// subscribes to.
#[derive(Default)]
pub struct HandlerRegistry {
    by_event_type: HashMap<AssetKind, PriorityBuckets>,
    known_names: HashMap<(AssetKind, String), ()>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler. Rejects duplicates by (eventType, name).
    pub fn register_handler(&mut self, handler: Arc<dyn Handler>) -> DispatchResult<()> {
        let event_type = handler.event_type();
        let name = handler.handler_name().to_string();
        let key = (event_type, name.clone());

        if self.known_names.contains_key(&key) {
            return Err(DispatchError::DuplicateHandler {
                event_type: format!("{event_type:?}"),
                name,
            });
        }
        self.known_names.insert(key, ());

        let registered = RegisteredHandler {
            semaphore: Arc::new(Semaphore::new(handler.max_instances())),
            handler,
        };
        self.by_event_type
            .entry(event_type)
            .or_default()
            .insert(registered.handler.priority(), registered);
        Ok(())
    }

    /// Priority-ordered handler buckets registered for `event_type`, highest
    /// priority first.
    pub(crate) fn buckets_for(&self, event_type: AssetKind) -> &[(u8, Vec<RegisteredHandler>)] {
        self.by_event_type
            .get(&event_type)
            .map(|b| b.buckets.as_slice())
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::DispatchHandle;
    use crate::event::Event;
    use async_trait::async_trait;
    use tokio_util::sync::CancellationToken;

    struct Noop(&'static str, u8);

    #[async_trait]
    impl Handler for Noop {
        fn plugin_name(&self) -> &str {
            "test"
        }
        fn handler_name(&self) -> &str {
            self.0
        }
        fn priority(&self) -> u8 {
            self.1
        }
        fn event_type(&self) -> AssetKind {
            AssetKind::Fqdn
        }
        async fn handle(
            &self,
            _event: Event,
            _handle: DispatchHandle,
            _suppressed: bool,
            _cancel: CancellationToken,
        ) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn duplicate_event_type_and_name_rejected() {
        let mut registry = HandlerRegistry::new();
        registry
            .register_handler(Arc::new(Noop("dns", 9)))
            .unwrap();
        let result = registry.register_handler(Arc::new(Noop("dns", 9)));
        assert!(matches!(result, Err(DispatchError::DuplicateHandler { .. })));
    }

    #[test]
    fn buckets_are_sorted_descending_by_priority() {
        let mut registry = HandlerRegistry::new();
        registry
            .register_handler(Arc::new(Noop("low", 2)))
            .unwrap();
        registry
            .register_handler(Arc::new(Noop("high", 9)))
            .unwrap();
        let buckets = registry.buckets_for(AssetKind::Fqdn);
        let priorities: Vec<u8> = buckets.iter().map(|(p, _)| *p).collect();
        assert_eq!(priorities, vec![9, 2]);
    }
}
