//! Priority-ordered, concurrency-capped event dispatch to typed handlers.

#[macro_use]
extern crate tracing;

mod dispatcher;
mod error;
mod event;
mod handler;
mod registry;
mod ttl_cache;

pub use dispatcher::{DispatchHandle, Dispatcher};
pub use error::{DispatchError, DispatchResult};
pub use event::{Event, EventTag};
pub use handler::{Handler, DEFAULT_PRIORITY};
pub use registry::HandlerRegistry;
pub use ttl_cache::{SharedTtlCache, TtlCache, TtlKey};
