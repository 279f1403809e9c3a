//! Adaptive DNS resolver pool and wildcard detector.

#[macro_use]
extern crate tracing;

mod blacklist;
mod error;
mod pool;
mod resolver;
mod wildcard;
mod wire;

pub use blacklist::Blacklist;
pub use error::{ResolverError, ResolverResult};
pub use pool::{ResolverPool, MIN_MAX_CONNECTIONS};
pub use resolver::Resolver;
pub use wildcard::{RequestTag, WildcardDetector, WildcardKind};
