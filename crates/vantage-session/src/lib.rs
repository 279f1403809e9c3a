//! Session assembly: configuration, scope, rate limiting, output, and the
//! engine-wide error taxonomy.

#[macro_use]
extern crate tracing;

mod config;
mod error;
mod output;
mod rate_limit;
mod scope;
mod session;

pub use config::{default_config_path, CliOverrides, Config};
pub use error::{EngineError, EngineResult};
pub use output::{AddressRecord, FqdnRecord, OutputWriter};
pub use rate_limit::SourceRateLimiter;
pub use scope::{Confidence, Scope};
pub use session::Session;
