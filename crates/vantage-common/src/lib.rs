//! Common, generic utilities that are shared across the other `vantage` crates.

#[macro_use]
extern crate tracing;

pub mod channel;
mod filter;
mod random;
mod task;

pub use filter::*;
pub use random::*;
pub use task::*;
