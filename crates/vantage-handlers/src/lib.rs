//! Built-in handler plugins: DNS resolution (the main producer) and the
//! reverse-sweep handler that PTR-scans around newly discovered addresses.

#[macro_use]
extern crate tracing;

mod dns_handler;
mod reverse_sweep;
mod support;

pub use dns_handler::DnsHandler;
pub use reverse_sweep::ReverseSweepHandler;
