//! Rate limiting ports and application service.
//!
//! Fixed-window counters keyed by `"{scope}:{identifier}"`. The first hit of
//! a window sets the reset time; every later hit in the window increments the
//! count until the quota is exhausted.

mod config;
mod ports;
mod scoped;
mod service;

#[cfg(test)]
mod tests;

pub use config::RateLimitRule;
pub use ports::{CounterStore, RateLimitEntry};
pub use scoped::ScopedRateLimiter;
pub use service::{RateLimitDecision, RateLimitService};
