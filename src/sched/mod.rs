//! Thread scheduler implementations.
//!
//! Provides the round-robin slot selection used by the dispatch loop.

pub mod rr;

pub use rr::RoundRobinScheduler;
