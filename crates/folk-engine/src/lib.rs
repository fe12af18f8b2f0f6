//! The Folk aggregation engine.
//!
//! Consumes contact events from sources and identity-change notifications
//! from the store, and maintains the live keyed collection of person
//! aggregates that UI layers read. All aggregate mutation happens on one
//! logical task; the quadratic duplicate scan is offloaded through
//! [`scan::spawn_scan`] so it never blocks event processing.

mod engine;
mod scan;

pub mod error;

pub use engine::Aggregator;
pub use error::{Error, Result};
pub use scan::{ScanHandle, ScanToken, spawn_scan};
