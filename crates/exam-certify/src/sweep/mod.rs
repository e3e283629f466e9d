//! Expiry sweep: force-submits candidates whose exam window elapsed.
//!
//! The sweep is a pure function of stored state and the current time, so
//! re-running it on an already-swept candidate changes nothing.

pub mod engine;
pub mod types;

pub use types::{DomainSweep, SweepFailure, SweepReport};

pub use engine::sweep_domain;
