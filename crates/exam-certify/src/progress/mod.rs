//! Module progress tracking: the forward-only module state machine.
//!
//! The progress module provides:
//! - Prerequisite-ordered unlocking
//! - Idempotent module start, which opens the candidate's exam window
//! - Score-clamped completion, overwritable only by grading

pub mod engine;
pub mod types;

pub use types::{CompletionSource, ModuleProgress, ProgressStatus};

pub use engine::{complete, ensure_prerequisites, start, unlock};
