//! Lifecycle controller for chaos experiments
//!
//! [`ChaosController`] owns the experiments injected within a scope and
//! guarantees their removal; [`cleanup_orphaned`] sweeps up after runs that
//! never got the chance.

mod cleanup;
mod lifecycle;

pub use cleanup::cleanup_orphaned;
pub use lifecycle::{ChaosController, CleanupFailure, CleanupReport, Phase};
