//! Integration tests for chaos-harness
//!
//! These tests require a Kubernetes cluster (kind) with Chaos Mesh installed
//! and tell the story of how a test suite drives fault injection.
//!
//! # Test Organization
//!
//! - `experiment_lifecycle`: Stories about injecting experiments, waiting for
//!   the reconciler and removing them again
//!
//! - `orphan_cleanup`: Stories about sweeping up experiments a crashed run
//!   left behind
//!
//! # Running These Tests
//!
//! ```bash
//! cargo test --test kind -- --ignored --nocapture
//! ```

mod experiment_lifecycle;
mod helpers;
mod orphan_cleanup;
