//! chaos-harness - declare, inject and reliably clean up Chaos Mesh experiments
//!
//! Experiments are described as typed, validated values, rendered into Chaos
//! Mesh custom resources, submitted through a retrying client and tracked by a
//! scoped controller that removes them again no matter how the scope ends.
//!
//! # Modules
//!
//! - [`crd`] - Selectors, action parameters and the experiment builder
//! - [`manifest`] - Experiment to custom resource payload
//! - [`client`] - `ChaosApi` trait and its kube-backed implementation
//! - [`retry`] - Exponential backoff for transient API failures
//! - [`polling`] - Wall-clock bounded status polling
//! - [`manager`] - Apply, delete, status and wait operations
//! - [`controller`] - Scoped cleanup guarantee and orphan sweep
//! - [`config`] - Process-level settings with environment overrides
//! - [`telemetry`] - Logging setup for binaries
//! - [`error`] - Error types
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use chaos_harness::{ChaosConfig, ChaosController, ChaosManager, Experiment, KubeChaosClient, Selector};
//!
//! let config = ChaosConfig::from_env()?;
//! let client = Arc::new(KubeChaosClient::connect(config.clone()).await?);
//! let manager = ChaosManager::new(client, config);
//!
//! let web = Selector::from_labels([("app", "web")], &["default"])?;
//! ChaosController::scope(manager, |chaos| {
//!     Box::pin(async move {
//!         chaos.inject(Experiment::pod_kill(web).build()?).await?;
//!         // exercise the system under test
//!         Ok(())
//!     })
//! })
//! .await?;
//! ```

#![warn(missing_docs)]

pub mod client;
pub mod config;
pub mod controller;
pub mod crd;
pub mod error;
pub mod manager;
pub mod manifest;
pub mod polling;
pub mod retry;
pub mod telemetry;

pub use client::{ChaosApi, KubeChaosClient};
pub use config::ChaosConfig;
pub use controller::{cleanup_orphaned, ChaosController, CleanupReport, Phase};
pub use crd::{Action, Experiment, ExperimentBuilder, Mode, ResourceKind, Selector};
pub use error::Error;
pub use manager::ChaosManager;
pub use manifest::ChaosManifest;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;
