//! Chaos experiment model
//!
//! Selectors, action parameters and experiments. Every type here validates on
//! construction, so anything that reaches the manifest builder is well-formed.

mod experiment;
mod params;
mod selector;
mod types;
mod validation;

pub use experiment::{
    Action, Experiment, ExperimentBuilder, DEFAULT_NAMESPACE, DEFAULT_POD_FAILURE_DURATION,
};
pub use params::{
    BandwidthParams, CorruptParams, DelayParams, DuplicateParams, LossParams, PartitionParams,
    PodOptions, ReorderParams,
};
pub use selector::{Selector, SelectorBuilder};
pub use types::{
    ActionKind, ChaosCondition, ChaosStatus, Direction, Mode, ResourceKind,
    CONDITION_ALL_INJECTED, STATUS_TRUE,
};
pub use validation::parse_duration;
