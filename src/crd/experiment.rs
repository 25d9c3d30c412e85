//! Chaos experiments and their validating builder
//!
//! An [`Experiment`] can only be obtained from [`ExperimentBuilder::build`],
//! which enforces the mode/value, duration and action invariants before any
//! request reaches the cluster.

use std::collections::BTreeMap;
use std::time::Duration;

use super::params::{
    BandwidthParams, CorruptParams, DelayParams, DuplicateParams, LossParams, PartitionParams,
    PodOptions, ReorderParams,
};
use super::selector::Selector;
use super::types::{ActionKind, Direction, Mode, ResourceKind};
use super::validation::{parse_duration, validate_percentage};
use crate::Error;

/// Namespace used when none is given
pub const DEFAULT_NAMESPACE: &str = "default";

/// Duration preset by [`Experiment::pod_failure`]
pub const DEFAULT_POD_FAILURE_DURATION: &str = "30s";

/// The fault an experiment injects, with its parameters
#[derive(Clone, Debug, PartialEq)]
pub enum Action {
    /// Make pods unavailable
    PodFailure(PodOptions),
    /// Kill pods
    PodKill(PodOptions),
    /// Kill containers; `container_names` must be non-empty
    ContainerKill(PodOptions),
    /// Add latency
    Delay(DelayParams),
    /// Drop packets
    Loss(LossParams),
    /// Duplicate packets
    Duplicate(DuplicateParams),
    /// Corrupt packets
    Corrupt(CorruptParams),
    /// Partition from a target selection
    Partition(PartitionParams),
    /// Limit bandwidth
    Bandwidth(BandwidthParams),
    /// Reorder packets
    Reorder(ReorderParams),
}

impl Action {
    /// The action kind, as written to `spec.action`
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::PodFailure(_) => ActionKind::PodFailure,
            Self::PodKill(_) => ActionKind::PodKill,
            Self::ContainerKill(_) => ActionKind::ContainerKill,
            Self::Delay(_) => ActionKind::Delay,
            Self::Loss(_) => ActionKind::Loss,
            Self::Duplicate(_) => ActionKind::Duplicate,
            Self::Corrupt(_) => ActionKind::Corrupt,
            Self::Partition(_) => ActionKind::Partition,
            Self::Bandwidth(_) => ActionKind::Bandwidth,
            Self::Reorder(_) => ActionKind::Reorder,
        }
    }

    /// The custom resource kind carrying this action
    pub fn resource_kind(&self) -> ResourceKind {
        self.kind().resource_kind()
    }

    fn validate(&self) -> Result<(), Error> {
        if let Self::ContainerKill(options) = self {
            if options.container_names.is_empty() {
                return Err(Error::validation(
                    "container_names",
                    "container-kill requires at least one container name",
                ));
            }
        }
        Ok(())
    }
}

/// A validated chaos experiment
#[derive(Clone, Debug, PartialEq)]
pub struct Experiment {
    name: String,
    namespace: String,
    selector: Selector,
    mode: Mode,
    value: Option<String>,
    duration: Option<String>,
    duration_parsed: Option<Duration>,
    labels: BTreeMap<String, String>,
    action: Action,
}

impl Experiment {
    /// Start building an experiment
    pub fn builder(selector: Selector, action: Action) -> ExperimentBuilder {
        ExperimentBuilder::new(selector, action)
    }

    /// Make the selected pods unavailable for 30 seconds (override with `.duration()`)
    pub fn pod_failure(selector: Selector) -> ExperimentBuilder {
        ExperimentBuilder::new(selector, Action::PodFailure(PodOptions::default()))
            .duration(DEFAULT_POD_FAILURE_DURATION)
    }

    /// Kill the selected pods
    pub fn pod_kill(selector: Selector) -> ExperimentBuilder {
        ExperimentBuilder::new(selector, Action::PodKill(PodOptions::default()))
    }

    /// Kill the named containers in the selected pods
    pub fn container_kill<I, S>(selector: Selector, containers: I) -> ExperimentBuilder
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let options = PodOptions {
            container_names: containers.into_iter().map(Into::into).collect(),
            ..Default::default()
        };
        ExperimentBuilder::new(selector, Action::ContainerKill(options))
    }

    /// Add `latency` (e.g. `100ms`) with `jitter` (e.g. `10ms`)
    pub fn network_delay(
        selector: Selector,
        latency: &str,
        jitter: &str,
    ) -> Result<ExperimentBuilder, Error> {
        let delay = DelayParams::with_jitter(latency, jitter, "0")?;
        Ok(ExperimentBuilder::new(selector, Action::Delay(delay)))
    }

    /// Drop `loss` percent of packets
    pub fn network_loss(selector: Selector, loss: &str) -> Result<ExperimentBuilder, Error> {
        let loss = LossParams::new(loss)?;
        Ok(ExperimentBuilder::new(selector, Action::Loss(loss)))
    }

    /// Partition the selected pods from every pod matched by `target`
    pub fn network_partition(
        selector: Selector,
        target: Selector,
        direction: Direction,
    ) -> ExperimentBuilder {
        ExperimentBuilder::new(
            selector,
            Action::Partition(PartitionParams::new(direction, target)),
        )
    }

    /// Limit bandwidth to `rate` (e.g. `1mbps`)
    pub fn network_bandwidth(
        selector: Selector,
        rate: &str,
        limit: u32,
        buffer: u32,
    ) -> Result<ExperimentBuilder, Error> {
        let bandwidth = BandwidthParams::new(rate, limit, buffer)?;
        Ok(ExperimentBuilder::new(selector, Action::Bandwidth(bandwidth)))
    }

    /// Resource name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resource namespace
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Target selection
    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    /// Selection mode
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Mode value, for counting modes
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// Duration as written (e.g. `30s`)
    pub fn duration(&self) -> Option<&str> {
        self.duration.as_deref()
    }

    /// Duration converted to a [`Duration`]
    pub fn duration_time(&self) -> Option<Duration> {
        self.duration_parsed
    }

    /// Labels copied onto the resource metadata
    pub fn labels(&self) -> &BTreeMap<String, String> {
        &self.labels
    }

    /// Injected fault
    pub fn action(&self) -> &Action {
        &self.action
    }

    /// Custom resource kind
    pub fn kind(&self) -> ResourceKind {
        self.action.resource_kind()
    }
}

/// Builder for [`Experiment`]
#[derive(Clone, Debug)]
pub struct ExperimentBuilder {
    name: Option<String>,
    namespace: String,
    selector: Selector,
    mode: Mode,
    value: Option<String>,
    duration: Option<String>,
    labels: BTreeMap<String, String>,
    action: Action,
}

impl ExperimentBuilder {
    /// Experiment on `selector` running `action`, mode `one` in `default`
    pub fn new(selector: Selector, action: Action) -> Self {
        Self {
            name: None,
            namespace: DEFAULT_NAMESPACE.to_string(),
            selector,
            mode: Mode::default(),
            value: None,
            duration: None,
            labels: BTreeMap::new(),
            action,
        }
    }

    /// Explicit resource name; generated from the kind and time otherwise
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Namespace the resource is created in
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Selection mode
    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Count or percentage for counting modes
    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// How long the fault lasts (`\d+[smh]`)
    pub fn duration(mut self, duration: impl Into<String>) -> Self {
        self.duration = Some(duration.into());
        self
    }

    /// Add a metadata label
    pub fn label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Validate and produce the experiment
    pub fn build(self) -> Result<Experiment, Error> {
        validate_mode_value(self.mode, self.value.as_deref())?;
        self.action.validate()?;

        let duration_parsed = self.duration.as_deref().map(parse_duration).transpose()?;

        if self.namespace.is_empty() {
            return Err(Error::validation("namespace", "must not be empty"));
        }

        let name = match self.name {
            Some(name) if name.is_empty() => {
                return Err(Error::validation("name", "must not be empty"))
            }
            Some(name) => name,
            None => generate_name(self.action.resource_kind()),
        };

        Ok(Experiment {
            name,
            namespace: self.namespace,
            selector: self.selector,
            mode: self.mode,
            value: self.value,
            duration: self.duration,
            duration_parsed,
            labels: self.labels,
            action: self.action,
        })
    }
}

/// `<lowercase kind>-<unix seconds>`, e.g. `podchaos-1700820345`
fn generate_name(kind: ResourceKind) -> String {
    format!("{}-{}", kind.plural(), chrono::Utc::now().timestamp())
}

fn validate_mode_value(mode: Mode, value: Option<&str>) -> Result<(), Error> {
    if !mode.requires_value() {
        return Ok(());
    }
    let value = match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => {
            return Err(Error::validation(
                "value",
                format!("mode '{mode}' requires a value"),
            ))
        }
    };

    match mode {
        Mode::Fixed => match value.trim().parse::<i64>() {
            Ok(n) if n > 0 => Ok(()),
            Ok(_) => Err(Error::validation(
                "value",
                format!("mode 'fixed' requires a positive integer, got '{value}'"),
            )),
            Err(_) => Err(Error::validation(
                "value",
                format!("mode 'fixed' requires an integer, got '{value}'"),
            )),
        },
        _ => validate_percentage("value", value).map(|_| ()),
    }
}
