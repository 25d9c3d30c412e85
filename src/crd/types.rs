//! Enumerations and status types shared by all chaos experiments

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Condition type reported once every selected target has been injected
pub const CONDITION_ALL_INJECTED: &str = "AllInjected";

/// The "True" status value for conditions
pub const STATUS_TRUE: &str = "True";

/// How many of the matched targets an experiment affects
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    /// One random target
    #[default]
    One,
    /// Every matched target
    All,
    /// A fixed number of targets (`value` is the count)
    Fixed,
    /// A fixed percentage of targets (`value` is the percentage)
    FixedPercent,
    /// A random percentage up to `value`
    RandomMaxPercent,
}

impl Mode {
    /// Wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::One => "one",
            Self::All => "all",
            Self::Fixed => "fixed",
            Self::FixedPercent => "fixed-percent",
            Self::RandomMaxPercent => "random-max-percent",
        }
    }

    /// True if this mode needs a `value`
    pub fn requires_value(&self) -> bool {
        matches!(
            self,
            Self::Fixed | Self::FixedPercent | Self::RandomMaxPercent
        )
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "one" => Ok(Self::One),
            "all" => Ok(Self::All),
            "fixed" => Ok(Self::Fixed),
            "fixed-percent" => Ok(Self::FixedPercent),
            "random-max-percent" => Ok(Self::RandomMaxPercent),
            _ => Err(Error::validation(
                "mode",
                format!(
                    "invalid mode '{s}', expected one of: one, all, fixed, fixed-percent, random-max-percent"
                ),
            )),
        }
    }
}

/// Traffic direction blocked by a network partition
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Traffic to the target
    #[default]
    To,
    /// Traffic from the target
    From,
    /// Both directions
    Both,
}

impl Direction {
    /// Wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::To => "to",
            Self::From => "from",
            Self::Both => "both",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The fault an experiment injects
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ActionKind {
    /// Make pods unavailable for the duration
    PodFailure,
    /// Kill pods
    PodKill,
    /// Kill specific containers
    ContainerKill,
    /// Add network latency
    Delay,
    /// Drop packets
    Loss,
    /// Duplicate packets
    Duplicate,
    /// Corrupt packets
    Corrupt,
    /// Partition the network between two selections
    Partition,
    /// Limit bandwidth
    Bandwidth,
    /// Reorder packets
    Reorder,
}

impl ActionKind {
    /// Value of the `spec.action` field
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PodFailure => "pod-failure",
            Self::PodKill => "pod-kill",
            Self::ContainerKill => "container-kill",
            Self::Delay => "delay",
            Self::Loss => "loss",
            Self::Duplicate => "duplicate",
            Self::Corrupt => "corrupt",
            Self::Partition => "partition",
            Self::Bandwidth => "bandwidth",
            Self::Reorder => "reorder",
        }
    }

    /// The custom resource kind that carries this action
    pub fn resource_kind(&self) -> ResourceKind {
        match self {
            Self::PodFailure | Self::PodKill | Self::ContainerKill => ResourceKind::PodChaos,
            Self::Delay
            | Self::Loss
            | Self::Duplicate
            | Self::Corrupt
            | Self::Partition
            | Self::Bandwidth
            | Self::Reorder => ResourceKind::NetworkChaos,
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Chaos custom resource kinds served by the control plane
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// Pod-level faults
    PodChaos,
    /// Network faults
    NetworkChaos,
    /// Filesystem I/O faults
    IoChaos,
    /// CPU/memory stress
    StressChaos,
    /// Clock skew
    TimeChaos,
    /// Kernel faults
    KernelChaos,
    /// DNS faults
    DnsChaos,
    /// HTTP faults
    HttpChaos,
    /// JVM faults
    JvmChaos,
    /// AWS faults
    AwsChaos,
    /// GCP faults
    GcpChaos,
}

impl ResourceKind {
    /// Every kind, in the order the orphan sweep visits them
    pub const ALL: [ResourceKind; 11] = [
        Self::PodChaos,
        Self::NetworkChaos,
        Self::IoChaos,
        Self::StressChaos,
        Self::TimeChaos,
        Self::KernelChaos,
        Self::DnsChaos,
        Self::HttpChaos,
        Self::JvmChaos,
        Self::AwsChaos,
        Self::GcpChaos,
    ];

    /// The `kind` field value
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PodChaos => "PodChaos",
            Self::NetworkChaos => "NetworkChaos",
            Self::IoChaos => "IOChaos",
            Self::StressChaos => "StressChaos",
            Self::TimeChaos => "TimeChaos",
            Self::KernelChaos => "KernelChaos",
            Self::DnsChaos => "DNSChaos",
            Self::HttpChaos => "HTTPChaos",
            Self::JvmChaos => "JVMChaos",
            Self::AwsChaos => "AWSChaos",
            Self::GcpChaos => "GCPChaos",
        }
    }

    /// REST plural; chaos kinds are their own lowercase plural
    pub fn plural(&self) -> String {
        self.as_str().to_lowercase()
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ResourceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s) || k.plural() == s)
            .ok_or_else(|| Error::validation("kind", format!("unknown chaos kind '{s}'")))
    }
}

/// A condition reported by the reconciler
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct ChaosCondition {
    /// Condition type (e.g., "Selected", "AllInjected", "AllRecovered")
    #[serde(rename = "type")]
    pub type_: String,
    /// "True", "False" or "Unknown"
    #[serde(default)]
    pub status: String,
}

impl ChaosCondition {
    /// True if this condition has the given type and status "True"
    pub fn is_true(&self, condition_type: &str) -> bool {
        self.type_ == condition_type && self.status == STATUS_TRUE
    }
}

/// The `status` sub-object of a chaos resource; never written by this crate
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct ChaosStatus {
    /// Reconciler conditions
    #[serde(default)]
    pub conditions: Vec<ChaosCondition>,
    /// Every other status field, preserved as-is
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl ChaosStatus {
    /// True if any condition of the given type has status "True"
    pub fn has_condition(&self, condition_type: &str) -> bool {
        self.conditions.iter().any(|c| c.is_true(condition_type))
    }

    /// True once the reconciler reports `AllInjected=True`
    pub fn all_injected(&self) -> bool {
        self.has_condition(CONDITION_ALL_INJECTED)
    }
}
