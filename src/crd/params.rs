//! Action-specific parameters
//!
//! Each constructor validates its inputs; once built, a parameter value always
//! renders to a fragment the control plane accepts.

use serde_json::{json, Map, Value};

use super::selector::Selector;
use super::types::{Direction, Mode};
use super::validation::{validate_network_duration, validate_percentage, validate_rate};
use crate::Error;

/// Options shared by pod-failure, pod-kill and container-kill
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PodOptions {
    /// Containers to target; required (non-empty) for container-kill
    pub container_names: Vec<String>,
    /// Termination grace period in seconds
    pub grace_period: Option<u32>,
    /// Opaque scheduler descriptor for recurring experiments, passed through
    pub scheduler: Option<Value>,
    /// Remote cluster for multi-cluster experiments
    pub remote_cluster: Option<String>,
}

impl PodOptions {
    pub(crate) fn write_fields(&self, fields: &mut Map<String, Value>) {
        if !self.container_names.is_empty() {
            fields.insert("containerNames".into(), json!(self.container_names));
        }
        if let Some(grace) = self.grace_period {
            fields.insert("gracePeriod".into(), json!(grace));
        }
        if let Some(scheduler) = &self.scheduler {
            fields.insert("scheduler".into(), scheduler.clone());
        }
        if let Some(cluster) = &self.remote_cluster {
            fields.insert("remoteCluster".into(), json!(cluster));
        }
    }
}

/// Network latency injection
#[derive(Clone, Debug, PartialEq)]
pub struct DelayParams {
    latency: String,
    jitter: String,
    correlation: String,
    reorder: Option<ReorderParams>,
}

impl DelayParams {
    /// Latency with no jitter and no correlation
    pub fn new(latency: &str) -> Result<Self, Error> {
        Self::with_jitter(latency, "0ms", "0")
    }

    /// Latency with jitter and correlation percentage
    pub fn with_jitter(latency: &str, jitter: &str, correlation: &str) -> Result<Self, Error> {
        validate_network_duration("delay.latency", latency)?;
        validate_network_duration("delay.jitter", jitter)?;
        validate_percentage("delay.correlation", correlation)?;
        Ok(Self {
            latency: latency.to_string(),
            jitter: jitter.to_string(),
            correlation: correlation.to_string(),
            reorder: None,
        })
    }

    /// Also reorder delayed packets
    pub fn reorder(mut self, reorder: ReorderParams) -> Self {
        self.reorder = Some(reorder);
        self
    }

    /// Configured latency
    pub fn latency(&self) -> &str {
        &self.latency
    }

    pub(crate) fn to_value(&self) -> Value {
        let mut delay = json!({
            "latency": self.latency,
            "jitter": self.jitter,
            "correlation": self.correlation,
        });
        if let (Some(reorder), Some(obj)) = (&self.reorder, delay.as_object_mut()) {
            obj.insert("reorder".into(), reorder.to_value());
        }
        delay
    }
}

macro_rules! percentage_params {
    ($(#[$doc:meta])* $name:ident, $field:literal) => {
        $(#[$doc])*
        #[derive(Clone, Debug, PartialEq)]
        pub struct $name {
            percent: String,
            correlation: String,
        }

        impl $name {
            /// Percentage of packets affected, with no correlation
            pub fn new(percent: &str) -> Result<Self, Error> {
                Self::with_correlation(percent, "0")
            }

            /// Percentage of packets affected and correlation percentage
            pub fn with_correlation(percent: &str, correlation: &str) -> Result<Self, Error> {
                validate_percentage(concat!($field, ".", $field), percent)?;
                validate_percentage(concat!($field, ".correlation"), correlation)?;
                Ok(Self {
                    percent: percent.to_string(),
                    correlation: correlation.to_string(),
                })
            }

            /// Configured percentage
            pub fn percent(&self) -> &str {
                &self.percent
            }

            pub(crate) fn to_value(&self) -> Value {
                let mut fields = Map::new();
                fields.insert($field.to_string(), json!(self.percent));
                fields.insert("correlation".to_string(), json!(self.correlation));
                Value::Object(fields)
            }
        }
    };
}

percentage_params!(
    /// Packet loss
    LossParams,
    "loss"
);
percentage_params!(
    /// Packet duplication
    DuplicateParams,
    "duplicate"
);
percentage_params!(
    /// Packet corruption
    CorruptParams,
    "corrupt"
);

/// Network partition between the experiment's selection and a target
#[derive(Clone, Debug, PartialEq)]
pub struct PartitionParams {
    /// Direction of blocked traffic
    pub direction: Direction,
    /// Pods on the other side of the partition
    pub target: Selector,
    /// How many target pods take part
    pub target_mode: Mode,
}

impl PartitionParams {
    /// Partition against every pod matched by `target`
    pub fn new(direction: Direction, target: Selector) -> Self {
        Self {
            direction,
            target,
            target_mode: Mode::All,
        }
    }

    pub(crate) fn target_value(&self) -> Value {
        json!({ "selector": self.target.to_value(), "mode": self.target_mode.as_str() })
    }
}

/// Bandwidth limitation (token bucket filter)
#[derive(Clone, Debug, PartialEq)]
pub struct BandwidthParams {
    rate: String,
    limit: u32,
    buffer: u32,
    peakrate: Option<u64>,
    minburst: Option<u32>,
}

impl BandwidthParams {
    /// Rate (e.g. `1mbps`), queue limit in bytes and bucket size in bytes
    pub fn new(rate: &str, limit: u32, buffer: u32) -> Result<Self, Error> {
        validate_rate("bandwidth.rate", rate)?;
        if limit == 0 {
            return Err(Error::validation("bandwidth.limit", "must be greater than 0"));
        }
        if buffer == 0 {
            return Err(Error::validation("bandwidth.buffer", "must be greater than 0"));
        }
        Ok(Self {
            rate: rate.to_string(),
            limit,
            buffer,
            peakrate: None,
            minburst: None,
        })
    }

    /// Maximum depletion rate of the bucket, in bytes per second
    pub fn peakrate(mut self, peakrate: u64) -> Self {
        self.peakrate = Some(peakrate);
        self
    }

    /// Size of the peakrate bucket, in bytes
    pub fn minburst(mut self, minburst: u32) -> Self {
        self.minburst = Some(minburst);
        self
    }

    pub(crate) fn to_value(&self) -> Value {
        let mut bandwidth = Map::new();
        bandwidth.insert("rate".into(), json!(self.rate));
        bandwidth.insert("limit".into(), json!(self.limit));
        bandwidth.insert("buffer".into(), json!(self.buffer));
        if let Some(peakrate) = self.peakrate {
            bandwidth.insert("peakrate".into(), json!(peakrate));
        }
        if let Some(minburst) = self.minburst {
            bandwidth.insert("minburst".into(), json!(minburst));
        }
        Value::Object(bandwidth)
    }
}

/// Packet reordering
#[derive(Clone, Debug, PartialEq)]
pub struct ReorderParams {
    reorder: String,
    correlation: String,
    gap: u32,
}

impl ReorderParams {
    /// Reorder percentage, correlation percentage and packet gap
    pub fn new(reorder: &str, correlation: &str, gap: u32) -> Result<Self, Error> {
        validate_percentage("reorder.reorder", reorder)?;
        validate_percentage("reorder.correlation", correlation)?;
        Ok(Self {
            reorder: reorder.to_string(),
            correlation: correlation.to_string(),
            gap,
        })
    }

    pub(crate) fn to_value(&self) -> Value {
        json!({ "reorder": self.reorder, "correlation": self.correlation, "gap": self.gap })
    }
}
