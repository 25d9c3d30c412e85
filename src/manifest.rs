//! Experiment to declarative resource payload
//!
//! [`build`] is a pure function of the experiment and the configured API
//! version: the same experiment (with an explicit name) always yields the same
//! manifest, key for key.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::DynamicObject;
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::config::ChaosConfig;
use crate::crd::{Action, Experiment};
use crate::Error;

/// A chaos custom resource ready to submit
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChaosManifest {
    /// `<group>/<version>`
    pub api_version: String,
    /// Resource kind, e.g. `PodChaos`
    pub kind: String,
    /// Name, namespace and labels
    pub metadata: ObjectMeta,
    /// Experiment spec
    pub spec: Value,
}

impl ChaosManifest {
    /// Resource name
    pub fn name(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or_default()
    }

    /// Manifest as a JSON value
    pub fn to_value(&self) -> Result<Value, Error> {
        serde_json::to_value(self)
            .map_err(|e| Error::serialization(format!("failed to encode {}: {}", self.kind, e)))
    }

    /// Manifest as a dynamic object for the kube API
    pub fn to_dynamic_object(&self) -> Result<DynamicObject, Error> {
        serde_json::from_value(self.to_value()?)
            .map_err(|e| Error::serialization(format!("failed to convert {}: {}", self.kind, e)))
    }

    /// Manifest rendered as YAML
    pub fn to_yaml(&self) -> Result<String, Error> {
        serde_yaml::to_string(self)
            .map_err(|e| Error::serialization(format!("failed to render {}: {}", self.kind, e)))
    }
}

/// Build the resource payload for an experiment
pub fn build(experiment: &Experiment, config: &ChaosConfig) -> ChaosManifest {
    let labels = (!experiment.labels().is_empty()).then(|| experiment.labels().clone());

    ChaosManifest {
        api_version: config.api_version_string(),
        kind: experiment.kind().as_str().to_string(),
        metadata: ObjectMeta {
            name: Some(experiment.name().to_string()),
            namespace: Some(experiment.namespace().to_string()),
            labels,
            ..Default::default()
        },
        spec: build_spec(experiment),
    }
}

fn build_spec(experiment: &Experiment) -> Value {
    let mut spec = Map::new();
    let action = experiment.action();
    spec.insert("action".into(), json!(action.kind().as_str()));

    match action {
        Action::PodFailure(options) | Action::PodKill(options) | Action::ContainerKill(options) => {
            options.write_fields(&mut spec);
        }
        Action::Delay(delay) => {
            spec.insert("delay".into(), delay.to_value());
        }
        Action::Loss(loss) => {
            spec.insert("loss".into(), loss.to_value());
        }
        Action::Duplicate(duplicate) => {
            spec.insert("duplicate".into(), duplicate.to_value());
        }
        Action::Corrupt(corrupt) => {
            spec.insert("corrupt".into(), corrupt.to_value());
        }
        Action::Partition(partition) => {
            spec.insert("direction".into(), json!(partition.direction.as_str()));
            spec.insert("target".into(), partition.target_value());
        }
        Action::Bandwidth(bandwidth) => {
            spec.insert("bandwidth".into(), bandwidth.to_value());
        }
        Action::Reorder(reorder) => {
            spec.insert("reorder".into(), reorder.to_value());
        }
    }

    spec.insert("selector".into(), experiment.selector().to_value());
    spec.insert("mode".into(), json!(experiment.mode().as_str()));
    if let Some(value) = experiment.value() {
        spec.insert("value".into(), json!(value));
    }
    if let Some(duration) = experiment.duration() {
        spec.insert("duration".into(), json!(duration));
    }

    Value::Object(spec)
}
