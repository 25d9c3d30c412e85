//! Target selection for chaos experiments
//!
//! A [`Selector`] chooses which pods an experiment affects. Label-based and
//! pod-name-based selection are mutually exclusive: the control plane silently
//! prefers `pods` when both are set, so we refuse the combination outright.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::Error;

/// Validated target-matching criteria
///
/// Fields are private; every constructor validates, so a `Selector` in hand is
/// always a valid selector fragment.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Selector {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    namespaces: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    label_selectors: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pods: BTreeMap<String, Vec<String>>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    field_selectors: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    annotation_selectors: BTreeMap<String, String>,
}

impl Selector {
    /// Start building a selector
    pub fn builder() -> SelectorBuilder {
        SelectorBuilder::default()
    }

    /// Label-based selection, optionally restricted to namespaces
    pub fn from_labels<I, K, V>(labels: I, namespaces: &[&str]) -> Result<Self, Error>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut builder = Self::builder();
        for ns in namespaces {
            builder = builder.namespace(*ns);
        }
        for (k, v) in labels {
            builder = builder.label(k, v);
        }
        builder.build()
    }

    /// Select specific pods by name within one namespace
    pub fn from_pods<I, S>(namespace: &str, pod_names: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::builder()
            .namespace(namespace)
            .pods(namespace, pod_names)
            .build()
    }

    /// Namespaces the selection is restricted to (empty = all)
    pub fn namespaces(&self) -> &[String] {
        &self.namespaces
    }

    /// Label key/value pairs
    pub fn label_selectors(&self) -> &BTreeMap<String, String> {
        &self.label_selectors
    }

    /// Pod names by namespace
    pub fn pods(&self) -> &BTreeMap<String, Vec<String>> {
        &self.pods
    }

    /// Field selectors
    pub fn field_selectors(&self) -> &BTreeMap<String, String> {
        &self.field_selectors
    }

    /// Annotation selectors
    pub fn annotation_selectors(&self) -> &BTreeMap<String, String> {
        &self.annotation_selectors
    }

    /// Selector fragment as it appears in a resource spec
    pub fn to_value(&self) -> Value {
        let mut fragment = Map::new();
        if !self.namespaces.is_empty() {
            fragment.insert("namespaces".into(), Value::from(self.namespaces.clone()));
        }
        insert_string_map(&mut fragment, "labelSelectors", &self.label_selectors);
        if !self.pods.is_empty() {
            let pods = self
                .pods
                .iter()
                .map(|(ns, names)| (ns.clone(), Value::from(names.clone())))
                .collect();
            fragment.insert("pods".into(), Value::Object(pods));
        }
        insert_string_map(&mut fragment, "fieldSelectors", &self.field_selectors);
        insert_string_map(&mut fragment, "annotationSelectors", &self.annotation_selectors);
        Value::Object(fragment)
    }

    fn validate(self) -> Result<Self, Error> {
        if !self.label_selectors.is_empty() && !self.pods.is_empty() {
            return Err(Error::ambiguous_selector(
                "cannot use both label selectors and pods; choose label-based or pod-name-based selection",
            ));
        }
        if self.label_selectors.is_empty()
            && self.pods.is_empty()
            && self.field_selectors.is_empty()
            && self.annotation_selectors.is_empty()
        {
            return Err(Error::ambiguous_selector(
                "at least one of label selectors, pods, field selectors or annotation selectors must be set",
            ));
        }
        Ok(self)
    }
}

fn insert_string_map(fragment: &mut Map<String, Value>, key: &str, map: &BTreeMap<String, String>) {
    if map.is_empty() {
        return;
    }
    let object = map
        .iter()
        .map(|(k, v)| (k.clone(), Value::from(v.as_str())))
        .collect();
    fragment.insert(key.to_string(), Value::Object(object));
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if !self.pods.is_empty() {
            let pods: Vec<String> = self
                .pods
                .iter()
                .map(|(ns, names)| format!("{}/{}", ns, names.join(",")))
                .collect();
            write!(f, "Pods: {}", pods.join(", "))
        } else if !self.label_selectors.is_empty() {
            let labels: Vec<String> = self
                .label_selectors
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect();
            write!(f, "Labels: {}", labels.join(", "))?;
            if !self.namespaces.is_empty() {
                write!(f, " in {}", self.namespaces.join(", "))?;
            }
            Ok(())
        } else {
            f.write_str("Custom selector")
        }
    }
}

/// Builder for [`Selector`]; validation happens in [`SelectorBuilder::build`]
#[derive(Clone, Debug, Default)]
pub struct SelectorBuilder {
    inner: Selector,
}

impl SelectorBuilder {
    /// Restrict selection to a namespace (repeatable, kept exactly as given)
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.inner.namespaces.push(namespace.into());
        self
    }

    /// Match pods carrying this label
    pub fn label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.inner.label_selectors.insert(key.into(), value.into());
        self
    }

    /// Select pods by name within a namespace
    pub fn pods<I, S>(mut self, namespace: impl Into<String>, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inner
            .pods
            .entry(namespace.into())
            .or_default()
            .extend(names.into_iter().map(Into::into));
        self
    }

    /// Match pods by field selector (e.g. `spec.nodeName`)
    pub fn field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.inner.field_selectors.insert(key.into(), value.into());
        self
    }

    /// Match pods carrying this annotation
    pub fn annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.inner
            .annotation_selectors
            .insert(key.into(), value.into());
        self
    }

    /// Validate and produce the selector
    pub fn build(self) -> Result<Selector, Error> {
        self.inner.validate()
    }
}
