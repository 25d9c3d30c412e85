//! Experiment lifecycle operations
//!
//! [`ChaosManager`] submits and deletes experiments, reads their status and
//! waits for the reconciler to confirm injection or removal.

use std::sync::Arc;
use std::time::Duration;

use kube::api::DynamicObject;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::client::ChaosApi;
use crate::config::ChaosConfig;
use crate::crd::{ChaosStatus, Experiment, ResourceKind};
use crate::manifest::{self, ChaosManifest};
use crate::polling::wait_for_resource;
use crate::Error;

/// Lifecycle operations over a [`ChaosApi`]
pub struct ChaosManager<C: ?Sized> {
    client: Arc<C>,
    config: ChaosConfig,
}

impl<C: ?Sized> Clone for ChaosManager<C> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            config: self.config.clone(),
        }
    }
}

impl<C: ChaosApi + ?Sized> ChaosManager<C> {
    /// Manager over `client` using `config` for API version and wait defaults
    pub fn new(client: Arc<C>, config: ChaosConfig) -> Self {
        Self { client, config }
    }

    /// Underlying client
    pub fn client(&self) -> &Arc<C> {
        &self.client
    }

    /// Active configuration
    pub fn config(&self) -> &ChaosConfig {
        &self.config
    }

    /// Replace the configuration; running waits keep the values they started with
    pub fn set_config(&mut self, config: ChaosConfig) {
        self.config = config;
    }

    /// The payload `apply` would submit
    pub fn manifest(&self, experiment: &Experiment) -> ChaosManifest {
        manifest::build(experiment, &self.config)
    }

    /// Submit the experiment
    pub async fn apply(&self, experiment: &Experiment) -> Result<DynamicObject, Error> {
        let manifest = self.manifest(experiment);
        info!(
            kind = %experiment.kind(),
            name = %experiment.name(),
            namespace = %experiment.namespace(),
            action = %experiment.action().kind(),
            selector = %experiment.selector(),
            "Applying chaos experiment"
        );
        self.client
            .create(experiment.kind(), experiment.namespace(), &manifest)
            .await
    }

    /// Delete the experiment's resource; an absent resource is not an error
    pub async fn delete(&self, experiment: &Experiment) -> Result<(), Error> {
        info!(
            kind = %experiment.kind(),
            name = %experiment.name(),
            namespace = %experiment.namespace(),
            "Deleting chaos experiment"
        );
        self.client
            .delete(experiment.kind(), experiment.namespace(), experiment.name())
            .await
    }

    /// Current `status` of the experiment's resource (empty if not yet reported)
    pub async fn get_status(&self, experiment: &Experiment) -> Result<ChaosStatus, Error> {
        let obj = self
            .client
            .get(experiment.kind(), experiment.namespace(), experiment.name())
            .await?;
        status_of(&obj)
    }

    /// Wait until the reconciler reports `AllInjected=True`
    ///
    /// `timeout` and `poll_interval` default to the configured values. A
    /// resource that is not visible yet is treated as pending; any other error
    /// aborts the wait. Returns the time spent waiting.
    pub async fn wait_for_injection(
        &self,
        experiment: &Experiment,
        timeout: Option<Duration>,
        poll_interval: Option<Duration>,
    ) -> Result<Duration, Error> {
        let timeout = timeout.unwrap_or(self.config.wait_timeout);
        let poll_interval = poll_interval.unwrap_or(self.config.poll_interval);
        let start = Instant::now();

        info!(
            kind = %experiment.kind(),
            name = %experiment.name(),
            timeout_secs = timeout.as_secs_f64(),
            "Waiting for chaos injection"
        );

        wait_for_resource(
            "injection",
            timeout,
            poll_interval,
            || async move {
                match self.get_status(experiment).await {
                    Ok(status) if status.all_injected() => Ok(Some(())),
                    Ok(_) => Ok(None),
                    Err(e) if e.is_not_found() => {
                        warn!(
                            kind = %experiment.kind(),
                            name = %experiment.name(),
                            "Chaos resource not visible yet"
                        );
                        Ok(None)
                    }
                    Err(e) => Err(e),
                }
            },
            |elapsed| {
                timeout_error(
                    "injection",
                    experiment.kind(),
                    experiment.name(),
                    &experiment.selector().to_string(),
                    elapsed,
                )
            },
        )
        .await?;

        let elapsed = start.elapsed();
        info!(
            kind = %experiment.kind(),
            name = %experiment.name(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Chaos injected"
        );
        Ok(elapsed)
    }

    /// Wait until the experiment's resource is gone
    ///
    /// `timeout` and `poll_interval` default to the configured deletion
    /// values. Returns the time spent waiting.
    pub async fn wait_for_deletion(
        &self,
        experiment: &Experiment,
        timeout: Option<Duration>,
        poll_interval: Option<Duration>,
    ) -> Result<Duration, Error> {
        self.wait_until_gone(
            experiment.kind(),
            experiment.namespace(),
            experiment.name(),
            &experiment.selector().to_string(),
            timeout,
            poll_interval,
        )
        .await
    }

    /// Wait until the named resource is gone
    ///
    /// Like [`wait_for_deletion`](Self::wait_for_deletion) for a resource
    /// known only by its coordinates. `selector` describes the targeted pods
    /// in the timeout error.
    pub async fn wait_until_gone(
        &self,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
        selector: &str,
        timeout: Option<Duration>,
        poll_interval: Option<Duration>,
    ) -> Result<Duration, Error> {
        let timeout = timeout.unwrap_or(self.config.deletion_timeout);
        let poll_interval = poll_interval.unwrap_or(self.config.deletion_poll_interval);
        let start = Instant::now();

        wait_for_resource(
            "deletion",
            timeout,
            poll_interval,
            || async move {
                match self.client.get(kind, namespace, name).await {
                    Ok(_) => Ok(None),
                    Err(e) if e.is_not_found() => Ok(Some(())),
                    Err(e) => Err(e),
                }
            },
            |elapsed| timeout_error("deletion", kind, name, selector, elapsed),
        )
        .await?;

        let elapsed = start.elapsed();
        info!(
            kind = %kind,
            namespace = %namespace,
            name = %name,
            elapsed_ms = elapsed.as_millis() as u64,
            "Chaos experiment deleted"
        );
        Ok(elapsed)
    }
}

/// Extract and decode the `status` sub-object
pub fn status_of(obj: &DynamicObject) -> Result<ChaosStatus, Error> {
    match obj.data.get("status") {
        None | Some(serde_json::Value::Null) => Ok(ChaosStatus::default()),
        Some(status) => serde_json::from_value(status.clone())
            .map_err(|e| Error::serialization(format!("invalid chaos status: {}", e))),
    }
}

fn timeout_error(
    operation: &str,
    kind: ResourceKind,
    name: &str,
    selector: &str,
    elapsed: Duration,
) -> Error {
    Error::Timeout {
        operation: operation.to_string(),
        kind: kind.to_string(),
        name: name.to_string(),
        elapsed,
        selector: selector.to_string(),
    }
}
