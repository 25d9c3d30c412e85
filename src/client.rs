//! Resilient client for chaos custom resources
//!
//! [`ChaosApi`] is the seam the manager and controller talk through;
//! [`KubeChaosClient`] implements it against a real API server. Reads (get and
//! list) are retried with backoff on transient failures. Create and delete are
//! single attempts: a retried create could observe its own first attempt as a
//! conflict.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use kube::api::{Api, DeleteParams, DynamicObject, ListParams, PostParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::discovery::ApiResource;
use kube::{Client, Config};
#[cfg(test)]
use mockall::automock;
use tracing::{debug, info, warn};

use crate::config::ChaosConfig;
use crate::crd::ResourceKind;
use crate::manifest::ChaosManifest;
use crate::retry::{retry_with_backoff, Attempt};
use crate::Error;

/// Connection timeout for API server requests
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Read timeout for API server requests
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// CRUD operations on chaos resources
///
/// Implementations translate transport failures into [`Error`]: HTTP 404
/// becomes [`Error::NotFound`], HTTP 409 becomes [`Error::AlreadyExists`] and
/// everything else becomes [`Error::Connection`].
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ChaosApi: Send + Sync {
    /// Submit a new resource
    async fn create(
        &self,
        kind: ResourceKind,
        namespace: &str,
        manifest: &ChaosManifest,
    ) -> Result<DynamicObject, Error>;

    /// Fetch a resource by name
    async fn get(
        &self,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
    ) -> Result<DynamicObject, Error>;

    /// Delete a resource; an absent resource counts as deleted
    async fn delete(&self, kind: ResourceKind, namespace: &str, name: &str) -> Result<(), Error>;

    /// List resources of a kind, optionally filtered by a label selector
    async fn list(
        &self,
        kind: ResourceKind,
        namespace: &str,
        label_selector: Option<String>,
    ) -> Result<Vec<DynamicObject>, Error>;
}

/// [`ChaosApi`] backed by a kube client
#[derive(Clone)]
pub struct KubeChaosClient {
    client: Client,
    config: ChaosConfig,
}

impl KubeChaosClient {
    /// Authenticate using in-cluster credentials, falling back to kubeconfig
    ///
    /// The kubeconfig is `config.kubeconfig_path` if set, otherwise the
    /// default location (`$KUBECONFIG` or `~/.kube/config`).
    pub async fn connect(config: ChaosConfig) -> Result<Self, Error> {
        let mut kube_config = match Config::incluster() {
            Ok(kube_config) => {
                info!("Using in-cluster credentials");
                kube_config
            }
            Err(in_cluster) => {
                debug!(error = %in_cluster, "In-cluster credentials unavailable, trying kubeconfig");
                load_kubeconfig(config.kubeconfig_path.as_deref()).await?
            }
        };
        kube_config.connect_timeout = Some(DEFAULT_CONNECT_TIMEOUT);
        kube_config.read_timeout = Some(DEFAULT_READ_TIMEOUT);

        let client =
            Client::try_from(kube_config).map_err(|e| Error::connection_from("connect", e))?;
        Ok(Self::from_client(client, config))
    }

    /// Wrap an existing kube client
    pub fn from_client(client: Client, config: ChaosConfig) -> Self {
        Self { client, config }
    }

    /// Active configuration
    pub fn config(&self) -> &ChaosConfig {
        &self.config
    }

    /// Replace the configuration; affects only requests started afterwards
    pub fn set_config(&mut self, config: ChaosConfig) {
        self.config = config;
    }

    fn api(&self, kind: ResourceKind, namespace: &str) -> Api<DynamicObject> {
        Api::namespaced_with(
            self.client.clone(),
            namespace,
            &api_resource(&self.config, kind),
        )
    }
}

async fn load_kubeconfig(path: Option<&Path>) -> Result<Config, Error> {
    let options = KubeConfigOptions::default();
    match path {
        Some(path) => {
            info!(path = %path.display(), "Loading kubeconfig");
            let kubeconfig = Kubeconfig::read_from(path)
                .map_err(|e| Error::connection_from("read kubeconfig", e))?;
            Config::from_custom_kubeconfig(kubeconfig, &options)
                .await
                .map_err(|e| Error::connection_from("load kubeconfig", e))
        }
        None => Config::from_kubeconfig(&options)
            .await
            .map_err(|e| Error::connection_from("load kubeconfig", e)),
    }
}

/// API resource for a chaos kind under the configured group/version
pub fn api_resource(config: &ChaosConfig, kind: ResourceKind) -> ApiResource {
    ApiResource {
        group: config.api_group.clone(),
        version: config.api_version.clone(),
        api_version: config.api_version_string(),
        kind: kind.as_str().to_string(),
        plural: kind.plural(),
    }
}

/// True for failures worth retrying: throttling, server errors, transport
///
/// Configuration, authentication and TLS failures are permanent.
pub fn is_transient(err: &kube::Error) -> bool {
    match err {
        kube::Error::Api(resp) => resp.code == 429 || resp.code >= 500,
        kube::Error::HyperError(_) | kube::Error::Service(_) | kube::Error::HttpError(_) => true,
        _ => false,
    }
}

fn translate(
    err: kube::Error,
    operation: &str,
    kind: ResourceKind,
    namespace: &str,
    name: &str,
) -> Error {
    if let kube::Error::Api(resp) = &err {
        match resp.code {
            404 => return Error::not_found(kind.as_str(), namespace, name),
            409 => return Error::already_exists(kind.as_str(), namespace, name),
            _ => {}
        }
    }
    Error::connection_from(format!("{operation} {kind}/{name}"), err)
}

fn classify<T>(result: Result<T, kube::Error>) -> Attempt<T, kube::Error> {
    match result {
        Ok(value) => Attempt::Done(value),
        Err(e) if is_transient(&e) => Attempt::Transient(e),
        Err(e) => Attempt::Fatal(e),
    }
}

#[async_trait]
impl ChaosApi for KubeChaosClient {
    async fn create(
        &self,
        kind: ResourceKind,
        namespace: &str,
        manifest: &ChaosManifest,
    ) -> Result<DynamicObject, Error> {
        let obj = manifest.to_dynamic_object()?;
        let name = manifest.name();
        debug!(kind = %kind, namespace = %namespace, name = %name, "Creating chaos resource");

        self.api(kind, namespace)
            .create(&PostParams::default(), &obj)
            .await
            .map_err(|e| translate(e, "create", kind, namespace, name))
    }

    async fn get(
        &self,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
    ) -> Result<DynamicObject, Error> {
        let api = &self.api(kind, namespace);
        let operation = format!("get {kind}/{name}");

        let outcome = retry_with_backoff(&self.config.retry_config(), &operation, || async move {
            classify(api.get(name).await)
        })
        .await;

        outcome
            .result
            .map_err(|e| translate(e, "get", kind, namespace, name))
    }

    async fn delete(&self, kind: ResourceKind, namespace: &str, name: &str) -> Result<(), Error> {
        match self
            .api(kind, namespace)
            .delete(name, &DeleteParams::default())
            .await
        {
            Ok(_) => {
                debug!(kind = %kind, namespace = %namespace, name = %name, "Deleted chaos resource");
                Ok(())
            }
            Err(kube::Error::Api(resp)) if resp.code == 404 => {
                warn!(kind = %kind, namespace = %namespace, name = %name, "Chaos resource already absent");
                Ok(())
            }
            Err(e) => Err(translate(e, "delete", kind, namespace, name)),
        }
    }

    async fn list(
        &self,
        kind: ResourceKind,
        namespace: &str,
        label_selector: Option<String>,
    ) -> Result<Vec<DynamicObject>, Error> {
        let api = &self.api(kind, namespace);
        let params = match label_selector.as_deref() {
            Some(selector) => ListParams::default().labels(selector),
            None => ListParams::default(),
        };
        let params = &params;
        let operation = format!("list {kind}");

        let outcome = retry_with_backoff(&self.config.retry_config(), &operation, || async move {
            classify(api.list(params).await)
        })
        .await;

        outcome
            .result
            .map(|list| list.items)
            .map_err(|e| translate(e, "list", kind, namespace, "*"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::core::ErrorResponse;

    fn api_error(code: u16) -> kube::Error {
        kube::Error::Api(ErrorResponse {
            status: "Failure".into(),
            message: format!("status {code}"),
            reason: "Test".into(),
            code,
        })
    }

    #[test]
    fn server_errors_and_throttling_are_transient() {
        assert!(is_transient(&api_error(500)));
        assert!(is_transient(&api_error(503)));
        assert!(is_transient(&api_error(429)));
    }

    #[test]
    fn client_errors_are_not_retried() {
        assert!(!is_transient(&api_error(404)));
        assert!(!is_transient(&api_error(409)));
        assert!(!is_transient(&api_error(403)));
        let decode = serde_json::from_str::<u32>("nope").unwrap_err();
        assert!(!is_transient(&kube::Error::SerdeError(decode)));
    }

    #[test]
    fn only_transport_failures_are_retried() {
        assert!(is_transient(&kube::Error::Service("connection reset by peer".into())));
        assert!(!is_transient(&kube::Error::ReadEvents(std::io::Error::other("eof"))));
    }

    #[test]
    fn status_codes_translate_to_domain_errors() {
        let err = translate(api_error(404), "get", ResourceKind::PodChaos, "default", "kill-web");
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "PodChaos/kill-web not found in namespace default");

        let err = translate(api_error(409), "create", ResourceKind::NetworkChaos, "prod", "delay");
        assert!(matches!(err, Error::AlreadyExists { .. }));

        let err = translate(api_error(503), "get", ResourceKind::PodChaos, "default", "kill-web");
        match err {
            Error::Connection { operation, source, .. } => {
                assert_eq!(operation, "get PodChaos/kill-web");
                assert!(source.is_some());
            }
            other => panic!("expected connection error, got {other:?}"),
        }
    }

    #[test]
    fn api_resource_uses_lowercase_plural() {
        let ar = api_resource(&ChaosConfig::default(), ResourceKind::NetworkChaos);
        assert_eq!(ar.group, "chaos-mesh.org");
        assert_eq!(ar.version, "v1alpha1");
        assert_eq!(ar.api_version, "chaos-mesh.org/v1alpha1");
        assert_eq!(ar.kind, "NetworkChaos");
        assert_eq!(ar.plural, "networkchaos");
    }

    #[test]
    fn classify_separates_transient_from_fatal() {
        assert!(matches!(classify::<()>(Err(api_error(502))), Attempt::Transient(_)));
        assert!(matches!(classify::<()>(Err(api_error(404))), Attempt::Fatal(_)));
        assert!(matches!(classify(Ok::<_, kube::Error>(1)), Attempt::Done(1)));
    }

    // =========================================================================
    // Against canned API server responses
    // =========================================================================

    use std::convert::Infallible;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use serde_json::{json, Value};

    use crate::crd::{Experiment, Selector};

    /// Client whose API server answers with `responses` in order, repeating
    /// the last one. Returns the number of requests served alongside.
    fn canned(responses: Vec<(u16, Value)>) -> (KubeChaosClient, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let service = tower::service_fn(move |_req: http::Request<kube::client::Body>| {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            let (status, body) = responses
                .get(n)
                .or_else(|| responses.last())
                .cloned()
                .unwrap_or((500, Value::Null));
            async move {
                let response = http::Response::builder()
                    .status(status)
                    .header("content-type", "application/json")
                    .body(kube::client::Body::from(body.to_string().into_bytes()))
                    .unwrap();
                Ok::<_, Infallible>(response)
            }
        });
        let client = Client::new(service, "default");
        (
            KubeChaosClient::from_client(client, ChaosConfig::default()),
            calls,
        )
    }

    fn status(code: u16, reason: &str) -> (u16, Value) {
        (
            code,
            json!({
                "kind": "Status",
                "apiVersion": "v1",
                "metadata": {},
                "status": "Failure",
                "message": format!("{reason} (test)"),
                "reason": reason,
                "code": code
            }),
        )
    }

    fn pod_chaos(name: &str) -> (u16, Value) {
        (
            200,
            json!({
                "apiVersion": "chaos-mesh.org/v1alpha1",
                "kind": "PodChaos",
                "metadata": {"name": name, "namespace": "default"},
                "spec": {"action": "pod-kill"}
            }),
        )
    }

    #[tokio::test]
    async fn delete_of_absent_resource_succeeds_without_retry() {
        let (client, calls) = canned(vec![status(404, "NotFound")]);

        client
            .delete(ResourceKind::PodChaos, "default", "kill-web")
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn get_retries_server_errors_until_success() {
        let (client, calls) = canned(vec![
            status(503, "ServiceUnavailable"),
            status(503, "ServiceUnavailable"),
            pod_chaos("kill-web"),
        ]);

        let obj = client
            .get(ResourceKind::PodChaos, "default", "kill-web")
            .await
            .unwrap();
        assert_eq!(obj.metadata.name.as_deref(), Some("kill-web"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn get_gives_up_after_max_attempts() {
        let (client, calls) = canned(vec![status(503, "ServiceUnavailable")]);

        let err = client
            .get(ResourceKind::PodChaos, "default", "kill-web")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Connection { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn get_of_absent_resource_is_not_retried() {
        let (client, calls) = canned(vec![status(404, "NotFound")]);

        let err = client
            .get(ResourceKind::PodChaos, "default", "kill-web")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn list_retries_throttling() {
        let (client, calls) = canned(vec![
            status(429, "TooManyRequests"),
            (
                200,
                json!({
                    "apiVersion": "chaos-mesh.org/v1alpha1",
                    "kind": "PodChaosList",
                    "metadata": {},
                    "items": [pod_chaos("kill-web").1]
                }),
            ),
        ]);

        let items = client
            .list(ResourceKind::PodChaos, "default", Some("team=qa".into()))
            .await
            .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn create_conflict_is_already_exists_in_a_single_attempt() {
        let (client, calls) = canned(vec![status(409, "AlreadyExists")]);
        let experiment = Experiment::pod_kill(Selector::from_labels([("app", "web")], &[]).unwrap())
            .name("kill-web")
            .build()
            .unwrap();
        let manifest = crate::manifest::build(&experiment, client.config());

        let err = client
            .create(ResourceKind::PodChaos, "default", &manifest)
            .await
            .unwrap_err();
        match err {
            Error::AlreadyExists { kind, name, namespace } => {
                assert_eq!(kind, "PodChaos");
                assert_eq!(name, "kill-web");
                assert_eq!(namespace, "default");
            }
            other => panic!("expected AlreadyExists, got {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
