//! Shared fixtures for cluster tests

use std::sync::Arc;

use chaos_harness::{ChaosConfig, ChaosManager, KubeChaosClient, Selector};

/// Label every test-created experiment carries, for the orphan sweep
pub const TEST_LABEL_KEY: &str = "chaos-harness/test-run";

/// Namespace the target pods live in
pub fn test_namespace() -> String {
    std::env::var("CHAOS_TEST_NAMESPACE").unwrap_or_else(|_| "default".to_string())
}

/// Connect to the cluster using the environment's config
pub async fn connect() -> (Arc<KubeChaosClient>, ChaosConfig) {
    let config = ChaosConfig::from_env().expect("invalid CHAOS_* environment");
    let client = KubeChaosClient::connect(config.clone())
        .await
        .expect("failed to connect to cluster");
    (Arc::new(client), config)
}

/// Manager over a fresh connection
pub async fn manager() -> ChaosManager<KubeChaosClient> {
    let (client, config) = connect().await;
    ChaosManager::new(client, config)
}

/// The pods chaos is aimed at
pub fn target_selector() -> Selector {
    Selector::from_labels([("app", "chaos-target")], &[test_namespace().as_str()])
        .expect("valid selector")
}

/// A resource name unique to this test run
pub fn unique_name(prefix: &str) -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("clock before epoch")
        .subsec_nanos();
    format!("{}-{}", prefix, nanos)
}
