//! Integration tests for the orphan sweep
//!
//! These tests tell the story of a CI job recovering from a previous run that
//! crashed before its chaos scope could clean up.

use chaos_harness::{cleanup_orphaned, ChaosApi, Experiment};

use super::helpers::{connect, target_selector, test_namespace, unique_name, TEST_LABEL_KEY};

/// Story: Leftovers from a crashed run are found by label and removed
#[tokio::test]
#[ignore]
async fn story_leftovers_are_swept_by_label() {
    let (client, config) = connect().await;
    let manager = chaos_harness::ChaosManager::new(client.clone(), config);
    let ns = test_namespace();
    let run = unique_name("run");
    let selector = format!("{}={}", TEST_LABEL_KEY, run);

    // A crashed run left a pod-kill and a loss experiment behind
    for experiment in [
        Experiment::pod_kill(target_selector())
            .name(unique_name("orphan-kill"))
            .namespace(ns.clone())
            .duration("10m")
            .label(TEST_LABEL_KEY, run.clone())
            .build()
            .expect("valid experiment"),
        Experiment::network_loss(target_selector(), "20")
            .expect("valid loss")
            .name(unique_name("orphan-loss"))
            .namespace(ns.clone())
            .duration("10m")
            .label(TEST_LABEL_KEY, run.clone())
            .build()
            .expect("valid experiment"),
    ] {
        manager.apply(&experiment).await.expect("create should succeed");
    }

    // A dry run reports them without deleting
    let found = cleanup_orphaned(client.as_ref(), &ns, Some(&selector), true).await;
    assert_eq!(found, 2);

    // The real sweep removes them
    let removed = cleanup_orphaned(client.as_ref(), &ns, Some(&selector), false).await;
    assert_eq!(removed, 2);

    let remaining = client
        .list(chaos_harness::ResourceKind::PodChaos, &ns, Some(selector.clone()))
        .await
        .expect("list should succeed");
    assert!(remaining
        .iter()
        .all(|obj| obj.metadata.deletion_timestamp.is_some()));
}
