//! Integration tests for the experiment lifecycle
//!
//! These tests tell the story of a resilience suite that injects faults into a
//! running workload, waits for the reconciler to confirm them, and relies on
//! the controller to take them down again.

use std::time::Duration;

use chaos_harness::crd::Direction;
use chaos_harness::{ChaosApi, ChaosController, Error, Experiment, Mode, Selector};

use super::helpers::{manager, target_selector, test_namespace, unique_name, TEST_LABEL_KEY};

// =============================================================================
// Injection Stories
// =============================================================================

/// Story: A pod-kill experiment is confirmed injected and removed on scope exit
#[tokio::test]
#[ignore]
async fn story_pod_kill_is_injected_and_removed_by_the_scope() {
    let manager = manager().await;
    let client = manager.client().clone();
    let experiment = Experiment::pod_kill(target_selector())
        .name(unique_name("kill"))
        .namespace(test_namespace())
        .label(TEST_LABEL_KEY, "lifecycle")
        .build()
        .expect("valid experiment");
    let probe = experiment.clone();

    let phase = ChaosController::scope(manager, |chaos| {
        Box::pin(async move {
            let exp = chaos.inject(experiment).await?;
            Ok(chaos.phase(&exp))
        })
    })
    .await
    .expect("scope should succeed");
    assert_eq!(phase, Some(chaos_harness::Phase::Injected));

    // Scope exit waited for deletion, so the resource is gone
    let err = client
        .get(probe.kind(), probe.namespace(), probe.name())
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

/// Story: Network delay on a fraction of pods, removed explicitly mid-scope
#[tokio::test]
#[ignore]
async fn story_network_delay_can_be_removed_before_scope_exit() {
    let manager = manager().await;
    let experiment = Experiment::network_delay(target_selector(), "100ms", "10ms")
        .expect("valid delay")
        .name(unique_name("delay"))
        .namespace(test_namespace())
        .mode(Mode::FixedPercent)
        .value("50")
        .duration("2m")
        .label(TEST_LABEL_KEY, "lifecycle")
        .build()
        .expect("valid experiment");

    ChaosController::scope(manager, |chaos| {
        Box::pin(async move {
            let exp = chaos
                .inject_with(experiment, true, Some(Duration::from_secs(90)))
                .await?;
            chaos.remove(&exp, true).await?;
            assert_eq!(chaos.active_count(), 0);
            Ok(())
        })
    })
    .await
    .expect("scope should succeed");
}

/// Story: A partition between two label selections round-trips through the API
#[tokio::test]
#[ignore]
async fn story_partition_is_accepted_by_the_api_server() {
    let manager = manager().await;
    let ns = test_namespace();
    let target = Selector::from_labels([("app", "chaos-peer")], &[ns.as_str()]).expect("valid selector");
    let experiment = Experiment::network_partition(target_selector(), target, Direction::Both)
        .name(unique_name("split"))
        .namespace(ns)
        .duration("1m")
        .label(TEST_LABEL_KEY, "lifecycle")
        .build()
        .expect("valid experiment");

    manager.apply(&experiment).await.expect("create should succeed");
    manager.get_status(&experiment).await.expect("status readable");

    manager.delete(&experiment).await.expect("delete should succeed");
    manager
        .wait_for_deletion(&experiment, None, None)
        .await
        .expect("resource should disappear");
}

// =============================================================================
// Failure Stories
// =============================================================================

/// Story: Submitting the same experiment twice is reported as a conflict
#[tokio::test]
#[ignore]
async fn story_duplicate_submission_is_a_conflict() {
    let manager = manager().await;
    let experiment = Experiment::pod_failure(target_selector())
        .name(unique_name("fail"))
        .namespace(test_namespace())
        .label(TEST_LABEL_KEY, "lifecycle")
        .build()
        .expect("valid experiment");

    manager.apply(&experiment).await.expect("first create succeeds");
    let err = manager.apply(&experiment).await.unwrap_err();
    assert!(matches!(err, Error::AlreadyExists { .. }));

    manager.delete(&experiment).await.expect("cleanup");
}

/// Story: Deleting an experiment that was never created is not an error
#[tokio::test]
#[ignore]
async fn story_deleting_an_absent_experiment_succeeds() {
    let manager = manager().await;
    let experiment = Experiment::pod_kill(target_selector())
        .name(unique_name("ghost"))
        .namespace(test_namespace())
        .build()
        .expect("valid experiment");

    manager.delete(&experiment).await.expect("absent resource counts as deleted");
}

/// Story: Waiting on an experiment that was never created times out
#[tokio::test]
#[ignore]
async fn story_waiting_on_an_absent_experiment_times_out() {
    let manager = manager().await;
    let experiment = Experiment::pod_kill(target_selector())
        .name(unique_name("ghost"))
        .namespace(test_namespace())
        .build()
        .expect("valid experiment");

    let err = manager
        .wait_for_injection(&experiment, Some(Duration::from_secs(5)), Some(Duration::from_secs(1)))
        .await
        .unwrap_err();
    assert!(err.is_timeout());
}
