//! Offline stories for describing experiments
//!
//! These run without a cluster: they build experiments through the public API
//! and check the resources that would be submitted.

use chaos_harness::crd::{BandwidthParams, Direction, LossParams, PodOptions};
use chaos_harness::manifest;
use chaos_harness::{Action, ChaosConfig, Experiment, Mode, Selector};
use serde_json::json;

/// Story: A tester kills two nginx pods by name for a minute
#[test]
fn story_kill_named_pods_for_a_minute() {
    let selector = Selector::from_pods("shop", ["nginx-0", "nginx-1"]).unwrap();
    let experiment = Experiment::pod_kill(selector)
        .name("kill-nginx")
        .namespace("shop")
        .mode(Mode::All)
        .duration("1m")
        .build()
        .unwrap();

    let payload = manifest::build(&experiment, &ChaosConfig::default())
        .to_value()
        .unwrap();
    assert_eq!(
        payload,
        json!({
            "apiVersion": "chaos-mesh.org/v1alpha1",
            "kind": "PodChaos",
            "metadata": {"name": "kill-nginx", "namespace": "shop"},
            "spec": {
                "action": "pod-kill",
                "selector": {"namespaces": ["shop"], "pods": {"shop": ["nginx-0", "nginx-1"]}},
                "mode": "all",
                "duration": "1m"
            }
        })
    );
}

/// Story: Mixing label- and name-based selection is refused before any request
#[test]
fn story_ambiguous_selection_is_refused_up_front() {
    let err = Selector::builder()
        .namespace("shop")
        .label("app", "nginx")
        .pods("shop", ["nginx-0"])
        .build()
        .unwrap_err();
    assert!(err.is_validation());
    assert!(err.to_string().starts_with("ambiguous selector"));
}

/// Story: A lossy link to the database from a random third of the web tier
#[test]
fn story_lossy_link_on_a_random_share_of_pods() {
    let web = Selector::from_labels([("app", "web")], &["shop"]).unwrap();
    let loss = LossParams::with_correlation("15", "25").unwrap();
    let experiment = Experiment::builder(web, Action::Loss(loss))
        .name("lossy-web")
        .namespace("shop")
        .mode(Mode::RandomMaxPercent)
        .value("33")
        .duration("5m")
        .build()
        .unwrap();

    let spec = manifest::build(&experiment, &ChaosConfig::default()).spec;
    assert_eq!(spec["action"], "loss");
    assert_eq!(spec["loss"], json!({"loss": "15", "correlation": "25"}));
    assert_eq!(spec["mode"], "random-max-percent");
    assert_eq!(spec["value"], "33");
}

/// Story: Throttled bandwidth with a peak rate, and a partition in both directions
#[test]
fn story_bandwidth_and_partition_share_the_network_kind() {
    let web = Selector::from_labels([("app", "web")], &["shop"]).unwrap();
    let db = Selector::from_labels([("app", "db")], &["shop"]).unwrap();
    let config = ChaosConfig::default();

    let bandwidth = BandwidthParams::new("10mbps", 2000, 20000)
        .unwrap()
        .peakrate(20_000_000);
    let throttled = Experiment::builder(web.clone(), Action::Bandwidth(bandwidth))
        .name("slow-web")
        .build()
        .unwrap();
    let split = Experiment::network_partition(web, db, Direction::Both)
        .name("split-web-db")
        .build()
        .unwrap();

    let throttled = manifest::build(&throttled, &config);
    let split = manifest::build(&split, &config);
    assert_eq!(throttled.kind, "NetworkChaos");
    assert_eq!(split.kind, "NetworkChaos");
    assert_eq!(throttled.spec["bandwidth"]["peakrate"], 20_000_000);
    assert_eq!(split.spec["target"]["mode"], "all");
}

/// Story: Killing a sidecar with a grace period and a recurring schedule
#[test]
fn story_container_kill_passes_scheduler_through() {
    let web = Selector::from_labels([("app", "web")], &[]).unwrap();
    let options = PodOptions {
        container_names: vec!["istio-proxy".into()],
        grace_period: Some(10),
        scheduler: Some(json!({"cron": "@every 5m"})),
        remote_cluster: None,
    };
    let experiment = Experiment::builder(web, Action::ContainerKill(options))
        .name("kill-sidecar")
        .build()
        .unwrap();

    let spec = manifest::build(&experiment, &ChaosConfig::default()).spec;
    assert_eq!(spec["scheduler"], json!({"cron": "@every 5m"}));
    assert_eq!(spec["gracePeriod"], 10);
    assert!(spec["selector"].get("namespaces").is_none());
}

/// Story: Invalid inputs are caught when the experiment is built
#[test]
fn story_invalid_inputs_fail_at_build_time() {
    let web = || Selector::from_labels([("app", "web")], &["shop"]).unwrap();

    for (mode, value) in [(Mode::Fixed, "0"), (Mode::Fixed, "-1"), (Mode::FixedPercent, "150")] {
        let err = Experiment::pod_kill(web())
            .mode(mode)
            .value(value)
            .build()
            .unwrap_err();
        assert!(err.is_validation(), "{mode} {value}");
    }
    assert!(Experiment::pod_kill(web()).mode(Mode::Fixed).build().is_err());
    assert!(Experiment::pod_kill(web()).duration("45x").build().is_err());
    assert!(Experiment::pod_kill(web()).mode(Mode::Fixed).value("3").build().is_ok());
}
