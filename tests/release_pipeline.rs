// tests/release_pipeline.rs

use jobdag::clock::ManualClock;
use jobdag::dag::NodeStatus;
use jobdag::demo::{DemoInputs, release_pipeline};
use jobdag::{Engine, EngineOptions};
use jobdag_test_utils::init_tracing;

fn run_pipeline(inputs: DemoInputs, subscribers: &[&str], options: EngineOptions) -> Engine {
    init_tracing();
    let subscribers: Vec<String> = subscribers.iter().map(|s| s.to_string()).collect();
    let (catalog, root) = release_pipeline(&subscribers).unwrap();
    let options = EngineOptions {
        default_retry_delay: 0.0,
        ..options
    };
    let mut engine = Engine::configure_with_clock(catalog, root, options, ManualClock::new()).unwrap();
    engine.set_arguments(inputs.arguments()).unwrap();
    engine.run().unwrap();
    engine
}

#[test]
fn publishes_with_default_inputs() {
    let engine = run_pipeline(DemoInputs::default(), &["ops", "docs"], EngineOptions::default());

    assert!(engine.succeeded());
    assert!(engine.statuses().values().all(|s| *s == NodeStatus::Success));
    assert_eq!(engine.attempts_of("WarmCache"), Some(3));
    assert_eq!(engine.attempts_of("BuildAssets"), Some(2));

    let notified: Vec<String> = engine.global_storage().get_as("notified").unwrap();
    assert_eq!(notified, vec!["ops", "docs"]);
}

#[test]
fn one_notification_job_per_subscriber() {
    let engine = run_pipeline(DemoInputs::default(), &["a", "b", "c"], EngineOptions::default());

    assert_eq!(
        engine.graph().dependencies_of("NotifySubscribers"),
        vec!["Notify a", "Notify b", "Notify c"]
    );
    assert!(engine.succeeded());
}

#[test]
fn build_that_needs_too_many_tries_skips_everything_downstream() {
    let inputs = DemoInputs {
        build_success_try: 6,
        ..DemoInputs::default()
    };
    let engine = run_pipeline(inputs, &["ops"], EngineOptions::default());

    assert!(!engine.succeeded());
    assert_eq!(engine.status_of("BuildAssets"), Some(NodeStatus::Failed));
    assert_eq!(engine.attempts_of("BuildAssets"), Some(5));
    for job in ["UploadArtifacts", "Artifacts", "PublishSite", "VerifyDeployment"] {
        assert_eq!(engine.status_of(job), Some(NodeStatus::Skipped), "{job}");
    }
    assert_eq!(engine.status_of("Notify ops"), Some(NodeStatus::Success));
    assert_eq!(engine.status_of("AcquireDeployLock"), Some(NodeStatus::Success));
}

#[test]
fn expired_token_fails_credentials_only() {
    let inputs = DemoInputs {
        token_state: "expired".to_string(),
        ..DemoInputs::default()
    };
    let engine = run_pipeline(inputs, &["ops"], EngineOptions::default());

    assert!(!engine.succeeded());
    assert_eq!(engine.status_of("CheckCredentials"), Some(NodeStatus::Failed));
    assert_eq!(
        engine.node_error("CheckCredentials"),
        Some("token at ~/.config/site/token is expired")
    );
    assert_eq!(engine.status_of("LocateCredentials"), Some(NodeStatus::Success));
    assert_eq!(engine.status_of("VerifyDeployment"), Some(NodeStatus::Skipped));
    // The run ends once the root is skipped, before the slow build chain finishes.
    assert_eq!(engine.status_of("Artifacts"), Some(NodeStatus::Blocked));
    assert!(engine.global_storage().get_bool("workspace_removed"));
}

#[test]
fn held_lock_fails_after_two_tries() {
    let inputs = DemoInputs {
        lock_free: false,
        ..DemoInputs::default()
    };
    let engine = run_pipeline(inputs, &[], EngineOptions::default());

    assert!(!engine.succeeded());
    assert_eq!(engine.status_of("AcquireDeployLock"), Some(NodeStatus::Failed));
    assert_eq!(engine.attempts_of("AcquireDeployLock"), Some(2));
    assert_eq!(engine.node_error("AcquireDeployLock"), Some("deploy_lock not set"));
}

#[test]
fn flaky_upload_is_retried() {
    let inputs = DemoInputs {
        upload_success_try: 3,
        ..DemoInputs::default()
    };
    let engine = run_pipeline(inputs, &[], EngineOptions::default());

    assert!(engine.succeeded());
    assert_eq!(engine.attempts_of("UploadArtifacts"), Some(3));
    assert_eq!(engine.global_storage().get_i64("upload_runs"), Some(3));
}

#[test]
fn cleanup_releases_resources() {
    let engine = run_pipeline(DemoInputs::default(), &[], EngineOptions::default());

    assert!(engine.global_storage().get_bool("workspace_removed"));
    assert!(!engine.global_storage().contains_key("deploy_lock"));
}

#[test]
fn disabled_cleanup_keeps_resources_until_requested() {
    let options = EngineOptions {
        cleanup: false,
        ..EngineOptions::default()
    };
    let mut engine = run_pipeline(DemoInputs::default(), &[], options);

    assert!(engine.global_storage().get_bool("deploy_lock"));
    assert!(!engine.global_storage().contains_key("workspace_removed"));

    let report = engine.cleanup();
    assert!(report.is_clean());
    assert!(engine.global_storage().get_bool("workspace_removed"));
    assert!(!engine.global_storage().contains_key("deploy_lock"));
}
