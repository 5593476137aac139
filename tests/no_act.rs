// tests/no_act.rs

use jobdag::clock::ManualClock;
use jobdag::dag::NodeStatus;
use jobdag::{Engine, EngineOptions, JobCatalog, JobSpec};
use jobdag_test_utils::CallLog;
use jobdag_test_utils::jobs::{always_fail, always_pass, run_only_ok, with_recorded_cleanup};

fn no_act() -> EngineOptions {
    EngineOptions {
        no_act: true,
        default_retry_delay: 0.0,
        ..EngineOptions::default()
    }
}

#[test]
fn run_only_job_never_succeeds_even_with_a_large_budget() {
    let log = CallLog::new();
    let mut catalog = JobCatalog::new();
    let root = catalog.add(run_only_ok("Upload", &log).with_tries(1000)).unwrap();

    let mut engine = Engine::configure_with_clock(catalog, root, no_act(), ManualClock::new()).unwrap();
    let summary = engine.run().unwrap();

    assert!(!summary.succeeded);
    assert_eq!(engine.status_of("Upload"), Some(NodeStatus::Failed));
    assert_eq!(engine.attempts_of("Upload"), Some(1000));
    assert!(log.events().is_empty());
}

#[test]
fn checks_still_run_and_passing_checks_succeed() {
    let log = CallLog::new();
    let mut catalog = JobCatalog::new();
    let ok = catalog.add(always_pass("Ok", &log)).unwrap();
    let gate = catalog.add(JobSpec::dummy("Gate").after(ok)).unwrap();

    let mut engine = Engine::configure_with_clock(catalog, gate, no_act(), ManualClock::new()).unwrap();
    engine.run().unwrap();

    assert!(engine.succeeded());
    assert_eq!(log.events(), vec!["check:Ok"]);
}

#[test]
fn failing_check_fails_without_action_or_recheck() {
    let log = CallLog::new();
    let mut catalog = JobCatalog::new();
    let root = catalog
        .add(with_recorded_cleanup(always_fail("Broken", &log).with_tries(2), &log))
        .unwrap();

    let mut engine = Engine::configure_with_clock(catalog, root, no_act(), ManualClock::new()).unwrap();
    let summary = engine.run().unwrap();

    assert!(!engine.succeeded());
    assert_eq!(log.events(), vec!["check:Broken", "check:Broken"]);
    assert_eq!(engine.node_error("Broken"), Some("Broken never passes"));
    assert!(summary.cleanup.unwrap().ran.is_empty());
}
