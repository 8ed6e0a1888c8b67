//! Runner behavior that needs no live engine.

use sqlparity::{Assertion, EngineConfig, HarnessError, Script, SuiteRunner, Tolerances, Value};

fn runner_with_missing_engine() -> SuiteRunner {
    // Points at a binary that cannot exist; anything that tries to boot
    // an engine fails with a spawn error.
    let config = EngineConfig::new("/nonexistent/sqlparity-engine");
    SuiteRunner::new(config, Tolerances::default())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("sqlparity=info")
        .try_init();
}

#[tokio::test]
async fn test_missing_engine_binary_fails_that_script() {
    init_tracing();
    let runner = runner_with_missing_engine();
    let scripts = vec![
        Script::new("boot").assertion(Assertion::rows("SELECT 1;", vec![vec![Value::Int64(1)]])),
    ];

    let report = runner
        .run_with_ci_flag(&scripts, false)
        .await
        .expect("a per-script fatal error must not abort the run");
    assert_eq!(report.fatal_scripts(), 1);
    assert!(!report.is_success());
    assert!(report.scripts[0].fatal.is_some(), "{report:?}");
}

#[tokio::test]
async fn test_one_bootstrap_failure_does_not_stop_siblings() {
    init_tracing();
    let runner = runner_with_missing_engine();
    let scripts = vec![
        Script::new("broken_boot")
            .assertion(Assertion::rows("SELECT 1;", vec![vec![Value::Int64(1)]])),
        Script::new("still_reported").skipped(),
    ];

    let report = runner
        .run_with_ci_flag(&scripts, false)
        .await
        .expect("siblings must keep running after a fatal script");
    assert_eq!(report.scripts.len(), 2, "{report:?}");
    assert!(report.scripts[0].fatal.is_some());
    assert_eq!(report.scripts[1].script, "still_reported");
    assert!(report.scripts[1].skipped);
    assert!(!report.is_success());
}

#[tokio::test]
async fn test_focus_in_ci_aborts_before_any_boot() {
    init_tracing();
    let runner = runner_with_missing_engine();
    let scripts = vec![Script::new("focused_one").focused(), Script::new("other")];

    // Were the pre-pass ordered after bootstrap, this would surface the
    // spawn error instead of the focus abort.
    let err = runner
        .run_with_ci_flag(&scripts, true)
        .await
        .expect_err("focus in CI must abort");
    match err {
        HarnessError::FocusInCi { script } => assert_eq!(script, "focused_one"),
        other => panic!("expected FocusInCi, got {other:?}"),
    }
}

#[tokio::test]
async fn test_skipped_scripts_never_boot_an_engine() {
    init_tracing();
    let runner = runner_with_missing_engine();
    let scripts = vec![
        Script::new("skipped_a").skipped(),
        Script::new("skipped_b")
            .skipped()
            .assertion(Assertion::error("SELECT 1/0;")),
    ];

    let report = runner
        .run_with_ci_flag(&scripts, false)
        .await
        .expect("skipped scripts must not touch the engine binary");
    assert_eq!(report.skipped_scripts(), 2);
    assert_eq!(report.passed(), 0);
    assert_eq!(report.failed(), 0);
    assert!(report.is_success());
}

#[tokio::test]
async fn test_focus_mode_drops_unfocused_scripts_from_report() {
    init_tracing();
    let runner = runner_with_missing_engine();
    let scripts = vec![
        Script::new("focused_but_skipped").focused().skipped(),
        Script::new("unfocused"),
    ];

    let report = runner
        .run_with_ci_flag(&scripts, false)
        .await
        .expect("focused skipped script must not boot an engine");
    assert_eq!(report.scripts.len(), 1);
    assert_eq!(report.scripts[0].script, "focused_but_skipped");
    assert!(report.scripts[0].skipped);
}
