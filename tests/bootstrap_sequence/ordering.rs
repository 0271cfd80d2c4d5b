//! tests/bootstrap_sequence/ordering.rs
//! Steps run in order and the first failure stops the boot.

#[path = "../mod.rs"]
mod common;

use appservice_bootstrap::core::bootstrap::PACKAGE_INDEX;
use appservice_bootstrap::{BootState, Bootstrap, BootstrapError, Completion, EnvSnapshot, StepFailure};
use common::{Journal, RecordingHandoff, RecordingRunner};

#[tokio::test]
async fn steps_run_in_order_and_end_with_the_handoff() {
    let root: tempfile::TempDir = common::app_root_with_manifest();
    let snapshot: EnvSnapshot = common::snapshot_for(root.path(), &[]);
    let config = common::config_for(&snapshot);
    let journal: Journal = Journal::default();

    let mut bootstrap = Bootstrap::new(
        &config,
        &snapshot,
        RecordingRunner::new(&journal),
        RecordingHandoff::new(&journal),
    );
    let code: i32 = bootstrap.run().await.expect("bootstrap should succeed");

    let manifest: String = common::manifest_path(root.path()).display().to_string();
    assert_eq!(code, 0);
    assert_eq!(bootstrap.state(), BootState::HandedOff);
    assert_eq!(
        journal.labels(),
        vec![
            "apt-get update".to_owned(),
            "apt-get install -y unixodbc-dev".to_owned(),
            "apt-get install -y msodbcsql18".to_owned(),
            format!("python3 -m pip install -r {manifest}"),
            "hand-off".to_owned(),
        ]
    );
}

#[tokio::test]
async fn driver_install_accepts_the_eula_non_interactively() {
    let root: tempfile::TempDir = common::app_root_with_manifest();
    let snapshot: EnvSnapshot = common::snapshot_for(root.path(), &[("BOOTSTRAP_ODBC_PACKAGE", "msodbcsql17")]);
    let config = common::config_for(&snapshot);
    let journal: Journal = Journal::default();

    Bootstrap::new(&config, &snapshot, RecordingRunner::new(&journal), RecordingHandoff::new(&journal))
        .run()
        .await
        .expect("bootstrap should succeed");

    let driver = journal
        .commands()
        .into_iter()
        .find(|spec| spec.args.iter().any(|a| a == "msodbcsql17"))
        .expect("driver install command");

    assert!(driver.args.iter().any(|a| a == "-y"));
    assert!(driver.envs.contains(&("ACCEPT_EULA".to_owned(), "Y".to_owned())));
    assert!(driver.envs.contains(&("DEBIAN_FRONTEND".to_owned(), "noninteractive".to_owned())));
}

#[tokio::test]
async fn unixodbc_dev_preinstall_can_be_disabled() {
    let root: tempfile::TempDir = common::app_root_with_manifest();
    let snapshot: EnvSnapshot =
        common::snapshot_for(root.path(), &[("BOOTSTRAP_INSTALL_UNIXODBC_DEV", "false")]);
    let config = common::config_for(&snapshot);
    let journal: Journal = Journal::default();

    Bootstrap::new(&config, &snapshot, RecordingRunner::new(&journal), RecordingHandoff::new(&journal))
        .run()
        .await
        .expect("bootstrap should succeed");

    assert!(!journal.labels().iter().any(|label| label.contains("unixodbc-dev")));
}

#[tokio::test]
async fn native_failure_stops_before_language_dependencies() {
    let root: tempfile::TempDir = common::app_root_with_manifest();
    let snapshot: EnvSnapshot = common::snapshot_for(root.path(), &[]);
    let config = common::config_for(&snapshot);
    let journal: Journal = Journal::default();

    let mut bootstrap = Bootstrap::new(
        &config,
        &snapshot,
        RecordingRunner::failing_on(&journal, "msodbcsql18", Completion::Exited(100)),
        RecordingHandoff::new(&journal),
    );
    let err: BootstrapError = bootstrap.run().await.unwrap_err();

    match &err {
        BootstrapError::NativeDependencyInstall { package, failure } => {
            assert_eq!(package, "msodbcsql18");
            assert!(matches!(failure, StepFailure::Exited(100)));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.exit_code(), 100);
    assert_eq!(bootstrap.state(), BootState::NativeDepsFailed);
    assert!(!journal.labels().iter().any(|label| label.contains("pip")));
    assert!(journal.handoffs().is_empty());
}

#[tokio::test]
async fn index_refresh_failure_names_the_package_index() {
    let root: tempfile::TempDir = common::app_root_with_manifest();
    let snapshot: EnvSnapshot = common::snapshot_for(root.path(), &[]);
    let config = common::config_for(&snapshot);
    let journal: Journal = Journal::default();

    let err: BootstrapError = Bootstrap::new(
        &config,
        &snapshot,
        RecordingRunner::failing_on(&journal, "update", Completion::Exited(100)),
        RecordingHandoff::new(&journal),
    )
    .run()
    .await
    .unwrap_err();

    assert!(matches!(
        err,
        BootstrapError::NativeDependencyInstall { ref package, .. } if package == PACKAGE_INDEX
    ));
    assert_eq!(journal.labels(), vec!["apt-get update".to_owned()]);
}

#[tokio::test]
async fn missing_package_manager_is_a_native_failure() {
    let root: tempfile::TempDir = common::app_root_with_manifest();
    let snapshot: EnvSnapshot = common::snapshot_for(root.path(), &[]);
    let config = common::config_for(&snapshot);
    let journal: Journal = Journal::default();

    let err: BootstrapError = Bootstrap::new(
        &config,
        &snapshot,
        RecordingRunner::missing_program(&journal, "apt-get"),
        RecordingHandoff::new(&journal),
    )
    .run()
    .await
    .unwrap_err();

    assert_eq!(err.kind(), "NativeDependencyInstallError");
    assert_eq!(err.exit_code(), 127);
}

#[tokio::test]
async fn pip_failure_prevents_the_handoff_with_a_distinct_error_kind() {
    let root: tempfile::TempDir = common::app_root_with_manifest();
    let snapshot: EnvSnapshot = common::snapshot_for(root.path(), &[]);
    let config = common::config_for(&snapshot);
    let journal: Journal = Journal::default();

    let mut bootstrap = Bootstrap::new(
        &config,
        &snapshot,
        RecordingRunner::failing_on(&journal, "pip", Completion::Exited(1)),
        RecordingHandoff::new(&journal),
    );
    let err: BootstrapError = bootstrap.run().await.unwrap_err();

    assert_eq!(err.kind(), "LanguageDependencyInstallError");
    assert_eq!(err.exit_code(), 1);
    assert_eq!(bootstrap.state(), BootState::LangDepsFailed);
    assert!(journal.handoffs().is_empty());
}
