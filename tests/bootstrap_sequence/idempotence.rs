//! tests/bootstrap_sequence/idempotence.rs
//! Booting twice on the same instance state ends in the same place.

#[path = "../mod.rs"]
mod common;

use appservice_bootstrap::core::launch::{LaunchPlan, MODULE_PATH_KEY};
use appservice_bootstrap::{Bootstrap, BootstrapConfig, EnvSnapshot};
use common::{Journal, RecordingHandoff, RecordingRunner};

async fn boot(config: &BootstrapConfig, snapshot: &EnvSnapshot) -> Journal {
    let journal: Journal = Journal::default();
    Bootstrap::new(config, snapshot, RecordingRunner::new(&journal), RecordingHandoff::new(&journal))
        .run()
        .await
        .expect("bootstrap should succeed");
    journal
}

#[tokio::test]
async fn second_boot_issues_the_same_commands_and_plan() {
    let root: tempfile::TempDir = common::app_root_with_manifest();
    let snapshot: EnvSnapshot = common::snapshot_for(root.path(), &[]);
    let config = common::config_for(&snapshot);

    let first: Journal = boot(&config, &snapshot).await;
    let second: Journal = boot(&config, &snapshot).await;

    assert_eq!(first.labels(), second.labels());
    assert_eq!(first.handoffs(), second.handoffs());
}

#[tokio::test]
async fn rendered_gunicorn_config_survives_a_second_boot() {
    let root: tempfile::TempDir = common::app_root_with_manifest();
    let snapshot: EnvSnapshot = common::snapshot_for(root.path(), &[("BOOTSTRAP_LAUNCH_MODE", "config-file")]);
    let config = common::config_for(&snapshot);
    let config_file = root.path().join("gunicorn.conf.py");

    let first: Journal = boot(&config, &snapshot).await;
    let rendered: String = std::fs::read_to_string(&config_file).expect("config file rendered");
    assert!(rendered.contains("workers = 4\n"));

    std::fs::write(&config_file, "workers = 2\n").unwrap();
    let second: Journal = boot(&config, &snapshot).await;

    assert_eq!(std::fs::read_to_string(&config_file).unwrap(), "workers = 2\n");
    assert_eq!(first.handoffs(), second.handoffs());

    let plan: LaunchPlan = second.handoffs().remove(0);
    let expected = config_file.display().to_string();
    assert!(plan.args.windows(2).any(|w| w[0] == "--config" && w[1] == expected));
}

#[cfg(unix)]
#[tokio::test]
async fn module_path_is_not_prepended_twice() {
    let root: tempfile::TempDir = common::app_root_with_manifest();
    let already: String = format!("{}:/opt/python/site", root.path().display());
    let snapshot: EnvSnapshot = common::snapshot_for(root.path(), &[(MODULE_PATH_KEY, already.as_str())]);
    let config = common::config_for(&snapshot);

    let plan: LaunchPlan = boot(&config, &snapshot).await.handoffs().remove(0);

    assert_eq!(plan.env(MODULE_PATH_KEY), Some(std::ffi::OsStr::new(&already)));
}
