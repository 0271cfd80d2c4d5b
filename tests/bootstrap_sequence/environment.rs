//! tests/bootstrap_sequence/environment.rs
//! The server inherits the environment untouched, except for the module path,
//! and database settings are never needed to boot.

#[path = "../mod.rs"]
mod common;

use std::ffi::{OsStr, OsString};

use appservice_bootstrap::core::launch::{LaunchPlan, MODULE_PATH_KEY};
use appservice_bootstrap::{BootState, Bootstrap, EnvSnapshot};
use common::{Journal, RecordingHandoff, RecordingRunner};

async fn handed_off_plan(snapshot: &EnvSnapshot) -> LaunchPlan {
    let config = common::config_for(snapshot);
    let journal: Journal = Journal::default();

    let mut bootstrap = Bootstrap::new(
        &config,
        snapshot,
        RecordingRunner::new(&journal),
        RecordingHandoff::new(&journal),
    );
    bootstrap.run().await.expect("bootstrap should succeed");
    assert_eq!(bootstrap.state(), BootState::HandedOff);

    let mut plans: Vec<LaunchPlan> = journal.handoffs();
    assert_eq!(plans.len(), 1);
    plans.remove(0)
}

#[tokio::test]
async fn every_variable_reaches_the_server_unchanged() {
    let root: tempfile::TempDir = common::app_root_with_manifest();
    let snapshot: EnvSnapshot = common::snapshot_for(
        root.path(),
        &[
            ("DB_SERVER", "example.database.windows.net"),
            ("DB_NAME", "taskpoint"),
            ("DB_DRIVER", "ODBC Driver 18 for SQL Server"),
            ("OPENAI_API_KEY", "sk-test"),
            ("WEBSITE_SITE_NAME", "taskpoint-api"),
        ],
    );

    let plan: LaunchPlan = handed_off_plan(&snapshot).await;

    for (key, value) in snapshot.iter() {
        if key == MODULE_PATH_KEY {
            continue;
        }
        assert_eq!(plan.envs.get(key).map(OsString::as_os_str), Some(value), "{key:?} changed");
    }
    assert_eq!(
        plan.env("DB_SERVER"),
        Some(OsStr::new("example.database.windows.net"))
    );
    assert_eq!(plan.envs.len(), snapshot.len() + 1);
}

#[tokio::test]
async fn boots_without_any_database_settings() {
    let root: tempfile::TempDir = common::app_root_with_manifest();
    let snapshot: EnvSnapshot = common::snapshot_for(root.path(), &[]);

    let plan: LaunchPlan = handed_off_plan(&snapshot).await;

    assert!(plan.env("DB_SERVER").is_none());
    assert!(plan.env("OPENAI_API_KEY").is_none());
}

#[cfg(unix)]
#[tokio::test]
async fn app_root_is_prepended_to_the_module_path() {
    let root: tempfile::TempDir = common::app_root_with_manifest();
    let snapshot: EnvSnapshot = common::snapshot_for(root.path(), &[(MODULE_PATH_KEY, "/opt/python/site")]);

    let plan: LaunchPlan = handed_off_plan(&snapshot).await;

    let expected: String = format!("{}:/opt/python/site", root.path().display());
    assert_eq!(plan.env(MODULE_PATH_KEY), Some(OsStr::new(&expected)));
    assert_eq!(plan.current_dir, root.path());
}

#[tokio::test]
async fn server_binds_the_entry_object_with_event_loop_workers() {
    let root: tempfile::TempDir = common::app_root_with_manifest();
    let snapshot: EnvSnapshot = common::snapshot_for(root.path(), &[("PORT", "8181")]);

    let plan: LaunchPlan = handed_off_plan(&snapshot).await;

    assert_eq!(plan.program, "python3");
    assert!(plan.args.windows(2).any(|w| w == ["--workers", "4"]));
    assert!(plan
        .args
        .windows(2)
        .any(|w| w == ["--worker-class", "uvicorn.workers.UvicornWorker"]));
    assert!(plan.args.windows(2).any(|w| w == ["--bind", "0.0.0.0:8181"]));
    assert_eq!(plan.args.last().map(String::as_str), Some("api:app"));
}
