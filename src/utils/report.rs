// Start of file: src/utils/report.rs

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{ser::PrettyFormatter, Serializer};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::environment::{BootstrapConfig, EnvSnapshot, DOWNSTREAM_KEYS};

/*
    * Summary logged right before the hand-off. `environment_vars` mirrors the
    * presence map the API exposes on /health, so a missing database or OpenAI
    * setting is visible in the boot log without failing the boot.
*/
#[derive(Debug, Serialize)]
pub struct BootReport {
    pub run_id: Uuid,
    pub hostname: String,
    pub started_at: DateTime<Utc>,
    pub handed_off_at: DateTime<Utc>,
    pub odbc_package: String,
    pub manifest: String,
    pub launch_mode: String,
    pub handoff: String,
    pub workers: u32,
    pub worker_class: String,
    pub app_module: String,
    pub bind: String,
    pub command: String,
    pub environment_vars: BTreeMap<&'static str, bool>,
}

impl BootReport {
    pub fn new(
        run_id: Uuid,
        started_at: DateTime<Utc>,
        config: &BootstrapConfig,
        snapshot: &EnvSnapshot,
        command: String,
    ) -> Self {
        Self {
            run_id,
            hostname: instance_hostname(),
            started_at,
            handed_off_at: Utc::now(),
            odbc_package: config.odbc_package.to_string(),
            manifest: config.manifest.display().to_string(),
            launch_mode: config.launch_mode.to_string(),
            handoff: config.handoff.to_string(),
            workers: config.workers,
            worker_class: config.worker_class.to_string(),
            app_module: config.app_module.to_string(),
            bind: config.bind_address(),
            command,
            environment_vars: downstream_presence(snapshot),
        }
    }

    pub fn missing_downstream_keys(&self) -> Vec<&'static str> {
        self.environment_vars
            .iter()
            .filter(|(_, present)| !**present)
            .map(|(key, _)| *key)
            .collect()
    }
}

// * Presence only; values are never logged.
pub fn downstream_presence(snapshot: &EnvSnapshot) -> BTreeMap<&'static str, bool> {
    DOWNSTREAM_KEYS
        .iter()
        .map(|key| (*key, snapshot.contains(key)))
        .collect()
}

pub fn instance_hostname() -> String {
    hostname::get()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "unknown".to_owned())
}

/*
    * Logs the report in a pretty JSON and warns about unset downstream keys.
*/
pub fn log_report(report: &BootReport) {
    let missing: Vec<&'static str> = report.missing_downstream_keys();
    if !missing.is_empty() {
        warn!(
            missing = ?missing,
            "Downstream settings are not set; the server will fail on first use"
        );
    }

    match to_two_space_indented_json(report) {
        Ok(spaced_json) => {
            info!("\nBoot report:\n{}", spaced_json);
        }
        Err(err) => {
            error!("Failed to format boot report JSON: {:?}", err);
        }
    }
}

/*
    * Convert any `Serialize` type into a two-space-indented JSON string.
*/
fn to_two_space_indented_json<T: Serialize>(value: &T) -> serde_json::Result<String> {
    let mut writer: Vec<u8> = Vec::new();

    let formatter: PrettyFormatter<'_> = PrettyFormatter::with_indent(b"  ");

    let mut ser: Serializer<&mut Vec<u8>, PrettyFormatter<'_>> =
        Serializer::with_formatter(&mut writer, formatter);

    value.serialize(&mut ser)?;

    // serde_json only emits UTF-8
    Ok(String::from_utf8_lossy(&writer).into_owned())
}


// End of file: src/utils/report.rs
