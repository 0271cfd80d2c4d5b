// Start of file: /src/core/launch.rs

/*
    * Builds the server command line for each launch mode and the environment
    * the server will inherit.
*/

use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::io;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::environment::{BootstrapConfig, EnvSnapshot, LaunchMode};

pub const MODULE_PATH_KEY: &str = "PYTHONPATH";

#[cfg(unix)]
const PATH_LIST_SEPARATOR: &str = ":";
#[cfg(not(unix))]
const PATH_LIST_SEPARATOR: &str = ";";

// * Everything needed to start (or become) the server process
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LaunchPlan {
    pub program: String,
    pub args: Vec<String>,
    pub envs: BTreeMap<OsString, OsString>,
    pub current_dir: PathBuf,
}

impl LaunchPlan {
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<&str>>()
            .join(" ")
    }

    pub fn env(&self, key: &str) -> Option<&OsStr> {
        self.envs.get(OsStr::new(key)).map(OsString::as_os_str)
    }
}

// * Child environment: the full snapshot, with the app root prepended to the module path.
pub fn child_environment(snapshot: &EnvSnapshot, app_root: &Path) -> BTreeMap<OsString, OsString> {
    let mut envs: BTreeMap<OsString, OsString> = snapshot
        .iter()
        .map(|(k, v)| (k.to_owned(), v.to_owned()))
        .collect();

    let module_path: OsString = prepend_module_path(snapshot.get_os(MODULE_PATH_KEY), app_root);
    envs.insert(OsString::from(MODULE_PATH_KEY), module_path);
    envs
}

// * Idempotent: a root that is already first is not added twice.
// * Roots are compared component-wise, so trailing slashes don't matter.
pub fn prepend_module_path(existing: Option<&OsStr>, app_root: &Path) -> OsString {
    let root: PathBuf = normalize(app_root);

    let current: &OsStr = match existing.filter(|s| !s.is_empty()) {
        None => return root.into_os_string(),
        Some(current) => current,
    };

    let first: Option<PathBuf> = std::env::split_paths(current).next();
    if first.map(|entry| normalize(&entry)) == Some(root.clone()) {
        return current.to_owned();
    }

    let mut joined: OsString = root.into_os_string();
    joined.push(PATH_LIST_SEPARATOR);
    joined.push(current);
    joined
}

fn normalize(path: &Path) -> PathBuf {
    path.components().collect()
}

// * Server argv for the configured launch mode
pub fn server_args(config: &BootstrapConfig) -> Vec<String> {
    let root: String = config.app_root.display().to_string();

    match config.launch_mode {
        LaunchMode::InlineFlags => vec![
            "-m".into(),
            "gunicorn".into(),
            "--chdir".into(),
            root,
            "--workers".into(),
            config.workers.to_string(),
            "--worker-class".into(),
            config.worker_class.to_string(),
            "--bind".into(),
            config.bind_address(),
            "--timeout".into(),
            config.timeout_seconds.to_string(),
            "--keep-alive".into(),
            config.keepalive_seconds.to_string(),
            config.app_module.to_string(),
        ],
        LaunchMode::ConfigFile => vec![
            "-m".into(),
            "gunicorn".into(),
            "--chdir".into(),
            root,
            "--config".into(),
            config.gunicorn_config.display().to_string(),
            config.app_module.to_string(),
        ],
        LaunchMode::Uvicorn => vec![
            "-m".into(),
            "uvicorn".into(),
            config.app_module.to_string(),
            "--host".into(),
            config.bind_host.to_string(),
            "--port".into(),
            config.port.to_string(),
            "--workers".into(),
            config.workers.to_string(),
            "--log-level".into(),
            "info".into(),
        ],
    }
}

pub fn build_plan(config: &BootstrapConfig, snapshot: &EnvSnapshot) -> LaunchPlan {
    LaunchPlan {
        program: config.python.to_string(),
        args: server_args(config),
        envs: child_environment(snapshot, &config.app_root),
        current_dir: config.app_root.clone(),
    }
}

/*
    * Gunicorn settings file used by the config-file launch mode.
*/
pub fn render_gunicorn_config(config: &BootstrapConfig) -> String {
    format!(
        r#"# Gunicorn settings generated by appservice-bootstrap
bind = {bind}
workers = {workers}
worker_class = {worker_class}
timeout = {timeout}
keepalive = {keepalive}

# Logs
accesslog = "-"
errorlog = "-"
loglevel = "info"
access_log_format = '%(h)s %(l)s %(u)s %(t)s "%(r)s" %(s)s %(b)s "%(f)s" "%(a)s" %(D)s'

# Worker recycling
max_requests = 1000
max_requests_jitter = 100
preload_app = False

worker_tmp_dir = "/dev/shm"
tmp_upload_dir = None
"#,
        bind = python_str(&config.bind_address()),
        workers = config.workers,
        worker_class = python_str(&config.worker_class),
        timeout = config.timeout_seconds,
        keepalive = config.keepalive_seconds,
    )
}

// * Double-quoted Python string literal; the settings file is executed as Python.
fn python_str(value: &str) -> String {
    let mut out: String = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

// * Writes the settings file only if absent; an operator-supplied file always wins.
// * Returns whether a file was written.
pub fn ensure_gunicorn_config(config: &BootstrapConfig) -> io::Result<bool> {
    let path: &Path = &config.gunicorn_config;
    if path.exists() {
        info!(path = %path.display(), "Using existing Gunicorn config file");
        return Ok(false);
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, render_gunicorn_config(config))?;

    info!(path = %path.display(), "Rendered Gunicorn config file");
    Ok(true)
}


// End of file: /src/core/launch.rs
