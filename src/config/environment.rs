// Start of file: /src/config/environment.rs

// * Bootstrap configuration parsed from an immutable snapshot of the
// * process environment.

use std::{
    borrow::Cow,
    collections::BTreeMap,
    ffi::{OsStr, OsString},
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
};
// * anyhow for convenient error handling
use anyhow::{bail, Context, Result};
use tracing::warn;

// ! Default values for environment variables (used if variables aren't set):
const DEFAULT_ENVIRONMENT: &str = "development";
const DEFAULT_APP_ROOT: &str = "/home/site/wwwroot";
const DEFAULT_ODBC_PACKAGE: &str = "msodbcsql18";
const DEFAULT_APT_GET: &str = "apt-get";
const DEFAULT_PYTHON: &str = "python3";
const DEFAULT_MANIFEST: &str = "requirements.txt";
const DEFAULT_GUNICORN_CONFIG: &str = "gunicorn.conf.py";
const DEFAULT_APP_MODULE: &str = "api:app";
const DEFAULT_WORKER_CLASS: &str = "uvicorn.workers.UvicornWorker";
const DEFAULT_BIND_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_WORKERS: u32 = 4;
const DEFAULT_TIMEOUT: u64 = 600; // 10 minutes
const DEFAULT_KEEPALIVE: u64 = 2;

/*
    * Keys read by the application server on first use. The bootstrap only
    * reports whether they are present; it never requires them.
*/
pub const DOWNSTREAM_KEYS: [&str; 6] = [
    "DB_SERVER",
    "DB_NAME",
    "DB_USER",
    "DB_PASSWORD",
    "DB_DRIVER",
    "OPENAI_API_KEY",
];

// * Immutable copy of the environment taken once at start.
// * Values are kept as raw OS strings so non-UTF-8 variables reach the server untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EnvSnapshot {
    vars: BTreeMap<OsString, OsString>,
}

impl EnvSnapshot {
    // * Captures the process environment.
    // * Only reads .env if ENVIRONMENT != "production".
    pub fn capture() -> Self {
        if std::env::var("ENVIRONMENT").unwrap_or_default() != "production" {
            // ? A missing .env is the normal case on App Service
            dotenv::dotenv().ok();
        }

        std::env::vars_os().collect()
    }

    // * UTF-8 view used for configuration; non-UTF-8 values read as unset.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.get_os(key).and_then(OsStr::to_str)
    }

    pub fn get_os(&self, key: &str) -> Option<&OsStr> {
        self.vars.get(OsStr::new(key)).map(OsString::as_os_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.vars.contains_key(OsStr::new(key))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&OsStr, &OsStr)> {
        self.vars.iter().map(|(k, v)| (k.as_os_str(), v.as_os_str()))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl<K: Into<OsString>, V: Into<OsString>> FromIterator<(K, V)> for EnvSnapshot {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

// * How the server process is launched.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LaunchMode {
    InlineFlags,
    ConfigFile,
    Uvicorn,
}

impl FromStr for LaunchMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inline-flags" | "inline" => Ok(LaunchMode::InlineFlags),
            "config-file" | "config" => Ok(LaunchMode::ConfigFile),
            "uvicorn" => Ok(LaunchMode::Uvicorn),
            other => bail!("unknown launch mode '{other}' (expected inline-flags, config-file or uvicorn)"),
        }
    }
}

impl fmt::Display for LaunchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LaunchMode::InlineFlags => "inline-flags",
            LaunchMode::ConfigFile => "config-file",
            LaunchMode::Uvicorn => "uvicorn",
        })
    }
}

// * Whether the server replaces this process or runs as a supervised child.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandoffMode {
    Exec,
    Supervise,
}

impl FromStr for HandoffMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exec" => Ok(HandoffMode::Exec),
            "supervise" => Ok(HandoffMode::Supervise),
            other => bail!("unknown hand-off mode '{other}' (expected exec or supervise)"),
        }
    }
}

impl fmt::Display for HandoffMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HandoffMode::Exec => "exec",
            HandoffMode::Supervise => "supervise",
        })
    }
}

// * Everything the bootstrap sequence needs, with defaults applied
#[derive(Clone, Debug)]
pub struct BootstrapConfig {
    pub environment: Cow<'static, str>,
    pub app_root: PathBuf,
    pub odbc_package: Cow<'static, str>,
    pub install_unixodbc_dev: bool,
    pub apt_get: Cow<'static, str>,
    pub python: Cow<'static, str>,
    pub manifest: PathBuf,
    pub launch_mode: LaunchMode,
    pub gunicorn_config: PathBuf,
    pub app_module: Cow<'static, str>,
    pub workers: u32,
    pub worker_class: Cow<'static, str>,
    pub bind_host: Cow<'static, str>,
    pub port: u16,
    pub timeout_seconds: u64,
    pub keepalive_seconds: u64,
    pub handoff: HandoffMode,
}

impl BootstrapConfig {
    // * Builds the configuration from a snapshot, providing defaults if missing
    pub fn from_snapshot(env: &EnvSnapshot) -> Result<Self> {
        let get_var = |key: &str| env.get(key).map(str::trim).filter(|s| !s.is_empty());
        let owned = |key: &str, default: &'static str| -> Cow<'static, str> {
            get_var(key)
                .map(|s| Cow::Owned(s.to_owned()))
                .unwrap_or(Cow::Borrowed(default))
        };

        let app_root: PathBuf = get_var("BOOTSTRAP_APP_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_APP_ROOT));
        if !app_root.is_absolute() {
            bail!(
                "BOOTSTRAP_APP_ROOT must be an absolute path, got '{}'",
                app_root.display()
            );
        }

        let manifest: PathBuf = resolve_under(
            &app_root,
            get_var("BOOTSTRAP_MANIFEST").unwrap_or(DEFAULT_MANIFEST),
        );
        let gunicorn_config: PathBuf = resolve_under(
            &app_root,
            get_var("BOOTSTRAP_GUNICORN_CONFIG").unwrap_or(DEFAULT_GUNICORN_CONFIG),
        );

        let workers: u32 = get_var("BOOTSTRAP_WORKERS")
            .map(|s| s.parse().context("Invalid BOOTSTRAP_WORKERS value"))
            .transpose()?
            .unwrap_or(DEFAULT_WORKERS);
        if workers == 0 {
            bail!("BOOTSTRAP_WORKERS must be at least 1");
        }

        Ok(Self {
            environment: get_var("ENVIRONMENT")
                .map(|s| Cow::Owned(s.into()))
                .unwrap_or_else(|| {
                    warn!("Missing ENVIRONMENT, defaulting to '{DEFAULT_ENVIRONMENT}'");
                    Cow::Borrowed(DEFAULT_ENVIRONMENT)
                }),

            app_root,

            odbc_package: owned("BOOTSTRAP_ODBC_PACKAGE", DEFAULT_ODBC_PACKAGE),

            install_unixodbc_dev: get_var("BOOTSTRAP_INSTALL_UNIXODBC_DEV")
                .map(|s| parse_flag(s).context("Invalid BOOTSTRAP_INSTALL_UNIXODBC_DEV value"))
                .transpose()?
                .unwrap_or(true),

            apt_get: owned("BOOTSTRAP_APT_GET", DEFAULT_APT_GET),

            python: owned("BOOTSTRAP_PYTHON", DEFAULT_PYTHON),

            manifest,

            launch_mode: get_var("BOOTSTRAP_LAUNCH_MODE")
                .map(|s| s.parse().context("Invalid BOOTSTRAP_LAUNCH_MODE value"))
                .transpose()?
                .unwrap_or(LaunchMode::InlineFlags),

            gunicorn_config,

            app_module: owned("BOOTSTRAP_APP_MODULE", DEFAULT_APP_MODULE),

            workers,

            worker_class: owned("BOOTSTRAP_WORKER_CLASS", DEFAULT_WORKER_CLASS),

            bind_host: owned("BOOTSTRAP_BIND_HOST", DEFAULT_BIND_HOST),

            port: get_var("PORT")
                .map(|s| s.parse().context("Invalid PORT value"))
                .transpose()?
                .unwrap_or(DEFAULT_PORT),

            timeout_seconds: get_var("BOOTSTRAP_TIMEOUT_SECONDS")
                .map(|s| s.parse().context("Invalid BOOTSTRAP_TIMEOUT_SECONDS value"))
                .transpose()?
                .unwrap_or(DEFAULT_TIMEOUT),

            keepalive_seconds: get_var("BOOTSTRAP_KEEPALIVE_SECONDS")
                .map(|s| s.parse().context("Invalid BOOTSTRAP_KEEPALIVE_SECONDS value"))
                .transpose()?
                .unwrap_or(DEFAULT_KEEPALIVE),

            handoff: get_var("BOOTSTRAP_HANDOFF")
                .map(|s| s.parse().context("Invalid BOOTSTRAP_HANDOFF value"))
                .transpose()?
                .unwrap_or(HandoffMode::Exec),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_host, self.port)
    }
}

// * Relative paths hang off the application root, never the working directory.
fn resolve_under(root: &Path, value: &str) -> PathBuf {
    let path: &Path = Path::new(value);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("expected a boolean, got '{other}'"),
    }
}


// End of file: /src/config/environment.rs
