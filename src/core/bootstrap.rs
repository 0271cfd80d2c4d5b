// Start of file: /src/core/bootstrap.rs

/*
    * The bootstrap sequence: native dependencies, language dependencies,
    * module path, then hand-off to the server. Strictly linear, no retries;
    * the first failure ends the boot.
*/

use std::io;

use chrono::{DateTime, Utc};
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

use crate::config::environment::{BootstrapConfig, EnvSnapshot, LaunchMode};
use crate::core::handoff::Handoff;
use crate::core::launch::{build_plan, ensure_gunicorn_config, LaunchPlan, MODULE_PATH_KEY};
use crate::core::runner::{CommandRunner, CommandSpec, Completion};
use crate::core::state::BootState;
use crate::utils::error_handling::{BootstrapError, StepFailure};
use crate::utils::report::{instance_hostname, log_report, BootReport};

pub const PACKAGE_INDEX: &str = "package index";
const UNIXODBC_DEV: &str = "unixodbc-dev";

// * One setup command and the name used when it fails
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InstallStep {
    pub package: String,
    pub command: CommandSpec,
}

pub struct Bootstrap<'a, R, H> {
    config: &'a BootstrapConfig,
    snapshot: &'a EnvSnapshot,
    runner: R,
    handoff: H,
    state: BootState,
    run_id: Uuid,
}

impl<'a, R: CommandRunner, H: Handoff> Bootstrap<'a, R, H> {
    pub fn new(config: &'a BootstrapConfig, snapshot: &'a EnvSnapshot, runner: R, handoff: H) -> Self {
        Self {
            config,
            snapshot,
            runner,
            handoff,
            state: BootState::NotStarted,
            run_id: Uuid::new_v4(),
        }
    }

    pub fn state(&self) -> BootState {
        self.state
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn handoff(&self) -> &H {
        &self.handoff
    }

    /// Runs every step in order. Returns the exit code of a supervised server;
    /// with `exec` a successful run never returns.
    pub async fn run(&mut self) -> Result<i32, BootstrapError> {
        let span: tracing::Span = info_span!(
            "bootstrap",
            run_id = %self.run_id,
            host = %instance_hostname()
        );

        async {
            let started_at: DateTime<Utc> = Utc::now();
            info!(
                driver = %self.config.odbc_package,
                manifest = %self.config.manifest.display(),
                launch_mode = %self.config.launch_mode,
                "Starting bootstrap sequence"
            );

            self.install_native_dependencies().await?;
            self.install_language_dependencies().await?;
            let plan: LaunchPlan = self.configure_runtime_path();
            self.hand_off(plan, started_at).await
        }
        .instrument(span)
        .await
    }

    /// apt-get commands for step 1, in execution order.
    pub fn native_dependency_steps(&self) -> Vec<InstallStep> {
        let apt_get: &str = &self.config.apt_get;
        let mut steps: Vec<InstallStep> = vec![InstallStep {
            package: PACKAGE_INDEX.to_owned(),
            command: CommandSpec::new(apt_get)
                .env("DEBIAN_FRONTEND", "noninteractive")
                .arg("update"),
        }];

        if self.config.install_unixodbc_dev {
            steps.push(InstallStep {
                package: UNIXODBC_DEV.to_owned(),
                command: CommandSpec::new(apt_get)
                    .env("DEBIAN_FRONTEND", "noninteractive")
                    .args(["install", "-y", UNIXODBC_DEV]),
            });
        }

        steps.push(InstallStep {
            package: self.config.odbc_package.to_string(),
            command: CommandSpec::new(apt_get)
                .env("DEBIAN_FRONTEND", "noninteractive")
                .env("ACCEPT_EULA", "Y")
                .args(["install", "-y", &*self.config.odbc_package]),
        });

        steps
    }

    /// pip command for step 2; the manifest path is always absolute.
    pub fn language_dependency_command(&self) -> CommandSpec {
        CommandSpec::new(&*self.config.python)
            .args(["-m", "pip", "install", "-r"])
            .arg(self.config.manifest.display().to_string())
            .current_dir(&self.config.app_root)
    }

    async fn install_native_dependencies(&mut self) -> Result<(), BootstrapError> {
        self.transition(BootState::NativeDepsInstalling);

        for step in self.native_dependency_steps() {
            info!(package = %step.package, command = %step.command.display(), "Installing native dependency");

            if let Err(failure) = self.execute(&step.command).await {
                self.transition(BootState::NativeDepsFailed);
                return Err(BootstrapError::NativeDependencyInstall {
                    package: step.package,
                    failure,
                });
            }
        }

        Ok(())
    }

    async fn install_language_dependencies(&mut self) -> Result<(), BootstrapError> {
        self.transition(BootState::LangDepsInstalling);

        // * Only an absent path (or a non-file) counts as missing.
        let outcome: Result<(), StepFailure> = match tokio::fs::metadata(&self.config.manifest).await {
            Ok(meta) if meta.is_file() => {
                let command: CommandSpec = self.language_dependency_command();
                info!(command = %command.display(), "Installing language dependencies");
                self.execute(&command).await
            }
            Ok(_) => Err(StepFailure::ManifestMissing),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Err(StepFailure::ManifestMissing),
            Err(err) => Err(StepFailure::ManifestUnreadable(err)),
        };

        outcome.map_err(|failure| {
            self.transition(BootState::LangDepsFailed);
            BootstrapError::LanguageDependencyInstall {
                manifest: self.config.manifest.clone(),
                failure,
            }
        })
    }

    // * Cannot fail: only shapes the child's environment.
    fn configure_runtime_path(&mut self) -> LaunchPlan {
        let plan: LaunchPlan = build_plan(self.config, self.snapshot);
        info!(
            module_path = %plan.env(MODULE_PATH_KEY).unwrap_or_default().to_string_lossy(),
            "Configured module search path"
        );

        self.transition(BootState::PathConfigured);
        plan
    }

    async fn hand_off(&mut self, plan: LaunchPlan, started_at: DateTime<Utc>) -> Result<i32, BootstrapError> {
        if self.config.launch_mode == LaunchMode::ConfigFile {
            ensure_gunicorn_config(self.config).map_err(|source| BootstrapError::ProcessHandoff {
                program: self.config.gunicorn_config.display().to_string(),
                source,
            })?;
        }

        let report: BootReport = BootReport::new(self.run_id, started_at, self.config, self.snapshot, plan.display());
        log_report(&report);

        let code: i32 = self.handoff.hand_off(&plan).await?;
        self.transition(BootState::HandedOff);
        Ok(code)
    }

    async fn execute(&self, command: &CommandSpec) -> Result<(), StepFailure> {
        match self.runner.run(command).await {
            Ok(Completion::Exited(0)) => Ok(()),
            Ok(Completion::Exited(code)) => Err(StepFailure::Exited(code)),
            Ok(Completion::Signaled(signal)) => Err(StepFailure::Signaled(signal)),
            Err(err) => Err(StepFailure::Spawn(err)),
        }
    }

    fn transition(&mut self, next: BootState) {
        if let Err(err) = self.state.advance(next) {
            // ! Sequencing bug; the step outcome is still reported to the caller
            error!(error = %err, "Boot state machine violated");
        }
    }
}

// End of file: /src/core/bootstrap.rs
