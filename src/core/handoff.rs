// Start of file: /src/core/handoff.rs

/*
    * Final step: turn this process into the server.
    *
    * `exec` replaces the process image, so the platform supervisor ends up
    * watching the server itself. `supervise` spawns the server, forwards every
    * signal it cares about and exits with the server's status. It is also the
    * fallback where exec does not exist.
*/

use std::future::Future;
use std::io;
use std::process::{ExitStatus, Stdio};

use tokio::process::{Child, Command};
use tracing::{info, warn};

use crate::config::environment::HandoffMode;
use crate::core::launch::LaunchPlan;
use crate::utils::error_handling::{exit_code_from_status, BootstrapError};

/*
    * Takes over the process with the launch plan. Returns the exit code this
    * process should terminate with; a successful exec never returns.
*/
pub trait Handoff {
    fn hand_off(&self, plan: &LaunchPlan) -> impl Future<Output = Result<i32, BootstrapError>> + Send;
}

#[derive(Clone, Copy, Debug)]
pub struct ProcessHandoff {
    mode: HandoffMode,
}

impl ProcessHandoff {
    pub fn new(mode: HandoffMode) -> Self {
        Self { mode }
    }
}

impl Handoff for ProcessHandoff {
    async fn hand_off(&self, plan: &LaunchPlan) -> Result<i32, BootstrapError> {
        match self.mode {
            #[cfg(unix)]
            HandoffMode::Exec => exec(plan),
            #[cfg(not(unix))]
            HandoffMode::Exec => {
                warn!("Process replacement is unavailable on this platform, supervising instead");
                supervise(plan).await
            }
            HandoffMode::Supervise => supervise(plan).await,
        }
    }
}

fn handoff_error(plan: &LaunchPlan, source: io::Error) -> BootstrapError {
    BootstrapError::ProcessHandoff {
        program: plan.program.clone(),
        source,
    }
}

#[cfg(unix)]
fn exec(plan: &LaunchPlan) -> Result<i32, BootstrapError> {
    use std::os::unix::process::CommandExt;

    info!(command = %plan.display(), "Replacing bootstrap process with server");

    let mut cmd: std::process::Command = std::process::Command::new(&plan.program);
    cmd.args(&plan.args)
        .env_clear()
        .envs(&plan.envs)
        .current_dir(&plan.current_dir);

    // ! Only returns on failure
    let err: io::Error = cmd.exec();
    Err(handoff_error(plan, err))
}

#[cfg(unix)]
type ForwardedSignals = Vec<(nix::sys::signal::Signal, tokio::signal::unix::Signal)>;
#[cfg(not(unix))]
type ForwardedSignals = ();

async fn supervise(plan: &LaunchPlan) -> Result<i32, BootstrapError> {
    info!(command = %plan.display(), "Starting supervised server process");

    // ! Handlers must exist before the child does
    let signals: ForwardedSignals = register_forwarded_signals().map_err(|err| handoff_error(plan, err))?;
    let mut child: Child = spawn_server(plan).map_err(|err| handoff_error(plan, err))?;

    let status: ExitStatus = wait_forwarding_signals(&mut child, signals)
        .await
        .map_err(|err| handoff_error(plan, err))?;

    #[cfg(unix)]
    let signal: Option<i32> = std::os::unix::process::ExitStatusExt::signal(&status);
    #[cfg(not(unix))]
    let signal: Option<i32> = None;

    let code: i32 = exit_code_from_status(status.code(), signal);
    info!(code, "Server process exited");
    Ok(code)
}

fn spawn_server(plan: &LaunchPlan) -> io::Result<Child> {
    Command::new(&plan.program)
        .args(&plan.args)
        .env_clear()
        .envs(&plan.envs)
        .current_dir(&plan.current_dir)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
}

#[cfg(unix)]
const FORWARDED: [nix::sys::signal::Signal; 9] = {
    use nix::sys::signal::Signal;
    [
        Signal::SIGTERM,
        Signal::SIGINT,
        Signal::SIGHUP,
        Signal::SIGQUIT,
        Signal::SIGUSR1,
        Signal::SIGUSR2,
        Signal::SIGTTIN,
        Signal::SIGTTOU,
        Signal::SIGWINCH,
    ]
};

#[cfg(unix)]
fn register_forwarded_signals() -> io::Result<ForwardedSignals> {
    use tokio::signal::unix::{signal, SignalKind};

    FORWARDED
        .into_iter()
        .map(|sig| Ok((sig, signal(SignalKind::from_raw(sig as i32))?)))
        .collect()
}

#[cfg(not(unix))]
fn register_forwarded_signals() -> io::Result<ForwardedSignals> {
    Ok(())
}

#[cfg(unix)]
async fn wait_forwarding_signals(child: &mut Child, signals: ForwardedSignals) -> io::Result<ExitStatus> {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;
    use tokio::task::JoinHandle;

    let pid: Pid = match child.id() {
        Some(id) => Pid::from_raw(id as i32),
        // ? Already reaped
        None => return child.wait().await,
    };

    let forwarders: Vec<JoinHandle<()>> = signals
        .into_iter()
        .map(|(sig, mut stream)| {
            tokio::spawn(async move {
                while stream.recv().await.is_some() {
                    info!(signal = ?sig, "Forwarding signal to server");
                    if let Err(err) = kill(pid, sig) {
                        warn!(signal = ?sig, error = %err, "Failed to forward signal");
                    }
                }
            })
        })
        .collect();

    let status: io::Result<ExitStatus> = child.wait().await;

    for forwarder in forwarders {
        forwarder.abort();
    }

    status
}

#[cfg(not(unix))]
async fn wait_forwarding_signals(child: &mut Child, _signals: ForwardedSignals) -> io::Result<ExitStatus> {
    tokio::select! {
        status = child.wait() => status,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, stopping server");
            child.start_kill()?;
            child.wait().await
        }
    }
}


// End of file: /src/core/handoff.rs
