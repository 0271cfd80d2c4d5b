// Start of file: src/utils/error_handling.rs

use std::io;
use std::path::PathBuf;

use thiserror::Error;

// ! Exit codes for failures that don't carry a package manager status
pub const EXIT_GENERIC_FAILURE: i32 = 1;
pub const EXIT_NO_INPUT: i32 = 66;
pub const EXIT_CONFIG: i32 = 78;
pub const EXIT_CANNOT_EXECUTE: i32 = 126;
pub const EXIT_NOT_FOUND: i32 = 127;
const SIGNAL_EXIT_BASE: i32 = 128;

/*
    * How a single setup command failed.
*/
#[derive(Debug, Error)]
pub enum StepFailure {
    #[error("exited with status {0}")]
    Exited(i32),

    #[error("terminated by signal {0}")]
    Signaled(i32),

    #[error("could not be started: {0}")]
    Spawn(#[source] io::Error),

    #[error("manifest file does not exist")]
    ManifestMissing,

    #[error("manifest file could not be read: {0}")]
    ManifestUnreadable(#[source] io::Error),
}

impl StepFailure {
    // * Verbatim status when the package manager produced one.
    pub fn exit_code(&self) -> i32 {
        match self {
            StepFailure::Exited(0) => EXIT_GENERIC_FAILURE,
            StepFailure::Exited(code) => *code,
            StepFailure::Signaled(signal) => SIGNAL_EXIT_BASE + signal,
            StepFailure::Spawn(err) if err.kind() == io::ErrorKind::NotFound => EXIT_NOT_FOUND,
            StepFailure::Spawn(_) => EXIT_CANNOT_EXECUTE,
            StepFailure::ManifestMissing | StepFailure::ManifestUnreadable(_) => EXIT_NO_INPUT,
        }
    }
}

/*
    * Fatal bootstrap errors. None of them is retried.
*/
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("native dependency `{package}` failed to install: {failure}")]
    NativeDependencyInstall {
        package: String,
        #[source]
        failure: StepFailure,
    },

    #[error("language dependencies from `{}` failed to install: {failure}", .manifest.display())]
    LanguageDependencyInstall {
        manifest: PathBuf,
        #[source]
        failure: StepFailure,
    },

    #[error("process hand-off to `{program}` failed: {source}")]
    ProcessHandoff {
        program: String,
        #[source]
        source: io::Error,
    },
}

impl BootstrapError {
    pub fn kind(&self) -> &'static str {
        match self {
            BootstrapError::NativeDependencyInstall { .. } => "NativeDependencyInstallError",
            BootstrapError::LanguageDependencyInstall { .. } => "LanguageDependencyInstallError",
            BootstrapError::ProcessHandoff { .. } => "ProcessHandoffError",
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            BootstrapError::NativeDependencyInstall { failure, .. }
            | BootstrapError::LanguageDependencyInstall { failure, .. } => failure.exit_code(),
            BootstrapError::ProcessHandoff { source, .. } if source.kind() == io::ErrorKind::NotFound => {
                EXIT_NOT_FOUND
            }
            BootstrapError::ProcessHandoff { .. } => EXIT_CANNOT_EXECUTE,
        }
    }
}

// * Maps a raw wait status into the exit code this process should report.
pub fn exit_code_from_status(code: Option<i32>, signal: Option<i32>) -> i32 {
    match (code, signal) {
        (Some(code), _) => code,
        (None, Some(signal)) => SIGNAL_EXIT_BASE + signal,
        (None, None) => EXIT_GENERIC_FAILURE,
    }
}


// End of file: src/utils/error_handling.rs
