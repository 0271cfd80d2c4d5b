// Library root for the App Service bootstrap launcher

pub mod config;
pub mod core;
pub mod utils;

pub use crate::config::environment::{BootstrapConfig, EnvSnapshot, HandoffMode, LaunchMode};
pub use crate::core::bootstrap::Bootstrap;
pub use crate::core::handoff::{Handoff, ProcessHandoff};
pub use crate::core::runner::{CommandRunner, CommandSpec, Completion, SystemRunner};
pub use crate::core::state::BootState;
pub use crate::utils::error_handling::{BootstrapError, StepFailure};
