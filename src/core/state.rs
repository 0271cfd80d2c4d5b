// Start of file: /src/core/state.rs

use std::fmt;

/// Linear progress of one boot. Transitions only move forward.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BootState {
    NotStarted,
    NativeDepsInstalling,
    NativeDepsFailed,
    LangDepsInstalling,
    LangDepsFailed,
    PathConfigured,
    HandedOff,
}

/// Rejected transition between two boot states.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("illegal boot transition {from} -> {to}")]
pub struct IllegalTransition {
    pub from: BootState,
    pub to: BootState,
}

impl BootState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            BootState::NativeDepsFailed | BootState::LangDepsFailed | BootState::HandedOff
        )
    }

    pub fn can_transition_to(self, next: BootState) -> bool {
        use BootState::*;

        matches!(
            (self, next),
            (NotStarted, NativeDepsInstalling)
                | (NativeDepsInstalling, NativeDepsFailed)
                | (NativeDepsInstalling, LangDepsInstalling)
                | (LangDepsInstalling, LangDepsFailed)
                | (LangDepsInstalling, PathConfigured)
                | (PathConfigured, HandedOff)
        )
    }

    pub fn advance(&mut self, next: BootState) -> Result<(), IllegalTransition> {
        if !self.can_transition_to(next) {
            return Err(IllegalTransition { from: *self, to: next });
        }

        tracing::debug!(from = %self, to = %next, "Boot state transition");
        *self = next;
        Ok(())
    }
}

impl fmt::Display for BootState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}


// End of file: /src/core/state.rs
