// src/errors.rs

//! Crate-wide error taxonomy for container actions.
//!
//! Configuration errors (`InvalidReference`, `MissingOption`,
//! `UnrecognizedOption`, `InvalidOption`, `UnknownAction`, `Config`) are
//! raised before any process is spawned. The remaining variants describe
//! what happened to a process that was (or should have been) started.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ActionError {
    #[error("invalid container reference '{reference}': {reason}")]
    InvalidReference { reference: String, reason: String },

    #[error("missing required option '{0}'")]
    MissingOption(String),

    #[error("unrecognized option '{key}' for action '{action}'")]
    UnrecognizedOption { action: String, key: String },

    #[error("invalid value for option '{key}': {reason}")]
    InvalidOption { key: String, reason: String },

    #[error("unknown action '{0}'")]
    UnknownAction(String),

    #[error("backend '{backend}' unavailable: '{binary}' not found on PATH")]
    BackendUnavailable { backend: String, binary: String },

    #[error("failed to spawn '{program}': {source}")]
    SpawnFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("command interrupted ({reason}): {command}")]
    Interrupted { command: String, reason: String },

    #[error("{backend} exited with status {exit_code}: {command}\n{stderr_tail}")]
    NonZeroExit {
        backend: String,
        exit_code: i32,
        command: String,
        stderr_tail: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ActionError {
    /// True for errors detected before any process was spawned. Retrying
    /// these reproduces the same error.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            ActionError::InvalidReference { .. }
                | ActionError::MissingOption(_)
                | ActionError::UnrecognizedOption { .. }
                | ActionError::InvalidOption { .. }
                | ActionError::UnknownAction(_)
                | ActionError::Config(_)
        )
    }

    pub(crate) fn invalid_option(key: &str, reason: impl Into<String>) -> Self {
        ActionError::InvalidOption {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ActionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_errors_are_classified() {
        assert!(ActionError::MissingOption("dest".into()).is_configuration_error());
        assert!(
            ActionError::UnrecognizedOption {
                action: "run".into(),
                key: "contaner".into()
            }
            .is_configuration_error()
        );
        assert!(
            !ActionError::NonZeroExit {
                backend: "singularity".into(),
                exit_code: 1,
                command: "singularity exec img s.sh".into(),
                stderr_tail: String::new(),
            }
            .is_configuration_error()
        );
        assert!(
            !ActionError::Interrupted {
                command: "docker run".into(),
                reason: "timeout".into(),
            }
            .is_configuration_error()
        );
    }

    #[test]
    fn non_zero_exit_message_carries_code_and_tail() {
        let err = ActionError::NonZeroExit {
            backend: "docker".into(),
            exit_code: 2,
            command: "docker build -t x -f r .".into(),
            stderr_tail: "no such file".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("status 2"));
        assert!(msg.contains("no such file"));
    }
}
