use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while driving `cargo crev` or decoding what it prints
#[derive(Debug, Error)]
pub enum CrevError {
    #[error("failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to read output of `{command}`: {source}")]
    Output {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("`{command}` {status}; OUT: {stdout}; ERR: {stderr}")]
    ToolFailed {
        command: String,
        status: ExitStatusText,
        stdout: String,
        stderr: String,
    },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse review document: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("failed to parse cargo metadata: {0}")]
    Metadata(#[from] serde_json::Error),

    #[error("unknown level `{0}` (expected high, medium, low or none)")]
    InvalidLevel(String),

    #[error("unknown rating `{0}` (expected strong, positive, neutral or negative)")]
    InvalidRating(String),
}

impl CrevError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        CrevError::Io {
            path: path.into(),
            source,
        }
    }

    /// Exit code of a failed tool invocation, if it exited normally
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            CrevError::ToolFailed {
                status: ExitStatusText::Code(code),
                ..
            } => Some(*code),
            _ => None,
        }
    }
}

/// How a child process ended, for error messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatusText {
    Code(i32),
    Signal,
}

impl std::fmt::Display for ExitStatusText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExitStatusText::Code(code) => write!(f, "exited with code {}", code),
            ExitStatusText::Signal => write!(f, "was terminated by a signal"),
        }
    }
}

pub type Result<T> = std::result::Result<T, CrevError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_failed_message_has_code_and_streams() {
        let err = CrevError::ToolFailed {
            command: "cargo crev repo publish".to_string(),
            status: ExitStatusText::Code(101),
            stdout: "pushing".to_string(),
            stderr: "rejected".to_string(),
        };

        let message = err.to_string();
        assert!(message.contains("cargo crev repo publish"));
        assert!(message.contains("101"));
        assert!(message.contains("OUT: pushing"));
        assert!(message.contains("ERR: rejected"));
        assert_eq!(err.exit_code(), Some(101));
    }

    #[test]
    fn test_output_error_names_the_command() {
        let err = CrevError::Output {
            command: "cargo install cargo-crev".to_string(),
            source: io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"),
        };
        assert!(err.to_string().contains("cargo install cargo-crev"));
        assert!(err.to_string().contains("pipe closed"));
        assert_eq!(err.exit_code(), None);
    }

    #[test]
    fn test_signal_has_no_exit_code() {
        let err = CrevError::ToolFailed {
            command: "cargo".to_string(),
            status: ExitStatusText::Signal,
            stdout: String::new(),
            stderr: String::new(),
        };
        assert_eq!(err.exit_code(), None);
        assert!(err.to_string().contains("signal"));
    }
}
