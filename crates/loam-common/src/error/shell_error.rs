use thiserror::Error;

/// Errors raised by a command-execution surface while running one command.
///
/// The messages mirror what an interactive shell would print, since the
/// live session may show them when the command is not being replayed.
#[derive(Debug, Error)]
pub enum ShellError {
    #[error("{0}: File exists")]
    AlreadyExists(String),

    #[error("{0}: No such file or directory")]
    NotFound(String),

    #[error("{0}: Not a directory")]
    NotADirectory(String),

    #[error("{0}: Is a directory")]
    IsADirectory(String),

    #[error("{0}: Directory not empty")]
    DirectoryNotEmpty(String),

    #[error("missing operand")]
    MissingOperand,

    #[error("invalid date format '{0}'")]
    InvalidTimestamp(String),

    #[error("Operation not supported: {0}")]
    NotSupported(String),

    #[error("{0}")]
    Other(String),
}
