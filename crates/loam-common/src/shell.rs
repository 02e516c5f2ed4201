use async_trait::async_trait;
pub use crate::error::ShellError;
use std::fmt;

/// Where a command runs: the working directory and the identity's home,
/// plus whether a user is attached to the terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionFrame {
    pub cwd: String,
    pub home: String,
    pub interactive: bool,
}

impl ExecutionFrame {
    /// A frame for running commands with nobody watching, starting at `home`.
    pub fn non_interactive(home: impl Into<String>) -> Self {
        let home = home.into();
        Self {
            cwd: home.clone(),
            home,
            interactive: false,
        }
    }
}

/// What a successfully executed command did to the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Created(Vec<String>),
    Touched(Vec<String>),
    Copied { from: String, to: String },
    Removed(Vec<String>),
    ChangedDirectory(String),
    Nothing,
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Effect::Created(paths) => write!(f, "created {}", paths.join(", ")),
            Effect::Touched(paths) => write!(f, "touched {}", paths.join(", ")),
            Effect::Copied { from, to } => write!(f, "copied {} -> {}", from, to),
            Effect::Removed(paths) => write!(f, "removed {}", paths.join(", ")),
            Effect::ChangedDirectory(dir) => write!(f, "cwd {}", dir),
            Effect::Nothing => f.write_str("no change"),
        }
    }
}

/// The command-execution surface replay drives.
///
/// Implementations own the environment being rebuilt. Arguments arrive as
/// the user typed them, except that entry-creating commands replayed from a
/// journal carry a leading timestamp override (`-t YYMMDDHHMM` by default).
#[async_trait]
pub trait Shell: Send {
    /// Create files, or refresh their modification time.
    async fn create_file(
        &mut self,
        _frame: &mut ExecutionFrame,
        _args: &[String],
    ) -> Result<Effect, ShellError> {
        Err(ShellError::NotSupported("create-file".into()))
    }

    /// Create directories.
    async fn create_dir(
        &mut self,
        _frame: &mut ExecutionFrame,
        _args: &[String],
    ) -> Result<Effect, ShellError> {
        Err(ShellError::NotSupported("create-dir".into()))
    }

    async fn copy(
        &mut self,
        _frame: &mut ExecutionFrame,
        _args: &[String],
    ) -> Result<Effect, ShellError> {
        Err(ShellError::NotSupported("copy".into()))
    }

    async fn delete_file(
        &mut self,
        _frame: &mut ExecutionFrame,
        _args: &[String],
    ) -> Result<Effect, ShellError> {
        Err(ShellError::NotSupported("delete-file".into()))
    }

    async fn delete_dir(
        &mut self,
        _frame: &mut ExecutionFrame,
        _args: &[String],
    ) -> Result<Effect, ShellError> {
        Err(ShellError::NotSupported("delete-dir".into()))
    }

    /// Move the frame's working directory.
    async fn change_directory(
        &mut self,
        _frame: &mut ExecutionFrame,
        _args: &[String],
    ) -> Result<Effect, ShellError> {
        Err(ShellError::NotSupported("change-directory".into()))
    }
}
