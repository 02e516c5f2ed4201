use std::path::PathBuf;
use thiserror::Error;

/// Failures inside the per-identity stores.
///
/// These never cross the public best-effort API: the stores log them and
/// degrade to an empty result.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not lock {} after {attempts} attempts", path.display())]
    LockTimeout { path: PathBuf, attempts: usize },
}
