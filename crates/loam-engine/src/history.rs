use crate::error::StorageError;
use crate::lock::{LockMode, lock_with_retry};
use crate::storage::StorageLayout;
use loam_common::Identity;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use tracing::warn;

/// Raw command-line history per identity, for shell recall.
///
/// Every command is kept, mutating or not. Failures are logged and read back
/// as "no history".
#[derive(Debug, Clone)]
pub struct HistoryStore {
    layout: StorageLayout,
}

impl HistoryStore {
    pub fn new(layout: StorageLayout) -> Self {
        Self { layout }
    }

    pub fn append(&self, identity: &Identity, command_line: &str) {
        if let Err(e) = self.try_append(identity, command_line) {
            warn!(identity = %identity, error = %e, "history append failed");
        }
    }

    pub fn read_all(&self, identity: &Identity) -> Vec<String> {
        match self.try_read_all(identity) {
            Ok(lines) => lines,
            Err(e) => {
                warn!(identity = %identity, error = %e, "history read failed");
                Vec::new()
            }
        }
    }

    pub fn clear(&self, identity: &Identity) {
        if let Err(e) = self.try_clear(identity) {
            warn!(identity = %identity, error = %e, "history clear failed");
        }
    }

    fn try_append(&self, identity: &Identity, command_line: &str) -> Result<(), StorageError> {
        self.layout.ensure()?;
        let path = self.layout.history_path(identity);

        // One call, one line.
        let mut line = command_line.replace(['\r', '\n'], " ");
        line.push('\n');

        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&path)?;
        lock_with_retry(&file, &path, LockMode::Exclusive)?;
        file.write_all(line.as_bytes())?;
        file.flush()?;
        Ok(())
    }

    fn try_read_all(&self, identity: &Identity) -> Result<Vec<String>, StorageError> {
        let path = self.layout.history_path(identity);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        lock_with_retry(&file, &path, LockMode::Shared)?;

        let mut lines = Vec::new();
        for raw in BufReader::new(&file).split(b'\n') {
            lines.push(String::from_utf8_lossy(&raw?).into_owned());
        }
        Ok(lines)
    }

    fn try_clear(&self, identity: &Identity) -> Result<(), StorageError> {
        let path = self.layout.history_path(identity);
        let file = match OpenOptions::new().write(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        lock_with_retry(&file, &path, LockMode::Exclusive)?;
        file.set_len(0)?;
        Ok(())
    }
}
