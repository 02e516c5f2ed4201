use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};

pub const SECONDS_PER_DAY: u64 = 86_400;
pub const DEFAULT_MAX_AGE_DAYS: u64 = 14;

/// Deletes per-identity files that have not been modified for longer than
/// the retention window.
#[derive(Debug, Clone, Copy)]
pub struct RetentionPurger {
    max_age_days: u64,
}

impl Default for RetentionPurger {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_AGE_DAYS)
    }
}

impl RetentionPurger {
    pub fn new(max_age_days: u64) -> Self {
        Self { max_age_days }
    }

    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_days.saturating_mul(SECONDS_PER_DAY))
    }

    /// Sweep the regular files directly under `storage_dir`, returning the
    /// ones removed. Subdirectories are left alone and failures are logged
    /// per file.
    pub fn purge(&self, storage_dir: &Path) -> Vec<PathBuf> {
        let cutoff = SystemTime::now()
            .checked_sub(self.max_age())
            .unwrap_or(SystemTime::UNIX_EPOCH);
        purge_older_than(storage_dir, cutoff)
    }
}

/// Convenience form of [`RetentionPurger::purge`].
pub fn purge(storage_dir: &Path, max_age_days: u64) -> Vec<PathBuf> {
    RetentionPurger::new(max_age_days).purge(storage_dir)
}

fn purge_older_than(storage_dir: &Path, cutoff: SystemTime) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir(storage_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
        Err(e) => {
            warn!(dir = %storage_dir.display(), error = %e, "cannot list storage directory");
            return Vec::new();
        }
    };

    let mut removed = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        let metadata = match entry.metadata() {
            Ok(m) if m.is_file() => m,
            Ok(_) => continue,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "cannot stat, skipping");
                continue;
            }
        };
        let Ok(modified) = metadata.modified() else {
            continue;
        };
        if modified >= cutoff {
            continue;
        }
        match std::fs::remove_file(&path) {
            Ok(()) => {
                info!(path = %path.display(), "purged expired file");
                removed.push(path);
            }
            Err(e) => warn!(path = %path.display(), error = %e, "failed to purge"),
        }
    }
    removed
}
