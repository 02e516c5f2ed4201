//! Entry points a host session lifecycle calls into.

use crate::config::LoamConfig;
use crate::history::HistoryStore;
use crate::journal::JournalWriter;
use crate::lock::IdentityLocks;
use crate::replay::{ReplayReport, Replayer};
use crate::retention::RetentionPurger;
use crate::scanner::ActivityScanner;
use crate::shell::Shell;
use crate::storage::StorageLayout;
use loam_common::Identity;
use std::path::PathBuf;
use tracing::warn;

/// Connect, disconnect and per-command hooks for one storage directory.
///
/// Replay and journal writes for the same identity are serialised. Clones
/// share the same locks.
#[derive(Debug, Clone)]
pub struct PersistenceHooks {
    activity_log: PathBuf,
    scanner: ActivityScanner,
    writer: JournalWriter,
    replayer: Replayer,
    history: HistoryStore,
    locks: IdentityLocks,
}

impl PersistenceHooks {
    pub fn new(config: &LoamConfig) -> Self {
        let layout = StorageLayout::new(&config.storage.dir);
        let purger = RetentionPurger::new(config.retention.max_age_days);
        Self {
            activity_log: config.activity_log.path.clone(),
            scanner: ActivityScanner::new(),
            writer: JournalWriter::new(layout.clone(), purger)
                .with_deduplication(config.journal.deduplicate),
            replayer: Replayer::new(layout.clone(), config.replay.home.clone())
                .with_timestamp_flag(config.replay.timestamp_flag.clone()),
            history: HistoryStore::new(layout),
            locks: IdentityLocks::new(),
        }
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn replayer(&self) -> &Replayer {
        &self.replayer
    }

    /// Rebuild the identity's environment before its shell is handed over.
    pub async fn on_connect<S: Shell + ?Sized>(
        &self,
        identity: &Identity,
        shell: &mut S,
    ) -> ReplayReport {
        let _guard = self.locks.lock(identity).await;
        self.replayer.replay(identity, shell).await
    }

    /// Journal the session that just ended. Returns the number of new
    /// journal entries.
    pub async fn on_disconnect(&self, identity: &Identity) -> usize {
        let _guard = self.locks.lock(identity).await;

        let scanner = self.scanner;
        let writer = self.writer.clone();
        let log = self.activity_log.clone();
        let id = identity.clone();
        let task = tokio::task::spawn_blocking(move || {
            let entries = scanner.scan_path(&log, &id);
            writer.append(&id, &entries)
        });

        match task.await {
            Ok(written) => written,
            Err(e) => {
                warn!(identity = %identity, error = %e, "journal task failed");
                0
            }
        }
    }

    /// Record a command line for recall.
    pub fn on_command(&self, identity: &Identity, command_line: &str) {
        self.history.append(identity, command_line);
    }
}
