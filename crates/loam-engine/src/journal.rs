//! Per-identity journal files.
//!
//! One entry per line, `<RFC 3339 timestamp>,<verb> <args…>`. Files are only
//! ever appended to. A batch is written with a single `write_all` while the
//! file holds an exclusive advisory lock, and readers take a shared lock, so a
//! replay never sees half a batch.

use crate::error::StorageError;
use crate::lock::{LockMode, lock_with_retry};
use crate::retention::RetentionPurger;
use crate::storage::StorageLayout;
use chrono::{DateTime, Utc};
use loam_common::{Identity, JournalEntry};
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct JournalWriter {
    layout: StorageLayout,
    purger: RetentionPurger,
    deduplicate: bool,
}

impl JournalWriter {
    pub fn new(layout: StorageLayout, purger: RetentionPurger) -> Self {
        Self {
            layout,
            purger,
            deduplicate: true,
        }
    }

    /// Skip entries whose `(timestamp, command)` pair is already journaled.
    pub fn with_deduplication(mut self, deduplicate: bool) -> Self {
        self.deduplicate = deduplicate;
        self
    }

    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    /// Append `entries` to the identity's journal, then sweep expired files.
    ///
    /// Best effort: failures are logged and reported as zero entries
    /// written. Returns how many entries reached the file.
    pub fn append(&self, identity: &Identity, entries: &[JournalEntry]) -> usize {
        let written = match self.try_append(identity, entries) {
            Ok(written) => written,
            Err(e) => {
                warn!(identity = %identity, error = %e, "journal write failed, session state lost");
                return 0;
            }
        };
        if written > 0 {
            info!(identity = %identity, entries = written, "journal updated");
        }
        self.purger.purge(self.layout.root());
        written
    }

    fn try_append(
        &self,
        identity: &Identity,
        entries: &[JournalEntry],
    ) -> Result<usize, StorageError> {
        if entries.is_empty() {
            return Ok(0);
        }
        self.layout.ensure()?;
        let path = self.layout.journal_path(identity);

        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&path)?;
        lock_with_retry(&file, &path, LockMode::Exclusive)?;

        // Only what is already on disk counts as a duplicate. A batch may
        // legitimately repeat a command under one timestamp (`touch a; rm a;
        // touch a`), so each on-disk occurrence absorbs one batch entry.
        let mut on_disk = if self.deduplicate {
            existing_keys(&file)?
        } else {
            HashMap::new()
        };

        let mut buffer = String::new();
        let mut written = 0;
        for entry in entries {
            if let Some(remaining) = on_disk.get_mut(&key(entry)) {
                if *remaining > 0 {
                    *remaining -= 1;
                    debug!(identity = %identity, command = %entry.command, "already journaled");
                    continue;
                }
            }
            buffer.push_str(&entry.to_line());
            buffer.push('\n');
            written += 1;
        }

        if written > 0 {
            file.write_all(buffer.as_bytes())?;
            file.flush()?;
        }
        Ok(written)
    }
}

fn key(entry: &JournalEntry) -> (DateTime<Utc>, String) {
    (entry.timestamp, entry.command.clone())
}

/// How many times each `(timestamp, command)` pair occurs in the file.
fn existing_keys(file: &File) -> Result<HashMap<(DateTime<Utc>, String), usize>, StorageError> {
    let mut counts = HashMap::new();
    for raw in BufReader::new(file).split(b'\n') {
        if let Ok(entry) = JournalEntry::parse_line(&String::from_utf8_lossy(&raw?)) {
            *counts.entry(key(&entry)).or_insert(0) += 1;
        }
    }
    Ok(counts)
}

/// Read an identity's journal as raw lines.
///
/// `Ok(None)` means there is no journal, which is a new identity rather than
/// an error.
pub fn read_lines(path: &Path) -> Result<Option<Vec<String>>, StorageError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    lock_with_retry(&file, path, LockMode::Shared)?;

    // Lossy decoding: a corrupt byte spoils one line, not the whole replay.
    let mut lines = Vec::new();
    for raw in BufReader::new(&file).split(b'\n') {
        let raw = raw?;
        lines.push(String::from_utf8_lossy(&raw).into_owned());
    }
    Ok(Some(lines))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn entry(minute: u32, command: &str) -> JournalEntry {
        JournalEntry::new(
            Utc.with_ymd_and_hms(2021, 5, 1, 12, minute, 0).unwrap(),
            command,
        )
    }

    fn writer(dir: &Path) -> JournalWriter {
        JournalWriter::new(StorageLayout::new(dir), RetentionPurger::default())
    }

    #[test]
    fn test_append_creates_directory_and_file() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("store");
        let id = Identity::new("203.0.113.5").unwrap();

        let written = writer(&root).append(&id, &[entry(0, "touch note.txt")]);
        assert_eq!(written, 1);

        let lines = read_lines(&root.join("203.0.113.5.journal"))
            .unwrap()
            .unwrap();
        assert_eq!(lines, vec!["2021-05-01T12:00:00+00:00,touch note.txt"]);
    }

    #[test]
    fn test_repeated_disconnects_do_not_duplicate() {
        let dir = tempfile::tempdir().unwrap();
        let id = Identity::new("10.0.0.1").unwrap();
        let w = writer(dir.path());

        let first = [entry(0, "mkdir a"), entry(1, "cd a")];
        assert_eq!(w.append(&id, &first), 2);
        // The scanner hands the same session back plus one new command.
        let second = [entry(0, "mkdir a"), entry(1, "cd a"), entry(2, "touch b")];
        assert_eq!(w.append(&id, &second), 1);

        let lines = read_lines(&w.layout().journal_path(&id)).unwrap().unwrap();
        assert_eq!(lines.len(), 3);
        assert!(lines[2].ends_with(",touch b"));
    }

    #[test]
    fn test_repeats_within_one_record_are_kept() {
        let dir = tempfile::tempdir().unwrap();
        let id = Identity::new("10.0.0.1").unwrap();
        let w = writer(dir.path());

        // `touch a; rm a; touch a` shares one timestamp.
        let session = [entry(0, "touch a"), entry(0, "rm a"), entry(0, "touch a")];
        assert_eq!(w.append(&id, &session), 3);
        // Rescanning the same session adds nothing.
        assert_eq!(w.append(&id, &session), 0);

        let mut again = session.to_vec();
        again.push(entry(0, "touch a"));
        assert_eq!(w.append(&id, &again), 1);

        let lines = read_lines(&w.layout().journal_path(&id)).unwrap().unwrap();
        assert_eq!(
            lines,
            vec![
                "2021-05-01T12:00:00+00:00,touch a",
                "2021-05-01T12:00:00+00:00,rm a",
                "2021-05-01T12:00:00+00:00,touch a",
                "2021-05-01T12:00:00+00:00,touch a",
            ]
        );
    }

    #[test]
    fn test_same_command_at_different_times_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let id = Identity::new("10.0.0.1").unwrap();
        let w = writer(dir.path());
        assert_eq!(w.append(&id, &[entry(0, "rm x"), entry(5, "rm x")]), 2);
    }

    #[test]
    fn test_deduplication_can_be_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let id = Identity::new("10.0.0.1").unwrap();
        let w = writer(dir.path()).with_deduplication(false);
        w.append(&id, &[entry(0, "mkdir a")]);
        assert_eq!(w.append(&id, &[entry(0, "mkdir a")]), 1);
    }

    #[test]
    fn test_missing_journal_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_lines(&dir.path().join("nobody.journal")).unwrap().is_none());
    }

    #[test]
    fn test_empty_batch_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let id = Identity::new("10.0.0.1").unwrap();
        let w = writer(dir.path());
        assert_eq!(w.append(&id, &[]), 0);
        assert!(!w.layout().journal_path(&id).exists());
    }

    #[test]
    fn test_unwritable_storage_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where the storage directory should be.
        let blocker = dir.path().join("store");
        std::fs::write(&blocker, "").unwrap();
        let id = Identity::new("10.0.0.1").unwrap();
        assert_eq!(writer(&blocker).append(&id, &[entry(0, "touch a")]), 0);
    }
}
