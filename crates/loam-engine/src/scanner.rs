use loam_common::verb::is_monitored;
use loam_common::{ActivityEvent, ActivityRecord, Identity, JournalEntry};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, warn};

/// Pulls one identity's latest-session mutating commands out of the shared
/// activity log.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActivityScanner;

impl ActivityScanner {
    pub fn new() -> Self {
        Self
    }

    /// Scan the log file at `path`. An unreadable log yields no entries.
    pub fn scan_path(&self, path: &Path, identity: &Identity) -> Vec<JournalEntry> {
        match File::open(path) {
            Ok(file) => self.scan(BufReader::new(file), identity),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot open activity log");
                Vec::new()
            }
        }
    }

    /// Walk the log in order. A new connection for `identity` discards what
    /// was gathered so far, so only its most recent session survives.
    pub fn scan<R: BufRead>(&self, reader: R, identity: &Identity) -> Vec<JournalEntry> {
        let mut accumulator = Vec::new();

        // Split on raw bytes: a stray non-UTF-8 byte in someone else's record
        // must not make the whole log unreadable.
        for (index, raw) in reader.split(b'\n').enumerate() {
            let line = match raw {
                Ok(raw) => String::from_utf8_lossy(&raw).into_owned(),
                Err(e) => {
                    warn!(identity = %identity, line = index + 1, error = %e, "activity log read failed");
                    return Vec::new();
                }
            };
            if line.trim().is_empty() {
                continue;
            }

            let record = match ActivityRecord::from_line(&line) {
                Ok(record) => record,
                Err(e) => {
                    debug!(line = index + 1, error = %e, "skipping unparsable activity record");
                    continue;
                }
            };
            if !record.belongs_to(identity) {
                continue;
            }

            match record.classify() {
                ActivityEvent::NewConnection => accumulator.clear(),
                ActivityEvent::Command(input) => {
                    // One input line may chain several commands.
                    for command in input.split(';').map(str::trim) {
                        if is_monitored(command) {
                            accumulator.push(JournalEntry::new(record.timestamp, command));
                        }
                    }
                }
                ActivityEvent::Other => {}
            }
        }

        accumulator
    }
}
