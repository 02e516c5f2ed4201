//! Rebuilds an identity's environment from its journal.
//!
//! Lines run strictly in file order, one at a time, each to completion.
//! Nothing that goes wrong inside a single line stops the replay, and the
//! identity always ends up back in its home directory.

use crate::command::{CommandFactory, CommandOutcome};
use crate::journal;
use crate::shell::Shell;
use crate::storage::StorageLayout;
use loam_common::timestamp::format_touch_stamp;
use loam_common::{Identity, JournalEntry, VerbKind};
use tracing::{debug, info, warn};

pub const DEFAULT_TIMESTAMP_FLAG: &str = "-t";

/// Tally of one replay.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayReport {
    pub lines: usize,
    pub executed: usize,
    /// Commands whose errors were swallowed.
    pub failed: usize,
    /// Malformed lines.
    pub skipped: usize,
    /// Unknown verbs dispatched as no-ops.
    pub ignored: usize,
    pub returned_home: bool,
}

#[derive(Debug, Clone)]
pub struct Replayer {
    layout: StorageLayout,
    factory: CommandFactory,
    home: String,
    timestamp_flag: String,
}

impl Replayer {
    pub fn new(layout: StorageLayout, home: impl Into<String>) -> Self {
        Self {
            layout,
            factory: CommandFactory::new(),
            home: home.into(),
            timestamp_flag: DEFAULT_TIMESTAMP_FLAG.to_string(),
        }
    }

    pub fn with_timestamp_flag(mut self, flag: impl Into<String>) -> Self {
        self.timestamp_flag = flag.into();
        self
    }

    pub fn home(&self) -> &str {
        &self.home
    }

    /// Replay `identity`'s journal against `shell`.
    ///
    /// An identity without a journal is left untouched.
    pub async fn replay<S: Shell + ?Sized>(
        &self,
        identity: &Identity,
        shell: &mut S,
    ) -> ReplayReport {
        let path = self.layout.journal_path(identity);
        // File locking may sleep between retries, so keep it off the runtime.
        let read_path = path.clone();
        let loaded = tokio::task::spawn_blocking(move || journal::read_lines(&read_path))
            .await
            .unwrap_or_else(|e| {
                warn!(identity = %identity, error = %e, "journal read task failed");
                Ok(Some(Vec::new()))
            });
        let lines = match loaded {
            Ok(Some(lines)) => lines,
            Ok(None) => {
                debug!(identity = %identity, "no journal, nothing to replay");
                return ReplayReport::default();
            }
            Err(e) => {
                warn!(identity = %identity, path = %path.display(), error = %e, "cannot read journal");
                Vec::new()
            }
        };

        let mut report = ReplayReport::default();
        let mut scaffolding = self.factory.scaffolding(&self.home);

        for (index, line) in lines.iter().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            report.lines += 1;

            let entry = match JournalEntry::parse_line(line) {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(identity = %identity, line = index + 1, error = %e, "skipping malformed journal line");
                    report.skipped += 1;
                    continue;
                }
            };

            let mut tokens = entry.command.split_ascii_whitespace();
            let Some(verb) = tokens.next() else {
                report.skipped += 1;
                continue;
            };
            let args = tokens.map(str::to_string).collect();

            let mut command = self.factory.build(verb, args);
            command.backdate(&self.timestamp_flag, format_touch_stamp(&entry.timestamp));

            match command.run(shell, &mut scaffolding).await {
                CommandOutcome::Executed(_) => report.executed += 1,
                CommandOutcome::Failed => report.failed += 1,
                CommandOutcome::Ignored => report.ignored += 1,
            }
        }

        let go_home = self
            .factory
            .build(VerbKind::ChangeDirectory.descriptive_name(), vec![self.home.clone()]);
        report.returned_home = matches!(
            go_home.run(shell, &mut scaffolding).await,
            CommandOutcome::Executed(_)
        );

        info!(
            identity = %identity,
            lines = report.lines,
            executed = report.executed,
            failed = report.failed,
            skipped = report.skipped,
            "replay finished"
        );
        report
    }
}
