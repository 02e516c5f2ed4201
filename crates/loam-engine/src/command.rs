//! Verb dispatch for replayed commands.
//!
//! The factory turns a journaled verb and its arguments into a
//! [`ReplayCommand`] and provides the scaffolding such a command needs to run
//! without a terminal: an [`ExecutionFrame`] and an [`OutputChannel`].

use crate::shell::{Effect, ExecutionFrame, Shell, ShellError};
use loam_common::VerbKind;
use std::collections::HashMap;
use tracing::debug;

/// Emulated terminal output for a command nobody is watching.
///
/// A silent channel keeps no text. Writes are only counted, and errors are
/// counted and logged at `debug`.
#[derive(Debug, Default)]
pub struct OutputChannel {
    verbose: bool,
    lines: Vec<String>,
    written: usize,
    suppressed: usize,
}

impl OutputChannel {
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            ..Self::default()
        }
    }

    /// A channel that swallows output and errors.
    pub fn silent() -> Self {
        Self::new(false)
    }

    pub fn write(&mut self, text: impl Into<String>) {
        self.written += 1;
        if self.verbose {
            self.lines.push(text.into());
        }
    }

    pub fn error(&mut self, command: &str, err: &ShellError) {
        if self.verbose {
            self.lines.push(format!("{}: {}", command, err));
        } else {
            self.suppressed += 1;
            debug!(command, error = %err, "suppressed replay error");
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn written(&self) -> usize {
        self.written
    }

    pub fn suppressed(&self) -> usize {
        self.suppressed
    }
}

/// Everything a command needs to run outside an interactive session.
#[derive(Debug)]
pub struct Scaffolding {
    pub frame: ExecutionFrame,
    pub output: OutputChannel,
}

/// How a single dispatched command ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Executed(Effect),
    Failed,
    Ignored,
}

/// An executable command bound to its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplayCommand {
    Dispatch { kind: VerbKind, verb: String, args: Vec<String> },
    /// Stand-in for verbs the factory does not know.
    Noop { verb: String },
}

impl ReplayCommand {
    pub fn kind(&self) -> Option<VerbKind> {
        match self {
            ReplayCommand::Dispatch { kind, .. } => Some(*kind),
            ReplayCommand::Noop { .. } => None,
        }
    }

    pub fn args(&self) -> &[String] {
        match self {
            ReplayCommand::Dispatch { args, .. } => args,
            ReplayCommand::Noop { .. } => &[],
        }
    }

    /// Prefix the arguments of an entry-creating command with a historical
    /// timestamp so the recreated entry carries its original mtime. Other
    /// commands are left unchanged.
    pub fn backdate(&mut self, flag: &str, stamp: String) {
        if let ReplayCommand::Dispatch { kind, args, .. } = self {
            if kind.creates_entry() {
                args.splice(0..0, [flag.to_string(), stamp]);
            }
        }
    }

    /// Run to completion. Errors go to `output`, never to the caller.
    pub async fn run<S: Shell + ?Sized>(
        &self,
        shell: &mut S,
        scaffolding: &mut Scaffolding,
    ) -> CommandOutcome {
        let (kind, verb, args) = match self {
            ReplayCommand::Dispatch { kind, verb, args } => (*kind, verb, args.as_slice()),
            ReplayCommand::Noop { verb } => {
                debug!(verb = %verb, "unknown verb, skipping");
                return CommandOutcome::Ignored;
            }
        };

        let frame = &mut scaffolding.frame;
        let result = match kind {
            VerbKind::CreateFile => shell.create_file(frame, args).await,
            VerbKind::CreateDir => shell.create_dir(frame, args).await,
            VerbKind::Copy => shell.copy(frame, args).await,
            VerbKind::DeleteFile => shell.delete_file(frame, args).await,
            VerbKind::DeleteDir => shell.delete_dir(frame, args).await,
            VerbKind::ChangeDirectory => shell.change_directory(frame, args).await,
        };

        match result {
            Ok(effect) => {
                scaffolding.output.write(effect.to_string());
                CommandOutcome::Executed(effect)
            }
            Err(err) => {
                scaffolding.output.error(verb, &err);
                CommandOutcome::Failed
            }
        }
    }
}

/// Fixed mapping from verb names to command constructors.
#[derive(Debug, Clone)]
pub struct CommandFactory {
    verbs: HashMap<&'static str, VerbKind>,
}

impl Default for CommandFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandFactory {
    pub fn new() -> Self {
        let mut verbs = HashMap::new();
        for kind in VerbKind::ALL {
            verbs.insert(kind.shell_name(), kind);
            verbs.insert(kind.descriptive_name(), kind);
        }
        Self { verbs }
    }

    pub fn resolve(&self, verb: &str) -> Option<VerbKind> {
        self.verbs.get(verb).copied()
    }

    /// Build the command for `verb`. Unknown verbs yield
    /// [`ReplayCommand::Noop`].
    pub fn build(&self, verb: &str, args: Vec<String>) -> ReplayCommand {
        match self.resolve(verb) {
            Some(kind) => ReplayCommand::Dispatch {
                kind,
                verb: verb.to_string(),
                args,
            },
            None => ReplayCommand::Noop {
                verb: verb.to_string(),
            },
        }
    }

    /// Non-interactive frame at `home` and an output channel with error
    /// reporting off.
    pub fn scaffolding(&self, home: &str) -> Scaffolding {
        Scaffolding {
            frame: ExecutionFrame::non_interactive(home),
            output: OutputChannel::silent(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct FailingShell;

    #[async_trait]
    impl Shell for FailingShell {
        async fn create_dir(
            &mut self,
            _frame: &mut ExecutionFrame,
            args: &[String],
        ) -> Result<Effect, ShellError> {
            Err(ShellError::AlreadyExists(args.join(" ")))
        }
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_factory_resolves_both_names() {
        let factory = CommandFactory::new();
        assert_eq!(factory.resolve("mkdir"), Some(VerbKind::CreateDir));
        assert_eq!(factory.resolve("create-dir"), Some(VerbKind::CreateDir));
        assert_eq!(
            factory.build("wget", strings(&["http://x"])),
            ReplayCommand::Noop {
                verb: "wget".into()
            }
        );
    }

    #[test]
    fn test_backdate_only_touches_creating_verbs() {
        let factory = CommandFactory::new();

        let mut touch = factory.build("touch", strings(&["a"]));
        touch.backdate("-t", "2105011234".into());
        assert_eq!(touch.args(), strings(&["-t", "2105011234", "a"]).as_slice());

        let mut cp = factory.build("cp", strings(&["a", "b"]));
        cp.backdate("-t", "2105011234".into());
        assert_eq!(cp.args(), strings(&["a", "b"]).as_slice());
    }

    #[tokio::test]
    async fn test_errors_are_suppressed() {
        let factory = CommandFactory::new();
        let mut scaffolding = factory.scaffolding("/root");
        let mut shell = FailingShell;

        let outcome = factory
            .build("mkdir", strings(&["dir"]))
            .run(&mut shell, &mut scaffolding)
            .await;
        assert_eq!(outcome, CommandOutcome::Failed);
        assert_eq!(scaffolding.output.suppressed(), 1);
        assert!(scaffolding.output.lines().is_empty());

        // Default trait methods report NotSupported, which is suppressed too.
        let outcome = factory
            .build("rm", strings(&["x"]))
            .run(&mut shell, &mut scaffolding)
            .await;
        assert_eq!(outcome, CommandOutcome::Failed);
        assert_eq!(scaffolding.output.suppressed(), 2);
    }

    #[test]
    fn test_reporting_channel_keeps_errors() {
        let mut output = OutputChannel::new(true);
        output.error("mkdir", &ShellError::AlreadyExists("dir".into()));
        assert_eq!(output.lines(), ["mkdir: dir: File exists".to_string()]);
        assert_eq!(output.suppressed(), 0);
    }

    #[test]
    fn test_silent_channel_keeps_no_text() {
        let mut output = OutputChannel::silent();
        for i in 0..1000 {
            output.write(format!("created /root/f{}", i));
        }
        assert_eq!(output.written(), 1000);
        assert!(output.lines().is_empty());

        let mut verbose = OutputChannel::new(true);
        verbose.write("created /root/a");
        assert_eq!(verbose.lines(), ["created /root/a".to_string()]);
    }
}
