/// Kinds of command that mutate the filesystem and are therefore journaled.
///
/// Each kind answers to a descriptive name and to the shell name the
/// emulated environment exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VerbKind {
    CreateFile,
    CreateDir,
    Copy,
    DeleteFile,
    DeleteDir,
    ChangeDirectory,
}

impl VerbKind {
    pub const ALL: [VerbKind; 6] = [
        VerbKind::CreateFile,
        VerbKind::CreateDir,
        VerbKind::Copy,
        VerbKind::DeleteFile,
        VerbKind::DeleteDir,
        VerbKind::ChangeDirectory,
    ];

    pub fn descriptive_name(self) -> &'static str {
        match self {
            VerbKind::CreateFile => "create-file",
            VerbKind::CreateDir => "create-dir",
            VerbKind::Copy => "copy",
            VerbKind::DeleteFile => "delete-file",
            VerbKind::DeleteDir => "delete-dir",
            VerbKind::ChangeDirectory => "change-directory",
        }
    }

    pub fn shell_name(self) -> &'static str {
        match self {
            VerbKind::CreateFile => "touch",
            VerbKind::CreateDir => "mkdir",
            VerbKind::Copy => "cp",
            VerbKind::DeleteFile => "rm",
            VerbKind::DeleteDir => "rmdir",
            VerbKind::ChangeDirectory => "cd",
        }
    }

    /// Look a verb up by either of its names.
    pub fn from_name(name: &str) -> Option<VerbKind> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.shell_name() == name || kind.descriptive_name() == name)
    }

    /// Whether replaying this verb brings a new filesystem entry into being,
    /// in which case it takes a historical timestamp.
    pub fn creates_entry(self) -> bool {
        matches!(self, VerbKind::CreateFile | VerbKind::CreateDir)
    }
}

impl std::fmt::Display for VerbKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.descriptive_name())
    }
}

/// Whether the first word of `command` belongs to the monitored mutation set.
pub fn is_monitored(command: &str) -> bool {
    command
        .split_ascii_whitespace()
        .next()
        .and_then(VerbKind::from_name)
        .is_some()
}
