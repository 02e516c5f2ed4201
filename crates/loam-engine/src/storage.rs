use loam_common::Identity;
use std::path::{Path, PathBuf};

pub const JOURNAL_SUFFIX: &str = "journal";
pub const HISTORY_SUFFIX: &str = "history";

/// Where per-identity files live: one flat directory, one journal and one
/// history file per identity.
#[derive(Debug, Clone)]
pub struct StorageLayout {
    root: PathBuf,
}

impl StorageLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn journal_path(&self, identity: &Identity) -> PathBuf {
        self.file_for(identity, JOURNAL_SUFFIX)
    }

    pub fn history_path(&self, identity: &Identity) -> PathBuf {
        self.file_for(identity, HISTORY_SUFFIX)
    }

    /// Create the storage directory if it is missing.
    pub fn ensure(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.root)
    }

    fn file_for(&self, identity: &Identity, suffix: &str) -> PathBuf {
        self.root
            .join(format!("{}.{}", identity.file_stem(), suffix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_stay_inside_root() {
        let layout = StorageLayout::new("/var/lib/loam");
        let id = Identity::new("../../etc/shadow").unwrap();
        let journal = layout.journal_path(&id);
        assert_eq!(journal.parent(), Some(Path::new("/var/lib/loam")));
        assert!(journal.to_string_lossy().ends_with(".journal"));
        assert_ne!(layout.journal_path(&id), layout.history_path(&id));
    }

    #[test]
    fn test_lookalike_identities_get_separate_files() {
        let layout = StorageLayout::new("/var/lib/loam");
        let v6 = Identity::new("2001:db8::1").unwrap();
        let lookalike = Identity::new("2001_db8__1").unwrap();
        assert_ne!(layout.journal_path(&v6), layout.journal_path(&lookalike));
        assert_ne!(layout.history_path(&v6), layout.history_path(&lookalike));
    }
}
