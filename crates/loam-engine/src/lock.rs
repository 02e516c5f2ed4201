//! Coordination between sessions of the same identity.
//!
//! Two layers are used. Inside one process, [`IdentityLocks`] serialises
//! replay and journal writes per identity. Across processes, journal and
//! history files carry `fs2` advisory locks while they are read or appended.

use crate::error::StorageError;
use loam_common::Identity;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::OwnedMutexGuard;

const MAX_RETRIES: usize = 10;
const RETRY_SLEEP: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    Shared,
    Exclusive,
}

/// Take an advisory lock on `file`, retrying a bounded number of times while
/// another process holds it. The lock is released when `file` is dropped.
pub fn lock_with_retry(file: &File, path: &Path, mode: LockMode) -> Result<(), StorageError> {
    for _ in 0..MAX_RETRIES {
        let attempt = match mode {
            LockMode::Shared => fs2::FileExt::try_lock_shared(file),
            LockMode::Exclusive => fs2::FileExt::try_lock_exclusive(file),
        };
        match attempt {
            Ok(()) => return Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                std::thread::sleep(RETRY_SLEEP);
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(StorageError::LockTimeout {
        path: path.to_path_buf(),
        attempts: MAX_RETRIES,
    })
}

/// One async mutex per identity.
#[derive(Debug, Clone, Default)]
pub struct IdentityLocks {
    inner: Arc<Mutex<HashMap<Identity, Arc<tokio::sync::Mutex<()>>>>>,
}

impl IdentityLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other holder works on `identity`, then hold it until
    /// the guard drops.
    pub async fn lock(&self, identity: &Identity) -> OwnedMutexGuard<()> {
        let slot = {
            let mut map = self.inner.lock().unwrap_or_else(|p| p.into_inner());
            // Forget identities nobody is holding or waiting on.
            map.retain(|_, slot| Arc::strong_count(slot) > 1);
            map.entry(identity.clone()).or_default().clone()
        };
        slot.lock_owned().await
    }

    /// Number of identities currently held or awaited.
    pub fn active(&self) -> usize {
        let map = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        map.values().filter(|slot| Arc::strong_count(slot) > 1).count()
    }
}
