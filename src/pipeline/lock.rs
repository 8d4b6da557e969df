//! Session locks keyed by store identity.
//!
//! The store format assumes a single writer. Ingestion sessions and
//! rebuilds both take this lock, so a rebuild can never run concurrently
//! with ingestion against the same store file within the process.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use crate::error::{AppError, Result};

static HELD: OnceLock<Mutex<HashSet<PathBuf>>> = OnceLock::new();

fn registry() -> &'static Mutex<HashSet<PathBuf>> {
    HELD.get_or_init(|| Mutex::new(HashSet::new()))
}

/// Exclusive ownership of one store identity, released on drop.
#[derive(Debug)]
pub struct SessionLock {
    identity: PathBuf,
}

impl SessionLock {
    /// Acquire the lock for a store path, failing fast if it is held.
    pub fn acquire(identity: impl AsRef<Path>) -> Result<Self> {
        let identity = identity.as_ref().to_path_buf();
        let mut held = registry().lock().expect("lock registry poisoned");
        if !held.insert(identity.clone()) {
            return Err(AppError::StoreLocked(identity.display().to_string()));
        }
        Ok(Self { identity })
    }

    /// The store identity this lock protects.
    pub fn identity(&self) -> &Path {
        &self.identity
    }
}

impl Drop for SessionLock {
    fn drop(&mut self) {
        let mut held = registry().lock().expect("lock registry poisoned");
        held.remove(&self.identity);
    }
}
