//! Claim-then-process bookkeeping.
//!
//! A scene is claimed before any work on it starts. A claim is atomic: when
//! several workers race for the same key exactly one of them gets `true`.

use super::SceneKey;
use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

pub trait ClaimStore: Send + Sync {
    /// Record `key` as taken. `Ok(false)` if it was already claimed.
    fn claim(&self, key: &SceneKey) -> io::Result<bool>;
}

/// Claims held for the lifetime of one process.
#[derive(Debug, Default)]
pub struct InMemoryClaimStore {
    claimed: Mutex<HashSet<SceneKey>>,
}

impl InMemoryClaimStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.claimed.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ClaimStore for InMemoryClaimStore {
    fn claim(&self, key: &SceneKey) -> io::Result<bool> {
        let mut claimed = self.claimed.lock().unwrap_or_else(|e| e.into_inner());
        Ok(claimed.insert(key.clone()))
    }
}

/// Claims shared between processes as marker files
/// `{dir}/{category}/{scene}.claim`.
///
/// Markers are never removed; delete the directory to reprocess.
#[derive(Debug, Clone)]
pub struct MarkerClaimStore {
    dir: PathBuf,
}

impl MarkerClaimStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn marker_path(&self, key: &SceneKey) -> PathBuf {
        self.dir
            .join(&key.category)
            .join(format!("{}.claim", key.scene))
    }
}

impl ClaimStore for MarkerClaimStore {
    fn claim(&self, key: &SceneKey) -> io::Result<bool> {
        let path = self.marker_path(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(e),
        }
    }
}
