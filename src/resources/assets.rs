//! Byte sources for loadable assets.
//!
//! Sounds and music are loaded by logical path through an [`AssetSource`].
//! [`DirSource`] reads from a directory on disk; [`MemorySource`] serves
//! bytes registered up front (embedded with `include_bytes!`, generated in a
//! test, ...).

use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::error::{EngineError, Result};

pub trait AssetSource: Send + Sync {
    /// Read the whole asset at `path`. Missing assets are
    /// [`EngineError::NotFound`].
    fn read(&self, path: &str) -> Result<Vec<u8>>;
}

/// Assets stored under a root directory.
#[derive(Debug, Clone)]
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl AssetSource for DirSource {
    fn read(&self, path: &str) -> Result<Vec<u8>> {
        let full = self.root.join(path);
        std::fs::read(&full).map_err(|e| match e.kind() {
            ErrorKind::NotFound => EngineError::NotFound(full.display().to_string()),
            _ => EngineError::Io(e),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    files: FxHashMap<String, Arc<[u8]>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, bytes: impl Into<Arc<[u8]>>) {
        self.files.insert(path.into(), bytes.into());
    }

    pub fn with(mut self, path: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        self.insert(path, bytes);
        self
    }
}

impl AssetSource for MemorySource {
    fn read(&self, path: &str) -> Result<Vec<u8>> {
        self.files
            .get(path)
            .map(|bytes| bytes.to_vec())
            .ok_or_else(|| EngineError::NotFound(path.to_string()))
    }
}
