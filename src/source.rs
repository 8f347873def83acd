//! @ai:module:intent Supply raw manifest, document and source text to the resolution engine
//! @ai:module:layer infrastructure
//! @ai:module:public_api SourceProvider, FsSource, MemorySource
//! @ai:module:depends_on error
//! @ai:module:stateless false

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// @ai:intent Text supplier the orchestrator reads documents and source files from
pub trait SourceProvider {
    /// @ai:intent Raw text of an intent document, addressed by its manifest `file`
    fn read_document(&self, file: &str) -> Option<String>;

    /// @ai:intent Raw text of a source file, addressed by a frontmatter `files` entry
    fn read_source(&self, path: &str) -> Option<String>;
}

/// @ai:intent Read documents and sources from a checked-out repository
#[derive(Debug, Clone)]
pub struct FsSource {
    root: PathBuf,
    intent_dir: PathBuf,
}

impl FsSource {
    /// @ai:intent Create a provider rooted at `root`, with documents under `root/intent_dir`
    pub fn new(root: impl Into<PathBuf>, intent_dir: impl AsRef<Path>) -> Self {
        let root = root.into();
        let intent_dir = root.join(intent_dir);
        Self { root, intent_dir }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn intent_dir(&self) -> &Path {
        &self.intent_dir
    }

    /// @ai:intent Read the manifest file from the intent directory
    /// @ai:effects fs:read
    pub fn read_manifest(&self, name: &str) -> Result<String> {
        read_text(&self.intent_dir.join(name))
    }

    fn read_logged(&self, path: &Path) -> Option<String> {
        match read_text(path) {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::warn!(error = %e, "source unavailable");
                None
            }
        }
    }
}

impl SourceProvider for FsSource {
    /// @ai:effects fs:read
    fn read_document(&self, file: &str) -> Option<String> {
        self.read_logged(&self.intent_dir.join(file))
    }

    /// @ai:effects fs:read
    fn read_source(&self, path: &str) -> Option<String> {
        self.read_logged(&self.root.join(path))
    }
}

/// @ai:intent Read a UTF-8 file, keeping the path in the error
/// @ai:effects fs:read
pub fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| Error::FileRead {
        path: path.to_path_buf(),
        source: e,
    })
}

/// @ai:intent In-memory provider for tests and embedding callers
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    documents: HashMap<String, String>,
    sources: HashMap<String, String>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(mut self, file: &str, text: &str) -> Self {
        self.documents.insert(file.to_string(), text.to_string());
        self
    }

    pub fn with_source(mut self, path: &str, text: &str) -> Self {
        self.sources.insert(path.to_string(), text.to_string());
        self
    }
}

impl SourceProvider for MemorySource {
    fn read_document(&self, file: &str) -> Option<String> {
        self.documents.get(file).cloned()
    }

    fn read_source(&self, path: &str) -> Option<String> {
        self.sources.get(path).cloned()
    }
}
