//! Shared types passed between the file source, the render transform and
//! the pipeline stage.

use std::path::{Path, PathBuf};

/// A file flowing through the pipeline.
///
/// The render transform only ever replaces `contents`; `path` and `base` are
/// carried through untouched so the host pipeline can write the result back
/// to the same relative location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Where the file came from (or its logical identity for in-memory input).
    pub path: PathBuf,
    /// Root the file was discovered under, if any. Output paths are computed
    /// relative to this.
    pub base: Option<PathBuf>,
    /// Raw payload. Rendered output is stored as UTF-8.
    pub contents: Vec<u8>,
}

impl FileRecord {
    pub fn new(path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            base: None,
            contents: contents.into(),
        }
    }

    pub fn with_base(mut self, base: impl Into<PathBuf>) -> Self {
        self.base = Some(base.into());
        self
    }

    /// Path relative to `base`, or the file name when there is no base.
    pub fn relative(&self) -> &Path {
        if let Some(base) = &self.base {
            if let Ok(rel) = self.path.strip_prefix(base) {
                return rel;
            }
        }
        self.path
            .file_name()
            .map(Path::new)
            .unwrap_or(self.path.as_path())
    }

    /// Payload as text, if it is valid UTF-8.
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.contents).ok()
    }
}
