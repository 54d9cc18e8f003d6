//! Shared test utilities.
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = partials_dir(&[("greeting.hjs", "Hello, {{name}}!")]);
//! let renderer = renderer_for(tmp.path(), json!({"name": "World"}));
//! let out = renderer.render_file(record("index.html", "{{> greeting}}")).unwrap();
//! assert_eq!(text_of(&out), "Hello, World!");
//! ```

use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::config::RenderOptions;
use crate::render::Renderer;
use crate::types::FileRecord;

// =========================================================================
// Fixture setup
// =========================================================================

/// Create a temp directory holding the given `(file name, contents)` pairs.
pub fn partials_dir(files: &[(&str, &str)]) -> TempDir {
    let tmp = TempDir::new().unwrap();
    for (name, contents) in files {
        std::fs::write(tmp.path().join(name), contents).unwrap();
    }
    tmp
}

/// Options pointing at `dir` with the default `.hjs` extension.
pub fn options_for(dir: &Path, data: serde_json::Value) -> RenderOptions {
    RenderOptions {
        data: Some(data),
        tmpl_path: Some(dir.to_path_buf()),
        ..Default::default()
    }
}

pub fn renderer_for(dir: &Path, data: serde_json::Value) -> Renderer {
    Renderer::new(options_for(dir, data).resolve())
}

// =========================================================================
// File records
// =========================================================================

pub fn record(path: impl Into<PathBuf>, text: &str) -> FileRecord {
    FileRecord::new(path, text)
}

/// Rendered payload as text. Panics on non-UTF-8 output.
pub fn text_of(file: &FileRecord) -> &str {
    file.text()
        .unwrap_or_else(|| panic!("{} is not UTF-8", file.path.display()))
}

/// Paths of the records, in order.
pub fn paths_of(files: &[FileRecord]) -> Vec<&Path> {
    files.iter().map(|f| f.path.as_path()).collect()
}
