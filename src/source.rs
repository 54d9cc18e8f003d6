//! Reading input files into [`FileRecord`]s and writing rendered ones back.
//!
//! This is the CLI's side of the pipeline. The render stage itself never
//! touches input files on disk; it only sees records.
//!
//! Inputs can be files or directories:
//!
//! ```text
//! tmpl-render render src/pages index.html
//!
//! src/pages/about.html      → dist/about.html
//! src/pages/blog/post.html  → dist/blog/post.html
//! index.html                → dist/index.html
//! ```
//!
//! A directory input is walked recursively, in file-name order, and its files
//! keep their path relative to that directory. A file input keeps only its
//! file name. Two inputs that would land on the same output path are an
//! error; nothing is written in that case.

use crate::types::FileRecord;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("input not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("walking input directory: {0}")]
    Walk(#[from] walkdir::Error),
    #[error(
        "{} and {} would both be written to {}",
        .first.display(),
        .second.display(),
        .dest.display()
    )]
    OutputCollision {
        dest: PathBuf,
        first: PathBuf,
        second: PathBuf,
    },
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> SourceError + '_ {
    move |source| SourceError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Read every input into a record, in argument order.
///
/// Anything under one of the `exclude` directories is skipped, so a partials
/// directory nested inside an input directory is not rendered as a page.
pub fn collect_inputs(
    inputs: &[PathBuf],
    exclude: &[PathBuf],
) -> Result<Vec<FileRecord>, SourceError> {
    let exclude: Vec<PathBuf> = exclude
        .iter()
        .filter_map(|p| p.canonicalize().ok())
        .collect();
    let is_excluded = |path: &Path| {
        !exclude.is_empty()
            && path
                .canonicalize()
                .map(|p| exclude.iter().any(|ex| p.starts_with(ex)))
                .unwrap_or(false)
    };

    let mut records = Vec::new();
    for input in inputs {
        if input.is_file() {
            if is_excluded(input.as_path()) {
                warn!(path = %input.display(), "skipping input inside the partials directory");
                continue;
            }
            let contents = fs::read(input).map_err(io_err(input))?;
            let base = input.parent().map(Path::to_path_buf).unwrap_or_default();
            records.push(FileRecord::new(input.clone(), contents).with_base(base));
        } else if input.is_dir() {
            let walker = WalkDir::new(input)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|e| !is_excluded(e.path()));
            for entry in walker {
                let entry = entry?;
                if !entry.file_type().is_file() {
                    continue;
                }
                let contents = fs::read(entry.path()).map_err(io_err(entry.path()))?;
                records.push(
                    FileRecord::new(entry.path().to_path_buf(), contents).with_base(input.clone()),
                );
            }
        } else {
            return Err(SourceError::NotFound(input.clone()));
        }
    }
    Ok(records)
}

/// Output path of every record under `out_dir`, in record order.
///
/// Fails if two records map to the same path.
pub fn output_paths(files: &[FileRecord], out_dir: &Path) -> Result<Vec<PathBuf>, SourceError> {
    let mut seen: HashMap<PathBuf, &Path> = HashMap::new();
    let mut dests = Vec::with_capacity(files.len());
    for file in files {
        let dest = out_dir.join(file.relative());
        if let Some(first) = seen.insert(dest.clone(), &file.path) {
            return Err(SourceError::OutputCollision {
                dest,
                first: first.to_path_buf(),
                second: file.path.clone(),
            });
        }
        dests.push(dest);
    }
    Ok(dests)
}

/// Write every record under `out_dir`, after checking that no two of them
/// share an output path.
pub fn write_outputs(files: &[FileRecord], out_dir: &Path) -> Result<Vec<PathBuf>, SourceError> {
    output_paths(files, out_dir)?;
    files.iter().map(|file| write_output(file, out_dir)).collect()
}

/// Write a record's payload under `out_dir`, returning the path written.
pub fn write_output(file: &FileRecord, out_dir: &Path) -> Result<PathBuf, SourceError> {
    let dest = out_dir.join(file.relative());
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(io_err(parent))?;
    }
    fs::write(&dest, &file.contents).map_err(io_err(&dest))?;
    Ok(dest)
}
