//! Partial discovery and loading.
//!
//! Partials are the reusable fragments templates pull in with `{{> name}}`.
//! They live as plain files directly inside one directory:
//!
//! ```text
//! src/tmpl/
//! ├── header.hjs        → {{> header}}
//! ├── footer.hjs        → {{> footer}}
//! ├── card.item.hjs     → {{> card.item}}
//! ├── notes.txt         (ignored: wrong extension)
//! └── drafts/           (ignored: subdirectories are not searched)
//! ```
//!
//! Loading happens in two steps: [`discover`] lists the matching files, then
//! [`read_partials`] reads all of them in parallel on the rayon pool and
//! builds the [`PartialSet`]. The set is only produced once every read has
//! finished; a single failed read fails the whole load and the contents of
//! the other files are dropped.
//!
//! Two files that map to the same partial name are rejected instead of
//! letting one silently win.

use crate::naming::partial_name_of_path;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum PartialError {
    #[error("failed to scan partials directory {}: {source}", .path.display())]
    Discovery {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read partial {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(
        "partial name '{name}' is defined twice: {} and {}",
        .first.display(),
        .second.display()
    )]
    Duplicate {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },
    #[error("partial '{name}' in {} is not a valid template: {source}", .path.display())]
    Compile {
        name: String,
        path: PathBuf,
        #[source]
        source: crate::template::TemplateError,
    },
}

impl PartialError {
    /// The file or directory the failure is about.
    pub fn path(&self) -> &Path {
        match self {
            PartialError::Discovery { path, .. }
            | PartialError::Read { path, .. }
            | PartialError::Compile { path, .. } => path,
            PartialError::Duplicate { second, .. } => second,
        }
    }
}

/// One loaded partial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partial {
    pub name: String,
    pub path: PathBuf,
    pub source: String,
}

/// Partial name → partial source.
///
/// Names are unique. Iteration is in name order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialSet {
    partials: BTreeMap<String, Partial>,
}

impl PartialSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a partial, rejecting a name that is already taken.
    pub fn insert(&mut self, partial: Partial) -> Result<(), PartialError> {
        if let Some(existing) = self.partials.get(&partial.name) {
            return Err(PartialError::Duplicate {
                name: partial.name,
                first: existing.path.clone(),
                second: partial.path,
            });
        }
        self.partials.insert(partial.name.clone(), partial);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Partial> {
        self.partials.get(name)
    }

    /// Source text of the named partial.
    pub fn source(&self, name: &str) -> Option<&str> {
        self.partials.get(name).map(|p| p.source.as_str())
    }

    pub fn len(&self) -> usize {
        self.partials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partials.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Partial> {
        self.partials.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.partials.keys().map(String::as_str)
    }
}

/// List the partial files directly inside `directory`, sorted by path.
///
/// A missing directory yields no files, the same as a glob that matches
/// nothing. Any other listing failure is an error.
pub fn discover(directory: &Path, extension: &str) -> Result<Vec<PathBuf>, PartialError> {
    let discovery_err = |source: io::Error| PartialError::Discovery {
        path: directory.to_path_buf(),
        source,
    };
    let entries = match fs::read_dir(directory) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(dir = %directory.display(), "partials directory does not exist");
            return Ok(Vec::new());
        }
        Err(e) => return Err(discovery_err(e)),
    };

    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(discovery_err)?.path();
        if path.is_file() && partial_name_of_path(&path, extension).is_some() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Read the given partial files in parallel and key them by partial name.
pub fn read_partials(files: &[PathBuf], extension: &str) -> Result<PartialSet, PartialError> {
    let partials = files
        .par_iter()
        .filter_map(|path| {
            partial_name_of_path(path, extension).map(|name| (name.to_string(), path))
        })
        .map(|(name, path)| {
            fs::read_to_string(path)
                .map(|source| Partial {
                    name,
                    path: path.clone(),
                    source,
                })
                .map_err(|source| PartialError::Read {
                    path: path.clone(),
                    source,
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut set = PartialSet::new();
    for partial in partials {
        set.insert(partial)?;
    }
    Ok(set)
}

/// Discover and read every partial in `directory`.
pub fn load_partials(directory: &Path, extension: &str) -> Result<PartialSet, PartialError> {
    let files = discover(directory, extension)?;
    if files.is_empty() {
        return Ok(PartialSet::new());
    }
    let set = read_partials(&files, extension)?;
    debug!(
        dir = %directory.display(),
        count = set.len(),
        "loaded partials"
    );
    Ok(set)
}
