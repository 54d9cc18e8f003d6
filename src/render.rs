//! The per-file render transform.
//!
//! [`Renderer::render_file`] takes a [`FileRecord`], treats its payload as a
//! template, renders it against the configured data with the loaded partials
//! available as `{{> name}}`, and puts the rendered text back into the
//! record. Every other field of the record is left as it was.
//!
//! ## Partial loading
//!
//! Partials are loaded from disk the first time any file needs them and then
//! shared, read-only, by every file the renderer handles afterwards. The load
//! runs under a mutex, so files that arrive in parallel while the first load
//! is still in flight wait for that load instead of starting their own.
//!
//! A failed load is not remembered: the next file tries again. Call
//! [`Renderer::invalidate`] when the partials directory is known to have
//! changed and the next file should see a fresh set.
//!
//! ## Templates
//!
//! Templates are compiled from each file's payload, used once, and dropped.
//! Partials are compiled once, when they are loaded. Syntax is logic-less
//! Mustache (see [`crate::template`]): missing variables and references to
//! partials that do not exist both render as empty text.

use crate::config::RenderConfig;
use crate::partials::{PartialError, PartialSet, load_partials};
use crate::template::{Template, TemplateError};
use crate::types::FileRecord;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("{}: could not load partials: {source}", .path.display())]
    Partials {
        path: PathBuf,
        #[source]
        source: PartialError,
    },
    #[error("{}: contents are not valid UTF-8: {source}", .path.display())]
    Encoding {
        path: PathBuf,
        #[source]
        source: std::str::Utf8Error,
    },
    #[error("{}: {source}", .path.display())]
    Template {
        path: PathBuf,
        #[source]
        source: TemplateError,
    },
}

impl RenderError {
    /// Path of the input file that failed.
    pub fn path(&self) -> &Path {
        match self {
            RenderError::Partials { path, .. }
            | RenderError::Encoding { path, .. }
            | RenderError::Template { path, .. } => path,
        }
    }
}

/// Partials as loaded from disk, plus their compiled templates.
struct Loaded {
    partials: Arc<PartialSet>,
    compiled: BTreeMap<String, Template>,
}

/// Renders files against one [`RenderConfig`].
pub struct Renderer {
    config: RenderConfig,
    loaded: Mutex<Option<Arc<Loaded>>>,
}

impl Renderer {
    pub fn new(config: RenderConfig) -> Self {
        Self {
            config,
            loaded: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// The partial set, loading it if this is the first request.
    pub fn partials(&self) -> Result<Arc<PartialSet>, PartialError> {
        self.load().map(|loaded| Arc::clone(&loaded.partials))
    }

    /// Forget the loaded partials; the next render reloads them from disk.
    pub fn invalidate(&self) {
        let mut slot = self.loaded.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = None;
    }

    fn load(&self) -> Result<Arc<Loaded>, PartialError> {
        let mut slot = self.loaded.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(loaded) = slot.as_ref() {
            return Ok(Arc::clone(loaded));
        }

        let partials = load_partials(&self.config.tmpl_path, &self.config.tmpl_extension)?;
        let compiled = compile_partials(&partials)?;
        debug!(
            dir = %self.config.tmpl_path.display(),
            count = partials.len(),
            "partials ready"
        );
        let loaded = Arc::new(Loaded {
            partials: Arc::new(partials),
            compiled,
        });
        *slot = Some(Arc::clone(&loaded));
        Ok(loaded)
    }

    /// Render one template string with the configured data and partials.
    ///
    /// `path` only identifies the template in error messages.
    pub fn render_str(&self, path: &Path, template: &str) -> Result<String, RenderError> {
        let loaded = self.load().map_err(|source| RenderError::Partials {
            path: path.to_path_buf(),
            source,
        })?;
        let to_error = |source| RenderError::Template {
            path: path.to_path_buf(),
            source,
        };
        Template::compile(template)
            .and_then(|compiled| compiled.render(&self.config.data, &loaded.compiled))
            .map_err(to_error)
    }

    /// Replace the file's payload with its rendered output.
    pub fn render_file(&self, mut file: FileRecord) -> Result<FileRecord, RenderError> {
        let text = std::str::from_utf8(&file.contents).map_err(|source| RenderError::Encoding {
            path: file.path.clone(),
            source,
        })?;
        let rendered = self.render_str(&file.path, text)?;
        file.contents = rendered.into_bytes();
        Ok(file)
    }
}

fn compile_partials(partials: &PartialSet) -> Result<BTreeMap<String, Template>, PartialError> {
    partials
        .iter()
        .map(|partial| {
            let template = Template::compile(&partial.source).map_err(|source| {
                PartialError::Compile {
                    name: partial.name.clone(),
                    path: partial.path.clone(),
                    source,
                }
            })?;
            Ok((partial.name.clone(), template))
        })
        .collect()
}
