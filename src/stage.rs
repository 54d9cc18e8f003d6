//! The render stage: an ordered run of the render transform over many files.
//!
//! Files are rendered in parallel on the rayon pool, but every result is
//! gathered back into input order before anything is reported, so the output
//! for `[A, B, C]` is always `[A', B', C']`.
//!
//! Each file resolves exactly once, to either a rendered [`FileRecord`] or a
//! [`RenderError`] naming it. What happens next depends on the
//! [`ErrorPolicy`]:
//!
//! | Policy | On first failure (in input order) |
//! |--------|-----------------------------------|
//! | [`ErrorPolicy::Halt`] | stop, return [`StageError::File`] |
//! | [`ErrorPolicy::Skip`] | log it, record it in [`RunSummary::failed`], keep going |
//!
//! Partials are loaded before any file is rendered. A partial that cannot be
//! loaded fails the run under either policy, since no file could render
//! against an incomplete set.
//!
//! Progress is reported through an optional [`mpsc::Sender<StageEvent>`];
//! events arrive in input order.

use crate::config::RenderConfig;
use crate::partials::PartialError;
use crate::render::{RenderError, Renderer};
use crate::types::FileRecord;
use rayon::prelude::*;
use std::path::PathBuf;
use std::sync::mpsc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum StageError {
    #[error(transparent)]
    Partials(#[from] PartialError),
    #[error("failed to render {}", .path.display())]
    File {
        path: PathBuf,
        #[source]
        source: RenderError,
    },
}

/// What to do when a file fails to render.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ErrorPolicy {
    #[default]
    Halt,
    Skip,
}

/// Progress events sent while a run is in progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageEvent {
    PartialsLoaded {
        dir: PathBuf,
        names: Vec<String>,
    },
    Rendered {
        index: usize,
        path: PathBuf,
        bytes: usize,
    },
    Failed {
        index: usize,
        path: PathBuf,
        error: String,
    },
}

/// A file that failed under [`ErrorPolicy::Skip`].
#[derive(Debug)]
pub struct FileFailure {
    /// Zero-based position in the input.
    pub index: usize,
    pub error: RenderError,
}

/// Result of a completed run.
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Rendered files, in input order.
    pub rendered: Vec<FileRecord>,
    /// Skipped failures, in input order. Always empty under `Halt`.
    pub failed: Vec<FileFailure>,
}

impl RunSummary {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct Stage {
    renderer: Renderer,
    policy: ErrorPolicy,
}

impl Stage {
    pub fn new(config: RenderConfig, policy: ErrorPolicy) -> Self {
        Self {
            renderer: Renderer::new(config),
            policy,
        }
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub fn policy(&self) -> ErrorPolicy {
        self.policy
    }

    /// Render every file and report the results in input order.
    pub fn run(
        &self,
        files: Vec<FileRecord>,
        events: Option<mpsc::Sender<StageEvent>>,
    ) -> Result<RunSummary, StageError> {
        let send = |event: StageEvent| {
            if let Some(tx) = &events {
                tx.send(event).ok();
            }
        };

        let partials = self.renderer.partials()?;
        send(StageEvent::PartialsLoaded {
            dir: self.renderer.config().tmpl_path.clone(),
            names: partials.names().map(str::to_string).collect(),
        });

        let results: Vec<Result<FileRecord, RenderError>> = files
            .into_par_iter()
            .map(|file| self.renderer.render_file(file))
            .collect();

        let mut summary = RunSummary::default();
        for (index, result) in results.into_iter().enumerate() {
            match result {
                Ok(file) => {
                    send(StageEvent::Rendered {
                        index,
                        path: file.path.clone(),
                        bytes: file.contents.len(),
                    });
                    summary.rendered.push(file);
                }
                Err(error) => {
                    send(StageEvent::Failed {
                        index,
                        path: error.path().to_path_buf(),
                        error: error.to_string(),
                    });
                    match self.policy {
                        ErrorPolicy::Halt => {
                            return Err(StageError::File {
                                path: error.path().to_path_buf(),
                                source: error,
                            });
                        }
                        ErrorPolicy::Skip => {
                            warn!(%error, "skipping file");
                            summary.failed.push(FileFailure { index, error });
                        }
                    }
                }
            }
        }

        info!(
            rendered = summary.rendered.len(),
            failed = summary.failed.len(),
            "render stage finished"
        );
        Ok(summary)
    }
}
