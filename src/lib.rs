//! # tmpl-render
//!
//! A build-pipeline stage that renders template files. Each input file is
//! treated as a mustache-style template, rendered against one shared data
//! context with a directory of reusable partials available as `{{> name}}`,
//! and passed on with its content replaced by the output.
//!
//! # Architecture
//!
//! ```text
//! options ──► RenderConfig ──┐
//!                            ▼
//! src/tmpl/*.hjs ──► PartialSet ──► Renderer ──► Stage
//!                                                  │
//!              [A, B, C] (FileRecord) ─────────────┴──► [A', B', C']
//! ```
//!
//! The stage is a pure function from records to records: it never reads
//! input files itself. The CLI (and tests) supply records through [`source`]
//! and write them back out afterwards.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | Options, stock defaults, layering, option and data files |
//! | [`naming`] | File name → partial name (`header.hjs` → `header`) |
//! | [`partials`] | Discovers and reads partial files in parallel |
//! | [`render`] | The per-file transform: compile, render, replace payload |
//! | [`template`] | Logic-less Mustache: parsing, context lookup, partials |
//! | [`stage`] | Ordered parallel run over many files with an error policy |
//! | [`source`] | Reads input paths into records, writes rendered records |
//! | [`types`] | [`FileRecord`](types::FileRecord), shared by all of the above |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Mustache as the Dialect
//!
//! Templates are logic-less Mustache, rendered by the small engine in
//! [`template`]: `{{var}}` escapes HTML, `{{#list}}` repeats, `{{^x}}`
//! inverts, and a partial that does not exist renders as nothing. Everything
//! else in the crate treats it as "compile text, render with data and
//! partials".
//!
//! ## Partials Once Per Run
//!
//! Partials are loaded the first time a file needs them and shared by every
//! file after that. Parallel workers that arrive during the first load wait
//! for it rather than starting their own. See [`render`].
//!
//! ## Failures Are Values
//!
//! Every file resolves to exactly one `Result`. Nothing is only logged. The
//! stage decides whether to stop at the first failure or skip and continue
//! (see [`stage::ErrorPolicy`]), and every error names the file it is about.
//!
//! ## No Name Collisions
//!
//! Two partial files that would be reachable under the same name are
//! rejected outright rather than one of them silently winning.

pub mod config;
pub mod naming;
pub mod output;
pub mod partials;
pub mod render;
pub mod source;
pub mod stage;
pub mod template;
pub mod types;

pub use config::{RenderConfig, RenderOptions};
pub use partials::{PartialSet, load_partials};
pub use render::Renderer;
pub use stage::{ErrorPolicy, Stage};
pub use types::FileRecord;

#[cfg(test)]
pub(crate) mod test_helpers;
