//! CLI output formatting.
//!
//! Each display has a `format_*` function that returns lines (pure, no I/O,
//! easy to test) and a `print_*` wrapper that writes them to stdout.
//!
//! # Output Format
//!
//! ## Partials
//!
//! ```text
//! Partials (src/tmpl, *.hjs)
//! 001 footer
//!     Source: footer.hjs
//! 002 header
//!     Source: header.hjs
//! ```
//!
//! ## Render
//!
//! ```text
//! Partials: 2 loaded from src/tmpl
//! 001 pages/index.html (1532 bytes)
//! 002 pages/about.html FAILED
//!     pages/about.html: line 3: section `posts` is never closed
//!
//! Rendered 1 file → dist (1 failed)
//! ```

use crate::partials::PartialSet;
use crate::stage::{RunSummary, StageEvent};
use std::path::Path;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

// ============================================================================
// Partials listing
// ============================================================================

/// Format the partial inventory for the `partials` command.
pub fn format_partials(set: &PartialSet, dir: &Path, extension: &str) -> Vec<String> {
    let mut lines = vec![format!("Partials ({}, *{})", dir.display(), extension)];
    if set.is_empty() {
        lines.push(format!("{}(none)", indent(1)));
        return lines;
    }
    for (i, partial) in set.iter().enumerate() {
        lines.push(format!("{} {}", format_index(i + 1), partial.name));
        let file_name = partial
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        lines.push(format!("{}Source: {}", indent(1), file_name));
    }
    lines
}

pub fn print_partials(set: &PartialSet, dir: &Path, extension: &str) {
    for line in format_partials(set, dir, extension) {
        println!("{}", line);
    }
}

// ============================================================================
// Render progress
// ============================================================================

/// Format a single stage event as display lines.
pub fn format_stage_event(event: &StageEvent) -> Vec<String> {
    match event {
        StageEvent::PartialsLoaded { dir, names } => {
            vec![format!(
                "Partials: {} loaded from {}",
                names.len(),
                dir.display()
            )]
        }
        StageEvent::Rendered { index, path, bytes } => vec![format!(
            "{} {} ({} bytes)",
            format_index(index + 1),
            path.display(),
            bytes
        )],
        StageEvent::Failed { index, path, error } => vec![
            format!("{} {} FAILED", format_index(index + 1), path.display()),
            format!("{}{}", indent(1), error),
        ],
    }
}

/// Format the closing summary of a render run.
pub fn format_run_summary(summary: &RunSummary, out_dir: &Path) -> Vec<String> {
    let mut line = format!(
        "Rendered {} → {}",
        plural(summary.rendered.len(), "file"),
        out_dir.display()
    );
    if !summary.is_clean() {
        line.push_str(&format!(" ({} failed)", summary.failed.len()));
    }
    vec![String::new(), line]
}

pub fn print_run_summary(summary: &RunSummary, out_dir: &Path) {
    for line in format_run_summary(summary, out_dir) {
        println!("{}", line);
    }
}
