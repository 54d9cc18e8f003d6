//! Partial naming convention.
//!
//! A partial is addressed from templates by its file name with the configured
//! extension suffix removed:
//! - `greeting.hjs` → `greeting` (extension `.hjs`)
//! - `site.header.hjs` → `site.header`
//! - `footer.mustache` → not a partial when the extension is `.hjs`
//!
//! Matching is a plain, case-sensitive suffix test, the same as a `*<ext>`
//! glob. Hidden files (leading `.`) are never partials, which also rules out a
//! bare `.hjs` that would otherwise yield an empty name.

/// Derive the partial name for `file_name`, or `None` if the file is not a
/// partial under `extension`.
pub fn partial_name<'a>(file_name: &'a str, extension: &str) -> Option<&'a str> {
    if file_name.starts_with('.') {
        return None;
    }
    let name = file_name.strip_suffix(extension)?;
    if name.is_empty() { None } else { Some(name) }
}

/// Same as [`partial_name`] for a path, looking only at its final component.
pub fn partial_name_of_path<'a>(path: &'a std::path::Path, extension: &str) -> Option<&'a str> {
    path.file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| partial_name(n, extension))
}
