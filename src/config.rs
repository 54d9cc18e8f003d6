//! Render configuration.
//!
//! Resolves caller-supplied options into the immutable [`RenderConfig`] used
//! for the lifetime of one pipeline run. Every recognized option is optional;
//! anything left out falls back to its stock default.
//!
//! ## Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! tmpl_path = "./src/tmpl"   # Directory scanned for partials
//! tmpl_extension = ".hjs"    # Partial file suffix, stripped to name partials
//!
//! [data]                     # Render context passed to every template
//! name = "World"
//! ```
//!
//! The camel-case spellings `tmplPath` and `tmplExtension` are accepted too.
//! Unrecognized keys are kept in [`RenderOptions::extra`] and otherwise
//! ignored, so option files can be shared with other build tools.
//!
//! ## Layering
//!
//! The CLI stacks option sources with [`RenderOptions::merge`]:
//!
//! ```text
//! stock defaults
//!   ← tmpl-render.toml (or --config FILE)
//!   ← --data FILE
//!   ← --tmpl-path / --tmpl-extension flags
//! ```
//!
//! Scalar options in a later layer replace earlier ones. `data` objects are
//! merged key by key, recursively.

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Conventional options file name looked up in the working directory.
pub const CONFIG_FILENAME: &str = "tmpl-render.toml";

pub const DEFAULT_TMPL_PATH: &str = "./src/tmpl";
pub const DEFAULT_TMPL_EXTENSION: &str = ".hjs";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Caller-supplied options. Any field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Render context for every template.
    pub data: Option<Value>,
    /// Directory scanned for partial files.
    #[serde(alias = "tmplPath")]
    pub tmpl_path: Option<PathBuf>,
    /// Suffix identifying partial files.
    #[serde(alias = "tmplExtension")]
    pub tmpl_extension: Option<String>,
    /// Unrecognized keys, passed through unused.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl RenderOptions {
    /// Layer `overlay` on top of `self`.
    pub fn merge(self, overlay: RenderOptions) -> RenderOptions {
        let data = match (self.data, overlay.data) {
            (Some(base), Some(over)) => Some(merge_values(base, over)),
            (base, over) => over.or(base),
        };
        let mut extra = self.extra;
        extra.extend(overlay.extra);
        RenderOptions {
            data,
            tmpl_path: overlay.tmpl_path.or(self.tmpl_path),
            tmpl_extension: overlay.tmpl_extension.or(self.tmpl_extension),
            extra,
        }
    }

    /// Fill every unspecified option with its default.
    pub fn resolve(self) -> RenderConfig {
        RenderConfig {
            data: self.data.unwrap_or_else(default_data),
            tmpl_path: self
                .tmpl_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_TMPL_PATH)),
            tmpl_extension: self
                .tmpl_extension
                .unwrap_or_else(|| DEFAULT_TMPL_EXTENSION.to_string()),
        }
    }
}

/// Fully resolved configuration. Read-only once a run starts.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    pub data: Value,
    pub tmpl_path: PathBuf,
    pub tmpl_extension: String,
}

fn default_data() -> Value {
    Value::Object(serde_json::Map::new())
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderOptions::default().resolve()
    }
}

impl From<RenderOptions> for RenderConfig {
    fn from(options: RenderOptions) -> Self {
        options.resolve()
    }
}

/// Resolve possibly-absent caller options.
pub fn resolve(options: Option<RenderOptions>) -> RenderConfig {
    options.unwrap_or_default().resolve()
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Objects are merged key-by-key (overlay keys override base keys).
/// - Non-object values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_values(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_val) in overlay_map {
                let merged = match base_map.remove(&key) {
                    Some(base_val) => merge_values(base_val, overlay_val),
                    None => overlay_val,
                };
                base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }
        (_, overlay) => overlay,
    }
}

fn read(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Load options from a TOML file.
pub fn load_options(path: &Path) -> Result<RenderOptions, ConfigError> {
    let content = read(path)?;
    Ok(toml::from_str(&content)?)
}

/// Load `tmpl-render.toml` from a directory.
///
/// Returns `Ok(None)` if the directory has no options file.
pub fn load_options_from_dir(dir: &Path) -> Result<Option<RenderOptions>, ConfigError> {
    let path = dir.join(CONFIG_FILENAME);
    if !path.exists() {
        return Ok(None);
    }
    load_options(&path).map(Some)
}

/// Load a render context from a `.toml` or `.json` file.
///
/// Files with any other extension are parsed as JSON.
pub fn load_data_file(path: &Path) -> Result<Value, ConfigError> {
    let content = read(path)?;
    let is_toml = path
        .extension()
        .map(|e| e.eq_ignore_ascii_case("toml"))
        .unwrap_or(false);
    if is_toml {
        Ok(toml::from_str(&content)?)
    } else {
        Ok(serde_json::from_str(&content)?)
    }
}

/// Resolve the effective worker count.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)`, never less than one
pub fn effective_threads(jobs: Option<usize>) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    jobs.map(|n| n.clamp(1, cores)).unwrap_or(cores)
}

/// Returns a fully-commented stock options file.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# tmpl-render options
# ===================
# All settings are optional. Values shown below are the defaults.
# Save as tmpl-render.toml in the directory you run tmpl-render from,
# or pass it explicitly with --config.

# Directory scanned for partial templates. Only files directly inside this
# directory are considered; subdirectories are not searched.
tmpl_path = "./src/tmpl"

# Suffix identifying partial files. It is stripped from the file name to get
# the partial's name: header.hjs is rendered with {{> header}}.
tmpl_extension = ".hjs"

# Render context passed to every template. Values can be overridden or
# extended with --data FILE (JSON or TOML).
[data]
# title = "My site"
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn absent_options_resolve_to_defaults() {
        let config = resolve(None);
        assert_eq!(config.data, json!({}));
        assert_eq!(config.tmpl_path, PathBuf::from("./src/tmpl"));
        assert_eq!(config.tmpl_extension, ".hjs");
    }

    #[test]
    fn partial_options_keep_other_defaults() {
        let config = RenderOptions {
            tmpl_path: Some("./tmpl".into()),
            ..Default::default()
        }
        .resolve();
        assert_eq!(config.tmpl_path, PathBuf::from("./tmpl"));
        assert_eq!(config.tmpl_extension, ".hjs");
        assert_eq!(config.data, json!({}));
    }

    #[test]
    fn parse_snake_case_options() {
        let toml = r#"
tmpl_path = "views/partials"
tmpl_extension = ".mustache"

[data]
name = "World"
"#;
        let options: RenderOptions = toml::from_str(toml).unwrap();
        let config = options.resolve();
        assert_eq!(config.tmpl_path, PathBuf::from("views/partials"));
        assert_eq!(config.tmpl_extension, ".mustache");
        assert_eq!(config.data, json!({"name": "World"}));
    }

    #[test]
    fn parse_camel_case_options() {
        let options: RenderOptions = serde_json::from_value(json!({
            "data": {"name": "World"},
            "tmplPath": "./tmpl",
            "tmplExtension": ".hjs"
        }))
        .unwrap();
        assert_eq!(options.tmpl_path, Some(PathBuf::from("./tmpl")));
        assert_eq!(options.tmpl_extension.as_deref(), Some(".hjs"));
    }

    #[test]
    fn unknown_keys_pass_through() {
        let toml = r#"
tmpl_path = "tmpl"
minify = true
"#;
        let options: RenderOptions = toml::from_str(toml).unwrap();
        assert_eq!(options.extra.get("minify"), Some(&json!(true)));
        assert_eq!(options.resolve().tmpl_path, PathBuf::from("tmpl"));
    }

    // =========================================================================
    // merge tests
    // =========================================================================

    #[test]
    fn merge_overlay_scalars_win() {
        let base = RenderOptions {
            tmpl_path: Some("a".into()),
            tmpl_extension: Some(".hjs".into()),
            ..Default::default()
        };
        let overlay = RenderOptions {
            tmpl_path: Some("b".into()),
            ..Default::default()
        };
        let merged = base.merge(overlay);
        assert_eq!(merged.tmpl_path, Some(PathBuf::from("b")));
        assert_eq!(merged.tmpl_extension.as_deref(), Some(".hjs"));
    }

    #[test]
    fn merge_data_is_deep() {
        let base = RenderOptions {
            data: Some(json!({"site": {"title": "A", "lang": "en"}, "year": 2020})),
            ..Default::default()
        };
        let overlay = RenderOptions {
            data: Some(json!({"site": {"title": "B"}})),
            ..Default::default()
        };
        let merged = base.merge(overlay);
        assert_eq!(
            merged.data,
            Some(json!({"site": {"title": "B", "lang": "en"}, "year": 2020}))
        );
    }

    #[test]
    fn merge_keeps_base_data_when_overlay_has_none() {
        let base = RenderOptions {
            data: Some(json!({"a": 1})),
            ..Default::default()
        };
        let merged = base.merge(RenderOptions::default());
        assert_eq!(merged.data, Some(json!({"a": 1})));
    }

    #[test]
    fn merge_values_non_object_replaces() {
        let merged = merge_values(json!({"list": [1, 2]}), json!({"list": [3]}));
        assert_eq!(merged, json!({"list": [3]}));
    }

    // =========================================================================
    // file loading tests
    // =========================================================================

    #[test]
    fn load_options_from_dir_returns_none_when_missing() {
        let tmp = TempDir::new().unwrap();
        assert!(load_options_from_dir(tmp.path()).unwrap().is_none());
    }

    #[test]
    fn load_options_from_dir_reads_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILENAME),
            "tmplExtension = \".tpl\"\n",
        )
        .unwrap();
        let options = load_options_from_dir(tmp.path()).unwrap().unwrap();
        assert_eq!(options.tmpl_extension.as_deref(), Some(".tpl"));
    }

    #[test]
    fn load_options_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILENAME);
        fs::write(&path, "this is not valid toml [[[").unwrap();
        assert!(matches!(load_options(&path), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn load_options_missing_file_names_path() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nope.toml");
        let err = load_options(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
        assert!(err.to_string().contains("nope.toml"));
    }

    #[test]
    fn load_data_file_json() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("data.json");
        fs::write(&path, r#"{"name": "World", "items": [1, 2]}"#).unwrap();
        assert_eq!(
            load_data_file(&path).unwrap(),
            json!({"name": "World", "items": [1, 2]})
        );
    }

    #[test]
    fn load_data_file_toml() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("data.toml");
        fs::write(&path, "name = \"World\"\n[site]\ntitle = \"Home\"\n").unwrap();
        assert_eq!(
            load_data_file(&path).unwrap(),
            json!({"name": "World", "site": {"title": "Home"}})
        );
    }

    #[test]
    fn load_data_file_invalid_json_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("data.json");
        fs::write(&path, "{ nope").unwrap();
        assert!(matches!(load_data_file(&path), Err(ConfigError::Json(_))));
    }

    #[test]
    fn stock_config_parses_to_defaults() {
        let options: RenderOptions = toml::from_str(stock_config_toml()).unwrap();
        assert_eq!(options.resolve(), RenderConfig::default());
    }

    // =========================================================================
    // worker count tests
    // =========================================================================

    #[test]
    fn effective_threads_auto() {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_threads(None), cores);
    }

    #[test]
    fn effective_threads_clamped_to_cores() {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_threads(Some(99999)), cores);
    }

    #[test]
    fn effective_threads_user_constrains_down() {
        assert_eq!(effective_threads(Some(1)), 1);
        assert_eq!(effective_threads(Some(0)), 1);
    }
}
