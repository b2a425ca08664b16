//! Build configuration for extpack.
//!
//! The build is driven by a single JSON file (`config.json` by default).
//! It is parsed into a typed [`BuildConfig`], validated once, and then shared
//! read-only with every stage.

use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{ExtpackError, Result};

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "config.json";

/// Upper bound for `fileConcurrency` and `closureCompiler.concurrency`.
pub const MAX_CONCURRENCY: usize = 1024;

// ---------------------------------------------------------------------------
// Config structs (matching config.json schema)
// ---------------------------------------------------------------------------

/// Top-level build config, deserialized from JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildConfig {
    /// Project root. Relative roots are resolved against the config file's directory.
    pub root_path: PathBuf,

    /// JavaScript sources, relative to `root_path`. Mirrored under the output root.
    pub js_path: PathBuf,

    /// Stylesheets, relative to `root_path`. Mirrored under the output root.
    pub css_path: PathBuf,

    /// Output root, relative to `root_path`.
    pub output: PathBuf,

    /// Bare file names skipped by the JS stage.
    pub exclude_js: BTreeSet<String>,

    /// Options handed to the HTML minifier untouched.
    pub minify_options: serde_json::Value,

    /// Remote compiler service settings.
    pub closure_compiler: CompilerConfig,

    /// Max files in flight per HTML/CSS stage.
    #[serde(default = "default_file_concurrency")]
    pub file_concurrency: usize,

    /// How discovered paths are matched against an extension filter.
    #[serde(default)]
    pub extension_match: ExtensionMatch,

    /// Remove the output root before building.
    #[serde(default)]
    pub clean_output: bool,

    /// Files and directories copied verbatim into the output root.
    #[serde(default = "default_assets")]
    pub assets: Vec<AssetEntry>,
}

/// `closureCompiler` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompilerConfig {
    /// Endpoint receiving the form-encoded compile request.
    pub url: Url,

    /// Optimization level requested from the service.
    pub level: CompilationLevel,

    /// Max compile requests in flight. 1 keeps requests strictly sequential.
    #[serde(default = "default_compile_concurrency")]
    pub concurrency: usize,

    /// Per-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Compilation level understood by the compiler service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompilationLevel {
    WhitespaceOnly,
    Simple,
    Advanced,
}

impl CompilationLevel {
    /// Wire value sent as `compilation_level`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WhitespaceOnly => "WHITESPACE_ONLY",
            Self::Simple => "SIMPLE",
            Self::Advanced => "ADVANCED",
        }
    }
}

impl std::fmt::Display for CompilationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Matching policy for extension filters during discovery.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtensionMatch {
    /// The full path contains the filter anywhere (`.js` also matches `a.json`).
    #[default]
    Contains,
    /// The full path ends with the filter.
    Suffix,
}

impl ExtensionMatch {
    /// Check a path string against `filter` under this policy.
    pub fn matches(&self, path: &str, filter: &str) -> bool {
        match self {
            Self::Contains => path.contains(filter),
            Self::Suffix => path.ends_with(filter),
        }
    }
}

/// One copy job. A bare string copies to the same relative location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AssetEntry {
    Same(PathBuf),
    Mapped { from: PathBuf, to: PathBuf },
}

impl AssetEntry {
    /// Source path, relative to the project root.
    pub fn from(&self) -> &Path {
        match self {
            Self::Same(path) => path,
            Self::Mapped { from, .. } => from,
        }
    }

    /// Destination path, relative to the output root.
    pub fn to(&self) -> &Path {
        match self {
            Self::Same(path) => path,
            Self::Mapped { to, .. } => to,
        }
    }
}

fn default_file_concurrency() -> usize {
    8
}
fn default_compile_concurrency() -> usize {
    1
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_assets() -> Vec<AssetEntry> {
    ["manifest.json", "icon.png", "_locales"]
        .into_iter()
        .map(|p| AssetEntry::Same(PathBuf::from(p)))
        .collect()
}

// ---------------------------------------------------------------------------
// Resolved paths
// ---------------------------------------------------------------------------

impl BuildConfig {
    /// Directory holding JavaScript sources.
    pub fn js_source_dir(&self) -> PathBuf {
        self.root_path.join(&self.js_path)
    }

    /// Directory holding stylesheet sources.
    pub fn css_source_dir(&self) -> PathBuf {
        self.root_path.join(&self.css_path)
    }

    /// Output root directory.
    pub fn output_dir(&self) -> PathBuf {
        self.root_path.join(&self.output)
    }

    /// Whether a JS file with this bare name is excluded from compilation.
    pub fn is_excluded_js(&self, file_name: &str) -> bool {
        self.exclude_js.contains(file_name)
    }

    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<()> {
        check_relative("jsPath", &self.js_path)?;
        check_relative("cssPath", &self.css_path)?;
        check_relative("output", &self.output)?;

        if self
            .output
            .components()
            .all(|c| matches!(c, Component::CurDir))
        {
            return Err(ExtpackError::config(
                "output must name a directory below rootPath",
            ));
        }

        if self.clean_output {
            let output = normalized(&self.output);
            for (key, source) in [("jsPath", &self.js_path), ("cssPath", &self.css_path)] {
                let source = normalized(source);
                let inside_source = !source.as_os_str().is_empty() && output.starts_with(&source);
                if source.starts_with(&output) || inside_source {
                    return Err(ExtpackError::config(format!(
                        "cleanOutput would delete {key}; output and {key} must not contain one another"
                    )));
                }
            }
        }

        if !self.minify_options.is_object() {
            return Err(ExtpackError::config("minifyOptions must be a JSON object"));
        }

        let scheme = self.closure_compiler.url.scheme();
        if scheme != "http" && scheme != "https" {
            return Err(ExtpackError::config(format!(
                "closureCompiler.url must be http or https, got '{scheme}'"
            )));
        }

        if self.closure_compiler.concurrency == 0 {
            return Err(ExtpackError::config(
                "closureCompiler.concurrency must be at least 1",
            ));
        }
        if self.closure_compiler.timeout_secs == 0 {
            return Err(ExtpackError::config(
                "closureCompiler.timeoutSecs must be at least 1",
            ));
        }
        if self.closure_compiler.concurrency > MAX_CONCURRENCY {
            return Err(ExtpackError::config(format!(
                "closureCompiler.concurrency must be at most {MAX_CONCURRENCY}"
            )));
        }
        if self.file_concurrency == 0 {
            return Err(ExtpackError::config("fileConcurrency must be at least 1"));
        }
        if self.file_concurrency > MAX_CONCURRENCY {
            return Err(ExtpackError::config(format!(
                "fileConcurrency must be at most {MAX_CONCURRENCY}"
            )));
        }

        for asset in &self.assets {
            check_relative("assets[].from", asset.from())?;
            check_relative("assets[].to", asset.to())?;
        }

        Ok(())
    }
}

/// Lexical form of a relative path with `.` components dropped, so `./js`,
/// `js/.` and `js/` all compare equal to `js`.
fn normalized(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

/// Reject absolute paths and `..` components.
fn check_relative(key: &str, path: &Path) -> Result<()> {
    if path.is_absolute() || path.has_root() {
        return Err(ExtpackError::config(format!(
            "{key} must be relative, got {}",
            path.display()
        )));
    }
    if path.components().any(|c| matches!(c, Component::ParentDir)) {
        return Err(ExtpackError::config(format!(
            "{key} must not contain '..', got {}",
            path.display()
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Load and validate the build config from a specific file path.
pub fn load_config(path: &Path) -> Result<BuildConfig> {
    if !path.exists() {
        return Err(ExtpackError::config(format!(
            "config file not found: {}",
            path.display()
        )));
    }

    let content = std::fs::read_to_string(path).map_err(|e| {
        ExtpackError::config(format!("failed to read {}: {e}", path.display()))
    })?;

    let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
    let config = parse_config(&content, base_dir).map_err(|e| match e {
        ExtpackError::Config { message } => {
            ExtpackError::config(format!("{}: {message}", path.display()))
        }
        other => other,
    })?;

    tracing::debug!(
        path = %path.display(),
        root = %config.root_path.display(),
        "config loaded"
    );

    Ok(config)
}

/// Parse and validate config JSON. A relative `rootPath` is joined onto `base_dir`
/// and made absolute.
pub fn parse_config(content: &str, base_dir: &Path) -> Result<BuildConfig> {
    let mut config: BuildConfig = serde_json::from_str(content)
        .map_err(|e| ExtpackError::config(format!("invalid config: {e}")))?;

    if config.root_path.is_relative() {
        let joined = base_dir.join(&config.root_path);
        config.root_path = std::path::absolute(&joined).map_err(|e| {
            ExtpackError::config(format!("cannot resolve rootPath {}: {e}", joined.display()))
        })?;
    }

    config.validate()?;
    Ok(config)
}
