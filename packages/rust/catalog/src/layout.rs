//! Output tree layout.
//!
//! ```text
//! <rootPath>/<output>/           minified HTML
//! <rootPath>/<output>/<jsPath>/  compiled JS
//! <rootPath>/<output>/<cssPath>/ minified CSS
//! ```

use std::path::{Path, PathBuf};

use extpack_shared::{ExtpackError, Result};
use tracing::{debug, info, instrument};

/// Destination directories for one build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTree {
    pub output_path: PathBuf,
    pub js_output_path: PathBuf,
    pub css_output_path: PathBuf,
}

/// Create the output root and its js/css subdirectories.
///
/// Existing directories are left as they are, including any files a previous
/// run wrote into them.
#[instrument(skip_all, fields(root = %root_path.display()))]
pub fn prepare(
    root_path: &Path,
    output_dir: &Path,
    js_dir: &Path,
    css_dir: &Path,
) -> Result<OutputTree> {
    let output_path = root_path.join(output_dir);
    let tree = OutputTree {
        js_output_path: output_path.join(js_dir),
        css_output_path: output_path.join(css_dir),
        output_path,
    };

    for dir in [&tree.output_path, &tree.js_output_path, &tree.css_output_path] {
        std::fs::create_dir_all(dir).map_err(|e| ExtpackError::io(dir, e))?;
    }

    debug!(path = %tree.output_path.display(), "output tree ready");
    Ok(tree)
}

/// Remove a previous output root entirely. A missing directory is not an error.
pub fn clean(output_path: &Path) -> Result<()> {
    if !output_path.exists() {
        return Ok(());
    }
    std::fs::remove_dir_all(output_path).map_err(|e| ExtpackError::io(output_path, e))?;
    info!(path = %output_path.display(), "removed previous output");
    Ok(())
}
