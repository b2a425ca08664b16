//! Source file discovery and output tree layout.
//!
//! [`discover`] lists the files of one category in a single directory.
//! [`layout::prepare`] creates the output root and the mirrored js/css
//! subdirectories the transform stages write into.

pub mod layout;

use std::path::{Path, PathBuf};

use extpack_shared::ExtensionMatch;
use tracing::{debug, instrument, warn};

pub use layout::{OutputTree, clean, prepare};

/// List the files directly inside `directory` whose path matches `filter`.
///
/// The match runs against the full joined path string, so with
/// [`ExtensionMatch::Contains`] a `.js` filter also picks up `data.json`, and a
/// directory name containing the filter matches every file in it.
/// Subdirectories are neither returned nor descended into. Results come back in
/// directory-listing order.
///
/// A missing or unreadable directory yields an empty list and a warning.
#[instrument(skip_all, fields(dir = %directory.display(), filter = %filter))]
pub fn discover(directory: &Path, filter: &str, mode: ExtensionMatch) -> Vec<PathBuf> {
    if !directory.exists() {
        warn!(dir = %directory.display(), "no directory found, skipping");
        return Vec::new();
    }

    let entries = match std::fs::read_dir(directory) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %directory.display(), error = %e, "cannot list directory, skipping");
            return Vec::new();
        }
    };

    let mut files = Vec::new();

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!(error = %e, "unreadable directory entry");
                continue;
            }
        };

        let path = directory.join(entry.file_name());
        if !mode.matches(&path.to_string_lossy(), filter) {
            continue;
        }

        // Follows symlinks, so a linked file still counts.
        if !path.is_file() {
            debug!(path = %path.display(), "matched a non-file entry, ignoring");
            continue;
        }

        files.push(path);
    }

    debug!(count = files.len(), "discovery complete");
    files
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("extpack-catalog-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn touch(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), "x").unwrap();
    }

    fn names(paths: &[PathBuf]) -> Vec<String> {
        let mut names: Vec<String> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn missing_directory_is_empty() {
        let dir = std::env::temp_dir().join(format!("extpack-catalog-missing-{}", uuid::Uuid::now_v7()));
        assert!(discover(&dir, ".js", ExtensionMatch::Contains).is_empty());
    }

    #[test]
    fn contains_match_is_substring() {
        let dir = temp_dir();
        touch(&dir, "app.js");
        touch(&dir, "data.json");
        touch(&dir, "style.css");

        let found = discover(&dir, ".js", ExtensionMatch::Contains);
        assert_eq!(names(&found), vec!["app.js", "data.json"]);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn suffix_match_is_strict() {
        let dir = temp_dir();
        touch(&dir, "app.js");
        touch(&dir, "data.json");

        let found = discover(&dir, ".js", ExtensionMatch::Suffix);
        assert_eq!(names(&found), vec!["app.js"]);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn returns_paths_under_directory() {
        let dir = temp_dir();
        touch(&dir, "index.html");
        touch(&dir, "popup.html");

        let found = discover(&dir, ".html", ExtensionMatch::Contains);
        assert_eq!(found.len(), 2);
        for path in &found {
            assert!(path.starts_with(&dir));
            assert!(path.to_string_lossy().contains(".html"));
        }

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn does_not_recurse() {
        let dir = temp_dir();
        touch(&dir, "top.js");
        let nested = dir.join("nested");
        std::fs::create_dir_all(&nested).unwrap();
        touch(&nested, "deep.js");
        std::fs::create_dir_all(dir.join("folder.js")).unwrap();

        let found = discover(&dir, ".js", ExtensionMatch::Contains);
        assert_eq!(names(&found), vec!["top.js"]);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn deterministic_for_unchanged_directory() {
        let dir = temp_dir();
        for name in ["a.css", "b.css", "c.css"] {
            touch(&dir, name);
        }

        let first = discover(&dir, ".css", ExtensionMatch::Contains);
        let second = discover(&dir, ".css", ExtensionMatch::Contains);
        assert_eq!(first, second);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
