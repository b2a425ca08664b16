//! Verbatim copy of auxiliary assets into the output tree.
//!
//! Icons, localization folders, the manifest and vendored scripts are not
//! transformed. Each job copies one file or one directory tree; a failing job
//! is recorded and the remaining jobs still run.

use std::path::{Path, PathBuf};

use extpack_shared::{CopyOutcome, CopyReport, ExtpackError, Result};
use tracing::{debug, info, instrument, warn};
use walkdir::WalkDir;

/// One `from -> to` copy, both absolute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyJob {
    pub from: PathBuf,
    pub to: PathBuf,
}

/// Copy a file, or a directory recursively. Returns the number of files copied.
pub fn copy(from: &Path, to: &Path) -> Result<usize> {
    if !from.exists() {
        return Err(ExtpackError::copy(from, to, "source does not exist"));
    }

    if from.is_file() {
        copy_file(from, to)?;
        return Ok(1);
    }

    let mut copied = 0;
    for entry in WalkDir::new(from) {
        let entry = entry.map_err(|e| ExtpackError::copy(from, to, e.to_string()))?;
        let relative = entry
            .path()
            .strip_prefix(from)
            .map_err(|e| ExtpackError::copy(from, to, e.to_string()))?;
        let target = to.join(relative);

        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)
                .map_err(|e| ExtpackError::copy(entry.path(), &target, e.to_string()))?;
        } else {
            copy_file(entry.path(), &target)?;
            copied += 1;
        }
    }

    Ok(copied)
}

fn copy_file(from: &Path, to: &Path) -> Result<()> {
    if let Some(parent) = to.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ExtpackError::copy(from, to, e.to_string()))?;
    }
    std::fs::copy(from, to).map_err(|e| ExtpackError::copy(from, to, e.to_string()))?;
    debug!(from = %from.display(), to = %to.display(), "copied file");
    Ok(())
}

/// Run every job in order, recording each result.
#[instrument(skip_all, fields(jobs = jobs.len()))]
pub fn copy_all(jobs: &[CopyJob]) -> CopyReport {
    let mut report = CopyReport::default();

    for job in jobs {
        let outcome = match copy(&job.from, &job.to) {
            Ok(files) => {
                info!(from = %job.from.display(), to = %job.to.display(), files, "copied asset");
                CopyOutcome {
                    from: job.from.clone(),
                    to: job.to.clone(),
                    files,
                    error: None,
                }
            }
            Err(e) => {
                warn!(from = %job.from.display(), error = %e, "asset copy failed");
                CopyOutcome {
                    from: job.from.clone(),
                    to: job.to.clone(),
                    files: 0,
                    error: Some(e.to_string()),
                }
            }
        };
        report.outcomes.push(outcome);
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("extpack-assets-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn copies_single_file_verbatim() {
        let tmp = temp_dir();
        let bytes: &[u8] = &[0x89, b'P', b'N', b'G', 0x00, 0xff];
        std::fs::write(tmp.join("icon.png"), bytes).unwrap();

        let count = copy(&tmp.join("icon.png"), &tmp.join("dist/icon.png")).unwrap();
        assert_eq!(count, 1);
        assert_eq!(std::fs::read(tmp.join("dist/icon.png")).unwrap(), bytes);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn copies_directory_recursively() {
        let tmp = temp_dir();
        let locales = tmp.join("_locales");
        std::fs::create_dir_all(locales.join("en")).unwrap();
        std::fs::create_dir_all(locales.join("de")).unwrap();
        std::fs::write(locales.join("en/messages.json"), "{\"a\":1}").unwrap();
        std::fs::write(locales.join("de/messages.json"), "{\"a\":2}").unwrap();

        let count = copy(&locales, &tmp.join("dist/_locales")).unwrap();
        assert_eq!(count, 2);
        assert_eq!(
            std::fs::read_to_string(tmp.join("dist/_locales/de/messages.json")).unwrap(),
            "{\"a\":2}"
        );

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn missing_source_is_copy_error() {
        let tmp = temp_dir();
        let err = copy(&tmp.join("nope.png"), &tmp.join("dist/nope.png")).unwrap_err();
        assert!(matches!(err, ExtpackError::Copy { .. }));

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn one_failed_job_does_not_stop_others() {
        let tmp = temp_dir();
        std::fs::write(tmp.join("manifest.json"), "{}").unwrap();
        std::fs::write(tmp.join("vendor.js"), "lib()").unwrap();

        let jobs = vec![
            CopyJob {
                from: tmp.join("missing.png"),
                to: tmp.join("dist/missing.png"),
            },
            CopyJob {
                from: tmp.join("manifest.json"),
                to: tmp.join("dist/manifest.json"),
            },
            CopyJob {
                from: tmp.join("vendor.js"),
                to: tmp.join("dist/lib/vendor.js"),
            },
        ];

        let report = copy_all(&jobs);
        assert_eq!(report.outcomes.len(), 3);
        assert_eq!(report.failed(), 1);
        assert!(report.outcomes[0].is_failure());
        assert!(tmp.join("dist/manifest.json").exists());
        assert!(tmp.join("dist/lib/vendor.js").exists());

        let _ = std::fs::remove_dir_all(&tmp);
    }
}
