//! Report types shared by the build stages.

use std::path::PathBuf;

use serde::Serialize;

// ---------------------------------------------------------------------------
// FileCategory
// ---------------------------------------------------------------------------

/// Which transform stage a source file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileCategory {
    Html,
    Css,
    Js,
}

impl FileCategory {
    /// Extension filter used to discover files of this category.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Html => ".html",
            Self::Css => ".css",
            Self::Js => ".js",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Css => "css",
            Self::Js => "js",
        }
    }
}

impl std::fmt::Display for FileCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Per-file outcomes
// ---------------------------------------------------------------------------

/// What happened to a single source file in a transform stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum FileOutcome {
    /// Transformed and written.
    Written { source: PathBuf, dest: PathBuf },
    /// Deliberately not processed (no read, no write).
    Skipped { source: PathBuf, reason: String },
    /// Read, transform, or write failed; nothing was written for it.
    Failed { source: PathBuf, error: String },
}

impl FileOutcome {
    /// Source file this outcome refers to.
    pub fn source(&self) -> &PathBuf {
        match self {
            Self::Written { source, .. }
            | Self::Skipped { source, .. }
            | Self::Failed { source, .. } => source,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Outcomes of one transform stage, in completion order.
#[derive(Debug, Clone, Serialize)]
pub struct StageReport {
    pub category: FileCategory,
    pub outcomes: Vec<FileOutcome>,
}

impl StageReport {
    pub fn new(category: FileCategory) -> Self {
        Self {
            category,
            outcomes: Vec::new(),
        }
    }

    pub fn written(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Written { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Skipped { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(FileOutcome::is_failure)
    }

    fn count(&self, pred: impl Fn(&FileOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(*o)).count()
    }
}

// ---------------------------------------------------------------------------
// Asset copy outcomes
// ---------------------------------------------------------------------------

/// Result of a single asset copy job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CopyOutcome {
    pub from: PathBuf,
    pub to: PathBuf,
    /// Number of files copied (1 for a single file).
    pub files: usize,
    /// Error message when the job failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CopyOutcome {
    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

/// Outcomes of the asset copy step, in job order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CopyReport {
    pub outcomes: Vec<CopyOutcome>,
}

impl CopyReport {
    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failure()).count()
    }
}

// ---------------------------------------------------------------------------
// BuildReport
// ---------------------------------------------------------------------------

/// Aggregate result of a finished build.
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    pub html: StageReport,
    pub css: StageReport,
    pub js: StageReport,
    pub copy: CopyReport,
}

impl BuildReport {
    /// All three stage reports.
    pub fn stages(&self) -> [&StageReport; 3] {
        [&self.html, &self.css, &self.js]
    }

    pub fn files_written(&self) -> usize {
        self.stages().iter().map(|s| s.written()).sum()
    }

    pub fn files_skipped(&self) -> usize {
        self.stages().iter().map(|s| s.skipped()).sum()
    }

    /// Failed files plus failed copy jobs.
    pub fn failures(&self) -> usize {
        self.stages().iter().map(|s| s.failed()).sum::<usize>() + self.copy.failed()
    }

    pub fn is_success(&self) -> bool {
        self.failures() == 0
    }
}
