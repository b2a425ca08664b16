//! Build orchestration: config → discovery → output tree → transforms → copy.
//!
//! [`BuildOrchestrator::launch`] walks the build through its states in order
//! and returns once assets are copied. The three transform stages are started
//! before the copy and keep running on the runtime; the returned
//! [`BuildHandle`] collects their reports.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use extpack_catalog::{OutputTree, discover};
use extpack_compiler::ClosureCompiler;
use extpack_minify::{CssMinifier, HtmlMinifier, Minifier};
use extpack_shared::{
    BuildConfig, BuildReport, CopyOutcome, CopyReport, ExtpackError, FileCategory, FileOutcome,
    Result, StageReport, load_config,
};
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

use crate::assets::{self, CopyJob};
use crate::stages::{JsStage, MinifyStage};

// ---------------------------------------------------------------------------
// Progress reporting
// ---------------------------------------------------------------------------

/// Progress callback for reporting build status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called from stage tasks as each file finishes, in completion order.
    fn file_done(&self, category: FileCategory, outcome: &FileOutcome);
    /// Called once per asset copy job.
    fn copy_done(&self, outcome: &CopyOutcome);
    /// Called when every stage has reported.
    fn done(&self, report: &BuildReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn file_done(&self, _category: FileCategory, _outcome: &FileOutcome) {}
    fn copy_done(&self, _outcome: &CopyOutcome) {}
    fn done(&self, _report: &BuildReport) {}
}

// ---------------------------------------------------------------------------
// BuildState
// ---------------------------------------------------------------------------

/// Where a build is in its lifecycle. States only ever move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BuildState {
    Init,
    ConfigLoaded,
    Discovered,
    LayoutReady,
    TransformsLaunched,
    CopyComplete,
}

impl std::fmt::Display for BuildState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Init => "init",
            Self::ConfigLoaded => "config-loaded",
            Self::Discovered => "discovered",
            Self::LayoutReady => "layout-ready",
            Self::TransformsLaunched => "transforms-launched",
            Self::CopyComplete => "copy-complete",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// BuildOrchestrator
// ---------------------------------------------------------------------------

/// Drives one build from a config file. Each orchestrator launches at most once.
pub struct BuildOrchestrator {
    config_path: PathBuf,
    state: BuildState,
    progress: Arc<dyn ProgressReporter>,
    html_minifier: Option<Arc<dyn Minifier>>,
    css_minifier: Option<Arc<dyn Minifier>>,
}

/// Sources found for each stage.
struct Sources {
    html: Vec<PathBuf>,
    css: Vec<PathBuf>,
    js: Vec<PathBuf>,
}

impl BuildOrchestrator {
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            state: BuildState::Init,
            progress: Arc::new(SilentProgress),
            html_minifier: None,
            css_minifier: None,
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    /// Replace the HTML minifier built from `minifyOptions`.
    pub fn with_html_minifier(mut self, minifier: Arc<dyn Minifier>) -> Self {
        self.html_minifier = Some(minifier);
        self
    }

    /// Replace the default CSS minifier.
    pub fn with_css_minifier(mut self, minifier: Arc<dyn Minifier>) -> Self {
        self.css_minifier = Some(minifier);
        self
    }

    pub fn state(&self) -> BuildState {
        self.state
    }

    fn advance(&mut self, next: BuildState) {
        debug_assert!(next > self.state, "build state moved backwards");
        info!(from = %self.state, to = %next, "build state");
        self.state = next;
    }

    /// Run the build up to `CopyComplete`.
    ///
    /// Config, layout and capability errors abort the build and are returned.
    /// Per-file failures never are: they end up in the [`BuildReport`].
    #[instrument(skip_all, fields(config = %self.config_path.display()))]
    pub async fn launch(&mut self) -> Result<BuildHandle> {
        if self.state != BuildState::Init {
            return Err(ExtpackError::config(format!(
                "build already launched (state: {}); create a new orchestrator to build again",
                self.state
            )));
        }
        let started = Instant::now();
        let progress = self.progress.clone();

        progress.phase("Loading configuration");
        let config = load_config(&self.config_path)?;
        info!(root = %config.root_path.display(), output = %config.output_dir().display(), "config loaded");
        self.advance(BuildState::ConfigLoaded);

        let html_minifier: Arc<dyn Minifier> = match &self.html_minifier {
            Some(m) => m.clone(),
            None => Arc::new(HtmlMinifier::from_config_value(&config.minify_options)?),
        };
        let css_minifier: Arc<dyn Minifier> = match &self.css_minifier {
            Some(m) => m.clone(),
            None => Arc::new(CssMinifier),
        };
        let compiler = ClosureCompiler::new(&config.closure_compiler)?;

        progress.phase("Discovering sources");
        let found = discover_sources(&config);
        info!(
            html = found.html.len(),
            css = found.css.len(),
            js = found.js.len(),
            "sources discovered"
        );
        self.advance(BuildState::Discovered);

        progress.phase("Preparing output tree");
        if config.clean_output {
            extpack_catalog::clean(&config.output_dir())?;
        }
        let tree = extpack_catalog::prepare(
            &config.root_path,
            &config.output,
            &config.js_path,
            &config.css_path,
        )?;
        self.advance(BuildState::LayoutReady);

        progress.phase("Launching transforms");
        let html = StageHandle::spawn(
            FileCategory::Html,
            config.root_path.clone(),
            MinifyStage {
                category: FileCategory::Html,
                minifier: html_minifier,
                output_dir: tree.output_path.clone(),
                concurrency: config.file_concurrency,
            }
            .run(found.html, progress.clone()),
        );
        let css = StageHandle::spawn(
            FileCategory::Css,
            config.css_source_dir(),
            MinifyStage {
                category: FileCategory::Css,
                minifier: css_minifier,
                output_dir: tree.css_output_path.clone(),
                concurrency: config.file_concurrency,
            }
            .run(found.css, progress.clone()),
        );
        let js = StageHandle::spawn(
            FileCategory::Js,
            config.js_source_dir(),
            JsStage {
                compiler,
                exclude: config.exclude_js.clone(),
                output_dir: tree.js_output_path.clone(),
                concurrency: config.closure_compiler.concurrency,
            }
            .run(found.js, progress.clone()),
        );
        self.advance(BuildState::TransformsLaunched);

        progress.phase("Copying assets");
        let jobs = copy_jobs(&config, &tree);
        let copy = match tokio::task::spawn_blocking(move || assets::copy_all(&jobs)).await {
            Ok(report) => report,
            Err(e) => {
                warn!(error = %e, "asset copy task failed");
                CopyReport {
                    outcomes: vec![CopyOutcome {
                        from: config.root_path.clone(),
                        to: tree.output_path.clone(),
                        files: 0,
                        error: Some(format!("copy task failed: {e}")),
                    }],
                }
            }
        };
        for outcome in &copy.outcomes {
            progress.copy_done(outcome);
        }
        self.advance(BuildState::CopyComplete);

        Ok(BuildHandle {
            html,
            css,
            js,
            copy,
            progress,
            started,
        })
    }
}

fn discover_sources(config: &BuildConfig) -> Sources {
    let mode = config.extension_match;
    Sources {
        html: discover(&config.root_path, FileCategory::Html.extension(), mode),
        css: discover(&config.css_source_dir(), FileCategory::Css.extension(), mode),
        js: discover(&config.js_source_dir(), FileCategory::Js.extension(), mode),
    }
}

fn copy_jobs(config: &BuildConfig, tree: &OutputTree) -> Vec<CopyJob> {
    config
        .assets
        .iter()
        .map(|asset| CopyJob {
            from: config.root_path.join(asset.from()),
            to: tree.output_path.join(asset.to()),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// BuildHandle
// ---------------------------------------------------------------------------

struct StageHandle {
    category: FileCategory,
    source_dir: PathBuf,
    task: JoinHandle<StageReport>,
}

impl StageHandle {
    fn spawn<F>(category: FileCategory, source_dir: PathBuf, stage: F) -> Self
    where
        F: Future<Output = StageReport> + Send + 'static,
    {
        Self {
            category,
            source_dir,
            task: tokio::spawn(stage),
        }
    }

    /// A stage that died is reported as one failure against its source dir.
    async fn join(self) -> StageReport {
        match self.task.await {
            Ok(report) => report,
            Err(e) => {
                warn!(stage = %self.category, error = %e, "stage task failed");
                let mut report = StageReport::new(self.category);
                report.outcomes.push(FileOutcome::Failed {
                    source: self.source_dir,
                    error: format!("stage task failed: {e}"),
                });
                report
            }
        }
    }
}

/// Transforms still in flight after [`BuildOrchestrator::launch`] returns.
pub struct BuildHandle {
    html: StageHandle,
    css: StageHandle,
    js: StageHandle,
    copy: CopyReport,
    progress: Arc<dyn ProgressReporter>,
    started: Instant,
}

impl BuildHandle {
    /// Result of the asset copy, which finished before `launch` returned.
    pub fn copy_report(&self) -> &CopyReport {
        &self.copy
    }

    /// Whether every transform stage has finished.
    pub fn is_finished(&self) -> bool {
        self.html.task.is_finished() && self.css.task.is_finished() && self.js.task.is_finished()
    }

    /// Wait for all transform stages and assemble the build report.
    pub async fn wait(self) -> BuildReport {
        let html = self.html.join().await;
        let css = self.css.join().await;
        let js = self.js.join().await;

        let report = BuildReport {
            html,
            css,
            js,
            copy: self.copy,
        };

        info!(
            written = report.files_written(),
            skipped = report.files_skipped(),
            failures = report.failures(),
            elapsed_ms = self.started.elapsed().as_millis() as u64,
            "build finished"
        );
        self.progress.done(&report);

        report
    }
}
