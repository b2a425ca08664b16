//! Per-category transform stages.
//!
//! A stage reads each discovered file as UTF-8, transforms it, and writes the
//! result to `output_dir/<basename>`. Files are processed independently: one
//! failure is recorded and the rest continue. At most `concurrency` files are
//! in flight, and permits are taken in discovery order, so a concurrency of 1
//! makes a stage strictly sequential.

use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use extpack_compiler::ClosureCompiler;
use extpack_minify::Minifier;
use extpack_shared::{ExtpackError, FileCategory, FileOutcome, Result, StageReport};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, instrument, warn};

use crate::pipeline::ProgressReporter;

// ---------------------------------------------------------------------------
// Minify stage (HTML, CSS)
// ---------------------------------------------------------------------------

/// Minifies HTML or CSS files with a local minifier.
pub struct MinifyStage {
    pub category: FileCategory,
    pub minifier: Arc<dyn Minifier>,
    pub output_dir: PathBuf,
    pub concurrency: usize,
}

impl MinifyStage {
    #[instrument(skip_all, fields(stage = %self.category, minifier = self.minifier.name(), files = files.len()))]
    pub async fn run(self, files: Vec<PathBuf>, progress: Arc<dyn ProgressReporter>) -> StageReport {
        let Self {
            category,
            minifier,
            output_dir,
            concurrency,
        } = self;
        let output_dir = Arc::new(output_dir);

        run_bounded(
            StageReport::new(category),
            files,
            concurrency,
            progress,
            move |source| {
                let minifier = minifier.clone();
                let output_dir = output_dir.clone();
                async move {
                    let result =
                        transform_file(&source, &output_dir, |text| async move { minifier.minify(&text) })
                            .await;
                    to_outcome(source, result)
                }
            },
        )
        .await
    }
}

// ---------------------------------------------------------------------------
// JS stage
// ---------------------------------------------------------------------------

/// Compiles JavaScript files through the remote compiler, skipping excluded
/// names entirely.
pub struct JsStage {
    pub compiler: ClosureCompiler,
    pub exclude: BTreeSet<String>,
    pub output_dir: PathBuf,
    pub concurrency: usize,
}

impl JsStage {
    #[instrument(skip_all, fields(stage = "js", endpoint = %self.compiler.url(), files = files.len()))]
    pub async fn run(self, files: Vec<PathBuf>, progress: Arc<dyn ProgressReporter>) -> StageReport {
        let Self {
            compiler,
            exclude,
            output_dir,
            concurrency,
        } = self;

        let mut report = StageReport::new(FileCategory::Js);
        let mut to_compile = Vec::with_capacity(files.len());

        for source in files {
            let excluded = source
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|name| exclude.contains(name));

            if excluded {
                let outcome = FileOutcome::Skipped {
                    source,
                    reason: "listed in excludeJs".into(),
                };
                log_outcome(FileCategory::Js, &outcome);
                progress.file_done(FileCategory::Js, &outcome);
                report.outcomes.push(outcome);
            } else {
                to_compile.push(source);
            }
        }

        let compiler = Arc::new(compiler);
        let output_dir = Arc::new(output_dir);

        run_bounded(report, to_compile, concurrency, progress, move |source| {
            let compiler = compiler.clone();
            let output_dir = output_dir.clone();
            async move {
                let result =
                    transform_file(&source, &output_dir, |text| async move { compiler.compile(&text).await })
                        .await;
                to_outcome(source, result)
            }
        })
        .await
    }
}

// ---------------------------------------------------------------------------
// Shared machinery
// ---------------------------------------------------------------------------

/// Spawn one task per file, acquiring a permit in file order before each
/// spawn, then collect every outcome into `report`.
async fn run_bounded<F, Fut>(
    mut report: StageReport,
    files: Vec<PathBuf>,
    concurrency: usize,
    progress: Arc<dyn ProgressReporter>,
    work: F,
) -> StageReport
where
    F: Fn(PathBuf) -> Fut,
    Fut: Future<Output = FileOutcome> + Send + 'static,
{
    let category = report.category;
    let semaphore = Arc::new(Semaphore::new(concurrency.clamp(1, Semaphore::MAX_PERMITS)));
    let mut tasks = JoinSet::new();
    let mut sources = HashMap::new();

    for source in files {
        // The semaphore is never closed.
        let Ok(permit) = semaphore.clone().acquire_owned().await else {
            break;
        };

        let job = work(source.clone());
        let progress = progress.clone();
        let handle = tasks.spawn(async move {
            let outcome = job.await;
            drop(permit);
            log_outcome(category, &outcome);
            progress.file_done(category, &outcome);
            outcome
        });
        sources.insert(handle.id(), source);
    }

    while let Some(joined) = tasks.join_next_with_id().await {
        match joined {
            Ok((_, outcome)) => report.outcomes.push(outcome),
            Err(e) => {
                let source = sources.remove(&e.id()).unwrap_or_default();
                let outcome = FileOutcome::Failed {
                    source,
                    error: format!("task failed: {e}"),
                };
                log_outcome(category, &outcome);
                progress.file_done(category, &outcome);
                report.outcomes.push(outcome);
            }
        }
    }

    info!(
        stage = %category,
        written = report.written(),
        skipped = report.skipped(),
        failed = report.failed(),
        "stage finished"
    );

    report
}

/// Read `source`, run `transform` on its text, write to `output_dir/<basename>`.
async fn transform_file<T, Fut>(source: &Path, output_dir: &Path, transform: T) -> Result<PathBuf>
where
    T: FnOnce(String) -> Fut,
    Fut: Future<Output = Result<String>>,
{
    let file_name = source.file_name().ok_or_else(|| {
        ExtpackError::io(
            source,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no file name"),
        )
    })?;

    let text = tokio::fs::read_to_string(source)
        .await
        .map_err(|e| ExtpackError::io(source, e))?;

    let transformed = transform(text).await?;

    let dest = output_dir.join(file_name);
    tokio::fs::write(&dest, transformed)
        .await
        .map_err(|e| ExtpackError::io(&dest, e))?;

    Ok(dest)
}

fn to_outcome(source: PathBuf, result: Result<PathBuf>) -> FileOutcome {
    match result {
        Ok(dest) => FileOutcome::Written { source, dest },
        Err(e) => FileOutcome::Failed {
            source,
            error: e.to_string(),
        },
    }
}

fn log_outcome(category: FileCategory, outcome: &FileOutcome) {
    match outcome {
        FileOutcome::Written { source, dest } => {
            info!(stage = %category, source = %source.display(), dest = %dest.display(), "wrote file");
        }
        FileOutcome::Skipped { source, reason } => {
            info!(stage = %category, source = %source.display(), %reason, "skipped file");
        }
        FileOutcome::Failed { source, error } => {
            warn!(stage = %category, source = %source.display(), %error, "file failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::SilentProgress;
    use extpack_minify::CssMinifier;
    use extpack_shared::{CompilationLevel, CompilerConfig};
    use std::time::{Duration, Instant};
    use wiremock::matchers::{body_string_contains, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("extpack-stages-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(dir.join("out")).unwrap();
        dir
    }

    fn compiler_for(uri: &str) -> ClosureCompiler {
        ClosureCompiler::new(&CompilerConfig {
            url: uri.parse().unwrap(),
            level: CompilationLevel::Simple,
            concurrency: 1,
            timeout_secs: 5,
        })
        .unwrap()
    }

    /// Fails on any source containing the marker, passes others through.
    struct RejectMarker(&'static str);

    impl Minifier for RejectMarker {
        fn name(&self) -> &'static str {
            "reject-marker"
        }

        fn minify(&self, source: &str) -> Result<String> {
            if source.contains(self.0) {
                Err(ExtpackError::minify("marker found"))
            } else {
                Ok(source.trim().to_string())
            }
        }
    }

    #[tokio::test]
    async fn minify_stage_writes_basename_into_output() {
        let tmp = temp_dir();
        std::fs::write(tmp.join("a.css"), "a {\n  color: red;\n}\n").unwrap();
        std::fs::write(tmp.join("b.css"), "b {\n  margin: 0px;\n}\n").unwrap();

        let stage = MinifyStage {
            category: FileCategory::Css,
            minifier: Arc::new(CssMinifier),
            output_dir: tmp.join("out"),
            concurrency: 4,
        };
        let report = stage
            .run(vec![tmp.join("a.css"), tmp.join("b.css")], Arc::new(SilentProgress))
            .await;

        assert_eq!(report.written(), 2);
        assert_eq!(report.failed(), 0);
        assert_eq!(std::fs::read_to_string(tmp.join("out/a.css")).unwrap(), "a{color:red}");

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn huge_concurrency_still_processes_files() {
        let tmp = temp_dir();
        std::fs::write(tmp.join("a.css"), "a { color: red }").unwrap();

        let stage = MinifyStage {
            category: FileCategory::Css,
            minifier: Arc::new(CssMinifier),
            output_dir: tmp.join("out"),
            concurrency: usize::MAX,
        };
        let report = stage.run(vec![tmp.join("a.css")], Arc::new(SilentProgress)).await;

        assert_eq!(report.written(), 1);
        assert_eq!(report.failed(), 0);
        assert!(tmp.join("out/a.css").exists());

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn one_bad_file_does_not_stop_the_stage() {
        let tmp = temp_dir();
        std::fs::write(tmp.join("good.html"), "<p>ok</p>").unwrap();
        std::fs::write(tmp.join("bad.html"), "<p>BROKEN</p>").unwrap();
        std::fs::write(tmp.join("latin1.html"), b"<p>caf\xe9\xff</p>").unwrap();

        let stage = MinifyStage {
            category: FileCategory::Html,
            minifier: Arc::new(RejectMarker("BROKEN")),
            output_dir: tmp.join("out"),
            concurrency: 2,
        };
        let report = stage
            .run(
                vec![tmp.join("bad.html"), tmp.join("latin1.html"), tmp.join("good.html")],
                Arc::new(SilentProgress),
            )
            .await;

        assert_eq!(report.outcomes.len(), 3);
        assert_eq!(report.written(), 1);
        assert_eq!(report.failed(), 2);
        assert!(tmp.join("out/good.html").exists());
        assert!(!tmp.join("out/bad.html").exists());
        assert!(!tmp.join("out/latin1.html").exists());

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn js_stage_skips_excluded_without_request() {
        let tmp = temp_dir();
        std::fs::write(tmp.join("app.js"), "var app = 1;").unwrap();
        std::fs::write(tmp.join("vendor.js"), "var VENDOR_LIB = 1;").unwrap();

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("VENDOR_LIB"))
            .respond_with(ResponseTemplate::new(200).set_body_string("vendor();"))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_string_contains("app"))
            .respond_with(ResponseTemplate::new(200).set_body_string("var app=1;"))
            .expect(1)
            .mount(&server)
            .await;

        let stage = JsStage {
            compiler: compiler_for(&server.uri()),
            exclude: BTreeSet::from(["vendor.js".to_string()]),
            output_dir: tmp.join("out"),
            concurrency: 1,
        };
        let report = stage
            .run(vec![tmp.join("app.js"), tmp.join("vendor.js")], Arc::new(SilentProgress))
            .await;

        assert_eq!(report.written(), 1);
        assert_eq!(report.skipped(), 1);
        assert_eq!(std::fs::read_to_string(tmp.join("out/app.js")).unwrap(), "var app=1;");
        assert!(!tmp.join("out/vendor.js").exists());

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn js_stage_continues_after_remote_failure() {
        let tmp = temp_dir();
        std::fs::write(tmp.join("first.js"), "var FAILS = 1;").unwrap();
        std::fs::write(tmp.join("second.js"), "var works = 2;").unwrap();

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("FAILS"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_string_contains("works"))
            .respond_with(ResponseTemplate::new(200).set_body_string("var works=2;"))
            .mount(&server)
            .await;

        let stage = JsStage {
            compiler: compiler_for(&server.uri()),
            exclude: BTreeSet::new(),
            output_dir: tmp.join("out"),
            concurrency: 1,
        };
        let report = stage
            .run(vec![tmp.join("first.js"), tmp.join("second.js")], Arc::new(SilentProgress))
            .await;

        assert_eq!(report.failed(), 1);
        assert_eq!(report.written(), 1);
        assert!(!tmp.join("out/first.js").exists());
        assert!(tmp.join("out/second.js").exists());

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn js_stage_with_one_permit_is_sequential_and_ordered() {
        let tmp = temp_dir();
        let names = ["one.js", "two.js", "three.js"];
        for name in names {
            std::fs::write(tmp.join(name), format!("var n = '{name}';")).unwrap();
        }

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("var n;")
                    .set_delay(Duration::from_millis(150)),
            )
            .expect(3)
            .mount(&server)
            .await;

        let stage = JsStage {
            compiler: compiler_for(&server.uri()),
            exclude: BTreeSet::new(),
            output_dir: tmp.join("out"),
            concurrency: 1,
        };

        let files: Vec<PathBuf> = names.iter().map(|n| tmp.join(n)).collect();
        let started = Instant::now();
        let report = stage.run(files.clone(), Arc::new(SilentProgress)).await;

        assert!(started.elapsed() >= Duration::from_millis(450));
        let order: Vec<&PathBuf> = report.outcomes.iter().map(FileOutcome::source).collect();
        assert_eq!(order, files.iter().collect::<Vec<_>>());

        let _ = std::fs::remove_dir_all(&tmp);
    }
}
