//! CLI definition, tracing setup, and the build command.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr, eyre};
use extpack_core::{BuildOrchestrator, ProgressReporter};
use extpack_shared::{BuildReport, CopyOutcome, DEFAULT_CONFIG_FILE, FileCategory, FileOutcome};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// extpack: build a browser extension's static assets.
#[derive(Parser)]
#[command(
    name = "extpack",
    version,
    about = "Minify HTML/CSS, compile JavaScript remotely, and copy extension assets into an output tree.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Build configuration file.
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE, env = "EXTPACK_CONFIG")]
    pub config: PathBuf,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text")]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "extpack=info",
        1 => "extpack=debug",
        _ => "extpack=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Build command
// ---------------------------------------------------------------------------

/// Run one build and print its summary. Fails when any file or asset failed.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let started = Instant::now();
    info!(config = %cli.config.display(), "starting build");

    let reporter = Arc::new(CliProgress::new());
    let mut orchestrator = BuildOrchestrator::new(&cli.config).with_progress(reporter.clone());

    let handle = match orchestrator.launch().await {
        Ok(handle) => handle,
        Err(e) => {
            reporter.abandon();
            return Err(e).wrap_err_with(|| {
                format!(
                    "build stopped at state '{}' ({})",
                    orchestrator.state(),
                    cli.config.display()
                )
            });
        }
    };

    let report = handle.wait().await;
    print_summary(&report, started);

    match report.failures() {
        0 => Ok(()),
        n => Err(eyre!("build finished with {n} failure(s)")),
    }
}

fn print_summary(report: &BuildReport, started: Instant) {
    println!();
    for stage in report.stages() {
        println!(
            "  {:<5} {} written, {} skipped, {} failed",
            stage.category.label(),
            stage.written(),
            stage.skipped(),
            stage.failed()
        );
    }
    let copied: usize = report.copy.outcomes.iter().map(|o| o.files).sum();
    println!(
        "  {:<5} {} files from {} entries, {} failed",
        "copy",
        copied,
        report.copy.outcomes.len(),
        report.copy.failed()
    );
    println!("  Time:  {:.1}s", started.elapsed().as_secs_f64());
    println!();
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// Spinner for the current phase plus one printed line per file and asset.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn abandon(&self) {
        self.spinner.finish_and_clear();
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn file_done(&self, category: FileCategory, outcome: &FileOutcome) {
        let category = category.label();
        let line = match outcome {
            FileOutcome::Written { source, dest } => {
                format!("  ok    {category:<4} {} -> {}", file_name(source), dest.display())
            }
            FileOutcome::Skipped { source, reason } => {
                format!("  skip  {category:<4} {} ({reason})", file_name(source))
            }
            FileOutcome::Failed { source, error } => {
                format!("  FAIL  {category:<4} {}: {error}", file_name(source))
            }
        };
        self.spinner.println(line);
    }

    fn copy_done(&self, outcome: &CopyOutcome) {
        let line = match &outcome.error {
            None => format!(
                "  ok    copy {} -> {} ({} files)",
                file_name(&outcome.from),
                outcome.to.display(),
                outcome.files
            ),
            Some(error) => format!("  FAIL  copy {}: {error}", file_name(&outcome.from)),
        };
        self.spinner.println(line);
    }

    fn done(&self, _report: &BuildReport) {
        self.spinner.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_config_json() {
        let cli = Cli::try_parse_from(["extpack"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("config.json"));
        assert_eq!(cli.verbose, 0);
        assert!(matches!(cli.log_format, LogFormat::Text));
    }

    #[test]
    fn parses_flags() {
        let cli = Cli::try_parse_from(["extpack", "--config", "build/ext.json", "-vv", "--log-format", "json"])
            .unwrap();
        assert_eq!(cli.config, PathBuf::from("build/ext.json"));
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.log_format, LogFormat::Json));
    }

    #[test]
    fn rejects_positional_arguments() {
        assert!(Cli::try_parse_from(["extpack", "extra"]).is_err());
    }
}
