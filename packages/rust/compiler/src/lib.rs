//! Client for the remote JavaScript compiler service.
//!
//! Each call posts one file's source as a form and asks for the compiled code
//! and the compile errors back as plain text. The service reports failures
//! with a `200` status, either as an `Error(<code>): ...` line or as
//! `Input_0:<line>: ERROR - ...` lines after the (then empty) code, so the
//! response body is checked as well as the status.

use std::time::Duration;

use extpack_shared::{CompilationLevel, CompilerConfig, ExtpackError, Result};
use reqwest::Client;
use tracing::{debug, instrument};
use url::Url;

/// User-Agent string for compile requests.
const USER_AGENT: &str = concat!("extpack/", env!("CARGO_PKG_VERSION"));

/// Prefix of a service-level error line (quota, malformed request).
const ERROR_PREFIX: &str = "Error(";

/// Marker of a per-source compile error line in text output.
const COMPILE_ERROR_MARKER: &str = ": ERROR - ";

// ---------------------------------------------------------------------------
// ClosureCompiler
// ---------------------------------------------------------------------------

/// HTTP client bound to one compiler endpoint and compilation level.
#[derive(Debug, Clone)]
pub struct ClosureCompiler {
    client: Client,
    url: Url,
    level: CompilationLevel,
}

impl ClosureCompiler {
    /// Create a client from the `closureCompiler` config section.
    pub fn new(config: &CompilerConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ExtpackError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: config.url.clone(),
            level: config.level,
        })
    }

    /// Endpoint this client posts to.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Compile one source text and return the compiled code.
    #[instrument(skip_all, fields(level = %self.level, bytes = source.len()))]
    pub async fn compile(&self, source: &str) -> Result<String> {
        let form = [
            ("output_format", "text"),
            ("output_info", "compiled_code"),
            ("output_info", "errors"),
            ("compilation_level", self.level.as_str()),
            ("js_code", source),
        ];

        let response = self
            .client
            .post(self.url.as_str())
            .form(&form)
            .send()
            .await
            .map_err(|e| ExtpackError::Network(format!("{}: {e}", self.url)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExtpackError::remote_compile(format!(
                "{}: HTTP {status}",
                self.url
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ExtpackError::Network(format!("{}: failed to read body: {e}", self.url)))?;

        debug!(compiled_len = body.len(), "compile response received");
        check_body(body)
    }
}

/// Reject bodies that carry an error instead of compiled code.
///
/// A source that compiles to nothing (comments only, say) legitimately comes
/// back empty, so emptiness alone is not a failure; reported errors are.
fn check_body(body: String) -> Result<String> {
    let trimmed = body.trim_start();

    if trimmed.starts_with(ERROR_PREFIX) {
        let first_line = trimmed.lines().next().unwrap_or_default();
        return Err(ExtpackError::remote_compile(format!(
            "service error: {first_line}"
        )));
    }

    let errors: Vec<&str> = body
        .lines()
        .filter(|line| line.starts_with("Input_") && line.contains(COMPILE_ERROR_MARKER))
        .collect();
    if let Some(first) = errors.first() {
        return Err(ExtpackError::remote_compile(format!(
            "{} compile error(s), first: {first}",
            errors.len()
        )));
    }

    Ok(body)
}
