//! CSS minification via `lightningcss`, with library defaults only.

use extpack_shared::{ExtpackError, Result};
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};

use crate::Minifier;

/// Stateless CSS minifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct CssMinifier;

impl Minifier for CssMinifier {
    fn name(&self) -> &'static str {
        "css"
    }

    fn minify(&self, source: &str) -> Result<String> {
        let mut sheet = StyleSheet::parse(source, ParserOptions::default())
            .map_err(|e| ExtpackError::minify(format!("CSS parse failed: {e}")))?;

        sheet
            .minify(MinifyOptions::default())
            .map_err(|e| ExtpackError::minify(format!("CSS minify failed: {e}")))?;

        let printed = sheet
            .to_css(PrinterOptions {
                minify: true,
                ..PrinterOptions::default()
            })
            .map_err(|e| ExtpackError::minify(format!("CSS print failed: {e}")))?;

        Ok(printed.code)
    }
}
