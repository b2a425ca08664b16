//! HTML and CSS minification capabilities.
//!
//! Both minifiers sit behind the [`Minifier`] trait so the transform stages can
//! treat them as black boxes: text in, smaller text out. Each is a pure
//! function of its input and options.

mod css;
mod html;

use extpack_shared::Result;

pub use css::CssMinifier;
pub use html::{HtmlMinifier, HtmlMinifyOptions};

/// A text-to-text minification capability.
pub trait Minifier: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Minify `source`, or explain why it could not be minified.
    fn minify(&self, source: &str) -> Result<String>;
}
