//! HTML minification via `minify-html`.
//!
//! `minifyOptions` in the build config uses html-minifier option names. The
//! ones with a `minify-html` equivalent are mapped below; everything else is
//! accepted and ignored.

use extpack_shared::{ExtpackError, Result};
use minify_html::Cfg;
use tracing::debug;

use crate::Minifier;

/// Option keys this minifier understands.
const KNOWN_OPTIONS: &[&str] = &[
    "removeComments",
    "removeOptionalTags",
    "minifyCSS",
    "minifyJS",
    "useShortDoctype",
];

/// The subset of html-minifier options with a `minify-html` counterpart.
///
/// Every flag defaults to `false`, matching html-minifier, so an empty
/// options object keeps comments, optional tags and inline code as they are.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HtmlMinifyOptions {
    pub remove_comments: bool,
    pub remove_optional_tags: bool,
    pub minify_css: bool,
    pub minify_js: bool,
    pub use_short_doctype: bool,
}

impl HtmlMinifyOptions {
    /// Read options from the opaque `minifyOptions` object.
    ///
    /// html-minifier allows an options object in place of `true` for
    /// `minifyCSS`/`minifyJS`; any value other than `false` or `null` turns the
    /// flag on.
    pub fn from_value(value: &serde_json::Value) -> Result<Self> {
        let map = value
            .as_object()
            .ok_or_else(|| ExtpackError::config("minifyOptions must be a JSON object"))?;

        for key in map.keys() {
            if !KNOWN_OPTIONS.contains(&key.as_str()) {
                debug!(option = %key, "minify option has no equivalent, ignoring");
            }
        }

        let flag = |key: &str| match map.get(key) {
            None | Some(serde_json::Value::Null) => false,
            Some(serde_json::Value::Bool(b)) => *b,
            Some(_) => true,
        };

        Ok(Self {
            remove_comments: flag("removeComments"),
            remove_optional_tags: flag("removeOptionalTags"),
            minify_css: flag("minifyCSS"),
            minify_js: flag("minifyJS"),
            use_short_doctype: flag("useShortDoctype"),
        })
    }

    fn to_cfg(&self) -> Cfg {
        let mut cfg = Cfg::new();
        cfg.keep_comments = !self.remove_comments;
        cfg.keep_closing_tags = !self.remove_optional_tags;
        cfg.keep_html_and_head_opening_tags = !self.remove_optional_tags;
        cfg.minify_css = self.minify_css;
        cfg.minify_js = self.minify_js;
        cfg.do_not_minify_doctype = !self.use_short_doctype;
        cfg
    }
}

/// HTML minifier configured once per build.
pub struct HtmlMinifier {
    cfg: Cfg,
}

impl HtmlMinifier {
    pub fn new(options: &HtmlMinifyOptions) -> Self {
        Self {
            cfg: options.to_cfg(),
        }
    }

    /// Build from the raw `minifyOptions` config value.
    pub fn from_config_value(value: &serde_json::Value) -> Result<Self> {
        Ok(Self::new(&HtmlMinifyOptions::from_value(value)?))
    }
}

impl Minifier for HtmlMinifier {
    fn name(&self) -> &'static str {
        "html"
    }

    fn minify(&self, source: &str) -> Result<String> {
        let out = minify_html::minify(source.as_bytes(), &self.cfg);
        String::from_utf8(out)
            .map_err(|e| ExtpackError::minify(format!("minified HTML is not UTF-8: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn minifier(options: serde_json::Value) -> HtmlMinifier {
        HtmlMinifier::from_config_value(&options).expect("valid options")
    }

    #[test]
    fn options_from_value() {
        let opts = HtmlMinifyOptions::from_value(&json!({
            "removeComments": true,
            "collapseWhitespace": true,
            "minifyCSS": { "level": 2 },
            "minifyJS": false
        }))
        .unwrap();

        assert!(opts.remove_comments);
        assert!(opts.minify_css);
        assert!(!opts.minify_js);
        assert!(!opts.remove_optional_tags);
    }

    #[test]
    fn empty_options_are_defaults() {
        let opts = HtmlMinifyOptions::from_value(&json!({})).unwrap();
        assert_eq!(opts, HtmlMinifyOptions::default());
    }

    #[test]
    fn non_object_rejected() {
        assert!(HtmlMinifyOptions::from_value(&json!("fast")).is_err());
    }

    #[test]
    fn removes_comments_when_asked() {
        let html = "<div><!-- build note --><p>Hello</p></div>";

        let stripped = minifier(json!({ "removeComments": true })).minify(html).unwrap();
        assert!(!stripped.contains("build note"));
        assert!(stripped.contains("Hello"));

        let kept = minifier(json!({})).minify(html).unwrap();
        assert!(kept.contains("build note"));
    }

    #[test]
    fn collapses_whitespace() {
        let html = "<div>\n    <p>Hello     world</p>\n\n    <p>Again</p>\n</div>\n";
        let out = minifier(json!({})).minify(html).unwrap();
        assert!(out.len() < html.len());
        assert!(out.contains("Hello world"));
        assert!(!out.contains("    "));
    }

    #[test]
    fn deterministic() {
        let html = "<html><head><title>T</title></head><body>  <p>x</p>  </body></html>";
        let m = minifier(json!({ "removeComments": true }));
        assert_eq!(m.minify(html).unwrap(), m.minify(html).unwrap());
    }
}
