//! `index.html` for the web app.
//!
//! The page starts from the user's template (or a bare default) and gets the
//! pieces the build produced injected: a `<title>` when the template has
//! none, the favicon, the stylesheets, the web-app manifest and the entry
//! script.

use regex::Regex;

use crate::error::{CliError, Result};

pub const DEFAULT_TEMPLATE: &str = "<!DOCTYPE html>
<html>
  <head>
    <meta charset=\"utf-8\" />
    <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\" />
  </head>
  <body>
  </body>
</html>
";

/// Written instead of a page when the project has no web app.
pub const EMPTY_PAGE: &str = "Nothing to see here...";

/// What the build contributes to the page. URLs are absolute.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageAssets {
    pub title: String,
    /// Bundle of every imported stylesheet.
    pub stylesheet: Option<String>,
    /// The entry directory's own `index.css`, linked after the bundle.
    pub root_stylesheet: Option<String>,
    pub favicon: Option<String>,
    pub manifest: Option<String>,
    pub script: String,
}

pub struct HtmlInjector {
    title: Regex,
    head_close: Regex,
    body_open: Regex,
    body_close: Regex,
}

fn pattern(source: &str) -> Result<Regex> {
    Regex::new(source).map_err(|e| CliError::Custom(format!("invalid html pattern: {}", e)))
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

impl HtmlInjector {
    pub fn new() -> Result<Self> {
        Ok(Self {
            title: pattern(r"(?is)<title[\s>]")?,
            head_close: pattern(r"(?i)</head\s*>")?,
            body_open: pattern(r"(?i)<body[^>]*>")?,
            body_close: pattern(r"(?i)</body\s*>")?,
        })
    }

    pub fn has_title(&self, html: &str) -> bool {
        self.title.is_match(html)
    }

    /// Insert `snippet` at the end of the head. Pages without `</head>` get
    /// it in front of `<body>`, or at the very start.
    pub fn inject_head(&self, html: &str, snippet: &str) -> String {
        let at = self
            .head_close
            .find(html)
            .or_else(|| self.body_open.find(html))
            .map(|m| m.start())
            .unwrap_or(0);
        insert(html, at, snippet)
    }

    /// Insert `snippet` before the last `</body>`, or append it.
    pub fn inject_body(&self, html: &str, snippet: &str) -> String {
        let at = self
            .body_close
            .find_iter(html)
            .last()
            .map(|m| m.start())
            .unwrap_or(html.len());
        insert(html, at, snippet)
    }

    pub fn render(&self, template: &str, assets: &PageAssets) -> String {
        let mut html = template.to_string();
        if !self.has_title(&html) {
            html = self.inject_head(&html, &format!("<title>{}</title>", escape(&assets.title)));
        }
        if let Some(favicon) = &assets.favicon {
            html = self.inject_head(
                &html,
                &format!("<link rel=\"icon\" type=\"image/png\" href=\"{}\" />", escape(favicon)),
            );
        }
        for stylesheet in assets.stylesheet.iter().chain(&assets.root_stylesheet) {
            html = self.inject_head(
                &html,
                &format!("<link rel=\"stylesheet\" href=\"{}\" />", escape(stylesheet)),
            );
        }
        if let Some(manifest) = &assets.manifest {
            html = self.inject_head(
                &html,
                &format!("<link rel=\"manifest\" href=\"{}\" />", escape(manifest)),
            );
        }
        self.inject_body(
            &html,
            &format!(
                "<script type=\"module\" src=\"{}\"></script>",
                escape(&assets.script)
            ),
        )
    }
}

fn insert(html: &str, at: usize, snippet: &str) -> String {
    let mut out = String::with_capacity(html.len() + snippet.len() + 1);
    out.push_str(&html[..at]);
    out.push_str(snippet);
    out.push('\n');
    out.push_str(&html[at..]);
    out
}

/// Short content hash used to bust caches of the entry script.
pub fn script_hash(compiled: &[u8]) -> String {
    let hash = blake3::hash(compiled).to_hex();
    hash.as_str()[..16].to_string()
}
