use std::sync::Arc;

use htmd::HtmlToMarkdown;
use jobscout_core::error::AppError;
use jobscout_core::util::collapse_whitespace;

/// Longest description kept on a normalized job, in characters.
pub const MAX_DESCRIPTION_CHARS: usize = 2000;

/// Converts provider HTML descriptions to Markdown using htmd.
///
/// Non-content elements (script, style, iframe, etc.) are dropped.
pub struct DescriptionCleaner {
    converter: Arc<HtmlToMarkdown>,
}

impl Clone for DescriptionCleaner {
    fn clone(&self) -> Self {
        Self {
            converter: Arc::clone(&self.converter),
        }
    }
}

impl DescriptionCleaner {
    pub fn new() -> Self {
        let converter = HtmlToMarkdown::builder()
            .skip_tags(vec!["script", "style", "noscript", "iframe", "svg", "img", "form"])
            .build();

        Self {
            converter: Arc::new(converter),
        }
    }

    pub fn to_markdown(&self, html: &str) -> Result<String, AppError> {
        self.converter
            .convert(html)
            .map(|md| md.trim().to_string())
            .map_err(|e| AppError::ParseError(format!("Failed to convert description: {e}")))
    }

    /// Display-ready description: Markdown when conversion works, the raw
    /// text with tags stripped otherwise, truncated to
    /// [`MAX_DESCRIPTION_CHARS`].
    pub fn description(&self, html: &str) -> String {
        let text = match self.to_markdown(html) {
            Ok(md) => md,
            Err(e) => {
                tracing::debug!(error = %e, "Falling back to plain-text description");
                collapse_whitespace(&strip_tags(html))
            }
        };
        truncate_chars(&text, MAX_DESCRIPTION_CHARS)
    }
}

impl Default for DescriptionCleaner {
    fn default() -> Self {
        Self::new()
    }
}

/// Remove anything between `<` and `>`. Used for short fields such as
/// titles where Markdown emphasis would be noise.
pub fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.replace("&amp;", "&")
        .replace("&nbsp;", " ")
        .replace("&#39;", "'")
        .replace("&quot;", "\"")
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", text[..cut].trim_end()),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_html_to_markdown() {
        let cleaner = DescriptionCleaner::new();
        let md = cleaner
            .to_markdown("<h2>About</h2><p>We build <b>Rust</b> tools.</p>")
            .unwrap();
        assert!(md.contains("About"));
        assert!(md.contains("**Rust**"));
        assert!(!md.contains("<p>"));
    }

    #[test]
    fn strips_script_tags() {
        let cleaner = DescriptionCleaner::new();
        let md = cleaner.description("<p>Content</p><script>alert('xss')</script>");
        assert!(md.contains("Content"));
        assert!(!md.contains("alert"));
    }

    #[test]
    fn long_descriptions_are_truncated() {
        let cleaner = DescriptionCleaner::new();
        let html = format!("<p>{}</p>", "é".repeat(MAX_DESCRIPTION_CHARS + 50));
        let text = cleaner.description(&html);
        assert!(text.ends_with("..."));
        assert_eq!(text.chars().count(), MAX_DESCRIPTION_CHARS + 3);
    }

    #[test]
    fn strip_tags_keeps_text() {
        assert_eq!(strip_tags("<strong>Rust</strong> Developer &amp; SRE"), "Rust Developer & SRE");
        assert_eq!(strip_tags("plain"), "plain");
    }
}
