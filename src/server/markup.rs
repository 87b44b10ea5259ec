//! HTML rendering of model output.

use std::sync::LazyLock;

use regex::Regex;

static BOLD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*").expect("valid bold regex"));

/// Escape HTML special characters for safe rendering.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Escape an evaluation and render its `**bold**` spans. Line breaks are
/// left for CSS (`white-space: pre-wrap`).
pub fn render_evaluation(text: &str) -> String {
    let escaped = html_escape(text);
    BOLD.replace_all(&escaped, "<strong>$1</strong>").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_escape() {
        assert_eq!(html_escape("<script>"), "&lt;script&gt;");
        assert_eq!(html_escape("a & b"), "a &amp; b");
        assert_eq!(html_escape("\"it's\""), "&quot;it&#39;s&quot;");
    }

    #[test]
    fn test_render_evaluation() {
        assert_eq!(
            render_evaluation("**Total Marks: 35/50**\n- **Relevance**: good"),
            "<strong>Total Marks: 35/50</strong>\n- <strong>Relevance</strong>: good"
        );
        assert_eq!(
            render_evaluation("**<b>x</b>** and a lone ** marker"),
            "<strong>&lt;b&gt;x&lt;/b&gt;</strong> and a lone ** marker"
        );
    }
}
