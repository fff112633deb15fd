//! Markdown subset to HTML
//!
//! An ordered list of substitutions. Order matters: later rules must not
//! re-match markup inserted by earlier ones.

use regex::{Captures, Regex};
use std::sync::LazyLock;

static FENCED_CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"```([\s\S]*?)```").unwrap());
static INLINE_CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"`([^`]+)`").unwrap());
static BOLD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*").unwrap());
static ITALIC_UNDERSCORE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"_(.+?)_").unwrap());
static ITALIC_STAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*(.+?)\*").unwrap());
static STRIKE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"~~(.+?)~~").unwrap());
static BLOCKQUOTE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^>(.*)$").unwrap());
static H4: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"#### (.*?)\n").unwrap());
static H3: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"### (.*?)\n").unwrap());
static H2: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"## (.*?)\n").unwrap());
static H1: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"# (.*?)\n").unwrap());
static LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(!?)\[([^\]]+)\]\(([^)]+)\)").unwrap());
static IMAGE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"!\[([^\]]*)\]\(([^)]+)\)").unwrap());

/// Convert accumulated answer text to HTML.
///
/// Deterministic: the same input always produces the same output.
pub fn markdown_to_html(text: &str) -> String {
    let text = FENCED_CODE.replace_all(text, "<pre><code>$1</code></pre>");
    let text = INLINE_CODE.replace_all(&text, "<code>$1</code>");
    let text = BOLD.replace_all(&text, "<strong>$1</strong>");
    let text = ITALIC_UNDERSCORE.replace_all(&text, "<em>$1</em>");
    let text = ITALIC_STAR.replace_all(&text, "<em>$1</em>");
    let text = STRIKE.replace_all(&text, "<del>$1</del>");
    let text = BLOCKQUOTE.replace_all(&text, "<blockquote>$1</blockquote>");
    let text = H4.replace_all(&text, "<h4>$1</h4>");
    let text = H3.replace_all(&text, "<h3>$1</h3>");
    let text = H2.replace_all(&text, "<h2>$1</h2>");
    let text = H1.replace_all(&text, "<h1>$1</h1>");
    // `![alt](url)` is left for the image rule
    let text = LINK.replace_all(&text, |caps: &Captures| {
        if caps[1].is_empty() {
            format!(r#"<a target="_blank" href="{}">{}</a>"#, &caps[3], &caps[2])
        } else {
            caps[0].to_string()
        }
    });
    let text = IMAGE.replace_all(&text, r#"<img alt="$1" src="$2" />"#);
    // Keep multi-line display math on one logical line
    let text = text.replace("\\[\n", "\\[").replace("\n\\]", "\\]");
    text.replace("---\n", "<br>").replace('\n', "<br>")
}
