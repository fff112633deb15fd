//! Math segment renderer
//!
//! Walks the text nodes of rendered HTML and replaces `\(...\)` and
//! `\[...\]` segments with rendered math markup. A segment that fails to
//! render is inserted as plain text; nothing propagates to the caller.

use super::fragment::{Fragment, Node};
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

static DELIMITER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\\[()\[\]]").unwrap());

/// Math layout failure for a single segment
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Cannot render math `{expr}`: {reason}")]
pub struct MathError {
    pub expr: String,
    pub reason: String,
}

impl MathError {
    pub fn new(expr: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            expr: expr.into(),
            reason: reason.into(),
        }
    }
}

/// Capability to turn one math expression into markup
pub trait MathRenderer: Send + Sync {
    /// Render `expr`; `display` is true for `\[...\]` blocks.
    fn render(&self, expr: &str, display: bool) -> Result<String, MathError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Part<'a> {
    Open { display: bool },
    Close,
    Segment(&'a str),
}

/// Split on the four delimiter tokens, keeping the delimiters as parts.
fn split_delimited(text: &str) -> Vec<Part<'_>> {
    let mut parts = Vec::new();
    let mut last = 0;
    for m in DELIMITER.find_iter(text) {
        parts.push(Part::Segment(text.get(last..m.start()).unwrap_or_default()));
        parts.push(match m.as_str() {
            "\\(" => Part::Open { display: false },
            "\\[" => Part::Open { display: true },
            _ => Part::Close,
        });
        last = m.end();
    }
    parts.push(Part::Segment(text.get(last..).unwrap_or_default()));
    parts
}

fn render_text(text: &str, renderer: &dyn MathRenderer) -> Vec<Node> {
    let parts = split_delimited(text);
    let mut nodes = Vec::new();

    for (index, part) in parts.iter().enumerate() {
        let Part::Segment(segment) = *part else {
            continue;
        };
        let opened_by = index.checked_sub(1).map(|i| parts[i]);

        if let Some(Part::Open { display }) = opened_by {
            match renderer.render(segment, display) {
                Ok(markup) => nodes.push(Node::Element {
                    name: "span".to_string(),
                    attrs: vec![("class".to_string(), "math".to_string())],
                    children: vec![Node::Raw(markup)],
                }),
                Err(e) => {
                    tracing::debug!(error = %e, "Math segment left as text");
                    nodes.push(Node::text(segment));
                }
            }
        } else if !segment.is_empty() {
            nodes.push(Node::text(segment));
        }
    }

    nodes
}

fn render_nodes(nodes: Vec<Node>, renderer: &dyn MathRenderer) -> Vec<Node> {
    let mut out = Vec::with_capacity(nodes.len());
    for node in nodes {
        match node {
            Node::Text(text) => out.extend(render_text(&text, renderer)),
            Node::Element {
                name,
                attrs,
                children,
            } => out.push(Node::Element {
                name,
                attrs,
                children: render_nodes(children, renderer),
            }),
            raw @ Node::Raw(_) => out.push(raw),
        }
    }
    out
}

/// Replace math segments in every text node of `fragment`.
pub fn render_math_fragment(fragment: &mut Fragment, renderer: &dyn MathRenderer) {
    let children = std::mem::take(&mut fragment.children);
    fragment.children = render_nodes(children, renderer);
}

/// Parse `html`, render its math segments and serialize the result.
pub fn render_math(html: &str, renderer: &dyn MathRenderer) -> String {
    let mut fragment = Fragment::parse(html);
    render_math_fragment(&mut fragment, renderer);
    fragment.to_html()
}
