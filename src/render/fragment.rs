//! Owned HTML fragment tree
//!
//! Stands in for the browser DOM container: rendered markdown is parsed once,
//! text nodes are rewritten in place, and the tree is serialized back.

use scraper::{ElementRef, Html};
use std::fmt::Write;

/// Elements serialized without a closing tag
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// A node in the fragment tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Text(String),
    Element {
        name: String,
        attrs: Vec<(String, String)>,
        children: Vec<Node>,
    },
    /// Pre-rendered markup inserted verbatim (math output)
    Raw(String),
}

impl Node {
    pub fn text(s: impl Into<String>) -> Self {
        Node::Text(s.into())
    }

    #[cfg(test)]
    pub fn element(name: impl Into<String>, children: Vec<Node>) -> Self {
        Node::Element {
            name: name.into(),
            attrs: Vec::new(),
            children,
        }
    }

    fn children_of(element: ElementRef<'_>) -> Vec<Node> {
        element
            .children()
            .filter_map(|child| {
                if let Some(child_el) = ElementRef::wrap(child) {
                    let el = child_el.value();
                    return Some(Node::Element {
                        name: el.name().to_string(),
                        attrs: el
                            .attrs()
                            .map(|(k, v)| (k.to_string(), v.to_string()))
                            .collect(),
                        children: Node::children_of(child_el),
                    });
                }
                // Comments and doctypes carry no text
                child.value().as_text().map(|t| Node::Text(String::from(&**t)))
            })
            .collect()
    }

    fn write_html(&self, out: &mut String) {
        match self {
            Node::Text(text) => escape_into(out, text, false),
            Node::Raw(markup) => out.push_str(markup),
            Node::Element {
                name,
                attrs,
                children,
            } => {
                out.push('<');
                out.push_str(name);
                for (key, value) in attrs {
                    let _ = write!(out, " {key}=\"");
                    escape_into(out, value, true);
                    out.push('"');
                }
                out.push('>');
                if VOID_ELEMENTS.contains(&name.as_str()) {
                    return;
                }
                for child in children {
                    child.write_html(out);
                }
                let _ = write!(out, "</{name}>");
            }
        }
    }

    fn write_text(&self, out: &mut String) {
        match self {
            Node::Text(text) => out.push_str(text),
            Node::Raw(_) => {}
            Node::Element { children, .. } => {
                for child in children {
                    child.write_text(out);
                }
            }
        }
    }
}

/// A parsed HTML fragment: the children of an implicit container
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fragment {
    pub children: Vec<Node>,
}

impl Fragment {
    pub fn parse(html: &str) -> Self {
        let parsed = Html::parse_fragment(html);
        Self {
            children: Node::children_of(parsed.root_element()),
        }
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            child.write_html(&mut out);
        }
        out
    }

    /// Concatenated text of all text nodes (tags stripped)
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            child.write_text(&mut out);
        }
        out
    }
}

fn escape_into(out: &mut String, text: &str, attribute: bool) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' if !attribute => out.push_str("&lt;"),
            '>' if !attribute => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
}
