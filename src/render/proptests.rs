//! Property-based tests for answer rendering
//!
//! - Markdown conversion is deterministic and leaves plain prose alone
//! - The math pass never panics and is a no-op without delimiters

use super::{markdown_to_html, render_math, Fragment, TexRenderer};
use proptest::prelude::*;

proptest! {
    #[test]
    fn prop_markdown_is_deterministic(text in "[a-zA-Z0-9 *_#>`~!\\[\\]()\n-]{0,80}") {
        prop_assert_eq!(markdown_to_html(&text), markdown_to_html(&text));
    }

    #[test]
    fn prop_plain_prose_unchanged(text in "[a-zA-Z0-9 .,?]{0,80}") {
        prop_assert_eq!(markdown_to_html(&text), text);
    }

    #[test]
    fn prop_markdown_idempotent_on_converted_output(
        words in prop::collection::vec(("[a-z]{1,8}", 0u8..4), 1..8),
    ) {
        let text: Vec<String> = words
            .iter()
            .map(|(w, style)| match style {
                0 => format!("**{w}**"),
                1 => format!("*{w}*"),
                2 => format!("~~{w}~~"),
                _ => w.clone(),
            })
            .collect();
        let once = markdown_to_html(&text.join(" "));
        prop_assert_eq!(markdown_to_html(&once), once);
    }

    #[test]
    fn prop_math_pass_without_delimiters_is_noop(text in "[a-zA-Z0-9 .,]{0,60}") {
        let html = format!("<p>{text}</p>");
        prop_assert_eq!(
            render_math(&html, &TexRenderer),
            Fragment::parse(&html).to_html()
        );
    }

    #[test]
    fn prop_math_pass_never_panics(text in "[a-z0-9 ^_{}+=\\\\()\\[\\]]{0,60}") {
        let _ = render_math(&markdown_to_html(&text), &TexRenderer);
    }
}
