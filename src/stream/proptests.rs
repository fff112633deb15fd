//! Property-based tests for stream decoding
//!
//! - Any split of a well-formed object sequence into chunks decodes to the
//!   same events in the same order
//! - Accumulating decoded events yields the markdown of the concatenated
//!   contents, whatever the chunking

use super::normalizer::normalize_chunk;
use super::{StreamEvent, Utf8Carry};
use crate::conversation::{Conversation, Message};
use crate::locale::Language;
use crate::render::markdown_to_html;
use proptest::prelude::*;

/// Content without braces so the `}{` repair never fires inside a string
fn arb_event() -> impl Strategy<Value = StreamEvent> {
    (
        "[a-zA-Z0-9 .,!?*_#>\n-]{0,20}",
        prop_oneof![Just("m1".to_string()), Just("m2".to_string())],
    )
        .prop_map(|(content, message_id)| StreamEvent::new(content, message_id))
}

/// Serialize `events` and split the objects into chunks at `cuts`
fn chunked(events: &[StreamEvent], cuts: &[usize], trailing_comma: bool) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    for (i, event) in events.iter().enumerate() {
        current.push_str(&serde_json::to_string(event).unwrap());
        if cuts.contains(&i) {
            if trailing_comma {
                current.push(',');
            }
            chunks.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

proptest! {
    #[test]
    fn prop_chunking_preserves_events(
        events in prop::collection::vec(arb_event(), 1..12),
        cuts in prop::collection::vec(0usize..12, 0..6),
        trailing_comma in any::<bool>(),
    ) {
        let decoded: Vec<StreamEvent> = chunked(&events, &cuts, trailing_comma)
            .iter()
            .flat_map(|chunk| normalize_chunk(chunk).unwrap())
            .collect();
        prop_assert_eq!(decoded, events);
    }

    #[test]
    fn prop_accumulated_answer_is_markdown_of_concatenation(
        events in prop::collection::vec(arb_event(), 1..12),
        cuts in prop::collection::vec(0usize..12, 0..6),
    ) {
        let mut conv = Conversation::new(Language::Pt, None, None);
        conv.start();
        conv.submit("pergunta").unwrap();

        for chunk in chunked(&events, &cuts, false) {
            for event in normalize_chunk(&chunk).unwrap() {
                conv.append(&event);
            }
        }

        let concatenated: String = events.iter().map(|e| e.content.as_str()).collect();
        let answers: Vec<&Message> = conv.messages().iter().skip(2).collect();
        if concatenated.is_empty() {
            prop_assert!(answers.is_empty());
        } else {
            prop_assert_eq!(answers.len(), 1);
            prop_assert_eq!(answers[0].raw_text(), concatenated.as_str());
            prop_assert_eq!(&answers[0].text, &markdown_to_html(&concatenated));
        }
    }

    #[test]
    fn prop_utf8_carry_is_split_invariant(
        text in "[a-zçãéõ€😀 ]{0,40}",
        split in 0usize..200,
    ) {
        let bytes = text.as_bytes();
        let at = split.min(bytes.len());
        let mut carry = Utf8Carry::new();
        let mut out = carry.push(&bytes[..at]);
        out.push_str(&carry.push(&bytes[at..]));
        if let Some(rest) = carry.finish() {
            out.push_str(&rest);
        }
        prop_assert_eq!(out, text);
    }
}
