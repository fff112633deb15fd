//! Wire stream decoding
//!
//! The completion endpoint answers with a chunked body of back-to-back JSON
//! objects shaped `{content, message_id}`. Objects are not separated, and a
//! single network read may carry several of them.

mod normalizer;
mod utf8;

#[cfg(test)]
mod proptests;

pub use normalizer::decode_chunk;
pub use utf8::Utf8Carry;

use serde::{Deserialize, Serialize};

/// One decoded unit from the wire stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamEvent {
    pub content: String,
    pub message_id: String,
}

impl StreamEvent {
    pub fn new(content: impl Into<String>, message_id: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            message_id: message_id.into(),
        }
    }
}
