//! UTF-8 decoding across network reads
//!
//! A read boundary may split a multi-byte character. The incomplete tail is
//! held back and prefixed to the next read instead of being replaced.

/// Incremental UTF-8 decoder for a byte stream
#[derive(Debug, Default)]
pub struct Utf8Carry {
    pending: Vec<u8>,
}

impl Utf8Carry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the next read, returning all complete text available so far.
    ///
    /// Invalid bytes become U+FFFD. An incomplete character at the end is
    /// held back even when invalid bytes precede it.
    pub fn push(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);

        let mut out = String::new();
        loop {
            let (decodable, done) = match std::str::from_utf8(&self.pending) {
                Ok(_) => (self.pending.len(), true),
                Err(e) => match e.error_len() {
                    None => (e.valid_up_to(), true),
                    Some(invalid) => (e.valid_up_to() + invalid, false),
                },
            };
            let head: Vec<u8> = self.pending.drain(..decodable).collect();
            out.push_str(&String::from_utf8_lossy(&head));
            if done {
                return out;
            }
        }
    }

    /// Flush whatever is left at end of stream.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let text = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_multibyte_character() {
        let bytes = "Olá".as_bytes();
        let mut carry = Utf8Carry::new();
        // 'á' is two bytes; split between them
        assert_eq!(carry.push(&bytes[..3]), "Ol");
        assert_eq!(carry.push(&bytes[3..]), "á");
        assert!(carry.finish().is_none());
    }

    #[test]
    fn test_plain_ascii_passthrough() {
        let mut carry = Utf8Carry::new();
        assert_eq!(carry.push(b"hello"), "hello");
    }

    #[test]
    fn test_truncated_tail_flushed_lossily() {
        let mut carry = Utf8Carry::new();
        assert_eq!(carry.push(&[b'a', 0xC3]), "a");
        assert_eq!(carry.finish().as_deref(), Some("\u{FFFD}"));
    }

    #[test]
    fn test_invalid_bytes_do_not_stall() {
        let mut carry = Utf8Carry::new();
        let text = carry.push(&[0xFF, b'b']);
        assert!(text.ends_with('b'));
    }

    #[test]
    fn test_tail_held_back_after_invalid_byte() {
        let mut carry = Utf8Carry::new();
        assert_eq!(carry.push(&[0xFF, 0xC3]), "\u{FFFD}");
        assert_eq!(carry.push(&[0xA1]), "á");
        assert!(carry.finish().is_none());
    }
}
