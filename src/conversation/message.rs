//! Conversation message model

use crate::render::markdown_to_html;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Who produced a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Question,
    Answer,
    Survey,
}

/// User rating of an answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Feedback {
    #[default]
    #[serde(rename = "nofbk")]
    None,
    #[serde(rename = "positive")]
    Positive,
    #[serde(rename = "negative")]
    Negative,
}

impl Feedback {
    pub fn as_str(self) -> &'static str {
        match self {
            Feedback::None => "nofbk",
            Feedback::Positive => "positive",
            Feedback::Negative => "negative",
        }
    }
}

impl fmt::Display for Feedback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Feedback {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "nofbk" => Ok(Feedback::None),
            "positive" => Ok(Feedback::Positive),
            "negative" => Ok(Feedback::Negative),
            other => Err(format!("Unknown feedback: {other}")),
        }
    }
}

/// One entry in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    /// HTML-bearing display text
    pub text: String,
    pub feedback: Feedback,
    #[serde(rename = "allowsfeedback")]
    pub allows_feedback: bool,
    #[serde(rename = "messageid")]
    pub message_id: String,
    /// Accumulated source text, re-rendered into `text` on every fragment
    #[serde(skip)]
    raw: String,
    /// `text` after the math pass, set once the stream completes
    #[serde(skip)]
    math_html: Option<String>,
}

impl Message {
    fn new(kind: MessageKind, text: &str, allows_feedback: bool, message_id: &str) -> Self {
        Self {
            kind,
            text: text.to_string(),
            feedback: Feedback::None,
            allows_feedback,
            message_id: message_id.to_string(),
            raw: text.to_string(),
            math_html: None,
        }
    }

    pub fn question(text: &str) -> Self {
        Self::new(MessageKind::Question, text, false, "")
    }

    /// Fixed assistant text (greeting, notices); cannot be rated
    pub fn notice(text: &str) -> Self {
        Self::new(MessageKind::Answer, text, false, "")
    }

    pub fn survey(text: &str) -> Self {
        Self::new(MessageKind::Survey, text, false, "")
    }

    /// Empty streamed answer waiting for its first fragment
    pub fn answer(message_id: &str) -> Self {
        Self::new(MessageKind::Answer, "", true, message_id)
    }

    pub fn is_answer(&self) -> bool {
        self.kind == MessageKind::Answer
    }

    pub fn raw_text(&self) -> &str {
        &self.raw
    }

    /// Append a fragment and re-render the whole accumulated text.
    pub(super) fn push_fragment(&mut self, fragment: &str) {
        self.raw.push_str(fragment);
        self.text = markdown_to_html(&self.raw);
        self.math_html = None;
    }

    pub(super) fn set_math_html(&mut self, html: String) {
        self.math_html = Some(html);
    }

    /// Best available HTML: math-rendered if the pass ran, else `text`
    pub fn display_html(&self) -> &str {
        self.math_html.as_deref().unwrap_or(&self.text)
    }
}
