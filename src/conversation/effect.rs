//! Effects produced by conversation updates

use super::Feedback;
use crate::locale::Language;
use crate::widget::WidgetMessage;

/// Side effects for the session runtime to execute after an update
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Message at `index` was added or changed
    Redraw { index: usize },

    /// The whole list was replaced
    Reset,

    /// Deferred scroll once the view has settled
    ScrollToBottom,

    /// Run the math pass over a completed message
    RenderMath { index: usize },

    /// Report a rating to the backend (fire-and-forget)
    SendFeedback {
        message_id: String,
        feedback: Feedback,
    },

    /// Post a message to the embedding parent page
    NotifyParent(WidgetMessage),

    /// Start a fresh backend conversation context
    RefreshContextKey,

    /// Persist the interface language
    PersistLanguage(Language),
}
