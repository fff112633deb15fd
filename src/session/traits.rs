//! Trait abstractions for session I/O
//!
//! These traits let the session be driven against mock backends and
//! recording presenters in tests.

use crate::client::{ApiClient, ApiError, ChunkStream, CompletionRequest};
use crate::conversation::{Feedback, Message};
use crate::locale::Language;
use crate::widget::WidgetMessage;
use async_trait::async_trait;
use std::sync::Arc;

/// Remote side of the chat
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Open a completion stream of raw text pieces
    async fn open_stream(&self, request: &CompletionRequest) -> Result<ChunkStream, ApiError>;

    /// Report a rating
    async fn send_feedback(&self, message_id: &str, feedback: Feedback) -> Result<(), ApiError>;

    /// Speech to text for a WAV recording
    async fn transcribe(&self, wav: Vec<u8>, language: Language) -> Result<Option<String>, ApiError>;

    /// Text to speech; returns audio bytes
    async fn text_to_speech(
        &self,
        text: &str,
        language: Language,
        voice_name: Option<&str>,
    ) -> Result<Vec<u8>, ApiError>;

    /// Drop the backend conversation context and start a new one
    fn refresh_context_key(&self);
}

/// Display surface for the conversation
pub trait Presenter: Send + Sync {
    /// Message at `index` was added or changed
    fn message_updated(&self, index: usize, message: &Message);

    /// The whole list must be redrawn
    fn reset(&self, messages: &[Message]);

    /// Bring the latest message into view
    fn scroll_to_bottom(&self);

    /// Deliver a message to the embedding page
    fn notify_parent(&self, message: &WidgetMessage);
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: ChatBackend + ?Sized> ChatBackend for Arc<T> {
    async fn open_stream(&self, request: &CompletionRequest) -> Result<ChunkStream, ApiError> {
        (**self).open_stream(request).await
    }

    async fn send_feedback(&self, message_id: &str, feedback: Feedback) -> Result<(), ApiError> {
        (**self).send_feedback(message_id, feedback).await
    }

    async fn transcribe(&self, wav: Vec<u8>, language: Language) -> Result<Option<String>, ApiError> {
        (**self).transcribe(wav, language).await
    }

    async fn text_to_speech(
        &self,
        text: &str,
        language: Language,
        voice_name: Option<&str>,
    ) -> Result<Vec<u8>, ApiError> {
        (**self).text_to_speech(text, language, voice_name).await
    }

    fn refresh_context_key(&self) {
        (**self).refresh_context_key();
    }
}

// ============================================================================
// Production adapter
// ============================================================================

#[async_trait]
impl ChatBackend for ApiClient {
    async fn open_stream(&self, request: &CompletionRequest) -> Result<ChunkStream, ApiError> {
        ApiClient::open_stream(self, request).await
    }

    async fn send_feedback(&self, message_id: &str, feedback: Feedback) -> Result<(), ApiError> {
        ApiClient::send_feedback(self, message_id, feedback).await
    }

    async fn transcribe(&self, wav: Vec<u8>, language: Language) -> Result<Option<String>, ApiError> {
        ApiClient::transcribe(self, wav, language).await
    }

    async fn text_to_speech(
        &self,
        text: &str,
        language: Language,
        voice_name: Option<&str>,
    ) -> Result<Vec<u8>, ApiError> {
        ApiClient::text_to_speech(self, text, language, voice_name).await
    }

    fn refresh_context_key(&self) {
        ApiClient::refresh_context_key(self);
    }
}
