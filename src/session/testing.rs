//! Mock implementations for testing
//!
//! These mocks let the session run end to end without network or terminal.

use super::traits::{ChatBackend, Presenter};
use crate::client::{ApiError, ChunkStream, CompletionRequest};
use crate::conversation::{Feedback, Message};
use crate::locale::Language;
use crate::widget::WidgetMessage;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

// ============================================================================
// Mock Backend
// ============================================================================

type QueuedStream = Result<Vec<Result<String, ApiError>>, ApiError>;

/// Backend replaying queued streams and recording every call
#[derive(Default)]
pub struct MockBackend {
    streams: Mutex<VecDeque<QueuedStream>>,
    transcriptions: Mutex<VecDeque<Option<String>>>,
    pub requests: Mutex<Vec<CompletionRequest>>,
    pub feedback: Mutex<Vec<(String, Feedback)>>,
    pub spoken: Mutex<Vec<(String, Language)>>,
    pub context_refreshes: Mutex<usize>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a stream delivering `pieces` then ending normally
    pub fn queue_stream(&self, pieces: &[&str]) {
        let items = pieces.iter().map(|p| Ok((*p).to_string())).collect();
        self.streams.lock().unwrap().push_back(Ok(items));
    }

    /// Queue a stream delivering `pieces` then failing
    pub fn queue_broken_stream(&self, pieces: &[&str], error: ApiError) {
        let mut items: Vec<_> = pieces.iter().map(|p| Ok((*p).to_string())).collect();
        items.push(Err(error));
        self.streams.lock().unwrap().push_back(Ok(items));
    }

    /// Queue a request that fails before any data arrives
    pub fn queue_open_error(&self, error: ApiError) {
        self.streams.lock().unwrap().push_back(Err(error));
    }

    pub fn queue_transcription(&self, text: Option<&str>) {
        self.transcriptions
            .lock()
            .unwrap()
            .push_back(text.map(String::from));
    }

    pub fn recorded_requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn recorded_feedback(&self) -> Vec<(String, Feedback)> {
        self.feedback.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatBackend for MockBackend {
    async fn open_stream(&self, request: &CompletionRequest) -> Result<ChunkStream, ApiError> {
        self.requests.lock().unwrap().push(request.clone());
        let items = self
            .streams
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::network("No mock stream queued")))?;

        let (tx, rx) = mpsc::channel(items.len().max(1));
        for item in items {
            // Capacity covers every item
            let _ = tx.try_send(item);
        }
        Ok(ReceiverStream::new(rx))
    }

    async fn send_feedback(&self, message_id: &str, feedback: Feedback) -> Result<(), ApiError> {
        self.feedback
            .lock()
            .unwrap()
            .push((message_id.to_string(), feedback));
        Ok(())
    }

    async fn transcribe(&self, _wav: Vec<u8>, _language: Language) -> Result<Option<String>, ApiError> {
        Ok(self.transcriptions.lock().unwrap().pop_front().flatten())
    }

    async fn text_to_speech(
        &self,
        text: &str,
        language: Language,
        _voice_name: Option<&str>,
    ) -> Result<Vec<u8>, ApiError> {
        self.spoken
            .lock()
            .unwrap()
            .push((text.to_string(), language));
        Ok(text.as_bytes().to_vec())
    }

    fn refresh_context_key(&self) {
        *self.context_refreshes.lock().unwrap() += 1;
    }
}

// ============================================================================
// Recording Presenter
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shown {
    Updated { index: usize, html: String },
    Reset { len: usize },
    Scrolled,
    Parent(WidgetMessage),
}

/// Presenter that records everything it is asked to show
#[derive(Default)]
pub struct RecordingPresenter {
    pub shown: Mutex<Vec<Shown>>,
}

impl RecordingPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Shown> {
        self.shown.lock().unwrap().clone()
    }

    pub fn scroll_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, Shown::Scrolled))
            .count()
    }
}

impl Presenter for RecordingPresenter {
    fn message_updated(&self, index: usize, message: &Message) {
        self.shown.lock().unwrap().push(Shown::Updated {
            index,
            html: message.display_html().to_string(),
        });
    }

    fn reset(&self, messages: &[Message]) {
        self.shown.lock().unwrap().push(Shown::Reset {
            len: messages.len(),
        });
    }

    fn scroll_to_bottom(&self) {
        self.shown.lock().unwrap().push(Shown::Scrolled);
    }

    fn notify_parent(&self, message: &WidgetMessage) {
        self.shown
            .lock()
            .unwrap()
            .push(Shown::Parent(message.clone()));
    }
}
