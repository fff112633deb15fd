//! Chat session runtime
//!
//! Drives transport -> normalizer -> accumulator -> renderer for each
//! question and executes the effects the conversation returns. Stream
//! events are applied strictly in arrival order on the caller's task.

mod traits;

#[cfg(test)]
pub mod testing;

pub use traits::{ChatBackend, Presenter};

use crate::client::{ApiError, CompletionRequest};
use crate::conversation::{Conversation, ConversationError, Effect, Feedback, Submission};
use crate::locale::Language;
use crate::render::{render_math, Fragment, MathRenderer, TexRenderer};
use crate::store::LocalStore;
use crate::stream::decode_chunk;
use crate::widget::WidgetError;
use futures::StreamExt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Delay before a scroll request reaches the presenter
pub const SCROLL_SETTLE_DELAY: Duration = Duration::from_millis(150);

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Conversation(#[from] ConversationError),
    #[error("Backend request failed: {0}")]
    Api(#[from] ApiError),
    #[error(transparent)]
    Widget(#[from] WidgetError),
}

pub struct ChatSession<B, P> {
    conversation: Conversation,
    backend: Arc<B>,
    presenter: Arc<P>,
    store: Option<LocalStore>,
    math: Arc<dyn MathRenderer>,
    model: String,
    scroll_delay: Duration,
}

impl<B, P> ChatSession<B, P>
where
    B: ChatBackend + 'static,
    P: Presenter + 'static,
{
    pub fn new(
        conversation: Conversation,
        backend: Arc<B>,
        presenter: Arc<P>,
        store: Option<LocalStore>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            conversation,
            backend,
            presenter,
            store,
            math: Arc::new(TexRenderer),
            model: model.into(),
            scroll_delay: SCROLL_SETTLE_DELAY,
        }
    }

    #[must_use]
    #[cfg(test)]
    pub fn with_scroll_delay(mut self, delay: Duration) -> Self {
        self.scroll_delay = delay;
        self
    }

    #[must_use]
    #[cfg(test)]
    pub fn with_math_renderer(mut self, renderer: Arc<dyn MathRenderer>) -> Self {
        self.math = renderer;
        self
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Show the opening message.
    pub fn start(&mut self) {
        let effects = self.conversation.start();
        self.execute(effects);
    }

    /// Submit a prompt and consume the answer stream to the end.
    pub async fn submit(&mut self, prompt: &str) -> Result<(), SessionError> {
        let prompt = match self.conversation.submit(prompt)? {
            Submission::Handled(effects) => {
                self.execute(effects);
                return Ok(());
            }
            Submission::Request { prompt, effects } => {
                self.execute(effects);
                prompt
            }
        };

        let request = CompletionRequest {
            prompt,
            language: self.conversation.language(),
            gpt_model: self.model.clone(),
            survey_option: self.conversation.selected_survey().map(String::from),
        };

        let started = Instant::now();
        let mut stream = match self.backend.open_stream(&request).await {
            Ok(stream) => stream,
            Err(e) => {
                tracing::error!(error = %e, status = e.status, "Completion request failed");
                self.conversation.fail();
                return Err(e.into());
            }
        };

        let mut chunks = 0usize;
        while let Some(item) = stream.next().await {
            match item {
                Ok(text) => {
                    chunks += 1;
                    for event in decode_chunk(&text) {
                        let effects = self.conversation.append(&event);
                        self.execute(effects);
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, chunks, "Completion stream failed");
                    self.conversation.fail();
                    return Err(e.into());
                }
            }
        }

        tracing::info!(
            chunks,
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "Completion stream finished"
        );
        let effects = self.conversation.complete();
        self.execute(effects);
        Ok(())
    }

    pub fn clear(&mut self) -> Result<(), SessionError> {
        let effects = self.conversation.clear()?;
        self.execute(effects);
        Ok(())
    }

    pub fn toggle_feedback(&mut self, index: usize, feedback: Feedback) -> Result<(), SessionError> {
        let effects = self.conversation.toggle_feedback(index, feedback)?;
        self.execute(effects);
        Ok(())
    }

    pub fn set_language(&mut self, language: Language) {
        let effects = self.conversation.set_language(language);
        self.execute(effects);
    }

    pub fn answer_survey(&mut self, id: &str) -> Result<(), SessionError> {
        let effects = self.conversation.answer_survey(id)?;
        self.execute(effects);
        Ok(())
    }

    pub fn receive_parent_message(&mut self, origin: &str, raw: &str) -> Result<(), SessionError> {
        self.conversation.receive_parent_message(origin, raw)?;
        Ok(())
    }

    /// Transcribe a recording and submit the text as a question.
    ///
    /// Returns the recognized text, or `None` if nothing was recognized.
    pub async fn submit_recording(&mut self, wav: Vec<u8>) -> Result<Option<String>, SessionError> {
        let language = self.conversation.language();
        let Some(text) = self.backend.transcribe(wav, language).await? else {
            tracing::info!("Nothing recognized in recording");
            return Ok(None);
        };
        self.submit(&text).await?;
        Ok(Some(text))
    }

    /// Synthesize the plain text of the message at `index`.
    pub async fn speak(&self, index: usize, voice_name: Option<&str>) -> Result<Vec<u8>, SessionError> {
        let message = self
            .conversation
            .messages()
            .get(index)
            .ok_or(ConversationError::NoSuchMessage(index))?;
        let text = Fragment::parse(&message.text).text_content();
        let audio = self
            .backend
            .text_to_speech(&text, self.conversation.language(), voice_name)
            .await?;
        Ok(audio)
    }

    fn execute(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            self.execute_effect(effect);
        }
    }

    fn execute_effect(&mut self, effect: Effect) {
        match effect {
            Effect::Redraw { index } => {
                if let Some(message) = self.conversation.messages().get(index) {
                    self.presenter.message_updated(index, message);
                }
            }
            Effect::Reset => self.presenter.reset(self.conversation.messages()),
            Effect::ScrollToBottom => {
                let presenter = Arc::clone(&self.presenter);
                let delay = self.scroll_delay;
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    presenter.scroll_to_bottom();
                });
            }
            Effect::RenderMath { index } => {
                let Some(message) = self.conversation.messages().get(index) else {
                    return;
                };
                let html = render_math(&message.text, self.math.as_ref());
                match self.conversation.set_math_html(index, html) {
                    Ok(redraw) => self.execute_effect(redraw),
                    Err(e) => tracing::warn!(error = %e, "Math pass target vanished"),
                }
            }
            Effect::SendFeedback {
                message_id,
                feedback,
            } => {
                let backend = Arc::clone(&self.backend);
                tokio::spawn(async move {
                    if let Err(e) = backend.send_feedback(&message_id, feedback).await {
                        tracing::error!(message_id = %message_id, error = %e, "Failed to send feedback");
                    }
                });
            }
            Effect::NotifyParent(message) => {
                tracing::info!(widget = ?message, "Notifying parent page");
                self.presenter.notify_parent(&message);
            }
            Effect::RefreshContextKey => self.backend.refresh_context_key(),
            Effect::PersistLanguage(language) => {
                if let Some(store) = &self.store {
                    if let Err(e) = store.set_language(language) {
                        tracing::warn!(error = %e, "Failed to persist language");
                    }
                }
            }
        }
    }
}
