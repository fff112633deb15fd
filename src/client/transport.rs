//! HTTP transport to the GenesisAI backend
//!
//! The completion body is read one chunk at a time by a spawned task and
//! handed over through a channel of capacity one, so at most one read is in
//! flight ahead of the consumer.

use super::error::ApiError;
use super::types::{
    CompletionRequest, FeedbackRequest, LoginRequest, LoginResponse, RemoteConfig, SpeechRequest,
    TranscriptionResponse,
};
use crate::conversation::Feedback;
use crate::locale::Language;
use crate::stream::Utf8Carry;
use rand::distributions::Alphanumeric;
use rand::Rng;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use std::sync::{Mutex, PoisonError};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

const CONTEXT_KEY_LEN: usize = 32;

/// Raw text pieces of a completion body, in arrival order
pub type ChunkStream = ReceiverStream<Result<String, ApiError>>;

/// Random token scoping a backend conversation
pub fn generate_context_key() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(CONTEXT_KEY_LEN)
        .map(char::from)
        .collect()
}

pub struct ApiClient {
    http: Client,
    api_url: String,
    api_key: String,
    context_key: Mutex<String>,
}

impl ApiClient {
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, ApiError> {
        let http = Client::builder()
            .build()
            .map_err(|e| ApiError::unknown(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            http,
            api_url: api_url.into(),
            api_key: api_key.into(),
            context_key: Mutex::new(generate_context_key()),
        })
    }

    pub fn context_key(&self) -> String {
        self.context_key
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Start a new backend conversation context.
    pub fn refresh_context_key(&self) {
        *self.context_key.lock().unwrap_or_else(PoisonError::into_inner) = generate_context_key();
        tracing::debug!("Context key refreshed");
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.api_url)
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.http
            .post(self.endpoint(path))
            .header("api-key", &self.api_key)
    }

    async fn send(request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::from_reqwest(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = status.as_u16(), "Backend request failed");
            return Err(ApiError::from_status(status, &body));
        }
        Ok(response)
    }

    /// Open a completion stream.
    ///
    /// There is no retry and no timeout; a read failure ends the stream with
    /// a single `Err` item.
    pub async fn open_stream(&self, request: &CompletionRequest) -> Result<ChunkStream, ApiError> {
        tracing::info!(
            language = %request.language,
            model = %request.gpt_model,
            prompt_len = request.prompt.len(),
            "Opening completion stream"
        );
        let response = Self::send(
            self.post("genesisai-completions")
                .header("context-key", self.context_key())
                .json(request),
        )
        .await?;

        let (tx, rx) = mpsc::channel(1);
        tokio::spawn(read_body(response, tx));
        Ok(ReceiverStream::new(rx))
    }

    pub async fn send_feedback(&self, message_id: &str, feedback: Feedback) -> Result<(), ApiError> {
        let body = FeedbackRequest {
            message_id: message_id.to_string(),
            feedback,
        };
        Self::send(
            self.post("genesisai-feedback")
                .header("context-key", self.context_key())
                .json(&body),
        )
        .await?;
        tracing::info!(message_id, %feedback, "Feedback sent");
        Ok(())
    }

    /// Transcribe a WAV recording. `None` if nothing was recognized.
    pub async fn transcribe(&self, wav: Vec<u8>, language: Language) -> Result<Option<String>, ApiError> {
        let part = Part::bytes(wav)
            .file_name("recording.wav")
            .mime_str("audio/wav")
            .map_err(|e| ApiError::unknown(format!("Invalid upload: {e}")))?;

        let response = Self::send(
            self.post("genesisai-speech")
                .header("context-key", generate_context_key())
                .header("language", language.speech_code())
                .multipart(Form::new().part("file", part)),
        )
        .await?;

        let body: TranscriptionResponse = response
            .json()
            .await
            .map_err(|e| ApiError::decode(format!("Failed to parse transcription: {e}")))?;
        Ok(body.text.filter(|t| !t.trim().is_empty()))
    }

    /// Synthesize speech for plain text; returns the audio bytes.
    pub async fn text_to_speech(
        &self,
        text: &str,
        language: Language,
        voice_name: Option<&str>,
    ) -> Result<Vec<u8>, ApiError> {
        let body = SpeechRequest {
            text: text.to_string(),
            language: language.speech_code().to_string(),
            voice_name: voice_name.map(String::from),
        };
        let response = Self::send(self.post("genesisai-text-to-speech").json(&body)).await?;
        let audio = response
            .bytes()
            .await
            .map_err(|e| ApiError::network(format!("Failed to read audio: {e}")))?;
        Ok(audio.to_vec())
    }

    pub async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, ApiError> {
        let response = Self::send(self.http.post(self.endpoint("auth/login")).json(request)).await?;
        response
            .json()
            .await
            .map_err(|e| ApiError::decode(format!("Failed to parse login response: {e}")))
    }
}

/// Fetch `{apiUrl, apiKey}` from a configuration origin.
pub async fn fetch_remote_config(config_url: &str) -> Result<RemoteConfig, ApiError> {
    let url = format!("{}/api/config", config_url.trim_end_matches('/'));
    let response = Client::new()
        .get(url)
        .send()
        .await
        .map_err(|e| ApiError::from_reqwest(&e))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ApiError::from_status(status, &body));
    }
    response
        .json()
        .await
        .map_err(|e| ApiError::decode(format!("Failed to parse config: {e}")))
}

async fn read_body(mut response: Response, tx: mpsc::Sender<Result<String, ApiError>>) {
    let mut carry = Utf8Carry::new();
    loop {
        match response.chunk().await {
            Ok(Some(bytes)) => {
                tracing::debug!(bytes = bytes.len(), "Stream read");
                let text = carry.push(&bytes);
                if text.is_empty() {
                    continue;
                }
                if tx.send(Ok(text)).await.is_err() {
                    tracing::debug!("Stream consumer gone");
                    return;
                }
            }
            Ok(None) => {
                if let Some(rest) = carry.finish() {
                    let _ = tx.send(Ok(rest)).await;
                }
                tracing::debug!("Stream finished");
                return;
            }
            Err(e) => {
                tracing::error!(error = %e, "Stream read failed");
                let _ = tx
                    .send(Err(ApiError::network(format!("Stream read failed: {e}"))))
                    .await;
                return;
            }
        }
    }
}
