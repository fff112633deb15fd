//! Wire types for the GenesisAI backend

use crate::conversation::Feedback;
use crate::locale::Language;
use serde::{Deserialize, Serialize};

/// Body of `POST /genesisai-completions`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub prompt: String,
    pub language: Language,
    pub gpt_model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub survey_option: Option<String>,
}

/// Body of `POST /genesisai-feedback`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackRequest {
    pub message_id: String,
    pub feedback: Feedback,
}

/// Body of `POST /genesisai-text-to-speech`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeechRequest {
    pub text: String,
    /// Regional code, e.g. `pt-PT`
    pub language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(super) struct TranscriptionResponse {
    #[serde(default)]
    pub text: Option<String>,
}

/// Response of `GET /api/config`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteConfig {
    #[serde(default)]
    pub api_url: String,
    #[serde(default)]
    pub api_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_completion_request_wire_format() {
        let req = CompletionRequest {
            prompt: "Olá".into(),
            language: Language::Pt,
            gpt_model: "gpt4o".into(),
            survey_option: None,
        };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({"prompt": "Olá", "language": "pt", "gpt_model": "gpt4o"})
        );
    }

    #[test]
    fn test_feedback_wire_format() {
        let req = FeedbackRequest {
            message_id: "m1".into(),
            feedback: Feedback::None,
        };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({"message_id": "m1", "feedback": "nofbk"})
        );
    }

    #[test]
    fn test_remote_config_camel_case() {
        let cfg: RemoteConfig =
            serde_json::from_str(r#"{"apiUrl":"http://x","apiKey":"k"}"#).unwrap();
        assert_eq!(cfg.api_url, "http://x");
        assert_eq!(cfg.api_key, "k");
    }
}
