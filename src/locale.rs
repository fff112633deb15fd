//! Interface language and fixed localized texts

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Interface language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Pt,
    En,
}

impl Language {
    pub fn as_str(self) -> &'static str {
        match self {
            Language::Pt => "pt",
            Language::En => "en",
        }
    }

    /// Regional code sent to the speech endpoints
    pub fn speech_code(self) -> &'static str {
        match self {
            Language::Pt => "pt-PT",
            Language::En => "en-GB",
        }
    }

    /// Lenient parse for persisted values: anything unknown is Portuguese.
    pub fn from_stored(value: Option<&str>) -> Self {
        value.and_then(|v| v.parse().ok()).unwrap_or_default()
    }

    pub fn greeting(self) -> &'static str {
        match self {
            Language::Pt => "Olá! Eu sou o GenAI, o auxiliar AI criado pela Genesis. Neste momento, ainda estou em processo de aprendizagem e, por esse motivo, as informações que forneço poderão carecer de confirmação junto dos canais tradicionais. Em que posso ajudar?",
            Language::En => "Hello, I am GenAI, the AI Assistant by Genesis. At the moment, I am still in the learning process and, for this reason, the information I provide may need to be confirmed through traditional channels. How can I help?",
        }
    }

    /// True if `text` is the start of a greeting in either language
    pub fn is_greeting(text: &str) -> bool {
        text.starts_with("Olá") || text.starts_with("Hello")
    }

    pub fn survey_prompt(self) -> &'static str {
        match self {
            Language::Pt => "Olá, eu sou o GenAI, o assistente virtual. Para começar primeiro selecione a opção mais adequada. Obrigado!",
            Language::En => "Hello, I'm GenAI, the virtual assistant. To get started, please select the most suitable option. Thank you!",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pt" | "pt-pt" => Ok(Language::Pt),
            "en" | "en-gb" => Ok(Language::En),
            other => Err(format!("Unsupported language: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_speech_codes() {
        assert_eq!(Language::Pt.speech_code(), "pt-PT");
        assert_eq!(Language::En.speech_code(), "en-GB");
    }

    #[test]
    fn test_from_stored_defaults_to_portuguese() {
        assert_eq!(Language::from_stored(None), Language::Pt);
        assert_eq!(Language::from_stored(Some("fr")), Language::Pt);
        assert_eq!(Language::from_stored(Some("en")), Language::En);
    }

    #[test]
    fn test_greetings_are_recognized() {
        assert!(Language::is_greeting(Language::Pt.greeting()));
        assert!(Language::is_greeting(Language::En.greeting()));
        assert!(!Language::is_greeting("Bom dia!"));
    }
}
