//! Conversation accumulator
//!
//! Owns the ordered message list. Updates are synchronous and return the
//! [`Effect`]s the session runtime must carry out; no I/O happens here.

mod effect;
mod message;

pub use effect::Effect;
pub use message::{Feedback, Message, MessageKind};

use crate::locale::Language;
use crate::stream::StreamEvent;
use crate::widget::{GateAction, WidgetError, WidgetGate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A selectable profile in survey mode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveyOption {
    pub id: String,
    pub name_pt: String,
    pub name_en: String,
}

impl SurveyOption {
    pub fn new(id: &str, name_pt: &str, name_en: &str) -> Self {
        Self {
            id: id.to_string(),
            name_pt: name_pt.to_string(),
            name_en: name_en.to_string(),
        }
    }

    pub fn name(&self, language: Language) -> &str {
        match language {
            Language::Pt => &self.name_pt,
            Language::En => &self.name_en,
        }
    }

    /// The stock profiles offered when survey mode is on
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::new("23dd6b44-be8d-4988-b99a-c51f3bcf44d0", "Aluno", "Student"),
            Self::new(
                "5e513ff0-4bdf-4733-9649-ae548de826da",
                "Encarregado de educação",
                "Educational Guardian",
            ),
            Self::new("57771d15-9c6e-4b9a-8e36-b375d796e784", "Município", "Municipality"),
            Self::new("626ebb0e-6c1b-494c-a14e-01b42d250c57", "Escola", "School"),
        ]
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConversationError {
    #[error("Prompt is empty")]
    EmptyPrompt,
    #[error("A request is already in progress")]
    Busy,
    #[error("Select a survey option first")]
    SurveyPending,
    #[error("Unknown survey option: {0}")]
    UnknownSurveyOption(String),
    #[error("Survey mode is not enabled")]
    SurveyDisabled,
    #[error("No message at index {0}")]
    NoSuchMessage(usize),
    #[error("Message at index {0} cannot be rated")]
    FeedbackNotAllowed(usize),
}

/// Result of submitting user input
#[derive(Debug, PartialEq, Eq)]
pub enum Submission {
    /// Open a completion stream for `prompt`
    Request { prompt: String, effects: Vec<Effect> },
    /// Input was consumed locally (registration dialog); no request
    Handled(Vec<Effect>),
}

/// The message list plus the flags that govern it
#[derive(Debug)]
pub struct Conversation {
    messages: Vec<Message>,
    language: Language,
    request_in_progress: bool,
    request_error: bool,
    survey_options: Vec<SurveyOption>,
    survey_enabled: bool,
    selected_survey: Option<String>,
    gate: Option<WidgetGate>,
}

impl Conversation {
    /// Build an empty conversation; call [`Conversation::start`] to seed it.
    pub fn new(language: Language, survey: Option<Vec<SurveyOption>>, gate: Option<WidgetGate>) -> Self {
        Self {
            messages: Vec::new(),
            language,
            request_in_progress: false,
            request_error: false,
            survey_enabled: survey.is_some(),
            survey_options: survey.unwrap_or_default(),
            selected_survey: None,
            gate,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn language(&self) -> Language {
        self.language
    }

    #[cfg(test)]
    pub fn is_request_in_progress(&self) -> bool {
        self.request_in_progress
    }

    pub fn has_request_error(&self) -> bool {
        self.request_error
    }

    pub fn survey_options(&self) -> &[SurveyOption] {
        &self.survey_options
    }

    pub fn selected_survey(&self) -> Option<&str> {
        self.selected_survey.as_deref()
    }

    pub fn gate(&self) -> Option<&WidgetGate> {
        self.gate.as_ref()
    }

    fn survey_pending(&self) -> bool {
        self.survey_enabled && self.selected_survey.is_none()
    }

    fn push(&mut self, message: Message) -> Effect {
        self.messages.push(message);
        Effect::Redraw {
            index: self.messages.len() - 1,
        }
    }

    /// Seed the opening message and announce the widget to its parent.
    pub fn start(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        if self.gate.is_some() {
            effects.push(Effect::NotifyParent(WidgetGate::signal_ready()));
        }
        effects.push(self.push_opening());
        effects
    }

    fn push_opening(&mut self) -> Effect {
        if self.survey_pending() {
            self.push(Message::survey(self.language.survey_prompt()))
        } else {
            self.push(Message::notice(self.language.greeting()))
        }
    }

    /// Accept user input.
    pub fn submit(&mut self, prompt: &str) -> Result<Submission, ConversationError> {
        if let Some(gate) = self.gate.as_mut() {
            if gate.is_blocked() {
                let actions = gate.handle_input(self.language, prompt);
                let mut effects = self.apply_gate_actions(actions);
                effects.push(Effect::ScrollToBottom);
                return Ok(Submission::Handled(effects));
            }
        }

        if prompt.is_empty() {
            return Err(ConversationError::EmptyPrompt);
        }
        if self.request_in_progress {
            return Err(ConversationError::Busy);
        }
        if self.survey_pending() {
            return Err(ConversationError::SurveyPending);
        }

        self.request_error = false;
        self.request_in_progress = true;
        let redraw = self.push(Message::question(prompt));

        Ok(Submission::Request {
            prompt: prompt.to_string(),
            effects: vec![redraw, Effect::ScrollToBottom],
        })
    }

    /// Merge one stream event into the trailing answer.
    pub fn append(&mut self, event: &StreamEvent) -> Vec<Effect> {
        if event.content.is_empty() {
            return Vec::new();
        }

        if !self.messages.last().is_some_and(Message::is_answer) {
            self.messages.push(Message::answer(&event.message_id));
        }
        let index = self.messages.len() - 1;
        self.messages[index].push_fragment(&event.content);

        vec![Effect::Redraw { index }, Effect::ScrollToBottom]
    }

    /// The stream ended normally.
    pub fn complete(&mut self) -> Vec<Effect> {
        self.request_in_progress = false;

        let mut effects = Vec::new();
        if let Some(index) = self.messages.len().checked_sub(1) {
            effects.push(Effect::RenderMath { index });
        }
        effects.push(Effect::ScrollToBottom);

        if let Some(gate) = self.gate.as_mut() {
            let actions = gate.record_answer(self.language);
            effects.extend(self.apply_gate_actions(actions));
        }
        effects
    }

    /// The stream failed. The partial answer is left as it is.
    pub fn fail(&mut self) {
        self.request_in_progress = false;
        self.request_error = true;
    }

    /// Store the result of the math pass for a message.
    pub fn set_math_html(&mut self, index: usize, html: String) -> Result<Effect, ConversationError> {
        let message = self
            .messages
            .get_mut(index)
            .ok_or(ConversationError::NoSuchMessage(index))?;
        message.set_math_html(html);
        Ok(Effect::Redraw { index })
    }

    /// Start over with a fresh backend context.
    pub fn clear(&mut self) -> Result<Vec<Effect>, ConversationError> {
        if self.request_in_progress {
            return Err(ConversationError::Busy);
        }
        self.messages.clear();
        self.request_error = false;
        self.push_opening();
        Ok(vec![Effect::RefreshContextKey, Effect::Reset])
    }

    /// Rate an answer; choosing the current rating again withdraws it.
    pub fn toggle_feedback(
        &mut self,
        index: usize,
        feedback: Feedback,
    ) -> Result<Vec<Effect>, ConversationError> {
        let message = self
            .messages
            .get_mut(index)
            .ok_or(ConversationError::NoSuchMessage(index))?;
        if !message.allows_feedback {
            return Err(ConversationError::FeedbackNotAllowed(index));
        }

        message.feedback = if message.feedback == feedback {
            Feedback::None
        } else {
            feedback
        };

        Ok(vec![
            Effect::Redraw { index },
            Effect::SendFeedback {
                message_id: message.message_id.clone(),
                feedback: message.feedback,
            },
        ])
    }

    /// Switch language, replacing a trailing greeting with the new one.
    pub fn set_language(&mut self, language: Language) -> Vec<Effect> {
        self.language = language;
        let mut effects = vec![Effect::PersistLanguage(language)];

        let trailing_greeting = self
            .messages
            .last()
            .is_some_and(|m| m.is_answer() && Language::is_greeting(&m.text));
        if trailing_greeting {
            self.messages.pop();
            effects.push(Effect::Reset);
        }
        effects.push(self.push(Message::notice(language.greeting())));
        effects
    }

    /// Record the chosen survey profile and replace the survey with the greeting.
    pub fn answer_survey(&mut self, id: &str) -> Result<Vec<Effect>, ConversationError> {
        if !self.survey_enabled {
            return Err(ConversationError::SurveyDisabled);
        }
        if !self.survey_options.iter().any(|o| o.id == id) {
            return Err(ConversationError::UnknownSurveyOption(id.to_string()));
        }

        self.selected_survey = Some(id.to_string());
        if self
            .messages
            .last()
            .is_some_and(|m| m.kind == MessageKind::Survey)
        {
            self.messages.pop();
        }
        self.push(Message::notice(self.language.greeting()));
        Ok(vec![Effect::Reset])
    }

    /// Forward a message from the embedding page to the widget gate.
    pub fn receive_parent_message(&mut self, origin: &str, raw: &str) -> Result<(), WidgetError> {
        match self.gate.as_mut() {
            Some(gate) => gate.receive(origin, raw),
            None => {
                tracing::debug!("Widget restriction disabled; ignoring parent message");
                Ok(())
            }
        }
    }

    fn apply_gate_actions(&mut self, actions: Vec<GateAction>) -> Vec<Effect> {
        actions
            .into_iter()
            .map(|action| match action {
                GateAction::Notify(message) => Effect::NotifyParent(message),
                GateAction::Echo(text) => self.push(Message::question(&text)),
                GateAction::Reply(text) => self.push(Message::notice(&text)),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widget::{Envelope, WidgetMessage};

    fn started(conv: Conversation) -> Conversation {
        let mut conv = conv;
        conv.start();
        conv
    }

    fn plain() -> Conversation {
        started(Conversation::new(Language::Pt, None, None))
    }

    fn answers(conv: &Conversation) -> Vec<&Message> {
        conv.messages()
            .iter()
            .filter(|m| m.is_answer() && m.allows_feedback)
            .collect()
    }

    #[test]
    fn test_start_adds_greeting() {
        let conv = plain();
        assert_eq!(conv.messages().len(), 1);
        assert_eq!(conv.messages()[0].text, Language::Pt.greeting());
        assert!(!conv.messages()[0].allows_feedback);
    }

    #[test]
    fn test_submit_pushes_question() {
        let mut conv = plain();
        let submission = conv.submit("Olá").unwrap();
        assert_eq!(
            submission,
            Submission::Request {
                prompt: "Olá".into(),
                effects: vec![Effect::Redraw { index: 1 }, Effect::ScrollToBottom],
            }
        );
        assert!(conv.is_request_in_progress());
        assert_eq!(conv.messages()[1].kind, MessageKind::Question);
    }

    #[test]
    fn test_submit_rejections() {
        let mut conv = plain();
        assert_eq!(conv.submit(""), Err(ConversationError::EmptyPrompt));
        conv.submit("one").unwrap();
        assert_eq!(conv.submit("two"), Err(ConversationError::Busy));
    }

    #[test]
    fn test_same_id_fragments_merge() {
        let mut conv = plain();
        conv.submit("q").unwrap();
        conv.append(&StreamEvent::new("Bom ", "m1"));
        conv.append(&StreamEvent::new("dia!", "m1"));
        let answers = answers(&conv);
        assert_eq!(answers.len(), 1);
        assert_eq!(answers[0].text, "Bom dia!");
        assert_eq!(answers[0].message_id, "m1");
    }

    #[test]
    fn test_empty_content_is_noop() {
        let mut conv = plain();
        conv.submit("q").unwrap();
        assert!(conv.append(&StreamEvent::new("", "m1")).is_empty());
        assert_eq!(conv.messages().len(), 2);
    }

    #[test]
    fn test_question_forces_new_answer() {
        let mut conv = plain();
        conv.submit("first").unwrap();
        conv.append(&StreamEvent::new("one", "m1"));
        conv.complete();
        conv.submit("second").unwrap();
        conv.append(&StreamEvent::new("two", "m2"));

        let answers = answers(&conv);
        assert_eq!(answers.len(), 2);
        assert_eq!(answers[1].text, "two");
        assert_eq!(answers[1].message_id, "m2");
    }

    #[test]
    fn test_complete_schedules_math_pass() {
        let mut conv = plain();
        conv.submit("q").unwrap();
        conv.append(&StreamEvent::new("x", "m1"));
        let effects = conv.complete();
        assert_eq!(
            effects,
            vec![Effect::RenderMath { index: 2 }, Effect::ScrollToBottom]
        );
        assert!(!conv.is_request_in_progress());
    }

    #[test]
    fn test_fail_keeps_partial_answer() {
        let mut conv = plain();
        conv.submit("q").unwrap();
        conv.append(&StreamEvent::new("partial", "m1"));
        conv.fail();
        assert!(!conv.is_request_in_progress());
        assert!(conv.has_request_error());
        assert_eq!(conv.messages()[2].text, "partial");
        // A new question is accepted afterwards
        assert!(conv.submit("again").is_ok());
        assert!(!conv.has_request_error());
    }

    #[test]
    fn test_clear_resets_and_refreshes_context() {
        let mut conv = plain();
        conv.submit("q").unwrap();
        assert_eq!(conv.clear(), Err(ConversationError::Busy));
        conv.complete();
        let effects = conv.clear().unwrap();
        assert_eq!(effects, vec![Effect::RefreshContextKey, Effect::Reset]);
        assert_eq!(conv.messages().len(), 1);
    }

    #[test]
    fn test_feedback_toggles() {
        let mut conv = plain();
        conv.submit("q").unwrap();
        conv.append(&StreamEvent::new("a", "m1"));

        let effects = conv.toggle_feedback(2, Feedback::Positive).unwrap();
        assert_eq!(
            effects[1],
            Effect::SendFeedback {
                message_id: "m1".into(),
                feedback: Feedback::Positive
            }
        );
        let effects = conv.toggle_feedback(2, Feedback::Positive).unwrap();
        assert_eq!(
            effects[1],
            Effect::SendFeedback {
                message_id: "m1".into(),
                feedback: Feedback::None
            }
        );
        conv.toggle_feedback(2, Feedback::Negative).unwrap();
        assert_eq!(conv.messages()[2].feedback, Feedback::Negative);

        assert_eq!(
            conv.toggle_feedback(0, Feedback::Positive),
            Err(ConversationError::FeedbackNotAllowed(0))
        );
        assert_eq!(
            conv.toggle_feedback(9, Feedback::Positive),
            Err(ConversationError::NoSuchMessage(9))
        );
    }

    #[test]
    fn test_language_switch_replaces_greeting() {
        let mut conv = plain();
        let effects = conv.set_language(Language::En);
        assert_eq!(effects[0], Effect::PersistLanguage(Language::En));
        assert_eq!(conv.messages().len(), 1);
        assert_eq!(conv.messages()[0].text, Language::En.greeting());
    }

    #[test]
    fn test_language_switch_after_answer_appends_greeting() {
        let mut conv = plain();
        conv.submit("q").unwrap();
        conv.append(&StreamEvent::new("resposta", "m1"));
        conv.complete();
        conv.set_language(Language::En);
        assert_eq!(conv.messages().len(), 4);
        assert_eq!(conv.messages()[3].text, Language::En.greeting());
    }

    #[test]
    fn test_survey_flow() {
        let mut conv = started(Conversation::new(
            Language::En,
            Some(SurveyOption::defaults()),
            None,
        ));
        assert_eq!(conv.messages()[0].kind, MessageKind::Survey);
        assert_eq!(conv.submit("hi"), Err(ConversationError::SurveyPending));
        assert_eq!(
            conv.answer_survey("nope"),
            Err(ConversationError::UnknownSurveyOption("nope".into()))
        );

        conv.answer_survey("626ebb0e-6c1b-494c-a14e-01b42d250c57").unwrap();
        assert_eq!(conv.selected_survey(), Some("626ebb0e-6c1b-494c-a14e-01b42d250c57"));
        assert_eq!(conv.messages().len(), 1);
        assert_eq!(conv.messages()[0].text, Language::En.greeting());
        assert!(conv.submit("hi").is_ok());
    }

    #[test]
    fn test_survey_disabled() {
        let mut conv = plain();
        assert_eq!(conv.answer_survey("x"), Err(ConversationError::SurveyDisabled));
    }

    #[test]
    fn test_widget_gate_blocks_after_allowance() {
        let gate = WidgetGate::new("https://parent.example", 4);
        let mut conv = Conversation::new(Language::Pt, None, Some(gate));
        let effects = conv.start();
        assert_eq!(effects[0], Effect::NotifyParent(WidgetGate::signal_ready()));

        conv.receive_parent_message(
            "https://parent.example",
            r#"{"type":"handshake","id":"p1","np":1,"ul":false}"#,
        )
        .unwrap();

        conv.submit("q").unwrap();
        conv.append(&StreamEvent::new("a", "m1"));
        let effects = conv.complete();
        assert!(effects.contains(&Effect::NotifyParent(WidgetMessage::UpdateAllowance(
            Envelope {
                id: "p1".into(),
                np: 1,
                ul: false
            }
        ))));
        assert!(conv.gate().unwrap().is_blocked());

        // Blocked input goes to the registration dialog, not the backend
        let submission = conv.submit("Ana").unwrap();
        assert!(matches!(submission, Submission::Handled(_)));
        let last = conv.messages().last().unwrap();
        assert!(last.text.starts_with("Olá Ana"));
    }
}
