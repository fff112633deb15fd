//! Embedded widget handshake and question allowance
//!
//! When the chat runs inside a parent page, the parent grants a number of
//! free questions. Once they are used up by an unregistered user, questions
//! are blocked and a short registration dialog (name, then email) runs in the
//! conversation itself.

use crate::locale::Language;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier the widget announces itself with before the handshake
pub const WIDGET_ID: &str = "genesis-widget";

/// Payload shared by all parent/widget messages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub id: String,
    /// Question count (outbound) or allowance (inbound)
    pub np: u32,
    /// Whether the user is registered
    pub ul: bool,
}

/// Messages exchanged with the parent page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WidgetMessage {
    SignalReady(Envelope),
    Handshake(Envelope),
    UpdateAllowance(Envelope),
    InfoProvided(Envelope),
}

#[derive(Debug, Error)]
pub enum WidgetError {
    #[error("Message from unexpected origin: {0}")]
    ForeignOrigin(String),
    #[error("Malformed widget message: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl WidgetMessage {
    /// Validate an inbound message at the boundary.
    pub fn parse(origin: &str, expected_origin: &str, raw: &str) -> Result<Self, WidgetError> {
        if origin != expected_origin {
            return Err(WidgetError::ForeignOrigin(origin.to_string()));
        }
        Ok(serde_json::from_str(raw)?)
    }
}

/// What the conversation should do in response to gate activity
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateAction {
    Notify(WidgetMessage),
    /// Show the user's own input as a question
    Echo(String),
    /// Show an assistant notice
    Reply(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Awaiting {
    Nothing,
    Name,
    Email,
}

/// Question allowance state for an embedded widget
#[derive(Debug, Clone)]
pub struct WidgetGate {
    parent_origin: String,
    parent_id: String,
    questions_allowed: u32,
    questions_made: u32,
    registered: bool,
    blocked: bool,
    user_name: String,
    user_email: String,
    awaiting: Awaiting,
}

impl WidgetGate {
    pub fn new(parent_origin: impl Into<String>, questions_allowed: u32) -> Self {
        Self {
            parent_origin: parent_origin.into(),
            parent_id: String::new(),
            questions_allowed,
            questions_made: 0,
            registered: false,
            blocked: false,
            user_name: String::new(),
            user_email: String::new(),
            awaiting: Awaiting::Nothing,
        }
    }

    pub fn is_blocked(&self) -> bool {
        self.blocked
    }

    pub fn questions_made(&self) -> u32 {
        self.questions_made
    }

    pub fn questions_allowed(&self) -> u32 {
        self.questions_allowed
    }

    pub fn user(&self) -> Option<(&str, &str)> {
        self.registered
            .then_some((self.user_name.as_str(), self.user_email.as_str()))
    }

    /// Announcement sent once the widget is up
    pub fn signal_ready() -> WidgetMessage {
        WidgetMessage::SignalReady(Envelope {
            id: WIDGET_ID.to_string(),
            np: 0,
            ul: false,
        })
    }

    /// Apply an inbound message from the parent page.
    pub fn receive(&mut self, origin: &str, raw: &str) -> Result<(), WidgetError> {
        match WidgetMessage::parse(origin, &self.parent_origin, raw)? {
            WidgetMessage::Handshake(envelope) => {
                tracing::info!(parent = %envelope.id, allowance = envelope.np, "Widget handshake");
                self.parent_id = envelope.id;
                self.questions_allowed = envelope.np;
                self.questions_made = 0;
            }
            WidgetMessage::UpdateAllowance(envelope) => {
                tracing::info!(allowance = envelope.np, "Widget allowance updated");
                self.questions_allowed = envelope.np;
            }
            other => tracing::debug!(message = ?other, "Ignoring widget message"),
        }
        Ok(())
    }

    fn outbound(&self, make: fn(Envelope) -> WidgetMessage) -> Option<GateAction> {
        // Nothing is reported before the parent has identified itself
        if self.parent_id.is_empty() {
            return None;
        }
        Some(GateAction::Notify(make(Envelope {
            id: self.parent_id.clone(),
            np: self.questions_made,
            ul: self.registered,
        })))
    }

    /// Count a completed answer and block if the allowance is used up.
    pub fn record_answer(&mut self, language: Language) -> Vec<GateAction> {
        self.questions_made += 1;
        let mut actions: Vec<GateAction> = self
            .outbound(WidgetMessage::UpdateAllowance)
            .into_iter()
            .collect();
        actions.extend(self.check_allowance(language, ""));
        actions
    }

    /// Route user input while questions are blocked.
    pub fn handle_input(&mut self, language: Language, input: &str) -> Vec<GateAction> {
        self.check_allowance(language, input)
    }

    fn check_allowance(&mut self, language: Language, input: &str) -> Vec<GateAction> {
        if self.registered || self.questions_made < self.questions_allowed {
            return Vec::new();
        }
        self.blocked = true;
        self.registration_step(language, input)
    }

    fn registration_step(&mut self, language: Language, input: &str) -> Vec<GateAction> {
        let input = input.trim();
        let mut actions = Vec::new();

        match self.awaiting {
            Awaiting::Name if !input.is_empty() => {
                self.user_name = input.to_string();
                self.awaiting = Awaiting::Nothing;
                actions.push(GateAction::Echo(input.to_string()));
            }
            Awaiting::Email if !input.is_empty() => {
                self.user_email = input.to_string();
                self.awaiting = Awaiting::Nothing;
                self.blocked = false;
                self.registered = true;
                actions.push(GateAction::Echo(input.to_string()));
                actions.push(GateAction::Reply(registered_text(language).to_string()));
                actions.extend(self.outbound(WidgetMessage::InfoProvided));
                return actions;
            }
            // Empty input while a field is pending: ask again below
            _ => {}
        }

        if self.user_name.is_empty() {
            actions.push(GateAction::Reply(limit_reached_text(language).to_string()));
            self.awaiting = Awaiting::Name;
        } else if self.user_email.is_empty() {
            let first_name = self.user_name.split(' ').next().unwrap_or_default();
            actions.push(GateAction::Reply(ask_email_text(language, first_name)));
            self.awaiting = Awaiting::Email;
        }
        actions
    }
}

fn limit_reached_text(language: Language) -> &'static str {
    match language {
        Language::Pt => "Atingiu o limite de respostas que o Bata pode dar neste momento. Se pretender continuar a fazer mais questões, poderá criar um registo. Pode-me indicar o seu nome para iniciar o registo?",
        Language::En => "You have reached the number of answers available right now. To keep asking questions you can create an account. Could you tell me your name to start?",
    }
}

fn ask_email_text(language: Language, first_name: &str) -> String {
    match language {
        Language::Pt => format!(
            "Olá {first_name}, só mais uma informação e podemos prosseguir. Pode-me indicar o seu endereço de email?"
        ),
        Language::En => format!(
            "Hello {first_name}, just one more detail and we can continue. Could you tell me your email address?"
        ),
    }
}

fn registered_text(language: Language) -> &'static str {
    match language {
        Language::Pt => "Obrigado! Vamos proceder à criação do seu registo! Podemos continuar a nossa conversa, como posso ajudar?",
        Language::En => "Thank you! We will create your account. Let's continue our conversation, how can I help?",
    }
}
