//! GenesisAI chat - terminal client
//!
//! Streams answers from the GenesisAI backend, assembling fragmented JSON
//! chunks into a conversation rendered from Markdown and TeX.

mod auth;
mod client;
mod config;
mod conversation;
mod locale;
mod render;
mod session;
mod store;
mod stream;
mod widget;

use auth::{AuthError, AuthService, LoginBackend, MockAuth};
use client::{fetch_remote_config, ApiClient};
use config::ChatConfig;
use conversation::{Conversation, Feedback, Message, MessageKind, SurveyOption};
use locale::Language;
use render::Fragment;
use session::{ChatSession, Presenter};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use store::LocalStore;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use widget::{WidgetGate, WidgetMessage};

const DEFAULT_SPEECH_FILE: &str = "speech.mp3";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr; stdout is the conversation
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "genesis_chat=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let mut config = ChatConfig::from_env();
    if let Some(url) = config.config_url.clone() {
        match fetch_remote_config(&url).await {
            Ok(remote) => {
                tracing::info!(config_url = %url, "Loaded remote configuration");
                config.apply_remote(remote);
            }
            Err(e) => tracing::warn!(config_url = %url, error = %e, "Remote configuration unavailable"),
        }
    }
    if config.api_url.is_empty() {
        tracing::warn!("No backend configured. Set GENESIS_API_URL or GENESIS_CONFIG_URL.");
    }

    tracing::info!(path = %config.state_path.display(), "Opening state store");
    let store = LocalStore::open(&config.state_path)?;
    let language = store.language()?.unwrap_or(config.language);

    let client = Arc::new(ApiClient::new(&config.api_url, &config.api_key)?);
    let login_backend = if config.flags.mock_auth {
        LoginBackend::Mock(MockAuth::default())
    } else {
        LoginBackend::Remote(Arc::clone(&client))
    };
    let auth = AuthService::new(config.flags.login, login_backend, store.clone());

    let survey = config.flags.survey.then(SurveyOption::defaults);
    let gate = config
        .flags
        .widget_restrict
        .then(|| WidgetGate::new(config.parent_origin.clone(), config.questions_allowed));
    let conversation = Conversation::new(language, survey, gate);

    tracing::info!(
        language = %language,
        model = %config.model,
        flags = ?config.flags,
        "Starting chat session"
    );
    let presenter = Arc::new(TerminalPresenter::default());
    let mut session = ChatSession::new(conversation, client, presenter, Some(store), config.model);
    session.start();
    print_survey_options(session.conversation());

    run_repl(&mut session, &auth).await?;
    Ok(())
}

// ============================================================================
// Commands
// ============================================================================

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Ask(String),
    Clear,
    Lang(Language),
    Rate(Feedback),
    Speak(PathBuf),
    Transcribe(PathBuf),
    Login { username: String, password: String },
    Logout,
    WhoAmI,
    Survey(String),
    Parent { origin: String, raw: String },
    Help,
    Quit,
}

fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let Some(rest) = line.strip_prefix('/') else {
        return Ok(Command::Ask(line.to_string()));
    };

    let (name, args) = rest.split_once(' ').unwrap_or((rest, ""));
    let args = args.trim();
    match name {
        "clear" => Ok(Command::Clear),
        "lang" => args.parse().map(Command::Lang),
        "good" => Ok(Command::Rate(Feedback::Positive)),
        "bad" => Ok(Command::Rate(Feedback::Negative)),
        "speak" if args.is_empty() => Ok(Command::Speak(PathBuf::from(DEFAULT_SPEECH_FILE))),
        "speak" => Ok(Command::Speak(PathBuf::from(args))),
        "transcribe" if !args.is_empty() => Ok(Command::Transcribe(PathBuf::from(args))),
        "login" => match args.split_once(' ') {
            Some((username, password)) => Ok(Command::Login {
                username: username.to_string(),
                password: password.trim().to_string(),
            }),
            None => Err("usage: /login <username> <password>".to_string()),
        },
        "logout" => Ok(Command::Logout),
        "whoami" => Ok(Command::WhoAmI),
        "survey" if !args.is_empty() => Ok(Command::Survey(args.to_string())),
        "parent" => match args.split_once(' ') {
            Some((origin, raw)) => Ok(Command::Parent {
                origin: origin.to_string(),
                raw: raw.trim().to_string(),
            }),
            None => Err("usage: /parent <origin> <json>".to_string()),
        },
        "help" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        other => Err(format!("unknown or incomplete command: /{other} (try /help)")),
    }
}

const HELP: &str = "\
commands:
  <text>                 ask a question
  /clear                 start a new conversation
  /lang pt|en            switch language
  /good, /bad            rate the last answer (again to withdraw)
  /speak [file]          synthesize the last answer to an audio file
  /transcribe <file.wav> transcribe a recording and ask it
  /login <user> <pass>   log in
  /logout                log out
  /whoami                show the logged-in user
  /survey <id>           pick a survey profile
  /parent <origin> <json> deliver a message from the embedding page
  /quit                  exit";

fn last_rateable(conversation: &Conversation) -> Option<usize> {
    conversation
        .messages()
        .iter()
        .rposition(|m| m.allows_feedback)
}

async fn run_repl(
    session: &mut ChatSession<ApiClient, TerminalPresenter>,
    auth: &AuthService,
) -> std::io::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt()?;

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            prompt()?;
            continue;
        }
        let language = session.conversation().language();
        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(usage) => {
                println!("{usage}");
                prompt()?;
                continue;
            }
        };

        let gated = !matches!(
            command,
            Command::Login { .. } | Command::Help | Command::Quit
        );
        if gated && !auth.is_authenticated() {
            println!("Please /login first.");
            prompt()?;
            continue;
        }

        match command {
            Command::Ask(text) => {
                if let Err(e) = session.submit(&text).await {
                    println!("\n[error] {e}");
                    if session.conversation().has_request_error() {
                        println!("The answer was interrupted. Ask again to retry.");
                    }
                }
                println!();
            }
            Command::Clear => match session.clear() {
                Ok(()) => print_survey_options(session.conversation()),
                Err(e) => println!("[error] {e}"),
            },
            Command::Lang(new_language) => session.set_language(new_language),
            Command::Rate(feedback) => match last_rateable(session.conversation()) {
                Some(index) => {
                    if let Err(e) = session.toggle_feedback(index, feedback) {
                        println!("[error] {e}");
                    }
                }
                None => println!("Nothing to rate yet."),
            },
            Command::Speak(path) => match last_rateable(session.conversation()) {
                Some(index) => match session.speak(index, None).await {
                    Ok(audio) => {
                        if save_audio(&path, &audio).await {
                            println!("Audio written to {}", path.display());
                        }
                    }
                    Err(e) => println!("[error] {e}"),
                },
                None => println!("Nothing to speak yet."),
            },
            Command::Transcribe(path) => {
                if let Some(wav) = read_recording(&path).await {
                    match session.submit_recording(wav).await {
                        Ok(Some(_)) => println!(),
                        Ok(None) => println!("Nothing recognized."),
                        Err(e) => println!("\n[error] {e}"),
                    }
                }
            }
            Command::Login { username, password } => {
                match auth.login(&username, &password).await {
                    Ok(_) => println!("Logged in as {username}."),
                    Err(e) => println!("{}", login_failure(&e, language)),
                }
            }
            Command::Logout => {
                if let Err(e) = auth.logout() {
                    println!("[error] {e}");
                }
            }
            Command::WhoAmI => match auth.user_info() {
                Some(claims) => println!(
                    "{} <{}> ({})",
                    claims.sub.unwrap_or_default(),
                    claims.email.unwrap_or_default(),
                    claims.role.unwrap_or_default()
                ),
                None if auth.is_login_enabled() => println!("Not logged in."),
                None => match session.conversation().gate() {
                    Some(gate) => {
                        if let Some((name, email)) = gate.user() {
                            println!("{name} <{email}>");
                        }
                        println!(
                            "{} of {} questions used.",
                            gate.questions_made(),
                            gate.questions_allowed()
                        );
                    }
                    None => println!("Login is disabled."),
                },
            },
            Command::Survey(id) => {
                if let Err(e) = session.answer_survey(&id) {
                    println!("[error] {e}");
                }
            }
            Command::Parent { origin, raw } => {
                if let Err(e) = session.receive_parent_message(&origin, &raw) {
                    println!("[error] {e}");
                }
            }
            Command::Help => println!("{HELP}"),
            Command::Quit => break,
        }
        prompt()?;
    }
    Ok(())
}

fn login_failure(error: &AuthError, language: Language) -> &'static str {
    if let AuthError::Store(e) = error {
        tracing::error!(error = %e, "Login succeeded but token could not be stored");
    }
    error.message(language)
}

fn prompt() -> std::io::Result<()> {
    let mut out = std::io::stdout().lock();
    write!(out, "> ")?;
    out.flush()
}

fn print_survey_options(conversation: &Conversation) {
    if conversation.selected_survey().is_some() {
        return;
    }
    let language = conversation.language();
    for option in conversation.survey_options() {
        println!("  /survey {}  {}", option.id, option.name(language));
    }
}

// ============================================================================
// Terminal presenter
// ============================================================================

/// Write synthesized audio; a failure is reported and the REPL goes on.
async fn save_audio(path: &Path, audio: &[u8]) -> bool {
    match tokio::fs::write(path, audio).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to write audio");
            println!("[error] {e}");
            false
        }
    }
}

async fn read_recording(path: &Path) -> Option<Vec<u8>> {
    match tokio::fs::read(path).await {
        Ok(wav) => Some(wav),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to read recording");
            println!("[error] {e}");
            None
        }
    }
}

/// Plain text of a message as shown in the terminal
fn plain_text(message: &Message) -> String {
    Fragment::parse(message.display_html()).text_content()
}

fn label(kind: MessageKind) -> &'static str {
    match kind {
        MessageKind::Question => "you",
        MessageKind::Answer => "genai",
        MessageKind::Survey => "survey",
    }
}

/// Writes answers to stdout as they stream in
#[derive(Default)]
struct TerminalPresenter {
    /// Index and raw length of the message currently being streamed
    streaming: Mutex<Option<(usize, usize)>>,
}

impl Presenter for TerminalPresenter {
    fn message_updated(&self, index: usize, message: &Message) {
        let mut streaming = self.streaming.lock().unwrap_or_else(PoisonError::into_inner);
        let raw = message.raw_text();

        if !message.allows_feedback {
            // Fixed texts appear whole; the user's own questions are already on screen
            if message.kind != MessageKind::Question {
                println!("{}: {}", label(message.kind), plain_text(message));
            }
            *streaming = None;
            return;
        }

        let shown = match *streaming {
            Some((i, len)) if i == index => len,
            _ => {
                print!("{}: ", label(message.kind));
                0
            }
        };
        print!("{}", raw.get(shown..).unwrap_or_default());
        *streaming = Some((index, raw.len()));
    }

    fn reset(&self, messages: &[Message]) {
        *self.streaming.lock().unwrap_or_else(PoisonError::into_inner) = None;
        println!();
        for message in messages {
            println!("{}: {}", label(message.kind), plain_text(message));
        }
    }

    fn scroll_to_bottom(&self) {
        let _ = std::io::stdout().flush();
    }

    fn notify_parent(&self, message: &WidgetMessage) {
        match serde_json::to_string(message) {
            Ok(json) => println!("[parent] {json}"),
            Err(e) => tracing::warn!(error = %e, "Cannot encode widget message"),
        }
    }
}
