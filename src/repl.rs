//! Terminal chat: each line is an utterance unless it starts with `/`.

use log::{ debug, warn };
use std::error::Error;
use std::io::{ self, Write };
use tokio::io::{ AsyncBufReadExt, BufReader };

use crate::agent::{ CalcAgent, Command };
use crate::cli::Args;
use crate::models::chat::Sender;
use crate::view::{ EventSink, SidebarView, UiEvent, THINKING_TEXT };
use crate::voice::{ create_recognizer, create_speaker, Speaker };

const HELP: &str = "\
Type a question such as \"12 percent of 50\" or \"5 add 3 add 2\" and press Enter.
  /new         start a new chat
  /list        show saved chats
  /load N      open chat N from the list
  /delete N    delete chat N from the list
  /mic         ask by voice
  /voice       toggle spoken replies
  /sidebar     toggle the chat list
  /quit        leave";

#[derive(Debug, PartialEq, Eq)]
pub enum ReplInput {
    Utterance(String),
    New,
    List,
    Load(usize),
    Delete(usize),
    Mic,
    Voice,
    Sidebar,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

pub fn parse_input(line: &str) -> ReplInput {
    let line = line.trim();
    if line.is_empty() {
        return ReplInput::Empty;
    }
    let Some(command) = line.strip_prefix('/') else {
        return ReplInput::Utterance(line.to_string());
    };

    let mut parts = command.split_whitespace();
    let name = parts.next().unwrap_or_default().to_lowercase();
    let position = parts.next().and_then(|p| p.parse::<usize>().ok());

    match (name.as_str(), position) {
        ("new", _) => ReplInput::New,
        ("list", _) => ReplInput::List,
        ("load", Some(n)) => ReplInput::Load(n),
        ("delete", Some(n)) => ReplInput::Delete(n),
        ("mic", _) => ReplInput::Mic,
        ("voice", _) => ReplInput::Voice,
        ("sidebar", _) => ReplInput::Sidebar,
        ("help", _) => ReplInput::Help,
        ("quit" | "exit", _) => ReplInput::Quit,
        _ => ReplInput::Unknown(line.to_string()),
    }
}

pub fn is_confirmation(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

/// Writes [`UiEvent`]s to a terminal and routes speech to a [`Speaker`].
pub struct TerminalRenderer<W: Write> {
    out: W,
    speaker: Box<dyn Speaker>,
    sidebar: Option<SidebarView>,
    pending_delete: Option<i64>,
}

impl<W: Write> TerminalRenderer<W> {
    pub fn new(out: W, speaker: Box<dyn Speaker>) -> Self {
        Self { out, speaker, sidebar: None, pending_delete: None }
    }

    pub fn sidebar(&self) -> Option<&SidebarView> {
        self.sidebar.as_ref()
    }

    pub fn take_pending_delete(&mut self) -> Option<i64> {
        self.pending_delete.take()
    }

    pub fn line(&mut self, text: &str) {
        if let Err(e) = writeln!(self.out, "{}", text) {
            debug!("Terminal write failed: {}", e);
        }
    }

    fn partial(&mut self, text: &str) {
        if let Err(e) = write!(self.out, "{}", text).and_then(|_| self.out.flush()) {
            debug!("Terminal write failed: {}", e);
        }
    }

    pub fn prompt(&mut self) {
        self.partial("> ");
    }

    pub fn print_sidebar(&mut self) {
        let Some(view) = self.sidebar.clone() else {
            return;
        };
        if !view.visible {
            self.line("(chat list hidden, /sidebar to show it)");
            return;
        }
        if view.entries.is_empty() {
            self.line("No saved chats yet.");
            return;
        }
        for (i, entry) in view.entries.iter().enumerate() {
            let marker = if entry.active { '*' } else { ' ' };
            self.line(&format!("{} {:>2}. {}", marker, i + 1, entry.title));
        }
    }
}

impl<W: Write + Send> EventSink for TerminalRenderer<W> {
    fn emit(&mut self, event: UiEvent) {
        match event {
            UiEvent::Append(message) => {
                let who = match message.sender {
                    Sender::User => "You",
                    Sender::Bot => "Bot",
                };
                self.line(&format!("{}: {}", who, message.text));
                if let Some(steps) = message.steps {
                    for step in steps.lines() {
                        self.line(&format!("     {}", step));
                    }
                }
            }
            UiEvent::Thinking => self.partial(THINKING_TEXT),
            UiEvent::ThinkingCleared => self.partial("\r\x1b[2K"),
            UiEvent::ClearTranscript => self.line(&"-".repeat(40)),
            UiEvent::Sidebar(view) => {
                let toggled = self.sidebar.as_ref().is_some_and(|old| old.visible != view.visible);
                self.sidebar = Some(view);
                if toggled {
                    self.print_sidebar();
                }
            }
            UiEvent::Notice(text) => self.line(&format!("* {}", text)),
            UiEvent::Speak(text) => {
                if let Err(e) = self.speaker.speak(&text) {
                    warn!("Could not speak reply: {}", e);
                }
            }
            UiEvent::ConfirmDelete { id, prompt } => {
                self.pending_delete = Some(id);
                self.partial(&format!("{} [y/N] ", prompt));
            }
        }
    }
}

pub async fn run(args: &Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    let mut agent = CalcAgent::new(args).await?;
    let recognizer = create_recognizer(args)?;
    let mut renderer = TerminalRenderer::new(io::stdout(), create_speaker(args)?);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    renderer.line("Calculator chat. /help for commands.");
    agent.snapshot(&mut renderer);

    loop {
        if renderer.pending_delete.is_none() {
            renderer.prompt();
        }
        let Some(line) = lines.next_line().await? else {
            break;
        };

        if let Some(id) = renderer.take_pending_delete() {
            if is_confirmation(&line) {
                agent.dispatch(Command::ConfirmDelete(id), &mut renderer).await;
                renderer.line("Deleted.");
            } else {
                renderer.line("Kept.");
            }
            continue;
        }

        match parse_input(&line) {
            ReplInput::Empty => {}
            ReplInput::Utterance(text) => {
                agent.dispatch(Command::Submit(text), &mut renderer).await;
            }
            ReplInput::New => agent.dispatch(Command::NewChat, &mut renderer).await,
            ReplInput::List => renderer.print_sidebar(),
            ReplInput::Load(n) | ReplInput::Delete(n) if agent.sidebar().entry_at(n).is_none() => {
                renderer.line(&format!("No chat number {}. /list shows them.", n));
            }
            ReplInput::Load(n) => {
                if let Some(command) = agent.sidebar().entry_at(n).map(|e| e.load_command()) {
                    agent.dispatch(command, &mut renderer).await;
                }
            }
            ReplInput::Delete(n) => {
                if let Some(command) = agent.sidebar().entry_at(n).map(|e| e.delete_command()) {
                    agent.dispatch(command, &mut renderer).await;
                }
            }
            ReplInput::Mic => {
                renderer.line("Listening...");
                match recognizer.listen().await {
                    Ok(Some(text)) => agent.dispatch(Command::Submit(text), &mut renderer).await,
                    Ok(None) => renderer.line("* Didn't catch that."),
                    Err(e) => {
                        warn!("Speech capture failed: {}", e);
                        renderer.line(&format!("* Voice input unavailable: {}", e));
                    }
                }
            }
            ReplInput::Voice => agent.dispatch(Command::ToggleVoice, &mut renderer).await,
            ReplInput::Sidebar => agent.dispatch(Command::ToggleSidebar, &mut renderer).await,
            ReplInput::Help => renderer.line(HELP),
            ReplInput::Quit => break,
            ReplInput::Unknown(text) => renderer.line(&format!("Unknown command {}. /help lists them.", text)),
        }
    }

    debug!("Leaving terminal chat");
    Ok(())
}
