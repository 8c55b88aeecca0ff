use log::{ debug, error, info };
use std::error::Error;
use std::time::Duration;

use crate::calc::classify;
use crate::cli::Args;
use crate::history::{ create_storage_backend, ConversationStore };
use crate::models::chat::{ ChatMessage, Conversation, Sender };
use crate::state::{ AppState, IdGenerator };
use crate::view::{ render_sidebar, render_transcript, EventSink, MessageView, SidebarView, UiEvent };

pub const DELETE_PROMPT: &str = "Delete this conversation?";
pub const SAVE_FAILED: &str = "Could not save conversation history.";

/// Everything a user can ask the calculator chat to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Submit(String),
    NewChat,
    Load(i64),
    /// Asks for confirmation; nothing is removed yet.
    Delete(i64),
    ConfirmDelete(i64),
    ToggleVoice,
    ToggleSidebar,
}

/// Owns the application state and the conversation store. Every mutation
/// goes through here and is reported to the caller's [`EventSink`].
pub struct CalcAgent {
    state: AppState,
    store: ConversationStore,
    thinking_delay: Duration,
}

impl CalcAgent {
    pub async fn new(args: &Args) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let backend = create_storage_backend(args)?;
        let store = ConversationStore::open(backend).await?;
        info!(
            "Calculator chat ready: voice {}, thinking delay {} ms",
            if args.voice_enabled { "on" } else { "off" },
            args.thinking_delay_ms
        );
        Ok(Self::with_store(store, args.voice_enabled, args.thinking_delay()))
    }

    pub fn with_store(store: ConversationStore, voice_enabled: bool, thinking_delay: Duration) -> Self {
        let mut ids = IdGenerator::default();
        for conversation in store.list() {
            ids.observe(conversation.id);
        }
        Self {
            state: AppState::new(voice_enabled, ids),
            store,
            thinking_delay,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn active(&self) -> &Conversation {
        self.state.active()
    }

    pub fn conversations(&self) -> &[Conversation] {
        self.store.list()
    }

    pub fn conversation(&self, id: i64) -> Option<&Conversation> {
        self.store.get(id)
    }

    pub fn sidebar(&self) -> SidebarView {
        render_sidebar(self.store.list(), self.state.active_id(), self.state.sidebar_visible())
    }

    pub fn transcript(&self) -> Vec<MessageView> {
        render_transcript(self.state.active())
    }

    pub async fn dispatch<S: EventSink + Send>(&mut self, command: Command, sink: &mut S) {
        debug!("Dispatching {:?}", command);
        match command {
            Command::Submit(text) => self.submit(&text, sink).await,
            Command::NewChat => self.new_conversation(sink),
            Command::Load(id) => {
                self.load_conversation(id, sink);
            }
            Command::Delete(id) => self.request_delete(id, sink),
            Command::ConfirmDelete(id) => {
                self.confirm_delete(id, sink).await;
            }
            Command::ToggleVoice => self.toggle_voice(sink),
            Command::ToggleSidebar => self.toggle_sidebar(sink),
        }
    }

    /// Full exchange for one utterance. Blank input is ignored.
    pub async fn submit<S: EventSink + Send>(&mut self, utterance: &str, sink: &mut S) {
        let text = utterance.trim();
        if text.is_empty() {
            return;
        }

        self.append(ChatMessage::user(text), true, sink);
        sink.emit(UiEvent::Thinking);
        tokio::time::sleep(self.thinking_delay).await;
        sink.emit(UiEvent::ThinkingCleared);

        let result = classify(text);
        self.append(ChatMessage::bot(result.answer, result.steps), true, sink);
        self.save_active(sink).await;
    }

    /// Shows a message; with `persist` it also joins the active conversation.
    fn append<S: EventSink>(&mut self, message: ChatMessage, persist: bool, sink: &mut S) {
        sink.emit(UiEvent::Append(MessageView::from(&message)));
        let speak = message.sender == Sender::Bot && self.state.voice_enabled();
        let spoken = speak.then(|| message.text.clone());

        if persist && self.state.active_mut().push(message) {
            debug!("Conversation {} titled '{}'", self.state.active_id(), self.state.active().title);
            sink.emit(UiEvent::Sidebar(self.sidebar()));
        }

        if let Some(text) = spoken {
            sink.emit(UiEvent::Speak(text));
        }
    }

    async fn save_active<S: EventSink>(&mut self, sink: &mut S) {
        if let Err(e) = self.store.save(self.state.active()).await {
            error!("Failed to persist conversation {}: {}", self.state.active_id(), e);
            sink.emit(UiEvent::Notice(SAVE_FAILED.to_string()));
        }
        sink.emit(UiEvent::Sidebar(self.sidebar()));
    }

    pub fn new_conversation<S: EventSink>(&mut self, sink: &mut S) {
        let id = self.state.reset_active();
        debug!("Started conversation {}", id);
        sink.emit(UiEvent::ClearTranscript);
        sink.emit(UiEvent::Sidebar(self.sidebar()));
    }

    /// Makes a stored conversation active. Unknown ids change nothing.
    pub fn load_conversation<S: EventSink>(&mut self, id: i64, sink: &mut S) -> bool {
        let Some(conversation) = self.store.get(id).cloned() else {
            debug!("Load ignored, no conversation {}", id);
            return false;
        };

        sink.emit(UiEvent::ClearTranscript);
        let messages = conversation.messages.clone();
        self.state.set_active(conversation);
        for message in messages {
            self.append(message, false, sink);
        }
        sink.emit(UiEvent::Sidebar(self.sidebar()));
        true
    }

    pub fn request_delete<S: EventSink>(&self, id: i64, sink: &mut S) {
        sink.emit(UiEvent::ConfirmDelete {
            id,
            prompt: DELETE_PROMPT.to_string(),
        });
    }

    /// Removes a conversation after the user confirmed. Deleting the active
    /// one leaves a fresh, unsaved conversation in its place.
    pub async fn confirm_delete<S: EventSink>(&mut self, id: i64, sink: &mut S) -> bool {
        let removed = match self.store.remove(id).await {
            Ok(removed) => removed,
            Err(e) => {
                error!("Failed to persist deletion of {}: {}", id, e);
                sink.emit(UiEvent::Notice(SAVE_FAILED.to_string()));
                !self.store.contains(id)
            }
        };

        if self.state.active_id() == id {
            self.state.reset_active();
            sink.emit(UiEvent::ClearTranscript);
        }
        info!("Deleted conversation {} (present: {})", id, removed);
        sink.emit(UiEvent::Sidebar(self.sidebar()));
        removed
    }

    pub fn toggle_voice<S: EventSink>(&mut self, sink: &mut S) {
        let on = self.state.toggle_voice();
        sink.emit(UiEvent::Notice(format!("Voice replies {}", if on { "ON" } else { "OFF" })));
    }

    pub fn toggle_sidebar<S: EventSink>(&mut self, sink: &mut S) {
        self.state.toggle_sidebar();
        sink.emit(UiEvent::Sidebar(self.sidebar()));
    }

    /// Redraws everything for a freshly attached front-end, without speaking.
    pub fn snapshot<S: EventSink>(&self, sink: &mut S) {
        sink.emit(UiEvent::ClearTranscript);
        for message in self.transcript() {
            sink.emit(UiEvent::Append(message));
        }
        sink.emit(UiEvent::Sidebar(self.sidebar()));
    }
}
