//! Display descriptions built from state snapshots.
//!
//! Nothing here touches storage or mutates state; front-ends (terminal,
//! WebSocket) turn these values into output.

use serde::{ Deserialize, Serialize };

use crate::agent::Command;
use crate::models::chat::{ ChatMessage, Conversation, Sender };

pub const THINKING_TEXT: &str = "AI is thinking...";

#[derive(Debug, Clone, PartialEq)]
pub struct MessageView {
    pub text: String,
    pub sender: Sender,
    pub steps: Option<String>,
}

impl From<&ChatMessage> for MessageView {
    fn from(message: &ChatMessage) -> Self {
        Self {
            text: message.text.clone(),
            sender: message.sender,
            steps: message.steps.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SidebarEntry {
    pub id: i64,
    pub title: String,
    pub active: bool,
}

impl SidebarEntry {
    pub fn load_command(&self) -> Command {
        Command::Load(self.id)
    }

    /// Asks for deletion only; loading never follows from it.
    pub fn delete_command(&self) -> Command {
        Command::Delete(self.id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SidebarView {
    pub visible: bool,
    pub entries: Vec<SidebarEntry>,
}

impl SidebarView {
    /// 1-based position lookup, as shown in listings.
    pub fn entry_at(&self, position: usize) -> Option<&SidebarEntry> {
        position.checked_sub(1).and_then(|i| self.entries.get(i))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    Append(MessageView),
    Thinking,
    ThinkingCleared,
    ClearTranscript,
    Sidebar(SidebarView),
    Notice(String),
    Speak(String),
    ConfirmDelete {
        id: i64,
        prompt: String,
    },
}

pub trait EventSink {
    fn emit(&mut self, event: UiEvent);
}

impl EventSink for Vec<UiEvent> {
    fn emit(&mut self, event: UiEvent) {
        self.push(event);
    }
}

pub fn render_sidebar(conversations: &[Conversation], active_id: i64, visible: bool) -> SidebarView {
    SidebarView {
        visible,
        entries: conversations
            .iter()
            .map(|c| SidebarEntry {
                id: c.id,
                title: c.title.clone(),
                active: c.id == active_id,
            })
            .collect(),
    }
}

pub fn render_transcript(conversation: &Conversation) -> Vec<MessageView> {
    conversation.messages.iter().map(MessageView::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn titled(id: i64, title: &str) -> Conversation {
        let mut conv = Conversation::new(id);
        conv.push(ChatMessage::user(title));
        conv
    }

    #[test]
    fn sidebar_marks_only_the_active_entry() {
        let conversations = vec![titled(3, "c"), titled(2, "b"), titled(1, "a")];
        let view = render_sidebar(&conversations, 2, true);

        let active: Vec<i64> = view.entries.iter().filter(|e| e.active).map(|e| e.id).collect();
        assert_eq!(active, vec![2]);
        assert_eq!(view.entries[0].title, "c");
    }

    #[test]
    fn sidebar_without_active_member_marks_nothing() {
        let view = render_sidebar(&[titled(1, "a")], 99, false);
        assert!(!view.visible);
        assert!(view.entries.iter().all(|e| !e.active));
    }

    #[test]
    fn entry_commands_are_distinct() {
        let entry = SidebarEntry { id: 7, title: "x".into(), active: false };
        assert_eq!(entry.load_command(), Command::Load(7));
        assert_eq!(entry.delete_command(), Command::Delete(7));
    }

    #[test]
    fn entry_positions_are_one_based() {
        let view = render_sidebar(&[titled(2, "b"), titled(1, "a")], 1, true);
        assert_eq!(view.entry_at(1).map(|e| e.id), Some(2));
        assert_eq!(view.entry_at(2).map(|e| e.id), Some(1));
        assert!(view.entry_at(0).is_none());
        assert!(view.entry_at(3).is_none());
    }

    #[test]
    fn transcript_keeps_message_order_and_steps() {
        let mut conv = titled(1, "square of 9");
        conv.push(ChatMessage::bot("Answer: 81", Some("9 × 9".into())));

        let transcript = render_transcript(&conv);
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript[1].sender, Sender::Bot);
        assert_eq!(transcript[1].steps.as_deref(), Some("9 × 9"));
    }
}
