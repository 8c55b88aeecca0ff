use chrono::Utc;
use serde::{ Serialize, Deserialize };

use crate::agent::Command;
use crate::models::chat::Sender;
use crate::view::{ SidebarEntry, UiEvent };

#[derive(Serialize, Deserialize, Debug, PartialEq)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "chat")] Chat {
        content: String,
    },
    #[serde(rename = "new_chat")]
    NewChat,
    #[serde(rename = "load")] Load {
        id: i64,
    },
    #[serde(rename = "delete")] Delete {
        id: i64,
    },
    #[serde(rename = "confirm_delete")] ConfirmDelete {
        id: i64,
    },
    #[serde(rename = "toggle_voice")]
    ToggleVoice,
    #[serde(rename = "toggle_sidebar")]
    ToggleSidebar,
    #[serde(rename = "sync")]
    Sync,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "message")] Message {
        text: String,
        sender: Sender,
        steps: Option<String>,
        timestamp: i64,
    },
    #[serde(rename = "processing")]
    Processing,
    #[serde(rename = "processing_done")]
    ProcessingDone,
    #[serde(rename = "clear")]
    Clear,
    #[serde(rename = "sidebar")] Sidebar {
        visible: bool,
        entries: Vec<SidebarEntry>,
    },
    #[serde(rename = "notice")] Notice {
        message: String,
    },
    #[serde(rename = "speak")] Speak {
        text: String,
    },
    #[serde(rename = "confirm_delete")] ConfirmDelete {
        id: i64,
        prompt: String,
    },
    #[serde(rename = "error")] Error {
        message: String,
    },
}

impl ClientMessage {
    /// `None` for frames that only ask for a redraw.
    pub fn into_command(self) -> Option<Command> {
        match self {
            ClientMessage::Chat { content } => Some(Command::Submit(content)),
            ClientMessage::NewChat => Some(Command::NewChat),
            ClientMessage::Load { id } => Some(Command::Load(id)),
            ClientMessage::Delete { id } => Some(Command::Delete(id)),
            ClientMessage::ConfirmDelete { id } => Some(Command::ConfirmDelete(id)),
            ClientMessage::ToggleVoice => Some(Command::ToggleVoice),
            ClientMessage::ToggleSidebar => Some(Command::ToggleSidebar),
            ClientMessage::Sync => None,
        }
    }
}

impl From<UiEvent> for ServerMessage {
    fn from(event: UiEvent) -> Self {
        match event {
            UiEvent::Append(message) => ServerMessage::Message {
                text: message.text,
                sender: message.sender,
                steps: message.steps,
                timestamp: Utc::now().timestamp(),
            },
            UiEvent::Thinking => ServerMessage::Processing,
            UiEvent::ThinkingCleared => ServerMessage::ProcessingDone,
            UiEvent::ClearTranscript => ServerMessage::Clear,
            UiEvent::Sidebar(view) => ServerMessage::Sidebar {
                visible: view.visible,
                entries: view.entries,
            },
            UiEvent::Notice(message) => ServerMessage::Notice { message },
            UiEvent::Speak(text) => ServerMessage::Speak { text },
            UiEvent::ConfirmDelete { id, prompt } => ServerMessage::ConfirmDelete { id, prompt },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::{ MessageView, SidebarView };

    #[test]
    fn client_frames_parse_by_type_tag() {
        let chat: ClientMessage = serde_json::from_str(r#"{"type":"chat","content":"5 add 3"}"#).unwrap();
        assert_eq!(chat.into_command(), Some(Command::Submit("5 add 3".into())));

        let delete: ClientMessage = serde_json::from_str(r#"{"type":"delete","id":17}"#).unwrap();
        assert_eq!(delete.into_command(), Some(Command::Delete(17)));

        let sync: ClientMessage = serde_json::from_str(r#"{"type":"sync"}"#).unwrap();
        assert_eq!(sync.into_command(), None);

        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"eval","code":"1+1"}"#).is_err());
    }

    #[test]
    fn bot_message_frame_carries_steps() {
        let frame = ServerMessage::from(UiEvent::Append(MessageView {
            text: "Answer: 81".into(),
            sender: Sender::Bot,
            steps: Some("9 × 9".into()),
        }));
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["type"], "message");
        assert_eq!(json["sender"], "bot");
        assert_eq!(json["steps"], "9 × 9");
    }

    #[test]
    fn thinking_maps_to_processing_frames() {
        assert_eq!(
            serde_json::to_string(&ServerMessage::from(UiEvent::Thinking)).unwrap(),
            r#"{"type":"processing"}"#
        );
        assert_eq!(
            serde_json::to_string(&ServerMessage::from(UiEvent::ThinkingCleared)).unwrap(),
            r#"{"type":"processing_done"}"#
        );
    }

    #[test]
    fn sidebar_frame_lists_entries() {
        let frame = ServerMessage::from(UiEvent::Sidebar(SidebarView {
            visible: true,
            entries: vec![SidebarEntry { id: 1, title: "square of 9".into(), active: true }],
        }));
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["entries"][0]["title"], "square of 9");
        assert_eq!(json["entries"][0]["active"], true);
    }
}
