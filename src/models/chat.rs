use serde::{ Serialize, Deserialize };

pub const DEFAULT_TITLE: &str = "New chat";
pub const TITLE_MAX_CHARS: usize = 30;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub text: String,
    pub sender: Sender,
    #[serde(default)]
    pub steps: Option<String>,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self { text: text.into(), sender: Sender::User, steps: None }
    }

    pub fn bot(text: impl Into<String>, steps: Option<String>) -> Self {
        Self { text: text.into(), sender: Sender::Bot, steps }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

impl Conversation {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            title: DEFAULT_TITLE.to_string(),
            messages: Vec::new(),
        }
    }

    pub fn has_user_message(&self) -> bool {
        self.messages.iter().any(|m| m.sender == Sender::User)
    }

    /// Appends a message. Returns `true` when this message set the title,
    /// which happens once, on the first user message.
    pub fn push(&mut self, message: ChatMessage) -> bool {
        let retitle = message.sender == Sender::User && !self.has_user_message();
        if retitle {
            self.title = message.text.chars().take(TITLE_MAX_CHARS).collect();
        }
        self.messages.push(message);
        retitle
    }
}
