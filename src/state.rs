use chrono::Utc;

use crate::models::chat::Conversation;

/// Hands out creation-time ids, strictly increasing even within one millisecond.
#[derive(Debug, Default)]
pub struct IdGenerator {
    last: i64,
}

impl IdGenerator {
    pub fn next(&mut self) -> i64 {
        let now = Utc::now().timestamp_millis();
        self.last = now.max(self.last.saturating_add(1));
        self.last
    }

    /// Ensures later ids land above `id`.
    pub fn observe(&mut self, id: i64) {
        self.last = self.last.max(id);
    }
}

#[derive(Debug)]
pub struct AppState {
    active: Conversation,
    voice_enabled: bool,
    sidebar_visible: bool,
    ids: IdGenerator,
}

impl AppState {
    pub fn new(voice_enabled: bool, mut ids: IdGenerator) -> Self {
        let active = Conversation::new(ids.next());
        Self {
            active,
            voice_enabled,
            sidebar_visible: true,
            ids,
        }
    }

    pub fn active(&self) -> &Conversation {
        &self.active
    }

    pub fn active_mut(&mut self) -> &mut Conversation {
        &mut self.active
    }

    pub fn active_id(&self) -> i64 {
        self.active.id
    }

    pub fn set_active(&mut self, conversation: Conversation) {
        self.ids.observe(conversation.id);
        self.active = conversation;
    }

    /// Replaces the active conversation with a fresh empty one.
    pub fn reset_active(&mut self) -> i64 {
        self.active = Conversation::new(self.ids.next());
        self.active.id
    }

    pub fn voice_enabled(&self) -> bool {
        self.voice_enabled
    }

    pub fn toggle_voice(&mut self) -> bool {
        self.voice_enabled = !self.voice_enabled;
        self.voice_enabled
    }

    pub fn sidebar_visible(&self) -> bool {
        self.sidebar_visible
    }

    pub fn toggle_sidebar(&mut self) -> bool {
        self.sidebar_visible = !self.sidebar_visible;
        self.sidebar_visible
    }
}
