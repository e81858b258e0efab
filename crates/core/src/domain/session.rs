use serde::{Deserialize, Serialize};

use crate::flows::states::ConversationState;

/// Persisted per-identity conversation record. `action` and `contents` are
/// the stored encoding of a [`ConversationState`]; callers go through
/// [`Session::state`] and [`Session::set_state`] rather than the raw fields.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub messaging_id: String,
    pub action: Option<String>,
    pub contents: Option<String>,
}

impl Session {
    pub fn new(messaging_id: impl Into<String>) -> Self {
        Self { messaging_id: messaging_id.into(), action: None, contents: None }
    }

    pub fn state(&self) -> ConversationState {
        ConversationState::decode(self.action.as_deref(), self.contents.as_deref())
    }

    pub fn set_state(&mut self, state: &ConversationState) {
        let (action, contents) = state.encode();
        self.action = action.map(str::to_string);
        self.contents = contents;
    }
}
