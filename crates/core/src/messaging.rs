use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Something the assistant asked the messaging gateway to deliver.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutboundMessage {
    Reply { reply_token: String, text: String },
    Push { identity: String, text: String },
    Buttons { identity: String, title: String, labels: Vec<String> },
}

/// Outbound side of the messaging gateway. Delivery is fire-and-forget:
/// implementations log their own failures and never report back.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn reply_message(&self, reply_token: &str, text: &str);
    async fn push_message(&self, identity: &str, text: &str);
    async fn push_buttons(&self, identity: &str, title: &str, labels: &[String]);
}

#[derive(Clone, Default)]
pub struct RecordingMessenger {
    messages: Arc<Mutex<Vec<OutboundMessage>>>,
}

impl RecordingMessenger {
    pub fn messages(&self) -> Vec<OutboundMessage> {
        match self.messages.lock() {
            Ok(messages) => messages.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Returns and forgets everything recorded so far.
    pub fn take(&self) -> Vec<OutboundMessage> {
        match self.messages.lock() {
            Ok(mut messages) => std::mem::take(&mut *messages),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }

    fn record(&self, message: OutboundMessage) {
        match self.messages.lock() {
            Ok(mut messages) => messages.push(message),
            Err(poisoned) => poisoned.into_inner().push(message),
        }
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn reply_message(&self, reply_token: &str, text: &str) {
        self.record(OutboundMessage::Reply {
            reply_token: reply_token.to_string(),
            text: text.to_string(),
        });
    }

    async fn push_message(&self, identity: &str, text: &str) {
        self.record(OutboundMessage::Push { identity: identity.to_string(), text: text.to_string() });
    }

    async fn push_buttons(&self, identity: &str, title: &str, labels: &[String]) {
        self.record(OutboundMessage::Buttons {
            identity: identity.to_string(),
            title: title.to_string(),
            labels: labels.to_vec(),
        });
    }
}
