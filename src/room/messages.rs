//! Values exchanged with the registry
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ClientId;
use crate::error::Result;
use crate::validation_error;

/// A message as stored in the room log.
/// `sent_at` is stamped by the registry loop when the intent is applied.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct ChatMessage {
    #[serde(rename = "clientID")]
    pub sender: ClientId,
    #[serde(rename = "message")]
    pub text: String,
    #[serde(rename = "sentTime")]
    pub sent_at: DateTime<Utc>,
}

/// A message submitted by a client, before the registry timestamps it
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewMessage {
    pub sender: ClientId,
    pub text: String,
}

impl NewMessage {
    pub fn new(sender: ClientId, text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(validation_error!("Message content is required."));
        }
        Ok(Self { sender, text })
    }

    pub(crate) fn stamp(self, sent_at: DateTime<Utc>) -> ChatMessage {
        ChatMessage {
            sender: self.sender,
            text: self.text,
            sent_at,
        }
    }
}

/// Kinds of intent the registry loop applies
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    Join,
    Leave,
    Message,
}

impl std::fmt::Display for IntentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IntentKind::Join => write!(f, "join"),
            IntentKind::Leave => write!(f, "leave"),
            IntentKind::Message => write!(f, "message"),
        }
    }
}

/// Receipt for an intent that has been queued. It does not mean the intent
/// has been applied yet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Accepted {
    #[serde(rename = "clientID")]
    pub client_id: ClientId,
    pub intent: IntentKind,
}

/// Snapshot of the room log returned to a member
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct HistoryResponse {
    pub messages: Vec<ChatMessage>,
    #[serde(rename = "clientID")]
    pub client_id: ClientId,
    #[serde(rename = "respondedAt")]
    pub responded_at: DateTime<Utc>,
    #[serde(rename = "message", skip_serializing_if = "Option::is_none", default)]
    pub notice: Option<String>,
}

impl HistoryResponse {
    pub fn new(client_id: ClientId, messages: Vec<ChatMessage>) -> Self {
        let notice = messages.is_empty().then(|| "No new messages".to_string());
        Self {
            messages,
            client_id,
            responded_at: Utc::now(),
            notice,
        }
    }
}
