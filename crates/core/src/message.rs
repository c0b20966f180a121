//! Message and Conversation domain types.
//!
//! These are the value objects that flow through a tutoring session:
//! Student sends a turn → Session assembles a request → Model responds → Session appends the reply.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The student
    User,
    /// The tutor model
    Assistant,
}

impl Role {
    /// The role name the generate-content API expects.
    pub fn wire_name(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "model",
        }
    }
}

/// Display-side description of a file that was sent with a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentSummary {
    pub name: String,

    pub mime_type: String,

    /// Preview reference, recorded for raster images only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_reference: Option<String>,
}

/// A single turn in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: String,

    /// Who sent this message
    pub role: Role,

    /// The text content shown to the student
    pub content: String,

    /// Timestamp
    pub timestamp: DateTime<Utc>,

    /// The file sent with this turn, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<AttachmentSummary>,
}

impl Message {
    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content.into(), None)
    }

    /// Create a new user message that carried a file.
    pub fn user_with_attachment(content: impl Into<String>, attachment: AttachmentSummary) -> Self {
        Self::new(Role::User, content.into(), Some(attachment))
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content.into(), None)
    }

    fn new(role: Role, content: String, attachment: Option<AttachmentSummary>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content,
            timestamp: Utc::now(),
            attachment,
        }
    }
}

/// An ordered message log. Insertion order is causal order; messages are
/// never edited once appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    messages: Vec<Message>,

    /// When this conversation was created
    pub created_at: DateTime<Utc>,

    /// When the last message was added
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Create a new empty conversation.
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Add a message to the conversation.
    pub fn push(&mut self, message: Message) {
        self.updated_at = Utc::now();
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_user_message() {
        let msg = Message::user("What is 3/4 + 1/8?");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "What is 3/4 + 1/8?");
        assert!(msg.attachment.is_none());
    }

    #[test]
    fn assistant_role_maps_to_model_on_the_wire() {
        assert_eq!(Role::Assistant.wire_name(), "model");
        assert_eq!(Role::User.wire_name(), "user");
    }

    #[test]
    fn conversation_preserves_insertion_order() {
        let mut conv = Conversation::new();
        let created = conv.created_at;

        conv.push(Message::assistant("Hello!"));
        conv.push(Message::user("Hi"));
        assert_eq!(conv.len(), 2);
        assert_eq!(conv.messages()[0].role, Role::Assistant);
        assert_eq!(conv.last().map(|m| m.content.as_str()), Some("Hi"));
        assert!(conv.updated_at >= created);
    }

    #[test]
    fn attachment_summary_is_omitted_when_absent() {
        let json = serde_json::to_string(&Message::user("plain")).unwrap();
        assert!(!json.contains("attachment"));

        let msg = Message::user_with_attachment(
            "[Sent file: hw.pdf]",
            AttachmentSummary {
                name: "hw.pdf".into(),
                mime_type: "application/pdf".into(),
                preview_reference: None,
            },
        );
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("hw.pdf"));
        assert!(!json.contains("preview_reference"));
    }
}
