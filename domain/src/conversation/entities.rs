//! Conversation domain entities

use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use uuid::Uuid;

/// Title given to the placeholder conversation shown on first launch.
pub const WELCOME_TITLE: &str = "Welcome";

/// Title used when a conversation is created without one.
pub const NEW_CONVERSATION_TITLE: &str = "New conversation";

/// Unique identifier of a [`Conversation`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(Uuid);

impl ConversationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// The nil id, used as a marker for records that lost their parent link.
    pub fn nil() -> Self {
        Self(Uuid::nil())
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier of a [`Message`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(Uuid);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Role of a message author
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

/// How a message's content should be interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    #[default]
    Text,
    Html,
}

/// A single message in a conversation (Entity)
///
/// Content may only change while `is_streaming` is set. Equality is identity-based.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(default)]
    id: MessageId,
    #[serde(default = "ConversationId::nil")]
    conversation_id: ConversationId,
    #[serde(default)]
    role: Role,
    #[serde(default, alias = "contentType")]
    content_kind: ContentKind,
    #[serde(default)]
    content: String,
    #[serde(
        default = "Utc::now",
        alias = "timestamp",
        deserialize_with = "deserialize_timestamp"
    )]
    created_at: DateTime<Utc>,
    #[serde(default)]
    is_streaming: bool,
}

impl Message {
    /// A plain-text prompt typed by the user.
    pub fn user_text(conversation_id: ConversationId, content: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            conversation_id,
            role: Role::User,
            content_kind: ContentKind::Text,
            content: content.into(),
            created_at: Utc::now(),
            is_streaming: false,
        }
    }

    /// An empty HTML assistant message that is about to receive streamed content.
    pub fn assistant_placeholder(conversation_id: ConversationId) -> Self {
        Self {
            id: MessageId::new(),
            conversation_id,
            role: Role::Assistant,
            content_kind: ContentKind::Html,
            content: String::new(),
            created_at: Utc::now(),
            is_streaming: true,
        }
    }

    pub fn id(&self) -> MessageId {
        self.id
    }

    pub fn conversation_id(&self) -> ConversationId {
        self.conversation_id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content_kind(&self) -> ContentKind {
        self.content_kind
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_streaming(&self) -> bool {
        self.is_streaming
    }

    /// Overwrite the content of a message that is still streaming.
    ///
    /// Returns `false` (and leaves the message untouched) once streaming has ended.
    pub fn update_streaming_content(&mut self, content: &str) -> bool {
        if !self.is_streaming {
            return false;
        }
        self.content.clear();
        self.content.push_str(content);
        true
    }

    /// Set the final content and clear the streaming flag.
    pub fn finish(&mut self, content: impl Into<String>) -> bool {
        if !self.is_streaming {
            return false;
        }
        self.content = content.into();
        self.is_streaming = false;
        true
    }

    /// Clear the streaming flag, keeping whatever content arrived so far.
    pub fn abandon(&mut self) -> bool {
        let was_streaming = self.is_streaming;
        self.is_streaming = false;
        was_streaming
    }
}

impl PartialEq for Message {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Message {}

/// A conversation owning an ordered list of messages (Entity)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    #[serde(default)]
    id: ConversationId,
    #[serde(default)]
    title: String,
    #[serde(default)]
    messages: Vec<Message>,
    #[serde(default = "Utc::now", deserialize_with = "deserialize_timestamp")]
    created_at: DateTime<Utc>,
    #[serde(default = "Utc::now", deserialize_with = "deserialize_timestamp")]
    updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn new(title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: ConversationId::new(),
            title: title.into(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// The empty placeholder conversation created when nothing has been stored yet.
    pub fn welcome() -> Self {
        Self::new(WELCOME_TITLE)
    }

    pub fn id(&self) -> ConversationId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// True for the untouched welcome placeholder (fixed title, no messages).
    pub fn is_welcome_placeholder(&self) -> bool {
        self.title == WELCOME_TITLE && self.messages.is_empty()
    }

    pub fn rename(&mut self, title: impl Into<String>) {
        self.title = title.into();
        self.touch();
    }

    /// Append a message, re-parenting it to this conversation.
    pub fn push_message(&mut self, mut message: Message) -> MessageId {
        message.conversation_id = self.id;
        let id = message.id;
        self.messages.push(message);
        self.touch();
        id
    }

    pub fn message(&self, id: MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    /// Mutable access to a message; bumps `updated_at`.
    pub fn message_mut(&mut self, id: MessageId) -> Option<&mut Message> {
        let index = self.messages.iter().position(|m| m.id == id)?;
        self.touch();
        self.messages.get_mut(index)
    }

    pub fn last_assistant_message(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.role == Role::Assistant)
    }

    /// Content of the last HTML message, or `""` if there is none.
    pub fn latest_renderable_content(&self) -> &str {
        self.messages
            .iter()
            .rev()
            .find(|m| m.content_kind == ContentKind::Html)
            .map(|m| m.content.as_str())
            .unwrap_or("")
    }

    /// Repair records read back from storage.
    ///
    /// Re-links messages to this conversation and clears streaming flags left
    /// behind by a process that exited mid-stream. Returns the number of
    /// messages whose streaming flag was cleared.
    pub fn normalize_loaded(&mut self) -> usize {
        let mut cleared = 0;
        for message in &mut self.messages {
            message.conversation_id = self.id;
            if message.abandon() {
                cleared += 1;
            }
        }
        cleared
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl PartialEq for Conversation {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Conversation {}

/// Unix time of 2001-01-01T00:00:00Z, the epoch of numeric store timestamps.
const REFERENCE_DATE_UNIX_SECONDS: i64 = 978_307_200;

/// Accept RFC 3339 text or seconds since 2001-01-01 UTC.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawTimestamp {
        Text(DateTime<Utc>),
        Seconds(f64),
    }

    match RawTimestamp::deserialize(deserializer)? {
        RawTimestamp::Text(timestamp) => Ok(timestamp),
        RawTimestamp::Seconds(seconds) => {
            let millis = (seconds * 1000.0).round() as i64;
            REFERENCE_DATE_UNIX_SECONDS
                .checked_mul(1000)
                .and_then(|base| base.checked_add(millis))
                .and_then(DateTime::from_timestamp_millis)
                .ok_or_else(|| D::Error::custom(format!("timestamp out of range: {}", seconds)))
        }
    }
}
