pub mod telegram;

use anyhow::Result;
use async_trait::async_trait;

/// Kind of an incoming message.
///
/// The discriminants are ordered: everything up to and including
/// [`MessageKind::GroupNote`] carries plain conversational content, everything
/// after it (media, stickers, locations, transfers, recalled messages, …) is
/// ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
#[allow(dead_code)]
pub enum MessageKind {
    Unknown = 0,
    Text = 1,
    Contact = 2,
    ChatHistory = 3,
    MiniProgram = 4,
    GroupNote = 5,
    Attachment = 6,
    Audio = 7,
    Emoticon = 8,
    Image = 9,
    Location = 10,
    Transfer = 11,
    RedEnvelope = 12,
    Recalled = 13,
    Url = 14,
    Video = 15,
    Post = 16,
}

impl MessageKind {
    /// Last kind the bot treats as plain content
    pub const PLAIN_CONTENT_BOUNDARY: MessageKind = MessageKind::GroupNote;

    pub fn is_plain_content(self) -> bool {
        self <= Self::PLAIN_CONTENT_BOUNDARY
    }
}

/// Who sent a message
#[derive(Debug, Clone)]
pub struct Sender {
    /// Platform-specific user ID as string
    pub id: String,
    /// Display name of the user
    pub display_name: String,
    /// True when the message was sent by the bot's own account
    pub is_self: bool,
}

/// Opaque handle for "send text to this conversation".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConversationTarget(pub String);

impl std::fmt::Display for ConversationTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A message received from the transport
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub sender: Sender,
    /// Group conversation ID; `None` for a direct conversation
    pub conversation: Option<String>,
    /// Where replies go: the group for group messages, the sender otherwise
    pub reply_to: ConversationTarget,
    /// The message text (caption for media)
    pub text: String,
    pub kind: MessageKind,
}

impl IncomingMessage {
    pub fn is_direct(&self) -> bool {
        self.conversation.is_none()
    }
}

/// Outbound side of a chat transport.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one text message to a conversation.
    async fn send(&self, target: &ConversationTarget, text: &str) -> Result<()>;
}
