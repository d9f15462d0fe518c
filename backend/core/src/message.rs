use serde::{Deserialize, Serialize};

/// Who authored an inbound message, as classified by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SenderKind {
    /// A human account.
    User,
    /// Another bot account (including this bot).
    Bot,
    /// A webhook post.
    Webhook,
    /// Join notices, pins and other server-generated messages.
    System,
}

/// Whether a channel is shared or a one-to-one conversation with the bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    Guild,
    Direct,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: String,
    pub name: String,
    pub kind: SenderKind,
}

impl Author {
    pub fn user(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: SenderKind::User,
        }
    }
}

/// Handle to the channel a message arrived on, used to address replies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRef {
    pub id: String,
    pub kind: ChannelKind,
    /// Guild the channel belongs to, if the transport knows it.
    pub guild: Option<String>,
}

impl ChannelRef {
    pub fn guild(id: impl Into<String>, guild: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: ChannelKind::Guild,
            guild: Some(guild.into()),
        }
    }

    pub fn direct(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: ChannelKind::Direct,
            guild: None,
        }
    }

    /// Label used in logs: the guild name, or "DM channel".
    pub fn origin_label(&self) -> &str {
        match (&self.kind, &self.guild) {
            (ChannelKind::Direct, _) => "DM channel",
            (ChannelKind::Guild, Some(guild)) => guild,
            (ChannelKind::Guild, None) => &self.id,
        }
    }
}

/// A transport-neutral inbound chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub id: String,
    pub content: String,
    pub author: Author,
    pub channel: ChannelRef,
}

/// The account the transport is logged in as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotIdentity {
    pub user_id: String,
    pub name: String,
}
