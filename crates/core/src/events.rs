use serde::{Deserialize, Serialize};

/// How a message reached the bot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelContext {
    DirectMessage,
    DirectMention,
    Mention,
    ChannelMessage,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageEvent {
    pub channel_id: String,
    pub user_id: String,
    pub text: String,
    pub context: ChannelContext,
    pub ts: String,
}

/// A button press or menu selection reported back with its callback id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InteractiveActionEvent {
    pub channel_id: String,
    pub user_id: String,
    pub callback_id: String,
    pub action_name: String,
    pub action_value: Option<String>,
    pub message_ts: String,
    pub trigger_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelJoinEvent {
    pub channel_id: String,
    pub user_id: String,
    /// True when the joining member is the bot itself.
    pub joined_self: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionStatus {
    Opened,
    Closed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectionStatusEvent {
    pub status: ConnectionStatus,
    pub detail: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InboundEvent {
    Message(MessageEvent),
    InteractiveAction(InteractiveActionEvent),
    ChannelJoin(ChannelJoinEvent),
    ConnectionStatus(ConnectionStatusEvent),
}

impl InboundEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Message(_) => "message",
            Self::InteractiveAction(_) => "interactive_action",
            Self::ChannelJoin(_) => "channel_join",
            Self::ConnectionStatus(_) => "connection_status",
        }
    }
}

/// At most one conversation is active per key at a time.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ConversationKey {
    pub user_id: String,
    pub channel_id: String,
}

impl ConversationKey {
    pub fn new(user_id: impl Into<String>, channel_id: impl Into<String>) -> Self {
        Self { user_id: user_id.into(), channel_id: channel_id.into() }
    }
}
