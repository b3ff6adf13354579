use serde_json::Value;
use thiserror::Error;
use tracing::trace;

use huddle_core::events::{
    ChannelContext, ChannelJoinEvent, ConnectionStatus, ConnectionStatusEvent, InboundEvent,
    InteractiveActionEvent, MessageEvent,
};

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("frame is not valid json: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("frame is missing field `{field}`")]
    MissingField { field: &'static str },
}

/// Turns raw RTM frames into normalized inbound events. Needs the bot's
/// own user id to classify mentions and to skip the bot's own messages.
pub struct EventParser {
    bot_user_id: String,
    mention: String,
}

impl EventParser {
    pub fn new(bot_user_id: impl Into<String>) -> Self {
        let bot_user_id = bot_user_id.into();
        let mention = format!("<@{bot_user_id}>");
        Self { bot_user_id, mention }
    }

    /// `Ok(None)` means the frame carries nothing the runtime cares about.
    pub fn parse(&self, raw: &str) -> Result<Option<InboundEvent>, ParseError> {
        let value: Value = serde_json::from_str(raw)?;
        let frame_type = value.get("type").and_then(Value::as_str).unwrap_or_default();

        match frame_type {
            "message" => self.parse_message(&value),
            "interactive_message" => self.parse_interactive(&value).map(Some),
            "goodbye" => Ok(Some(InboundEvent::ConnectionStatus(ConnectionStatusEvent {
                status: ConnectionStatus::Closed,
                detail: Some("server sent goodbye".to_owned()),
            }))),
            "hello" | "reconnect_url" | "user_typing" | "presence_change" => Ok(None),
            other => {
                trace!(frame_type = other, "skipping unsupported frame");
                Ok(None)
            }
        }
    }

    fn parse_message(&self, value: &Value) -> Result<Option<InboundEvent>, ParseError> {
        let subtype = value.get("subtype").and_then(Value::as_str);
        match subtype {
            Some("channel_join") | Some("group_join") => {
                let user_id = str_field(value, "user")?;
                return Ok(Some(InboundEvent::ChannelJoin(ChannelJoinEvent {
                    channel_id: str_field(value, "channel")?.to_owned(),
                    user_id: user_id.to_owned(),
                    joined_self: user_id == self.bot_user_id,
                })));
            }
            // Edits, deletions, and other bots' chatter are not ours.
            Some(_) => return Ok(None),
            None => {}
        }

        let user_id = str_field(value, "user")?;
        if user_id == self.bot_user_id {
            return Ok(None);
        }

        let channel_id = str_field(value, "channel")?;
        let (context, text) = self.classify(channel_id, str_field(value, "text")?);
        Ok(Some(InboundEvent::Message(MessageEvent {
            channel_id: channel_id.to_owned(),
            user_id: user_id.to_owned(),
            text,
            context,
            ts: str_field(value, "ts")?.to_owned(),
        })))
    }

    fn parse_interactive(&self, value: &Value) -> Result<InboundEvent, ParseError> {
        let action = value
            .get("actions")
            .and_then(Value::as_array)
            .and_then(|actions| actions.first())
            .ok_or(ParseError::MissingField { field: "actions" })?;

        Ok(InboundEvent::InteractiveAction(InteractiveActionEvent {
            channel_id: str_field(value, "channel")?.to_owned(),
            user_id: str_field(value, "user")?.to_owned(),
            callback_id: str_field(value, "callback_id")?.to_owned(),
            action_name: str_field(action, "name")?.to_owned(),
            action_value: action
                .get("value")
                .or_else(|| action.pointer("/selected_options/0/value"))
                .and_then(Value::as_str)
                .map(str::to_owned),
            message_ts: str_field(value, "message_ts")?.to_owned(),
            trigger_id: value.get("trigger_id").and_then(Value::as_str).map(str::to_owned),
        }))
    }

    /// Direct-mention text is returned with the leading mention stripped,
    /// the way handlers expect to match on it. An empty bot user id
    /// disables mention classification entirely; the marker `<@>` must
    /// never match real text.
    fn classify(&self, channel_id: &str, text: &str) -> (ChannelContext, String) {
        if channel_id.starts_with('D') {
            return (ChannelContext::DirectMessage, text.to_owned());
        }

        if !self.bot_user_id.is_empty() {
            let trimmed = text.trim_start();
            if let Some(rest) = trimmed.strip_prefix(&self.mention) {
                let rest = rest.trim_start_matches([':', ',']).trim_start();
                return (ChannelContext::DirectMention, rest.to_owned());
            }
            if text.contains(&self.mention) {
                return (ChannelContext::Mention, text.to_owned());
            }
        }
        (ChannelContext::ChannelMessage, text.to_owned())
    }
}

fn str_field<'a>(value: &'a Value, field: &'static str) -> Result<&'a str, ParseError> {
    value.get(field).and_then(Value::as_str).ok_or(ParseError::MissingField { field })
}
