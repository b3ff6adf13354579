use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use huddle_core::reply::{Dialog, Reply};
use huddle_core::runtime::Effect;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("chat api call failed: {0}")]
    Call(String),
}

/// Outbound surface of the chat platform. A channel id may also be a user
/// id, in which case implementations deliver to the member's direct
/// channel.
#[async_trait]
pub trait ChatApi: Send + Sync {
    async fn post_message(&self, channel_id: &str, reply: &Reply) -> Result<(), ApiError>;
    async fn update_message(&self, channel_id: &str, ts: &str, reply: &Reply)
        -> Result<(), ApiError>;
    async fn open_dialog(&self, trigger_id: &str, dialog: &Dialog) -> Result<(), ApiError>;
}

/// Logs outbound traffic instead of sending it; the dry-run surface for
/// local development.
#[derive(Default)]
pub struct LoggingChatApi;

#[async_trait]
impl ChatApi for LoggingChatApi {
    async fn post_message(&self, channel_id: &str, reply: &Reply) -> Result<(), ApiError> {
        tracing::info!(channel_id = %channel_id, text = reply.text.as_deref().unwrap_or(""), "dry-run post");
        Ok(())
    }

    async fn update_message(
        &self,
        channel_id: &str,
        ts: &str,
        _reply: &Reply,
    ) -> Result<(), ApiError> {
        tracing::info!(channel_id = %channel_id, ts = %ts, "dry-run update");
        Ok(())
    }

    async fn open_dialog(&self, trigger_id: &str, dialog: &Dialog) -> Result<(), ApiError> {
        tracing::info!(trigger_id = %trigger_id, title = %dialog.title, "dry-run dialog");
        Ok(())
    }
}

/// Carries out runtime effects in order, stopping at the first failure.
pub async fn deliver(api: &dyn ChatApi, effects: Vec<Effect>) -> Result<(), ApiError> {
    for effect in effects {
        match effect {
            Effect::Send { channel_id, reply } => {
                debug!(channel_id = %channel_id, "posting message");
                api.post_message(&channel_id, &reply).await?;
            }
            Effect::ReplaceMessage { channel_id, ts, reply } => {
                debug!(channel_id = %channel_id, ts = %ts, "replacing message");
                api.update_message(&channel_id, &ts, &reply).await?;
            }
            Effect::OpenDialog { trigger_id, dialog } => {
                debug!(trigger_id = %trigger_id, "opening dialog");
                api.open_dialog(&trigger_id, &dialog).await?;
            }
        }
    }
    Ok(())
}
