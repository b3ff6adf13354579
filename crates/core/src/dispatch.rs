use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, trace};

use crate::conversation::Script;
use crate::errors::{DispatchError, HandlerError};
use crate::events::{ChannelContext, ChannelJoinEvent, InteractiveActionEvent, MessageEvent};
use crate::pattern::Pattern;
use crate::reply::{Dialog, Reply};

/// What a handler decided to do with its event.
#[derive(Clone, Debug)]
pub enum Outcome {
    /// Handled, nothing to send.
    Done,
    /// Post one or more replies to the originating channel.
    Reply(Vec<Reply>),
    /// Start a scripted conversation with the sender in the channel.
    StartConversation(Script),
    /// Start a scripted conversation with the sender in a direct channel.
    StartPrivateConversation(Script),
    /// Replace the interactive message the action came from.
    ReplaceOriginal(Reply),
    /// Open a dialog against the action's trigger id.
    OpenDialog(Dialog),
}

impl Outcome {
    pub fn reply(reply: impl Into<Reply>) -> Self {
        Self::Reply(vec![reply.into()])
    }
}

#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, event: &MessageEvent) -> Result<Outcome, HandlerError>;
}

#[async_trait]
impl<F> MessageHandler for F
where
    F: Fn(&MessageEvent) -> Result<Outcome, HandlerError> + Send + Sync,
{
    async fn handle(&self, event: &MessageEvent) -> Result<Outcome, HandlerError> {
        (self)(event)
    }
}

#[async_trait]
pub trait ActionHandler: Send + Sync {
    async fn handle(&self, event: &InteractiveActionEvent) -> Result<Outcome, HandlerError>;
}

#[async_trait]
impl<F> ActionHandler for F
where
    F: Fn(&InteractiveActionEvent) -> Result<Outcome, HandlerError> + Send + Sync,
{
    async fn handle(&self, event: &InteractiveActionEvent) -> Result<Outcome, HandlerError> {
        (self)(event)
    }
}

#[async_trait]
pub trait JoinHandler: Send + Sync {
    async fn handle(&self, event: &ChannelJoinEvent) -> Result<Outcome, HandlerError>;
}

#[async_trait]
impl<F> JoinHandler for F
where
    F: Fn(&ChannelJoinEvent) -> Result<Outcome, HandlerError> + Send + Sync,
{
    async fn handle(&self, event: &ChannelJoinEvent) -> Result<Outcome, HandlerError> {
        (self)(event)
    }
}

struct MessageBinding {
    pattern: Pattern,
    contexts: Vec<ChannelContext>,
    handler: Arc<dyn MessageHandler>,
}

impl MessageBinding {
    /// A binding registered with no contexts can never fire.
    fn matches(&self, event: &MessageEvent) -> bool {
        self.contexts.contains(&event.context) && self.pattern.matches(&event.text)
    }
}

struct ActionBinding {
    callback_id: String,
    handler: Arc<dyn ActionHandler>,
}

/// Ordered pattern router: message bindings are scanned in registration
/// order and exactly one handler runs per event, the first whose pattern
/// and context both match. Unmatched events are dropped without reply.
#[derive(Default)]
pub struct Dispatcher {
    messages: Vec<MessageBinding>,
    actions: Vec<ActionBinding>,
    member_join: Option<Arc<dyn JoinHandler>>,
    self_join: Option<Arc<dyn JoinHandler>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hear(
        mut self,
        pattern: Pattern,
        contexts: &[ChannelContext],
        handler: impl MessageHandler + 'static,
    ) -> Self {
        self.messages.push(MessageBinding {
            pattern,
            contexts: contexts.to_vec(),
            handler: Arc::new(handler),
        });
        self
    }

    /// Registers a handler for interactive actions carrying the callback id.
    pub fn on_action(mut self, callback_id: &str, handler: impl ActionHandler + 'static) -> Self {
        self.actions
            .push(ActionBinding { callback_id: callback_id.to_owned(), handler: Arc::new(handler) });
        self
    }

    /// Runs when another member joins a channel the bot is in. Each join
    /// kind holds one handler; registering again replaces it.
    pub fn on_member_join(mut self, handler: impl JoinHandler + 'static) -> Self {
        self.member_join = Some(Arc::new(handler));
        self
    }

    /// Runs when the bot itself is invited into a channel.
    pub fn on_self_join(mut self, handler: impl JoinHandler + 'static) -> Self {
        self.self_join = Some(Arc::new(handler));
        self
    }

    pub fn binding_count(&self) -> usize {
        self.messages.len()
    }

    /// `None` means no binding claimed the event and it should be dropped.
    pub async fn dispatch_message(
        &self,
        event: &MessageEvent,
    ) -> Result<Option<Outcome>, DispatchError> {
        for (index, binding) in self.messages.iter().enumerate() {
            if binding.matches(event) {
                debug!(binding = index, pattern = ?binding.pattern, "message binding matched");
                return binding.handler.handle(event).await.map(Some).map_err(DispatchError::from);
            }
        }
        trace!(channel_id = %event.channel_id, "no message binding matched");
        Ok(None)
    }

    pub async fn dispatch_action(
        &self,
        event: &InteractiveActionEvent,
    ) -> Result<Option<Outcome>, DispatchError> {
        for binding in &self.actions {
            if binding.callback_id == event.callback_id {
                debug!(callback_id = %event.callback_id, action = %event.action_name, "action binding matched");
                return binding.handler.handle(event).await.map(Some).map_err(DispatchError::from);
            }
        }
        trace!(callback_id = %event.callback_id, "no action binding matched");
        Ok(None)
    }

    pub async fn dispatch_join(
        &self,
        event: &ChannelJoinEvent,
    ) -> Result<Option<Outcome>, DispatchError> {
        let handler = if event.joined_self { &self.self_join } else { &self.member_join };
        let Some(handler) = handler else {
            return Ok(None);
        };
        handler.handle(event).await.map(Some).map_err(DispatchError::from)
    }
}
