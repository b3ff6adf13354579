use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::conversation::{Conversation, Script, VarMap};
use crate::dispatch::{Dispatcher, Outcome};
use crate::errors::EngineError;
use crate::events::{
    ChannelJoinEvent, ConnectionStatus, ConnectionStatusEvent, ConversationKey, InboundEvent,
    InteractiveActionEvent, MessageEvent,
};
use crate::reply::{Dialog, Reply};
use crate::store::{StateKey, StateStore};

/// Side effect for the transport layer to carry out. The runtime never
/// talks to the network itself.
#[derive(Clone, Debug)]
pub enum Effect {
    Send { channel_id: String, reply: Reply },
    ReplaceMessage { channel_id: String, ts: String, reply: Reply },
    OpenDialog { trigger_id: String, dialog: Dialog },
}

struct ActiveConversation {
    conversation: Conversation,
    last_activity: Instant,
}

/// Event loop core. Messages from a (user, channel) with an active
/// conversation are fed to it; everything else goes through the
/// dispatcher. Captured variables are checkpointed to the state store
/// after every transition.
pub struct BotRuntime {
    dispatcher: Dispatcher,
    conversations: HashMap<ConversationKey, ActiveConversation>,
    store: Option<Arc<dyn StateStore>>,
    idle_timeout: Duration,
}

struct Origin {
    channel_id: String,
    user_id: String,
    ts: Option<String>,
    trigger_id: Option<String>,
}

impl BotRuntime {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher,
            conversations: HashMap::new(),
            store: None,
            idle_timeout: Duration::from_secs(1800),
        }
    }

    pub fn with_store(mut self, store: Arc<dyn StateStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Zero disables the idle sweep entirely.
    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    pub fn active_conversations(&self) -> usize {
        self.conversations.len()
    }

    pub async fn handle_event(&mut self, event: InboundEvent) -> Result<Vec<Effect>, EngineError> {
        match event {
            InboundEvent::Message(event) => self.handle_message(event).await,
            InboundEvent::InteractiveAction(event) => self.handle_action(event).await,
            InboundEvent::ChannelJoin(event) => self.handle_join(event).await,
            InboundEvent::ConnectionStatus(event) => {
                self.handle_connection_status(event);
                Ok(Vec::new())
            }
        }
    }

    /// Starts a scripted conversation for the key, replacing any active
    /// one. Statement-only scripts complete before this returns and are
    /// never tracked.
    pub async fn start_conversation(
        &mut self,
        key: ConversationKey,
        script: Script,
    ) -> Result<Vec<Effect>, EngineError> {
        if let Some(previous) = self.conversations.get_mut(&key) {
            warn!(user_id = %key.user_id, channel_id = %key.channel_id, "replacing active conversation");
            previous.conversation.stop();
        }

        let mut conversation = Conversation::start(script, key.clone())?;
        let effects = send_effects(&key.channel_id, conversation.drain_outbox());
        self.checkpoint(&key, conversation.vars()).await?;

        if conversation.status().is_terminal() {
            debug!(user_id = %key.user_id, status = ?conversation.status(), "conversation ended at start");
        } else {
            self.conversations.insert(
                key,
                ActiveConversation { conversation, last_activity: Instant::now() },
            );
        }
        Ok(effects)
    }

    /// Starts a conversation in the member's direct channel; the key and
    /// delivery target are both the user id.
    pub async fn start_private_conversation(
        &mut self,
        user_id: &str,
        script: Script,
    ) -> Result<Vec<Effect>, EngineError> {
        self.start_conversation(ConversationKey::new(user_id, user_id), script).await
    }

    /// Stops and removes conversations idle past the configured timeout,
    /// returning the keys that were swept.
    pub fn sweep_idle(&mut self) -> Vec<ConversationKey> {
        if self.idle_timeout.is_zero() {
            return Vec::new();
        }
        let now = Instant::now();
        let expired: Vec<ConversationKey> = self
            .conversations
            .iter()
            .filter(|(_, entry)| now.duration_since(entry.last_activity) >= self.idle_timeout)
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            if let Some(mut entry) = self.conversations.remove(key) {
                entry.conversation.stop();
                info!(user_id = %key.user_id, channel_id = %key.channel_id, "swept idle conversation");
            }
        }
        expired
    }

    async fn handle_message(&mut self, event: MessageEvent) -> Result<Vec<Effect>, EngineError> {
        let key = ConversationKey::new(&event.user_id, &event.channel_id);
        if self.conversations.contains_key(&key) {
            return self.feed_conversation(key, &event.text).await;
        }

        match self.dispatcher.dispatch_message(&event).await? {
            Some(outcome) => {
                let origin = Origin {
                    channel_id: event.channel_id,
                    user_id: event.user_id,
                    ts: Some(event.ts),
                    trigger_id: None,
                };
                self.apply_outcome(outcome, origin).await
            }
            None => {
                debug!(channel_id = %event.channel_id, context = ?event.context, "dropping unmatched message");
                Ok(Vec::new())
            }
        }
    }

    async fn handle_action(
        &mut self,
        event: InteractiveActionEvent,
    ) -> Result<Vec<Effect>, EngineError> {
        match self.dispatcher.dispatch_action(&event).await? {
            Some(outcome) => {
                let origin = Origin {
                    channel_id: event.channel_id,
                    user_id: event.user_id,
                    ts: Some(event.message_ts),
                    trigger_id: event.trigger_id,
                };
                self.apply_outcome(outcome, origin).await
            }
            None => {
                debug!(callback_id = %event.callback_id, "dropping unmatched interactive action");
                Ok(Vec::new())
            }
        }
    }

    async fn handle_join(&mut self, event: ChannelJoinEvent) -> Result<Vec<Effect>, EngineError> {
        match self.dispatcher.dispatch_join(&event).await? {
            Some(outcome) => {
                let origin = Origin {
                    channel_id: event.channel_id,
                    user_id: event.user_id,
                    ts: None,
                    trigger_id: None,
                };
                self.apply_outcome(outcome, origin).await
            }
            None => Ok(Vec::new()),
        }
    }

    fn handle_connection_status(&self, event: ConnectionStatusEvent) {
        match event.status {
            ConnectionStatus::Opened => info!(detail = ?event.detail, "transport connection opened"),
            ConnectionStatus::Closed => warn!(detail = ?event.detail, "transport connection closed"),
        }
    }

    async fn feed_conversation(
        &mut self,
        key: ConversationKey,
        text: &str,
    ) -> Result<Vec<Effect>, EngineError> {
        let Some(mut entry) = self.conversations.remove(&key) else {
            return Ok(Vec::new());
        };

        let result = entry.conversation.on_response(text).await;
        let effects = send_effects(&key.channel_id, entry.conversation.drain_outbox());
        self.checkpoint(&key, entry.conversation.vars()).await?;

        if let Err(error) = result {
            warn!(user_id = %key.user_id, channel_id = %key.channel_id, error = %error, "conversation transition failed");
            return Err(error.into());
        }

        if entry.conversation.status().is_terminal() {
            info!(user_id = %key.user_id, status = ?entry.conversation.status(), "conversation ended");
        } else {
            entry.last_activity = Instant::now();
            self.conversations.insert(key, entry);
        }
        Ok(effects)
    }

    async fn apply_outcome(
        &mut self,
        outcome: Outcome,
        origin: Origin,
    ) -> Result<Vec<Effect>, EngineError> {
        match outcome {
            Outcome::Done => Ok(Vec::new()),
            Outcome::Reply(replies) => Ok(send_effects(&origin.channel_id, replies)),
            Outcome::StartConversation(script) => {
                let key = ConversationKey::new(&origin.user_id, &origin.channel_id);
                self.start_conversation(key, script).await
            }
            Outcome::StartPrivateConversation(script) => {
                self.start_private_conversation(&origin.user_id, script).await
            }
            Outcome::ReplaceOriginal(reply) => match origin.ts {
                Some(ts) => {
                    Ok(vec![Effect::ReplaceMessage { channel_id: origin.channel_id, ts, reply }])
                }
                None => {
                    warn!(channel_id = %origin.channel_id, "no message to replace, dropping outcome");
                    Ok(Vec::new())
                }
            },
            Outcome::OpenDialog(dialog) => match origin.trigger_id {
                Some(trigger_id) => Ok(vec![Effect::OpenDialog { trigger_id, dialog }]),
                None => {
                    warn!(channel_id = %origin.channel_id, "no trigger id for dialog, dropping outcome");
                    Ok(Vec::new())
                }
            },
        }
    }

    async fn checkpoint(&self, key: &ConversationKey, vars: &VarMap) -> Result<(), EngineError> {
        if let Some(store) = &self.store {
            store.put(&StateKey::for_conversation(key), vars).await?;
        }
        Ok(())
    }
}

fn send_effects(channel_id: &str, replies: Vec<Reply>) -> Vec<Effect> {
    replies
        .into_iter()
        .map(|reply| Effect::Send { channel_id: channel_id.to_owned(), reply })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::conversation::{Question, Script, VarMap, DEFAULT_THREAD};
    use crate::dispatch::{Dispatcher, Outcome};
    use crate::errors::{EngineError, PersistenceError};
    use crate::events::{
        ChannelContext, ConnectionStatus, ConnectionStatusEvent, ConversationKey, InboundEvent,
        InteractiveActionEvent, MessageEvent,
    };
    use crate::pattern::Pattern;
    use crate::reply::{Dialog, Reply};
    use crate::store::{StateKey, StateStore};

    use super::{BotRuntime, Effect};

    #[derive(Default)]
    struct RecordingStore {
        entries: Mutex<HashMap<StateKey, VarMap>>,
    }

    impl RecordingStore {
        fn vars(&self, key: &StateKey) -> Option<VarMap> {
            self.entries.lock().expect("store lock").get(key).cloned()
        }
    }

    #[async_trait]
    impl StateStore for RecordingStore {
        async fn put(&self, key: &StateKey, vars: &VarMap) -> Result<(), PersistenceError> {
            self.entries.lock().expect("store lock").insert(key.clone(), vars.clone());
            Ok(())
        }

        async fn get(&self, key: &StateKey) -> Result<Option<VarMap>, PersistenceError> {
            Ok(self.entries.lock().expect("store lock").get(key).cloned())
        }

        async fn delete(&self, key: &StateKey) -> Result<(), PersistenceError> {
            self.entries.lock().expect("store lock").remove(key);
            Ok(())
        }
    }

    struct FailingStore;

    #[async_trait]
    impl StateStore for FailingStore {
        async fn put(&self, _key: &StateKey, _vars: &VarMap) -> Result<(), PersistenceError> {
            Err(PersistenceError::Write("disk full".to_owned()))
        }

        async fn get(&self, _key: &StateKey) -> Result<Option<VarMap>, PersistenceError> {
            Err(PersistenceError::Read("disk full".to_owned()))
        }

        async fn delete(&self, _key: &StateKey) -> Result<(), PersistenceError> {
            Err(PersistenceError::Write("disk full".to_owned()))
        }
    }

    fn message(text: &str) -> InboundEvent {
        InboundEvent::Message(MessageEvent {
            channel_id: "D1".to_owned(),
            user_id: "U1".to_owned(),
            text: text.to_owned(),
            context: ChannelContext::DirectMessage,
            ts: "1730000000.0001".to_owned(),
        })
    }

    fn proceed_script() -> Script {
        Script::new().add_question(
            DEFAULT_THREAD,
            Question::new("Shall we proceed Say YES, NO or DONE to quit.")
                .capture("answer")
                .option(Pattern::keyword("done"), |_, turn| {
                    turn.say("OK you are done!");
                    turn.next();
                }),
        )
    }

    fn dispatcher() -> Dispatcher {
        Dispatcher::new()
            .hear(
                Pattern::keywords(["hello", "hi"]),
                &[ChannelContext::DirectMessage, ChannelContext::DirectMention],
                |_: &MessageEvent| Ok(Outcome::reply("Yo!")),
            )
            .hear(
                Pattern::keyword("question me"),
                &[ChannelContext::DirectMessage],
                |_: &MessageEvent| Ok(Outcome::StartConversation(proceed_script())),
            )
    }

    fn sent_texts(effects: &[Effect]) -> Vec<String> {
        effects
            .iter()
            .map(|effect| match effect {
                Effect::Send { reply, .. } => reply.text.clone().unwrap_or_default(),
                other => panic!("expected send effect, got {other:?}"),
            })
            .collect()
    }

    #[tokio::test]
    async fn dispatched_replies_become_send_effects() {
        let mut runtime = BotRuntime::new(dispatcher());
        let effects = runtime.handle_event(message("hello there")).await.expect("handle");
        assert_eq!(sent_texts(&effects), vec!["Yo!".to_owned()]);
    }

    #[tokio::test]
    async fn unmatched_messages_produce_no_effects() {
        let mut runtime = BotRuntime::new(dispatcher());
        let effects = runtime.handle_event(message("what is the weather")).await.expect("handle");
        assert!(effects.is_empty());
    }

    #[tokio::test]
    async fn active_conversation_takes_precedence_until_it_ends() {
        let mut runtime = BotRuntime::new(dispatcher());

        let effects = runtime.handle_event(message("question me")).await.expect("start");
        assert_eq!(
            sent_texts(&effects),
            vec!["Shall we proceed Say YES, NO or DONE to quit.".to_owned()]
        );
        assert_eq!(runtime.active_conversations(), 1);

        // "hello" would match the greeting binding, but the conversation owns the key.
        let effects = runtime.handle_event(message("hello")).await.expect("repeat");
        assert_eq!(
            sent_texts(&effects),
            vec!["Shall we proceed Say YES, NO or DONE to quit.".to_owned()]
        );

        let effects = runtime.handle_event(message("done")).await.expect("finish");
        assert_eq!(sent_texts(&effects), vec!["OK you are done!".to_owned()]);
        assert_eq!(runtime.active_conversations(), 0);

        let effects = runtime.handle_event(message("hello")).await.expect("back to dispatcher");
        assert_eq!(sent_texts(&effects), vec!["Yo!".to_owned()]);
    }

    #[tokio::test]
    async fn captured_vars_are_checkpointed_after_each_transition() {
        let store = Arc::new(RecordingStore::default());
        let mut runtime = BotRuntime::new(dispatcher()).with_store(store.clone());

        runtime.handle_event(message("question me")).await.expect("start");
        runtime.handle_event(message("done")).await.expect("finish");

        let key = StateKey::for_conversation(&ConversationKey::new("U1", "D1"));
        let vars = store.vars(&key).expect("checkpoint exists");
        assert_eq!(vars.get("answer").map(String::as_str), Some("done"));
    }

    #[tokio::test]
    async fn persistence_failures_propagate_to_the_caller() {
        let mut runtime = BotRuntime::new(dispatcher()).with_store(Arc::new(FailingStore));
        let error = runtime.handle_event(message("question me")).await.expect_err("store failed");
        assert!(matches!(error, EngineError::Persistence(_)));
    }

    #[tokio::test]
    async fn starting_again_replaces_the_active_conversation() {
        let mut runtime = BotRuntime::new(dispatcher());
        runtime.handle_event(message("question me")).await.expect("first");
        assert_eq!(runtime.active_conversations(), 1);

        let key = ConversationKey::new("U1", "D1");
        runtime.start_conversation(key, proceed_script()).await.expect("second");
        assert_eq!(runtime.active_conversations(), 1);
    }

    #[tokio::test]
    async fn private_conversations_are_keyed_and_delivered_by_user_id() {
        let mut runtime = BotRuntime::new(Dispatcher::new());
        let script = Script::new()
            .add_message(DEFAULT_THREAD, "I am a bot that has just joined your team")
            .add_message(DEFAULT_THREAD, "You must now /invite me to a channel so that I can be of use!");

        let effects = runtime.start_private_conversation("U7", script).await.expect("start");
        assert_eq!(effects.len(), 2);
        for effect in &effects {
            match effect {
                Effect::Send { channel_id, .. } => assert_eq!(channel_id, "U7"),
                other => panic!("expected send effect, got {other:?}"),
            }
        }
        // Statement-only scripts finish immediately and are not tracked.
        assert_eq!(runtime.active_conversations(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn idle_conversations_are_swept_after_the_timeout() {
        let mut runtime =
            BotRuntime::new(dispatcher()).with_idle_timeout(Duration::from_secs(60));
        runtime.handle_event(message("question me")).await.expect("start");
        assert_eq!(runtime.active_conversations(), 1);

        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(runtime.sweep_idle().is_empty());

        tokio::time::advance(Duration::from_secs(31)).await;
        let swept = runtime.sweep_idle();
        assert_eq!(swept, vec![ConversationKey::new("U1", "D1")]);
        assert_eq!(runtime.active_conversations(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_idle_timeout_disables_the_sweep() {
        let mut runtime = BotRuntime::new(dispatcher()).with_idle_timeout(Duration::ZERO);
        runtime.handle_event(message("question me")).await.expect("start");

        tokio::time::advance(Duration::from_secs(86_400)).await;
        assert!(runtime.sweep_idle().is_empty());
        assert_eq!(runtime.active_conversations(), 1);
    }

    fn action(callback_id: &str, trigger_id: Option<&str>) -> InboundEvent {
        InboundEvent::InteractiveAction(InteractiveActionEvent {
            channel_id: "C1".to_owned(),
            user_id: "U1".to_owned(),
            callback_id: callback_id.to_owned(),
            action_name: "yes".to_owned(),
            action_value: Some("yes".to_owned()),
            message_ts: "1730000000.0002".to_owned(),
            trigger_id: trigger_id.map(str::to_owned),
        })
    }

    fn action_dispatcher() -> Dispatcher {
        Dispatcher::new()
            .on_action("123", |_: &InteractiveActionEvent| {
                Ok(Outcome::ReplaceOriginal(Reply::text("Some other things to do")))
            })
            .on_action("uh", |_: &InteractiveActionEvent| {
                Ok(Outcome::OpenDialog(
                    Dialog::builder("Title of dialog", "dialog-1", "Submit").build(),
                ))
            })
    }

    #[tokio::test]
    async fn replace_outcomes_target_the_original_message() {
        let mut runtime = BotRuntime::new(action_dispatcher());
        let effects = runtime.handle_event(action("123", None)).await.expect("handle");
        match effects.as_slice() {
            [Effect::ReplaceMessage { channel_id, ts, reply }] => {
                assert_eq!(channel_id, "C1");
                assert_eq!(ts, "1730000000.0002");
                assert_eq!(reply.text.as_deref(), Some("Some other things to do"));
            }
            other => panic!("expected replace effect, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn dialogs_require_a_trigger_id() {
        let mut runtime = BotRuntime::new(action_dispatcher());

        let effects = runtime.handle_event(action("uh", Some("trig-1"))).await.expect("handle");
        assert!(matches!(
            effects.as_slice(),
            [Effect::OpenDialog { trigger_id, .. }] if trigger_id == "trig-1"
        ));

        let effects = runtime.handle_event(action("uh", None)).await.expect("handle");
        assert!(effects.is_empty());
    }

    #[tokio::test]
    async fn connection_status_events_produce_no_effects() {
        let mut runtime = BotRuntime::new(Dispatcher::new());
        let effects = runtime
            .handle_event(InboundEvent::ConnectionStatus(ConnectionStatusEvent {
                status: ConnectionStatus::Closed,
                detail: Some("going away".to_owned()),
            }))
            .await
            .expect("handle");
        assert!(effects.is_empty());
    }
}
