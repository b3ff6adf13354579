//! Conversation scripts the template bot ships with.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use huddle_core::{
    utterances, HookError, Pattern, Question, Script, StateKey, StateStore, ThreadHook, VarMap,
    DEFAULT_THREAD, ERROR_THREAD,
};

/// Yes/no/done questionnaire; unrecognized answers re-ask the question.
pub fn proceed_script() -> Script {
    Script::new().add_question(
        DEFAULT_THREAD,
        Question::new("Shall we proceed Say YES, NO or DONE to quit.")
            .option(Pattern::keyword("done"), |_, turn| {
                turn.say("OK you are done!");
                turn.next();
            })
            .option(utterances::yes(), |_, turn| {
                turn.say("Great! I will continue...");
                turn.say("How long can I talk about how great this is?");
                turn.next();
            })
            .option(utterances::no(), |_, turn| {
                turn.say("Perhaps later.");
                turn.say("When you are ready, just say the magic words again!");
                turn.next();
            })
            .otherwise(|_, turn| {
                turn.repeat();
                turn.next();
            }),
    )
}

/// Writes the captured name to the state store between the question and
/// the confirmation thread.
struct SaveProfileHook {
    store: Arc<dyn StateStore>,
    user_id: String,
}

#[async_trait]
impl ThreadHook for SaveProfileHook {
    async fn run(&self, vars: &mut VarMap) -> Result<(), HookError> {
        let name =
            vars.get("name").cloned().ok_or_else(|| HookError::new("no name was captured"))?;

        let mut profile = VarMap::new();
        profile.insert("id".to_owned(), self.user_id.clone());
        profile.insert("name".to_owned(), name);

        self.store
            .put(&StateKey::new(format!("profile:{}", self.user_id)), &profile)
            .await
            .map_err(|error| HookError::new(error.to_string()))?;

        info!(user_id = %self.user_id, "profile saved");
        Ok(())
    }
}

/// Captures the sender's name and persists it before confirming. A hook
/// failure lands in the error thread instead of going silent.
pub fn onboarding_script(store: Arc<dyn StateStore>, user_id: impl Into<String>) -> Script {
    Script::new()
        .add_question(
            DEFAULT_THREAD,
            Question::new("What is your name?")
                .capture("name")
                .otherwise(|_, turn| turn.goto_thread("completed")),
        )
        .add_message("completed", "I saved your name in the database, {{vars.name}}")
        .add_message(ERROR_THREAD, "Oh no I experienced an error! {{vars.error}}")
        .before_thread("completed", SaveProfileHook { store, user_id: user_id.into() })
}

/// First words after the bot lands in a new workspace.
pub fn install_script() -> Script {
    Script::new()
        .add_message(DEFAULT_THREAD, "I am a bot that has just joined your team")
        .add_message(
            DEFAULT_THREAD,
            "You must now /invite me to a channel so that I can be of use!",
        )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use huddle_core::{Conversation, ConversationStatus, ConversationKey, StateKey, StateStore};
    use huddle_store::MemoryStateStore;

    use super::{onboarding_script, proceed_script};

    fn texts(conversation: &mut Conversation) -> Vec<String> {
        conversation
            .drain_outbox()
            .into_iter()
            .map(|reply| reply.text.unwrap_or_default())
            .collect()
    }

    #[tokio::test]
    async fn affirmative_answers_continue_and_complete() {
        let mut conversation =
            Conversation::start(proceed_script(), ConversationKey::new("U1", "D1"))
                .expect("start");
        conversation.drain_outbox();

        conversation.on_response("yeah ok").await.expect("respond");
        assert_eq!(
            texts(&mut conversation),
            vec![
                "Great! I will continue...".to_owned(),
                "How long can I talk about how great this is?".to_owned(),
            ]
        );
        assert_eq!(conversation.status(), ConversationStatus::Completed);
    }

    #[tokio::test]
    async fn gibberish_answers_re_ask_the_question() {
        let mut conversation =
            Conversation::start(proceed_script(), ConversationKey::new("U1", "D1"))
                .expect("start");
        conversation.drain_outbox();

        conversation.on_response("purple monkey dishwasher").await.expect("respond");
        assert_eq!(
            texts(&mut conversation),
            vec!["Shall we proceed Say YES, NO or DONE to quit.".to_owned()]
        );
        assert_eq!(conversation.status(), ConversationStatus::Active);
    }

    #[tokio::test]
    async fn onboarding_persists_the_profile_before_confirming() {
        let store = Arc::new(MemoryStateStore::default());
        let script = onboarding_script(store.clone(), "U1");
        let mut conversation =
            Conversation::start(script, ConversationKey::new("U1", "D1")).expect("start");
        conversation.drain_outbox();

        conversation.on_response("Ada").await.expect("respond");
        assert_eq!(
            texts(&mut conversation),
            vec!["I saved your name in the database, Ada".to_owned()]
        );

        let profile = store
            .get(&StateKey::new("profile:U1"))
            .await
            .expect("get profile")
            .expect("profile saved");
        assert_eq!(profile.get("name").map(String::as_str), Some("Ada"));
        assert_eq!(profile.get("id").map(String::as_str), Some("U1"));
    }
}
