use tracing::{debug, warn};

use crate::errors::TransitionError;
use crate::events::ConversationKey;
use crate::reply::Reply;

use super::script::{Directive, Prompt, Script, Turn, VarMap, ERROR_THREAD};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConversationStatus {
    Active,
    Completed,
    Errored,
    Stopped,
}

impl ConversationStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Active)
    }
}

/// One live conversation, owned by the event loop for its (user, channel)
/// key. All transitions are driven by explicit callback directives; there
/// is no implicit fallthrough beyond sequential advance within a thread.
#[derive(Debug)]
pub struct Conversation {
    key: ConversationKey,
    script: Script,
    status: ConversationStatus,
    thread: String,
    cursor: usize,
    vars: VarMap,
    outbox: Vec<Reply>,
}

impl Conversation {
    /// Creates an instance positioned at the script's first thread and
    /// emits statements up to the first prompt that awaits a response.
    pub fn start(script: Script, key: ConversationKey) -> Result<Self, TransitionError> {
        let initial =
            script.threads.first().map(|thread| thread.name.clone()).ok_or(TransitionError::EmptyScript)?;
        let mut conversation = Self {
            key,
            script,
            status: ConversationStatus::Active,
            thread: initial,
            cursor: 0,
            vars: VarMap::new(),
            outbox: Vec::new(),
        };
        conversation.emit_from_cursor();
        Ok(conversation)
    }

    pub fn key(&self) -> &ConversationKey {
        &self.key
    }

    pub fn status(&self) -> ConversationStatus {
        self.status
    }

    pub fn current_thread(&self) -> &str {
        &self.thread
    }

    pub fn vars(&self) -> &VarMap {
        &self.vars
    }

    /// Replies queued since the last drain, in send order.
    pub fn drain_outbox(&mut self) -> Vec<Reply> {
        std::mem::take(&mut self.outbox)
    }

    /// Ends the instance immediately. No-op once terminal.
    pub fn stop(&mut self) {
        if !self.status.is_terminal() {
            self.status = ConversationStatus::Stopped;
            debug!(thread = %self.thread, "conversation stopped");
        }
    }

    /// Feeds one raw response to the current prompt. Options are evaluated
    /// in order, first match wins; the default runs only when nothing
    /// matched; with neither, the prompt repeats verbatim.
    pub async fn on_response(&mut self, raw: &str) -> Result<(), TransitionError> {
        if self.status.is_terminal() {
            return Ok(());
        }
        let Some(prompt) = self.current_prompt().cloned() else {
            self.complete();
            return Ok(());
        };

        if let Some(key) = &prompt.capture_key {
            self.vars.insert(key.clone(), raw.to_owned());
        }

        let callback = prompt
            .options
            .iter()
            .find(|option| option.pattern.matches(raw))
            .map(|option| option.callback.clone())
            .or_else(|| prompt.default.clone());

        let Some(callback) = callback else {
            self.resend_current();
            return Ok(());
        };

        let directives = {
            let mut turn = Turn::new(&mut self.vars);
            callback(raw, &mut turn);
            turn.into_directives()
        };
        self.apply(directives).await
    }

    /// Jumps to the named thread, running its registered hook first. A hook
    /// failure marks the instance errored, records `vars["error"]`, and
    /// falls back to the `error` thread when the script defines one.
    pub async fn goto_thread(&mut self, name: &str) -> Result<(), TransitionError> {
        if self.status.is_terminal() {
            return Ok(());
        }
        if !self.script.has_thread(name) {
            self.status = ConversationStatus::Errored;
            return Err(TransitionError::UnknownThread { thread: name.to_owned() });
        }

        if let Some(hook) = self.script.hooks.get(name).cloned() {
            if let Err(error) = hook.run(&mut self.vars).await {
                warn!(thread = name, error = %error, "thread hook failed");
                self.vars.insert("error".to_owned(), error.to_string());
                self.status = ConversationStatus::Errored;
                if self.script.has_thread(ERROR_THREAD) {
                    // Internal goto: the error thread never re-fires hooks.
                    self.enter_thread(ERROR_THREAD);
                    return Ok(());
                }
                return Err(TransitionError::HookFailed {
                    thread: name.to_owned(),
                    reason: error.to_string(),
                });
            }
        }

        self.enter_thread(name);
        Ok(())
    }

    async fn apply(&mut self, directives: Vec<Directive>) -> Result<(), TransitionError> {
        let mut repeated = false;
        for directive in directives {
            if self.status.is_terminal() && !matches!(directive, Directive::Say(_)) {
                break;
            }
            match directive {
                Directive::Say(text) => {
                    let text = self.render(&text);
                    self.outbox.push(Reply::text(text));
                }
                Directive::Repeat => {
                    self.resend_current();
                    repeated = true;
                }
                Directive::Next => {
                    // repeat() followed by next() re-asks the question.
                    if repeated {
                        repeated = false;
                        continue;
                    }
                    self.cursor += 1;
                    self.emit_from_cursor();
                }
                Directive::GotoThread(name) => {
                    self.goto_thread(&name).await?;
                }
                Directive::Stop => {
                    self.stop();
                }
            }
        }
        Ok(())
    }

    fn enter_thread(&mut self, name: &str) {
        self.thread = name.to_owned();
        self.cursor = 0;
        self.emit_from_cursor();
    }

    /// Sends statements from the cursor until a prompt awaits a response or
    /// the thread runs out, which completes the instance.
    fn emit_from_cursor(&mut self) {
        loop {
            let Some(prompt) = self.current_prompt() else {
                self.complete();
                return;
            };
            let text = prompt.text.clone();
            let awaits = prompt.awaits_response();
            let rendered = self.render(&text);
            self.outbox.push(Reply::text(rendered));
            if awaits {
                return;
            }
            self.cursor += 1;
        }
    }

    fn resend_current(&mut self) {
        if let Some(prompt) = self.current_prompt() {
            let text = prompt.text.clone();
            let rendered = self.render(&text);
            self.outbox.push(Reply::text(rendered));
        }
    }

    fn complete(&mut self) {
        if self.status == ConversationStatus::Active {
            self.status = ConversationStatus::Completed;
            debug!(thread = %self.thread, "conversation completed");
        }
    }

    fn current_prompt(&self) -> Option<&Prompt> {
        self.script.thread(&self.thread).and_then(|thread| thread.prompts.get(self.cursor))
    }

    /// Substitutes `{{vars.key}}` placeholders with captured values.
    fn render(&self, text: &str) -> String {
        let mut rendered = text.to_owned();
        for (key, value) in &self.vars {
            rendered = rendered.replace(&format!("{{{{vars.{key}}}}}"), value);
        }
        rendered
    }
}
