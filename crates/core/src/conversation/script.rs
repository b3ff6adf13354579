use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::pattern::Pattern;

/// Thread a script starts in unless it declares another one first.
pub const DEFAULT_THREAD: &str = "default";
/// Thread entered when a hook reports failure during a transition.
pub const ERROR_THREAD: &str = "error";

pub type VarMap = HashMap<String, String>;

/// Action queued by a response callback; drained in order by the instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Directive {
    Say(String),
    Next,
    Repeat,
    GotoThread(String),
    Stop,
}

/// Handed to response callbacks. Collects directives and variable writes;
/// the instance applies them once the callback returns.
pub struct Turn<'a> {
    vars: &'a mut VarMap,
    queued: Vec<Directive>,
}

impl<'a> Turn<'a> {
    pub(crate) fn new(vars: &'a mut VarMap) -> Self {
        Self { vars, queued: Vec::new() }
    }

    /// Immediate send, no response expected.
    pub fn say(&mut self, text: impl Into<String>) {
        self.queued.push(Directive::Say(text.into()));
    }

    /// Advance to the next prompt in the current thread.
    pub fn next(&mut self) {
        self.queued.push(Directive::Next);
    }

    /// Re-send the current prompt without advancing.
    pub fn repeat(&mut self) {
        self.queued.push(Directive::Repeat);
    }

    /// Jump to the first prompt of the named thread.
    pub fn goto_thread(&mut self, thread: impl Into<String>) {
        self.queued.push(Directive::GotoThread(thread.into()));
    }

    /// End the conversation immediately.
    pub fn stop(&mut self) {
        self.queued.push(Directive::Stop);
    }

    pub fn set_var(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(key.into(), value.into());
    }

    pub fn var(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub(crate) fn into_directives(self) -> Vec<Directive> {
        self.queued
    }
}

pub type ResponseCallback = Arc<dyn Fn(&str, &mut Turn<'_>) + Send + Sync>;

/// One (pattern, callback) pair of a question. Evaluated in declaration
/// order; the first matching pattern wins.
#[derive(Clone)]
pub struct ResponseOption {
    pub(crate) pattern: Pattern,
    pub(crate) callback: ResponseCallback,
}

impl ResponseOption {
    pub fn new(
        pattern: Pattern,
        callback: impl Fn(&str, &mut Turn<'_>) + Send + Sync + 'static,
    ) -> Self {
        Self { pattern, callback: Arc::new(callback) }
    }
}

impl fmt::Debug for ResponseOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseOption").field("pattern", &self.pattern).finish_non_exhaustive()
    }
}

#[derive(Clone)]
pub(crate) struct Prompt {
    pub(crate) text: String,
    pub(crate) options: Vec<ResponseOption>,
    pub(crate) default: Option<ResponseCallback>,
    pub(crate) capture_key: Option<String>,
}

impl Prompt {
    /// Statements auto-advance; anything with options, a default, or a
    /// capture key waits for the next response.
    pub(crate) fn awaits_response(&self) -> bool {
        !self.options.is_empty() || self.default.is_some() || self.capture_key.is_some()
    }
}

/// Question under construction: text plus ordered options, at most one
/// default callback, and an optional capture key for the raw response.
pub struct Question {
    text: String,
    options: Vec<ResponseOption>,
    default: Option<ResponseCallback>,
    capture_key: Option<String>,
}

impl Question {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), options: Vec::new(), default: None, capture_key: None }
    }

    pub fn option(
        mut self,
        pattern: Pattern,
        callback: impl Fn(&str, &mut Turn<'_>) + Send + Sync + 'static,
    ) -> Self {
        self.options.push(ResponseOption::new(pattern, callback));
        self
    }

    /// Fallback run only when no option pattern matched.
    pub fn otherwise(
        mut self,
        callback: impl Fn(&str, &mut Turn<'_>) + Send + Sync + 'static,
    ) -> Self {
        self.default = Some(Arc::new(callback));
        self
    }

    /// Store the raw response under this key before any callback runs.
    pub fn capture(mut self, key: impl Into<String>) -> Self {
        self.capture_key = Some(key.into());
        self
    }

    fn into_prompt(self) -> Prompt {
        Prompt {
            text: self.text,
            options: self.options,
            default: self.default,
            capture_key: self.capture_key,
        }
    }
}

/// Error reported by a [`ThreadHook`]; its text becomes `vars["error"]`.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct HookError(pub String);

impl HookError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

/// Async side-work run between threads: invoked exactly once per
/// `goto_thread`, after the previous thread's last action and before the
/// target thread's first prompt is sent. The instance is suspended until
/// the hook resolves.
#[async_trait]
pub trait ThreadHook: Send + Sync {
    async fn run(&self, vars: &mut VarMap) -> Result<(), HookError>;
}

#[derive(Clone)]
pub(crate) struct Thread {
    pub(crate) name: String,
    pub(crate) prompts: Vec<Prompt>,
}

/// Conversation blueprint. Threads keep declaration order; the first
/// declared thread is the entry point.
#[derive(Clone, Default)]
pub struct Script {
    pub(crate) threads: Vec<Thread>,
    pub(crate) hooks: HashMap<String, Arc<dyn ThreadHook>>,
}

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a statement prompt; it is sent and the thread moves on.
    pub fn add_message(mut self, thread: &str, text: impl Into<String>) -> Self {
        self.thread_mut(thread).prompts.push(Prompt {
            text: text.into(),
            options: Vec::new(),
            default: None,
            capture_key: None,
        });
        self
    }

    /// Appends a question prompt; the thread waits for a response.
    pub fn add_question(mut self, thread: &str, question: Question) -> Self {
        self.thread_mut(thread).prompts.push(question.into_prompt());
        self
    }

    /// Registers the hook run before the named thread's first prompt.
    pub fn before_thread(mut self, thread: &str, hook: impl ThreadHook + 'static) -> Self {
        self.hooks.insert(thread.to_owned(), Arc::new(hook));
        self
    }

    pub(crate) fn thread(&self, name: &str) -> Option<&Thread> {
        self.threads.iter().find(|thread| thread.name == name)
    }

    pub(crate) fn has_thread(&self, name: &str) -> bool {
        self.thread(name).is_some()
    }

    fn thread_mut(&mut self, name: &str) -> &mut Thread {
        if let Some(index) = self.threads.iter().position(|thread| thread.name == name) {
            return &mut self.threads[index];
        }
        self.threads.push(Thread { name: name.to_owned(), prompts: Vec::new() });
        self.threads.last_mut().expect("thread was just pushed")
    }
}

impl fmt::Debug for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let threads: Vec<(&str, usize)> =
            self.threads.iter().map(|thread| (thread.name.as_str(), thread.prompts.len())).collect();
        f.debug_struct("Script")
            .field("threads", &threads)
            .field("hooks", &self.hooks.keys().collect::<Vec<_>>())
            .finish()
    }
}
