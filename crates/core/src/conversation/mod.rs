//! Multi-turn conversations: a `Script` is the reusable blueprint (named
//! threads of prompts plus between-thread hooks), a `Conversation` is one
//! live instance bound to a (user, channel) key.

mod instance;
mod script;

pub use instance::{Conversation, ConversationStatus};
pub use script::{
    Directive, HookError, Question, ResponseOption, Script, ThreadHook, Turn, VarMap,
    DEFAULT_THREAD, ERROR_THREAD,
};
