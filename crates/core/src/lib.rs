//! Huddle Core - keyword dispatch and scripted conversations
//!
//! This crate is the transport-independent heart of huddle:
//! - **Events** (`events`) - Normalized inbound event variants and contexts
//! - **Patterns** (`pattern`) - Keyword/regex triggers, first match wins
//! - **Dispatcher** (`dispatch`) - Ordered pattern -> handler bindings
//! - **Conversations** (`conversation`) - Multi-turn scripts with threads,
//!   captures, and between-thread hooks
//! - **Runtime** (`runtime`) - Routes events to conversations or the
//!   dispatcher and emits typed effects for a transport to deliver
//!
//! # Architecture
//!
//! ```text
//! Transport frames → BotRuntime → active Conversation | Dispatcher
//!                        ↓
//!                  Effects (send / replace / dialog) → Transport
//! ```
//!
//! # Key Types
//!
//! - `Dispatcher` - Registers pattern bindings, resolves first match
//! - `Script` / `Conversation` - Conversation blueprint and live instance
//! - `BotRuntime` - Event loop core with idle sweep and checkpointing
//! - `StateStore` - Persistence seam consumed for `vars` checkpoints

pub mod config;
pub mod conversation;
pub mod dispatch;
pub mod errors;
pub mod events;
pub mod pattern;
pub mod reply;
pub mod runtime;
pub mod store;

pub use conversation::{
    Conversation, ConversationStatus, Directive, HookError, Question, ResponseOption, Script,
    ThreadHook, Turn, VarMap, DEFAULT_THREAD, ERROR_THREAD,
};
pub use dispatch::{ActionHandler, Dispatcher, JoinHandler, MessageHandler, Outcome};
pub use errors::{
    DispatchError, EngineError, HandlerError, PersistenceError, TransitionError,
};
pub use events::{
    ChannelContext, ChannelJoinEvent, ConnectionStatus, ConnectionStatusEvent, ConversationKey,
    InboundEvent, InteractiveActionEvent, MessageEvent,
};
pub use pattern::{utterances, Pattern, PatternError};
pub use reply::{
    ActionElement, ActionStyle, Attachment, Confirmation, Dialog, DialogBuilder, DialogElement,
    Reply, SelectOption,
};
pub use runtime::{BotRuntime, Effect};
pub use store::{StateKey, StateStore};
