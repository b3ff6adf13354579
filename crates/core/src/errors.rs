use thiserror::Error;

/// Failure reported by a message/action/join handler.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum HandlerError {
    #[error("handler failure: {0}")]
    Failed(String),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error(transparent)]
    Handler(#[from] HandlerError),
}

/// Adapter read/write failure. Propagated to the caller, never retried here.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PersistenceError {
    #[error("persistence read failed: {0}")]
    Read(String),
    #[error("persistence write failed: {0}")]
    Write(String),
}

/// Failure while moving a conversation between threads.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("conversation script has no threads")]
    EmptyScript,
    #[error("unknown conversation thread `{thread}`")]
    UnknownThread { thread: String },
    #[error("thread hook failed entering `{thread}`: {reason}")]
    HookFailed { thread: String, reason: String },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}
