//! Error types for the security mode store.

use std::fmt;

/// How the store was misused relative to its one-time initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitFault {
    /// An operation ran before `initialize`.
    NotInitialized,
    /// `initialize` was called a second time.
    AlreadyInitialized,
}

impl fmt::Display for InitFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotInitialized => f.write_str("used before initialize"),
            Self::AlreadyInitialized => f.write_str("initialized more than once"),
        }
    }
}

/// Errors produced by the security mode store and its subscriptions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModeError {
    /// Programmer error: initialization order was violated. Never retried.
    #[error("security mode store {0}")]
    UninitializedState(InitFault),

    /// The subscriber could not keep up and was dropped by the store.
    #[error("subscriber fell behind and was dropped, resynchronize from current()")]
    SubscriberOverflow,

    /// Every store handle is gone; no further transitions can arrive.
    #[error("security mode store closed")]
    Closed,
}

/// A string did not name one of the four security levels.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown security level: {0:?}")]
pub struct ParseLevelError(pub String);
