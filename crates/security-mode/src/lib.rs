//! Authoritative security level state for the modeguard agent.
//!
//! A [`SecurityModeStore`] holds the single current [`SecurityLevel`] together
//! with a generation counter that grows by one on every committed transition.
//! Committed transitions are published to [`Subscription`]s in commit order:
//! - producers never wait on consumers
//! - a subscriber that falls behind its buffer is dropped and must
//!   resynchronize from [`SecurityModeStore::current`]
//!
//! The store is an explicit handle (cheap to clone) rather than a global, so
//! every collaborator receives it from whoever built it at startup.

mod error;
mod level;
mod store;
mod subscription;

pub use error::{InitFault, ModeError, ParseLevelError};
pub use level::SecurityLevel;
pub use store::{DEFAULT_SUBSCRIBER_CAPACITY, ModeState, SecurityModeStore};
pub use subscription::Subscription;
