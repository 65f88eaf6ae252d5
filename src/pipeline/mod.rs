//! The command resolution pipeline.
//!
//! An incoming message advances through a fixed sequence of phases until
//! it reaches a terminal state:
//!
//! ```text
//! message text
//!      │
//!      ▼
//! ┌─────────────────────┐  BeforePrefix / AfterPrefix
//! │ prefix recognition  │──── no prefix ──▶ NotFound
//! └─────────────────────┘
//!      │                ──── text lacks prefix ──▶ Ignored (silent)
//!      ▼
//! ┌─────────────────────┐  BeforeAliasAndParameterString /
//! │ alias + parameters  │  AfterAliasAndParameterString
//! └─────────────────────┘──── no alias ──▶ NotFound
//!      │
//!      ▼
//! ┌─────────────────────┐  BeforeCommand / AfterCommand
//! │ command lookup      │──── no command ──▶ NotFound
//! └─────────────────────┘
//!      │
//!      ▼
//!  restrictions ──── refused ──▶ NotAllowed
//!      │
//!      ▼
//!  parameter parsing ──── failed ──▶ InvalidArguments
//!      │
//!      ▼
//!   Executed
//! ```
//!
//! Between any two phases the host can plug in an [`Interceptor`]; a
//! context that an interceptor pre-populates fast-forwards past the
//! phases its fields make redundant (see [`Commander`]).
//!
//! # Module organization
//!
//! - [`context`] - the per-message copy-on-write [`CommandContext`]
//! - [`phase`] - the [`Phase`] enum and interceptor registration
//! - [`commander`] - the [`Commander`] builder and state machine

pub mod commander;
pub mod context;
pub mod phase;

pub use commander::{BuildError, Commander, CommanderBuilder};
pub use context::CommandContext;
pub use phase::{Interceptor, Phase};

/// The terminal state a message resolution ended in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A command was resolved and executed (or handed off to the runtime
    /// when declared asynchronous).
    Executed,
    /// A command was resolved but its restriction chain refused the
    /// context; the transport was notified.
    NotAllowed,
    /// The parameter string did not match the command's usage, or a value
    /// failed conversion; the transport received the user-safe message.
    InvalidArguments,
    /// No command matched; the transport was notified with the prefix and
    /// alias as far as they were recognized.
    NotFound,
    /// The message does not start with the configured prefix. Nothing was
    /// emitted; this is the pipeline's only silent termination.
    Ignored,
}
