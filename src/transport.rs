//! The chat-transport boundary.
//!
//! The resolution pipeline is transport-agnostic: it only needs to read
//! the text of an incoming message and to hand terminal outcomes back to
//! the host. Both concerns live behind the [`Transport`] trait, which the
//! host implements once per chat backend.
//!
//! The trait is mockable with [`mockall`], mirroring how the external
//! service seam is tested elsewhere in this codebase.

use mockall::automock;

use crate::pipeline::CommandContext;

/// Adapter between the resolution pipeline and a concrete chat backend.
///
/// `M` is the host's raw message type; the pipeline treats it as opaque
/// and only ever hands it back through the [`CommandContext`].
///
/// An ignored message (prefix mismatch) produces no callback at all; it
/// is the pipeline's only silent termination.
#[automock]
pub trait Transport<M: 'static + Send + Sync>: Send + Sync {
    /// Extracts the plain text of a message.
    fn message_text(&self, message: &M) -> String;

    /// No command matched the message. The context carries the prefix and
    /// alias as far as they were recognized.
    fn command_not_found(&self, context: &CommandContext<M>);

    /// A command was resolved but its restriction chain refused the
    /// context.
    fn command_not_allowed(&self, context: &CommandContext<M>);

    /// The parameter string did not match the command's usage, or a value
    /// failed conversion. `message` is end-user-safe and can be shown
    /// verbatim.
    fn parse_failure(&self, context: &CommandContext<M>, message: &str);
}
