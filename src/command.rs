//! Command definitions and registration.
//!
//! A host application implements [`Command`] for each text command it
//! wants resolved, and registers the implementations with a
//! [`Commander`](crate::pipeline::Commander) at start-up. Registration is
//! explicit: there is no runtime discovery, and registration-time faults
//! (duplicate aliases, malformed usage strings) abort construction
//! instead of surfacing at first invocation.
//!
//! # Execution
//!
//! Commands receive an [`Invocation`] - the final [`CommandContext`] plus
//! the typed parameters parsed from the message - and return a boxed
//! future. A command that returns `true` from
//! [`Command::is_asynchronous`] is spawned onto the runtime and the
//! pipeline does not wait for it; all other commands are awaited inline.
//!
//! # Restrictions
//!
//! [`Restriction`]s gate execution after command resolution: every
//! restriction a command declares must allow the context, otherwise the
//! command is not executed and the transport is notified. [`AllOf`],
//! [`AnyOf`] and [`Not`] compose restriction chains.

use std::{collections::HashMap, sync::Arc};

use futures::future::BoxFuture;
use thiserror::Error;

use crate::{params::TypedParameters, pipeline::CommandContext};

/// One resolved command invocation, handed to [`Command::execute`].
pub struct Invocation<M> {
    /// The final context produced by the resolution pipeline.
    pub context: CommandContext<M>,
    /// The typed parameters parsed from the parameter string. Empty when
    /// the command declares no usage.
    pub parameters: TypedParameters,
}

/// A text command the resolution pipeline can dispatch to.
///
/// `M` is the host's raw message type; the framework never inspects it.
pub trait Command<M>: Send + Sync {
    /// The aliases this command is reachable under. Must not be empty;
    /// aliases may contain spaces.
    ///
    /// [`derive_alias`] turns a type path into a conventional alias for
    /// implementors that want the type-name default.
    fn aliases(&self) -> Vec<String>;

    /// The usage grammar for this command's parameters, or `None` when it
    /// takes no structured parameters (in which case invoking it with a
    /// non-empty parameter string is a parse failure).
    fn usage(&self) -> Option<String> {
        None
    }

    /// Human-readable description, e.g. for help output.
    fn description(&self) -> Option<String> {
        None
    }

    /// Whether execution should be spawned onto the runtime instead of
    /// awaited inline by the pipeline.
    fn is_asynchronous(&self) -> bool {
        false
    }

    /// The restriction chain gating execution. Every restriction must
    /// allow the context, otherwise the command is not executed.
    fn restrictions(&self) -> Vec<Arc<dyn Restriction<M>>> {
        Vec::new()
    }

    /// Executes the command.
    ///
    /// Errors are logged by the pipeline and never shown to the end user;
    /// user-visible replies are the command's own responsibility through
    /// its transport.
    fn execute(&self, invocation: Invocation<M>) -> BoxFuture<'static, anyhow::Result<()>>;
}

/// A predicate deciding whether a resolved command may execute in a given
/// context.
pub trait Restriction<M>: Send + Sync {
    fn allows(&self, context: &CommandContext<M>) -> bool;
}

/// Allows only when every child restriction allows. Empty chains allow.
pub struct AllOf<M> {
    restrictions: Vec<Arc<dyn Restriction<M>>>,
}

impl<M> AllOf<M> {
    pub fn new(restrictions: Vec<Arc<dyn Restriction<M>>>) -> Self {
        AllOf { restrictions }
    }
}

impl<M> Restriction<M> for AllOf<M> {
    fn allows(&self, context: &CommandContext<M>) -> bool {
        self.restrictions.iter().all(|r| r.allows(context))
    }
}

/// Allows when at least one child restriction allows.
pub struct AnyOf<M> {
    restrictions: Vec<Arc<dyn Restriction<M>>>,
}

impl<M> AnyOf<M> {
    pub fn new(restrictions: Vec<Arc<dyn Restriction<M>>>) -> Self {
        AnyOf { restrictions }
    }
}

impl<M> Restriction<M> for AnyOf<M> {
    fn allows(&self, context: &CommandContext<M>) -> bool {
        self.restrictions.iter().any(|r| r.allows(context))
    }
}

/// Inverts a restriction.
pub struct Not<M> {
    inner: Arc<dyn Restriction<M>>,
}

impl<M> Not<M> {
    pub fn new(inner: Arc<dyn Restriction<M>>) -> Self {
        Not { inner }
    }
}

impl<M> Restriction<M> for Not<M> {
    fn allows(&self, context: &CommandContext<M>) -> bool {
        !self.inner.allows(context)
    }
}

/// Derives a conventional alias from a type path.
///
/// This is the explicit replacement for alias-from-class-name defaults: a
/// pure string transform a command author calls once when declaring
/// aliases, never reflection at resolution time. The last path segment is
/// taken, any generic arguments and a trailing `Command`/`Cmd` suffix are
/// stripped, and the remainder is lowercased.
///
/// # Examples
///
/// ```
/// use magpie::command::derive_alias;
///
/// assert_eq!(derive_alias("my_bot::commands::PingCommand"), "ping");
/// assert_eq!(derive_alias("EchoCmd"), "echo");
/// assert_eq!(derive_alias("Help"), "help");
/// ```
pub fn derive_alias(type_name: &str) -> String {
    let simple = type_name.rsplit("::").next().unwrap_or(type_name);
    let simple = simple.split('<').next().unwrap_or(simple);

    let base = simple
        .strip_suffix("Command")
        .or_else(|| simple.strip_suffix("Cmd"))
        .filter(|base| !base.is_empty())
        .unwrap_or(simple);

    base.to_lowercase()
}

/// A command registration fault, detected eagerly.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistrationError {
    /// A command declared no aliases.
    #[error("command registered with an empty alias list")]
    EmptyAliases,
    /// A command declared an empty or whitespace-only alias.
    #[error("alias `{alias}` is empty or blank")]
    BlankAlias { alias: String },
    /// Two registrations claim the same alias.
    #[error("alias `{alias}` is registered more than once")]
    DuplicateAlias { alias: String },
}

/// The alias→command map populated at start-up.
pub(crate) struct CommandRegistry<M> {
    by_alias: HashMap<String, Arc<dyn Command<M>>>,
    commands: Vec<Arc<dyn Command<M>>>,
    /// All aliases, longest first, for longest-match alias recognition.
    aliases_longest_first: Vec<String>,
}

impl<M> CommandRegistry<M> {
    pub(crate) fn new() -> Self {
        CommandRegistry {
            by_alias: HashMap::new(),
            commands: Vec::new(),
            aliases_longest_first: Vec::new(),
        }
    }

    pub(crate) fn register(
        &mut self,
        command: Arc<dyn Command<M>>,
    ) -> Result<(), RegistrationError> {
        let aliases = command.aliases();
        if aliases.is_empty() {
            return Err(RegistrationError::EmptyAliases);
        }

        for alias in aliases {
            if alias.trim().is_empty() {
                return Err(RegistrationError::BlankAlias { alias });
            }
            if self.by_alias.contains_key(&alias) {
                return Err(RegistrationError::DuplicateAlias { alias });
            }
            self.by_alias.insert(alias.clone(), Arc::clone(&command));
            self.aliases_longest_first.push(alias);
        }
        self.commands.push(command);

        // Longest first so multi-word aliases win over their prefixes;
        // ties break lexicographically for determinism.
        self.aliases_longest_first
            .sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        Ok(())
    }

    pub(crate) fn find(&self, alias: &str) -> Option<Arc<dyn Command<M>>> {
        self.by_alias.get(alias).cloned()
    }

    pub(crate) fn aliases_longest_first(&self) -> &[String] {
        &self.aliases_longest_first
    }

    /// Each registered command once, regardless of alias count.
    pub(crate) fn commands(&self) -> &[Arc<dyn Command<M>>] {
        &self.commands
    }

    pub(crate) fn len(&self) -> usize {
        self.commands.len()
    }
}
