//! Command resolution orchestration.
//!
//! [`Commander`] is the entry point of the crate: it owns the command
//! registry, the interceptor table, the converter registry and the
//! pattern-compiler cache, and drives each incoming message through the
//! resolution phases to a terminal [`Outcome`].
//!
//! # Phase flow
//!
//! ```text
//! message ──▶ init ──▶ BeforePrefix ──▶ (prefix) ──▶ AfterPrefix
//!                ──▶ BeforeAliasAndParameterString ──▶ (alias+params)
//!                ──▶ AfterAliasAndParameterString
//!                ──▶ BeforeCommand ──▶ (lookup) ──▶ AfterCommand
//!                ──▶ restrictions ──▶ parameters ──▶ execute
//! ```
//!
//! After any sub-phase - including the implicit initialization step - a
//! context that already carries a resolved command jumps straight to
//! execution; one that already carries an alias jumps to the command
//! phases; one that already carries a prefix enters at the alias phases.
//! A missing prefix or alias at the designated checkpoints routes to
//! [`Outcome::NotFound`]; a message that does not start with the computed
//! prefix is the pipeline's only silent termination,
//! [`Outcome::Ignored`].
//!
//! Resolution runs synchronously on the calling task; no phase suspends.
//! Only command execution may be handed off, as a fire-and-forget spawn,
//! when the command declares itself asynchronous.

use std::sync::Arc;

use log::{debug, error, info, warn};
use thiserror::Error;

use crate::{
    command::{Command, CommandRegistry, Invocation, RegistrationError},
    params::{
        ConversionError, ConverterRegistry, ParameterError, RegistryError, TypedParameterParser,
        Value, split_type,
    },
    pipeline::{
        CommandContext, Outcome,
        phase::{Interceptor, InterceptorRegistry, Phase},
    },
    transport::Transport,
    usage::{PatternCompiler, SlotKind, UsageError},
};

/// A configuration fault detected while building a [`Commander`].
///
/// All of these abort construction: configuration errors fail fast at
/// start-up instead of surfacing at first command invocation.
#[derive(Debug, Error)]
pub enum BuildError {
    /// No transport was configured.
    #[error("no transport configured")]
    MissingTransport,
    /// A command registration fault (duplicate, blank or missing alias).
    #[error(transparent)]
    Registration(#[from] RegistrationError),
    /// Two interceptors were registered for the same phase. The host must
    /// compose them into one; the pipeline does not multiplex.
    #[error("an interceptor is already registered for phase {phase:?}")]
    DuplicateInterceptor { phase: Phase },
    /// A converter registration fault.
    #[error(transparent)]
    Converter(#[from] RegistryError),
    /// A registered command declares a malformed usage string.
    #[error("invalid usage for command `{alias}`: {source}")]
    InvalidUsage { alias: String, source: UsageError },
    /// A registered command declares a parameter type with no converter.
    #[error("command `{alias}` declares parameter type `{type_name}` but no converter is registered for it")]
    UnknownParameterType { alias: String, type_name: String },
}

/// Builder assembling a [`Commander`].
///
/// Registration is explicit and happens once at start-up; `build()`
/// validates the whole configuration eagerly (aliases, interceptors,
/// converters, and every registered command's usage grammar and declared
/// parameter types) and pre-warms the pattern cache.
pub struct CommanderBuilder<M> {
    prefix: String,
    transport: Option<Arc<dyn Transport<M>>>,
    commands: Vec<Arc<dyn Command<M>>>,
    interceptors: Vec<(Phase, Arc<dyn Interceptor<M>>)>,
    converters: ConverterRegistry<M>,
    converter_error: Option<RegistryError>,
}

impl<M: Send + Sync + 'static> CommanderBuilder<M> {
    pub fn new() -> Self {
        CommanderBuilder {
            prefix: String::new(),
            transport: None,
            commands: Vec::new(),
            interceptors: Vec::new(),
            converters: ConverterRegistry::new(),
            converter_error: None,
        }
    }

    /// The command prefix messages must start with, e.g. `"!"`.
    ///
    /// An empty prefix is legal but costly: every incoming message is
    /// resolved, and every miss emits a not-found notification. `build()`
    /// warns when the prefix is empty.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// The chat-transport adapter. Required.
    pub fn transport(mut self, transport: impl Transport<M> + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Registers a command.
    pub fn command(mut self, command: impl Command<M> + 'static) -> Self {
        self.commands.push(Arc::new(command));
        self
    }

    /// Registers an already-shared command.
    pub fn command_arc(mut self, command: Arc<dyn Command<M>>) -> Self {
        self.commands.push(command);
        self
    }

    /// Registers the interceptor for `phase`. At most one interceptor may
    /// exist per phase; a duplicate fails `build()`.
    pub fn interceptor(mut self, phase: Phase, interceptor: impl Interceptor<M> + 'static) -> Self {
        self.interceptors.push((phase, Arc::new(interceptor)));
        self
    }

    /// Registers a user-supplied parameter converter for `type_name`.
    ///
    /// Built-in converters (`number`, `decimal`, `string`) may be
    /// overridden once; a second user converter for one type fails
    /// `build()`.
    pub fn converter(
        mut self,
        type_name: impl Into<String>,
        convert: impl Fn(&str, &str, &CommandContext<M>) -> Result<Value, ConversionError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        if let Err(error) = self.converters.register(type_name, convert) {
            // Surfaced by build(); the builder API stays chainable.
            self.converter_error.get_or_insert(error);
        }
        self
    }

    /// Validates the configuration and builds the commander.
    ///
    /// # Errors
    ///
    /// Any configuration fault - missing transport, duplicate alias,
    /// duplicate phase interceptor, duplicate converter, malformed usage
    /// string, unknown declared parameter type - aborts construction with
    /// a [`BuildError`].
    pub fn build(self) -> Result<Commander<M>, BuildError> {
        let transport = self.transport.ok_or(BuildError::MissingTransport)?;

        if let Some(error) = self.converter_error {
            return Err(error.into());
        }

        let mut registry = CommandRegistry::new();
        for command in self.commands {
            registry.register(command)?;
        }

        let mut interceptors = InterceptorRegistry::new();
        for (phase, interceptor) in self.interceptors {
            if !interceptors.register(phase, interceptor) {
                return Err(BuildError::DuplicateInterceptor { phase });
            }
        }

        // Compile every declared usage now: grammar faults fail fast here
        // instead of at first invocation, and the pattern cache is warm
        // before the first message arrives.
        let compiler = Arc::new(PatternCompiler::new());
        for command in registry.commands() {
            let Some(usage) = command.usage() else {
                continue;
            };
            let alias = command.aliases().first().cloned().unwrap_or_default();

            let pattern = compiler
                .compile(&usage)
                .map_err(|source| BuildError::InvalidUsage {
                    alias: alias.clone(),
                    source,
                })?;

            for slot in pattern.slots() {
                if slot.kind() == SlotKind::Literal {
                    continue;
                }
                let (_, type_name) = split_type(slot.name());
                if !self.converters.contains(type_name) {
                    return Err(BuildError::UnknownParameterType {
                        alias,
                        type_name: type_name.to_owned(),
                    });
                }
            }
        }

        if self.prefix.is_empty() {
            warn!(
                "empty command prefix configured: every message will be resolved and every miss \
                 will emit a not-found notification"
            );
        }
        info!("commander ready with {} command(s)", registry.len());

        let parser = TypedParameterParser::with_compiler(compiler, Arc::new(self.converters));

        Ok(Commander {
            prefix: self.prefix,
            transport,
            registry,
            interceptors,
            parser,
        })
    }
}

impl<M: Send + Sync + 'static> Default for CommanderBuilder<M> {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves incoming messages to commands and executes them.
///
/// One commander serves one chat backend; it is `Send + Sync` and meant
/// to be shared behind an [`Arc`] across message-handling tasks. All
/// lookup state (command registry, interceptor table, compiled-pattern
/// cache, converter registry) is read-only after `build()`.
pub struct Commander<M> {
    prefix: String,
    transport: Arc<dyn Transport<M>>,
    registry: CommandRegistry<M>,
    interceptors: InterceptorRegistry<M>,
    parser: TypedParameterParser<M>,
}

impl<M> Commander<M>
where
    M: Send + Sync + 'static,
{
    pub fn builder() -> CommanderBuilder<M> {
        CommanderBuilder::new()
    }

    /// Resolves one incoming message and, when a command matches,
    /// executes it.
    ///
    /// Resolution itself never suspends; the returned future only awaits
    /// the execution of a synchronous command. A command declared
    /// asynchronous is spawned fire-and-forget and `handle` returns
    /// without waiting for it.
    pub async fn handle(&self, message: M) -> Outcome {
        let text = self.transport.message_text(&message);
        debug!("resolving message {text:?}");

        self.resolve(CommandContext::new(message, text)).await
    }

    /// Runs a context through the pipeline, honoring any fields already
    /// present.
    ///
    /// This is the entry point for hosts that build contexts themselves
    /// (e.g. re-dispatching a synthesized message); [`handle`] is the
    /// normal path.
    ///
    /// [`handle`]: Commander::handle
    pub async fn resolve(&self, context: CommandContext<M>) -> Outcome {
        // Implicit initialization step: a pre-populated context
        // fast-forwards past the phases its fields make redundant.
        if context.command().is_some() {
            return self.execute(context).await;
        }
        if context.alias().is_some() {
            return self.command_phases(context).await;
        }
        if context.prefix().is_some() {
            return self.alias_phases(context).await;
        }
        self.prefix_phases(context).await
    }

    async fn prefix_phases(&self, mut context: CommandContext<M>) -> Outcome {
        context = self.intercept(Phase::BeforePrefix, context);
        if context.command().is_some() {
            return self.execute(context).await;
        }
        if context.alias().is_some() {
            return self.command_phases(context).await;
        }

        // Default prefix computation, skipped when an interceptor already
        // supplied one.
        if context.prefix().is_none() {
            context = context.with_prefix(self.prefix.clone());
        }

        context = self.intercept(Phase::AfterPrefix, context);
        if context.command().is_some() {
            return self.execute(context).await;
        }
        if context.alias().is_some() {
            return self.command_phases(context).await;
        }
        if context.prefix().is_none() {
            return self.not_found(context);
        }

        self.alias_phases(context).await
    }

    async fn alias_phases(&self, mut context: CommandContext<M>) -> Outcome {
        context = self.intercept(Phase::BeforeAliasAndParameterString, context);
        if context.command().is_some() {
            return self.execute(context).await;
        }

        let prefix_length = match context.prefix() {
            None => return self.not_found(context),
            Some(prefix) => {
                if !context.message_text().starts_with(prefix) {
                    // The only silent termination.
                    debug!("message does not start with prefix {prefix:?}, ignoring");
                    return Outcome::Ignored;
                }
                prefix.len()
            }
        };

        // Default alias and parameter-string computation.
        if context.alias().is_none() {
            if let Some((alias, parameter_string)) =
                self.split_alias(&context.message_text()[prefix_length..])
            {
                debug!("recognized alias {alias:?} with parameters {parameter_string:?}");
                context = context
                    .with_alias(alias)
                    .with_parameter_string(parameter_string);
            }
        }

        context = self.intercept(Phase::AfterAliasAndParameterString, context);
        if context.command().is_some() {
            return self.execute(context).await;
        }
        if context.alias().is_none() {
            return self.not_found(context);
        }

        self.command_phases(context).await
    }

    async fn command_phases(&self, mut context: CommandContext<M>) -> Outcome {
        context = self.intercept(Phase::BeforeCommand, context);
        if context.command().is_some() {
            return self.execute(context).await;
        }
        if context.alias().is_none() {
            return self.not_found(context);
        }

        // Default command computation: alias lookup in the registry.
        let found = context.alias().and_then(|alias| self.registry.find(alias));
        if let Some(command) = found {
            context = context.with_command(command);
        }

        context = self.intercept(Phase::AfterCommand, context);
        if context.command().is_none() {
            return self.not_found(context);
        }

        self.execute(context).await
    }

    async fn execute(&self, context: CommandContext<M>) -> Outcome {
        // Reaching execution without a command is an invariant violation;
        // per the error-handling policy it resolves to not-found rather
        // than a panic.
        let Some(command) = context.command().cloned() else {
            return self.not_found(context);
        };

        for restriction in command.restrictions() {
            if !restriction.allows(&context) {
                debug!(
                    "command `{}` not allowed in this context",
                    context.alias().unwrap_or("<unaliased>")
                );
                self.transport.command_not_allowed(&context);
                return Outcome::NotAllowed;
            }
        }

        let parameters = match self.parser.parse(&context) {
            Ok(parameters) => parameters,
            Err(error) if error.is_user_facing() => {
                debug!("parameter parse failure: {error}");
                self.transport.parse_failure(&context, &error.to_string());
                return Outcome::InvalidArguments;
            }
            Err(error) => {
                // Configuration faults reachable only through runtime
                // usage changes; the message is not end-user-safe.
                error!("parameter configuration error: {error}");
                return Outcome::InvalidArguments;
            }
        };

        let asynchronous = command.is_asynchronous();
        let invocation = Invocation {
            context,
            parameters,
        };

        if asynchronous {
            debug!("handing command off to the runtime");
            let future = command.execute(invocation);
            tokio::spawn(async move {
                if let Err(error) = future.await {
                    error!("command execution failed: {error:#}");
                }
            });
        } else if let Err(error) = command.execute(invocation).await {
            error!("command execution failed: {error:#}");
        }
        Outcome::Executed
    }

    fn intercept(&self, phase: Phase, context: CommandContext<M>) -> CommandContext<M> {
        match self.interceptors.get(phase) {
            Some(interceptor) => {
                debug!("running {phase:?} interceptor");
                interceptor.intercept(context)
            }
            None => context,
        }
    }

    fn not_found(&self, context: CommandContext<M>) -> Outcome {
        debug!(
            "no command found for prefix {:?}, alias {:?}",
            context.prefix(),
            context.alias()
        );
        self.transport.command_not_found(&context);
        Outcome::NotFound
    }

    /// Splits the text after the prefix into alias and parameter string.
    ///
    /// The longest registered alias wins when several match up to a
    /// whitespace boundary; with no registered match the first
    /// whitespace-delimited token is taken, so a not-found notification
    /// still carries the alias the user attempted. Whitespace between
    /// prefix and alias is tolerated, and the parameter string is
    /// trimmed.
    fn split_alias(&self, after_prefix: &str) -> Option<(String, String)> {
        let rest = after_prefix.trim_start();
        if rest.is_empty() {
            return None;
        }

        for alias in self.registry.aliases_longest_first() {
            if let Some(tail) = rest.strip_prefix(alias.as_str()) {
                if tail.is_empty() || tail.starts_with(char::is_whitespace) {
                    return Some((alias.clone(), tail.trim().to_owned()));
                }
            }
        }

        let token_end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        Some((
            rest[..token_end].to_owned(),
            rest[token_end..].trim().to_owned(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use futures::future::BoxFuture;
    use tokio::sync::mpsc;

    use super::*;
    use crate::{
        command::{Restriction, tests::StubCommand},
        transport::MockTransport,
    };

    /// What a [`RecordingCommand`] saw when it executed.
    #[derive(Debug)]
    struct Execution {
        parameter_string: Option<String>,
        parameters: crate::params::TypedParameters,
    }

    struct RecordingCommand {
        aliases: Vec<String>,
        usage: Option<String>,
        asynchronous: bool,
        restrictions: Vec<Arc<dyn Restriction<String>>>,
        executions: mpsc::UnboundedSender<Execution>,
    }

    impl RecordingCommand {
        fn new(alias: &str, usage: Option<&str>) -> (Self, mpsc::UnboundedReceiver<Execution>) {
            let (executions, receiver) = mpsc::unbounded_channel();
            (
                RecordingCommand {
                    aliases: vec![alias.to_owned()],
                    usage: usage.map(str::to_owned),
                    asynchronous: false,
                    restrictions: Vec::new(),
                    executions,
                },
                receiver,
            )
        }

        fn asynchronous(mut self) -> Self {
            self.asynchronous = true;
            self
        }

        fn restricted(mut self, restriction: impl Restriction<String> + 'static) -> Self {
            self.restrictions.push(Arc::new(restriction));
            self
        }
    }

    impl Command<String> for RecordingCommand {
        fn aliases(&self) -> Vec<String> {
            self.aliases.clone()
        }

        fn usage(&self) -> Option<String> {
            self.usage.clone()
        }

        fn is_asynchronous(&self) -> bool {
            self.asynchronous
        }

        fn restrictions(&self) -> Vec<Arc<dyn Restriction<String>>> {
            self.restrictions.clone()
        }

        fn execute(
            &self,
            invocation: Invocation<String>,
        ) -> BoxFuture<'static, anyhow::Result<()>> {
            let executions = self.executions.clone();
            Box::pin(async move {
                let _ = executions.send(Execution {
                    parameter_string: invocation
                        .context
                        .parameter_string()
                        .map(str::to_owned),
                    parameters: invocation.parameters,
                });
                Ok(())
            })
        }
    }

    struct Deny;

    impl Restriction<String> for Deny {
        fn allows(&self, _context: &CommandContext<String>) -> bool {
            false
        }
    }

    /// A transport that answers `message_text` with the message itself
    /// and expects no notifications unless told otherwise.
    fn quiet_transport() -> MockTransport<String> {
        let mut transport = MockTransport::new();
        transport
            .expect_message_text()
            .returning(|message: &String| message.clone());
        transport
    }

    #[tokio::test]
    async fn test_prefixed_alias_resolves_and_executes() {
        let (ping, mut executions) = RecordingCommand::new("ping", None);
        let commander = Commander::builder()
            .prefix("!")
            .transport(quiet_transport())
            .command(ping)
            .build()
            .unwrap();

        let outcome = commander.handle("!ping".to_owned()).await;

        assert_eq!(outcome, Outcome::Executed);
        let execution = executions.recv().await.unwrap();
        assert_eq!(execution.parameter_string.as_deref(), Some(""));
        assert!(execution.parameters.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_alias_is_not_found_with_notification() {
        let mut transport = quiet_transport();
        transport
            .expect_command_not_found()
            .withf(|context: &CommandContext<String>| {
                context.prefix() == Some("!") && context.alias() == Some("pong")
            })
            .times(1)
            .returning(|_| ());

        let (ping, _executions) = RecordingCommand::new("ping", None);
        let commander = Commander::builder()
            .prefix("!")
            .transport(transport)
            .command(ping)
            .build()
            .unwrap();

        assert_eq!(commander.handle("!pong".to_owned()).await, Outcome::NotFound);
    }

    #[tokio::test]
    async fn test_non_prefixed_message_is_silently_ignored() {
        let (ping, _executions) = RecordingCommand::new("ping", None);
        // No notification expectations: any callback would panic.
        let commander = Commander::builder()
            .prefix("!")
            .transport(quiet_transport())
            .command(ping)
            .build()
            .unwrap();

        assert_eq!(
            commander.handle("just chatting".to_owned()).await,
            Outcome::Ignored
        );
    }

    #[tokio::test]
    async fn test_empty_prefix_resolves_every_message() {
        let (ping, mut executions) = RecordingCommand::new("ping", None);
        let commander = Commander::builder()
            .prefix("")
            .transport(quiet_transport())
            .command(ping)
            .build()
            .unwrap();

        assert_eq!(commander.handle("ping".to_owned()).await, Outcome::Executed);
        assert!(executions.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_typed_parameters_reach_the_command() {
        let (register, mut executions) =
            RecordingCommand::new("register", Some("<game_id> <player> <delay:number>"));
        let commander = Commander::builder()
            .prefix("!")
            .transport(quiet_transport())
            .command(register)
            .build()
            .unwrap();

        let outcome = commander.handle("!register game1 alice 60".to_owned()).await;

        assert_eq!(outcome, Outcome::Executed);
        let execution = executions.recv().await.unwrap();
        assert_eq!(execution.parameters.text("game_id"), Some("game1"));
        assert_eq!(execution.parameters.text("player"), Some("alice"));
        assert_eq!(execution.parameters.integer("delay"), Some(60));
    }

    #[tokio::test]
    async fn test_mismatching_parameters_notify_with_usage() {
        let mut transport = quiet_transport();
        transport
            .expect_parse_failure()
            .withf(|_context, message: &str| {
                message.contains("<game_id> <player> <delay:number>")
            })
            .times(1)
            .returning(|_, _| ());

        let (register, _executions) =
            RecordingCommand::new("register", Some("<game_id> <player> <delay:number>"));
        let commander = Commander::builder()
            .prefix("!")
            .transport(transport)
            .command(register)
            .build()
            .unwrap();

        assert_eq!(
            commander.handle("!register game1".to_owned()).await,
            Outcome::InvalidArguments
        );
    }

    #[tokio::test]
    async fn test_conversion_failure_notifies_with_converter_message() {
        let mut transport = quiet_transport();
        transport
            .expect_parse_failure()
            .withf(|_context, message: &str| message == "`soon` is not a valid number")
            .times(1)
            .returning(|_, _| ());

        let (remind, _executions) = RecordingCommand::new("remind", Some("<delay:number>"));
        let commander = Commander::builder()
            .prefix("!")
            .transport(transport)
            .command(remind)
            .build()
            .unwrap();

        assert_eq!(
            commander.handle("!remind soon".to_owned()).await,
            Outcome::InvalidArguments
        );
    }

    #[tokio::test]
    async fn test_arguments_to_a_command_without_usage_fail() {
        let mut transport = quiet_transport();
        transport
            .expect_parse_failure()
            .withf(|_context, message: &str| message.contains("does not expect"))
            .times(1)
            .returning(|_, _| ());

        let (ping, _executions) = RecordingCommand::new("ping", None);
        let commander = Commander::builder()
            .prefix("!")
            .transport(transport)
            .command(ping)
            .build()
            .unwrap();

        assert_eq!(
            commander.handle("!ping now".to_owned()).await,
            Outcome::InvalidArguments
        );
    }

    #[tokio::test]
    async fn test_restriction_refusal_blocks_execution() {
        let mut transport = quiet_transport();
        transport
            .expect_command_not_allowed()
            .times(1)
            .returning(|_| ());

        let (admin, mut executions) = RecordingCommand::new("admin", None);
        let commander = Commander::builder()
            .prefix("!")
            .transport(transport)
            .command(admin.restricted(Deny))
            .build()
            .unwrap();

        assert_eq!(
            commander.handle("!admin".to_owned()).await,
            Outcome::NotAllowed
        );
        assert!(executions.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_asynchronous_command_is_spawned() {
        let (slow, mut executions) = RecordingCommand::new("slow", None);
        let commander = Commander::builder()
            .prefix("!")
            .transport(quiet_transport())
            .command(slow.asynchronous())
            .build()
            .unwrap();

        assert_eq!(commander.handle("!slow".to_owned()).await, Outcome::Executed);

        // The execution happens on a spawned task; awaiting the channel
        // proves it ran without handle() having waited for it.
        assert!(executions.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_interceptor_presetting_command_fast_forwards_to_execution() {
        let (hidden, mut executions) = RecordingCommand::new("hidden", None);
        let preset: Arc<dyn Command<String>> = Arc::new(hidden);

        // No prefix in the message: the preset command must skip every
        // remaining phase, including the prefix check.
        let commander = Commander::builder()
            .prefix("!")
            .transport(quiet_transport())
            .interceptor(Phase::BeforePrefix, move |ctx: CommandContext<String>| {
                ctx.with_command(Arc::clone(&preset))
            })
            .build()
            .unwrap();

        assert_eq!(
            commander.handle("anything at all".to_owned()).await,
            Outcome::Executed
        );
        assert!(executions.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_interceptor_presetting_alias_skips_prefix_and_alias_phases() {
        let (ping, mut executions) = RecordingCommand::new("ping", None);
        let commander = Commander::builder()
            .prefix("!")
            .transport(quiet_transport())
            .interceptor(Phase::BeforePrefix, |ctx: CommandContext<String>| {
                ctx.with_alias("ping")
            })
            .command(ping)
            .build()
            .unwrap();

        // The message carries no prefix; the preset alias routes straight
        // to command lookup.
        assert_eq!(
            commander.handle("unprefixed".to_owned()).await,
            Outcome::Executed
        );
        assert!(executions.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_interceptor_clearing_prefix_routes_to_not_found() {
        let mut transport = quiet_transport();
        transport
            .expect_command_not_found()
            .withf(|context: &CommandContext<String>| context.prefix().is_none())
            .times(1)
            .returning(|_| ());

        let (ping, _executions) = RecordingCommand::new("ping", None);
        let commander = Commander::builder()
            .prefix("!")
            .transport(transport)
            .interceptor(Phase::AfterPrefix, |ctx: CommandContext<String>| {
                ctx.without_prefix()
            })
            .command(ping)
            .build()
            .unwrap();

        assert_eq!(commander.handle("!ping".to_owned()).await, Outcome::NotFound);
    }

    #[tokio::test]
    async fn test_interceptor_removing_resolved_command_routes_to_not_found() {
        let mut transport = quiet_transport();
        transport
            .expect_command_not_found()
            .times(1)
            .returning(|_| ());

        let (ping, mut executions) = RecordingCommand::new("ping", None);
        let commander = Commander::builder()
            .prefix("!")
            .transport(transport)
            .interceptor(Phase::AfterCommand, |ctx: CommandContext<String>| {
                ctx.without_command()
            })
            .command(ping)
            .build()
            .unwrap();

        assert_eq!(commander.handle("!ping".to_owned()).await, Outcome::NotFound);
        assert!(executions.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_longest_alias_wins() {
        let (short, mut short_executions) = RecordingCommand::new("mod", None);
        let (long, mut long_executions) = RecordingCommand::new("mod kick", Some("<user>"));

        let commander = Commander::builder()
            .prefix("!")
            .transport(quiet_transport())
            .command(short)
            .command(long)
            .build()
            .unwrap();

        assert_eq!(
            commander.handle("!mod kick alice".to_owned()).await,
            Outcome::Executed
        );
        let execution = long_executions.recv().await.unwrap();
        assert_eq!(execution.parameters.text("user"), Some("alice"));
        assert!(short_executions.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_whitespace_between_prefix_and_alias_is_tolerated() {
        let (ping, mut executions) = RecordingCommand::new("ping", None);
        let commander = Commander::builder()
            .prefix("!")
            .transport(quiet_transport())
            .command(ping)
            .build()
            .unwrap();

        assert_eq!(commander.handle("! ping".to_owned()).await, Outcome::Executed);
        assert!(executions.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_prefix_alone_is_not_found() {
        let mut transport = quiet_transport();
        transport
            .expect_command_not_found()
            .withf(|context: &CommandContext<String>| {
                context.prefix() == Some("!") && context.alias().is_none()
            })
            .times(1)
            .returning(|_| ());

        let commander = Commander::<String>::builder()
            .prefix("!")
            .transport(transport)
            .build()
            .unwrap();

        assert_eq!(commander.handle("!".to_owned()).await, Outcome::NotFound);
    }

    #[tokio::test]
    async fn test_user_converter_end_to_end() {
        let (greet, mut executions) = RecordingCommand::new("greet", Some("<who:user>"));
        let commander = Commander::builder()
            .prefix("!")
            .transport(quiet_transport())
            .command(greet)
            .converter("user", |raw, _, _| {
                Ok(Value::Text(format!("@{raw}")))
            })
            .build()
            .unwrap();

        assert_eq!(
            commander.handle("!greet alice".to_owned()).await,
            Outcome::Executed
        );
        let execution = executions.recv().await.unwrap();
        assert_eq!(execution.parameters.text("who"), Some("@alice"));
    }

    #[test]
    fn test_build_rejects_missing_transport() {
        let result = CommanderBuilder::<String>::new().prefix("!").build();
        assert!(matches!(result, Err(BuildError::MissingTransport)));
    }

    #[test]
    fn test_build_rejects_duplicate_alias() {
        let result = Commander::<String>::builder()
            .prefix("!")
            .transport(quiet_transport())
            .command(StubCommand::new("ping", None))
            .command(StubCommand::new("ping", None))
            .build();

        assert!(matches!(
            result,
            Err(BuildError::Registration(RegistrationError::DuplicateAlias { .. }))
        ));
    }

    #[test]
    fn test_build_rejects_duplicate_interceptor() {
        let result = Commander::<String>::builder()
            .prefix("!")
            .transport(quiet_transport())
            .interceptor(Phase::BeforeCommand, |ctx: CommandContext<String>| ctx)
            .interceptor(Phase::BeforeCommand, |ctx: CommandContext<String>| ctx)
            .build();

        assert!(matches!(
            result,
            Err(BuildError::DuplicateInterceptor {
                phase: Phase::BeforeCommand
            })
        ));
    }

    #[test]
    fn test_build_rejects_malformed_usage_eagerly() {
        let result = Commander::<String>::builder()
            .prefix("!")
            .transport(quiet_transport())
            .command(StubCommand::new("broken", Some("<oops")))
            .build();

        assert!(matches!(
            result,
            Err(BuildError::InvalidUsage { ref alias, .. }) if alias == "broken"
        ));
    }

    #[test]
    fn test_build_rejects_unknown_parameter_type_eagerly() {
        let result = Commander::<String>::builder()
            .prefix("!")
            .transport(quiet_transport())
            .command(StubCommand::new("greet", Some("<who:user>")))
            .build();

        assert!(matches!(
            result,
            Err(BuildError::UnknownParameterType { ref type_name, .. }) if type_name == "user"
        ));
    }

    #[test]
    fn test_build_rejects_duplicate_user_converter() {
        let result = Commander::<String>::builder()
            .prefix("!")
            .transport(quiet_transport())
            .converter("user", |raw, _, _| Ok(Value::Text(raw.to_owned())))
            .converter("user", |raw, _, _| Ok(Value::Text(raw.to_owned())))
            .build();

        assert!(matches!(result, Err(BuildError::Converter(_))));
    }
}
