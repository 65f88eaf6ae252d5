//! Magpie - a command resolution framework for chat bots.
//!
//! Magpie lets a host application define text commands whose arguments
//! are declared with a small usage grammar, and resolves an incoming line
//! of text into a matched command plus typed, named parameters.
//!
//! # Overview
//!
//! Two pieces do the heavy lifting:
//!
//! 1. **The usage-grammar compiler** ([`usage`]): parses a compact DSL -
//!    placeholders, literal tokens, optional groups, alternatives,
//!    trailing free-text placeholders - into an executable matcher that
//!    extracts named values from an input string, duplicate names
//!    included.
//! 2. **The resolution pipeline** ([`pipeline`]): a fixed sequence of
//!    phases (prefix recognition → alias and parameter-string recognition
//!    → command lookup → execution) with well-defined fast-forward rules
//!    and at most one pluggable [`Interceptor`] per sub-phase.
//!
//! The chat transport itself stays outside: the host implements
//! [`Transport`] for its backend of choice and magpie never performs any
//! I/O of its own.
//!
//! # Architecture
//!
//! ```text
//! incoming message
//!      │
//!      ▼
//! ┌───────────┐   phases + interceptors   ┌──────────────────┐
//! │ Commander │──────────────────────────▶│ resolved command │
//! └───────────┘                           └──────────────────┘
//!      │                                          │
//!      │ parameter string                         │ execute(Invocation)
//!      ▼                                          ▼
//! ┌──────────────────────┐              ┌──────────────────────┐
//! │ TypedParameterParser │              │ host command logic   │
//! │  PatternCompiler     │              └──────────────────────┘
//! │  ConverterRegistry   │
//! └──────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use futures::future::BoxFuture;
//! use magpie::{Command, CommandContext, Commander, Invocation, Outcome, Transport};
//!
//! struct Println;
//!
//! impl Transport<String> for Println {
//!     fn message_text(&self, message: &String) -> String {
//!         message.clone()
//!     }
//!     fn command_not_found(&self, context: &CommandContext<String>) {
//!         println!("command not found: {:?}", context.alias());
//!     }
//!     fn command_not_allowed(&self, _context: &CommandContext<String>) {}
//!     fn parse_failure(&self, _context: &CommandContext<String>, message: &str) {
//!         println!("{message}");
//!     }
//! }
//!
//! struct Ping;
//!
//! impl Command<String> for Ping {
//!     fn aliases(&self) -> Vec<String> {
//!         vec!["ping".to_owned()]
//!     }
//!     fn execute(&self, _invocation: Invocation<String>) -> BoxFuture<'static, anyhow::Result<()>> {
//!         Box::pin(async {
//!             println!("pong");
//!             Ok(())
//!         })
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> anyhow::Result<()> {
//! let commander = Commander::builder()
//!     .prefix("!")
//!     .transport(Println)
//!     .command(Ping)
//!     .build()?;
//!
//! assert_eq!(commander.handle("!ping".to_owned()).await, Outcome::Executed);
//! assert_eq!(commander.handle("!pong".to_owned()).await, Outcome::NotFound);
//! assert_eq!(commander.handle("hello".to_owned()).await, Outcome::Ignored);
//! # Ok(())
//! # }
//! ```
//!
//! # Error handling
//!
//! Configuration faults - malformed usage strings, duplicate aliases,
//! duplicate interceptors or converters, unknown declared parameter types
//! - fail fast at [`CommanderBuilder::build`]. Parameter mismatches and
//! conversion failures are expected at runtime and surface as
//! end-user-safe messages through the transport. Pipeline non-matches
//! never error; they route to the [`Outcome`] terminal states.
//!
//! # Concurrency
//!
//! Resolution runs synchronously per message on the calling task. The
//! compiled-pattern cache and converter registry are read-mostly after
//! start-up and safe to share across message-handling tasks; per-message
//! state lives in a copy-on-write [`CommandContext`] that is never shared
//! between messages. Commands declared asynchronous are spawned
//! fire-and-forget onto the tokio runtime.
//!
//! # Module organization
//!
//! - [`usage`] - usage grammar parsing and pattern compilation
//! - [`params`] - parameter values, parsing and type conversion
//! - [`pipeline`] - the phase state machine and its context
//! - [`command`] - the [`Command`] trait, restrictions and registration
//! - [`transport`] - the chat-transport boundary

pub mod command;
pub mod params;
pub mod pipeline;
pub mod transport;
pub mod usage;

pub use command::{AllOf, AnyOf, Command, Invocation, Not, Restriction, derive_alias};
pub use params::{
    ConversionError, ConverterRegistry, ParameterError, ParameterParser, Parameters,
    RegistryError, TypedParameterParser, TypedParameters, Value,
};
pub use pipeline::{BuildError, CommandContext, Commander, CommanderBuilder, Interceptor, Outcome, Phase};
pub use transport::Transport;
pub use usage::{CompiledPattern, PatternCompiler, UsageError, UsageNode, UsageSyntaxError, UsageTree, parse_usage};
