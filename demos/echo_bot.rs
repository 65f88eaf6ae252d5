//! A minimal in-process bot wired against a println transport.
//!
//! Run with:
//!
//! ```bash
//! RUST_LOG=debug cargo run --example echo_bot
//! ```

use std::sync::Arc;

use env_logger::Env;
use futures::future::BoxFuture;
use magpie::{Command, CommandContext, Commander, Invocation, Restriction, Transport, Value};

/// The raw message type of this toy transport.
#[derive(Debug, Clone)]
struct ChatMessage {
    author: String,
    body: String,
}

/// A transport that prints every notification to stdout.
struct Stdout;

impl Transport<ChatMessage> for Stdout {
    fn message_text(&self, message: &ChatMessage) -> String {
        message.body.clone()
    }

    fn command_not_found(&self, context: &CommandContext<ChatMessage>) {
        println!(
            "  -> no such command: {}{}",
            context.prefix().unwrap_or(""),
            context.alias().unwrap_or("")
        );
    }

    fn command_not_allowed(&self, context: &CommandContext<ChatMessage>) {
        println!(
            "  -> {} is not allowed to do that",
            context.message().author
        );
    }

    fn parse_failure(&self, _context: &CommandContext<ChatMessage>, message: &str) {
        println!("  -> {message}");
    }
}

struct Ping;

impl Command<ChatMessage> for Ping {
    fn aliases(&self) -> Vec<String> {
        vec!["ping".to_owned()]
    }

    fn description(&self) -> Option<String> {
        Some("replies with pong".to_owned())
    }

    fn execute(&self, _invocation: Invocation<ChatMessage>) -> BoxFuture<'static, anyhow::Result<()>> {
        Box::pin(async {
            println!("  -> pong");
            Ok(())
        })
    }
}

struct Echo;

impl Command<ChatMessage> for Echo {
    fn aliases(&self) -> Vec<String> {
        vec!["echo".to_owned()]
    }

    fn usage(&self) -> Option<String> {
        Some("<text...>".to_owned())
    }

    fn execute(&self, invocation: Invocation<ChatMessage>) -> BoxFuture<'static, anyhow::Result<()>> {
        Box::pin(async move {
            println!(
                "  -> {}",
                invocation.parameters.text("text").unwrap_or_default()
            );
            Ok(())
        })
    }
}

struct Add;

impl Command<ChatMessage> for Add {
    fn aliases(&self) -> Vec<String> {
        vec!["add".to_owned()]
    }

    fn usage(&self) -> Option<String> {
        Some("<a:number> <b:number>".to_owned())
    }

    fn execute(&self, invocation: Invocation<ChatMessage>) -> BoxFuture<'static, anyhow::Result<()>> {
        Box::pin(async move {
            let a = invocation.parameters.integer("a").unwrap_or_default();
            let b = invocation.parameters.integer("b").unwrap_or_default();
            println!("  -> {a} + {b} = {}", a + b);
            Ok(())
        })
    }
}

/// Only the operator may shut the bot down.
struct OperatorOnly;

impl Restriction<ChatMessage> for OperatorOnly {
    fn allows(&self, context: &CommandContext<ChatMessage>) -> bool {
        context.message().author == "operator"
    }
}

struct Shutdown;

impl Command<ChatMessage> for Shutdown {
    fn aliases(&self) -> Vec<String> {
        vec!["shutdown".to_owned()]
    }

    fn restrictions(&self) -> Vec<Arc<dyn Restriction<ChatMessage>>> {
        vec![Arc::new(OperatorOnly)]
    }

    fn execute(&self, _invocation: Invocation<ChatMessage>) -> BoxFuture<'static, anyhow::Result<()>> {
        Box::pin(async {
            println!("  -> shutting down (not really)");
            Ok(())
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(Env::default().filter_or("RUST_LOG", "info"));

    let commander = Commander::builder()
        .prefix("!")
        .transport(Stdout)
        .command(Ping)
        .command(Echo)
        .command(Add)
        .command(Shutdown)
        .converter("shouted", |raw, _, _| {
            Ok(Value::Text(raw.to_uppercase()))
        })
        .build()?;

    let messages = [
        ("alice", "!ping"),
        ("alice", "!echo hello there, bot"),
        ("bob", "!add 2 40"),
        ("bob", "!add two forty"),
        ("bob", "!shutdown"),
        ("operator", "!shutdown"),
        ("carol", "!dance"),
        ("carol", "just chatting"),
    ];

    for (author, body) in messages {
        println!("<{author}> {body}");
        let outcome = commander
            .handle(ChatMessage {
                author: author.to_owned(),
                body: body.to_owned(),
            })
            .await;
        println!("  [{outcome:?}]");
    }

    Ok(())
}
