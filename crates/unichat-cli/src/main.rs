//! Unichat terminal client.
//!
//! # Usage
//!
//! ```bash
//! UNICHAT_USER=alice unichat --url wss://chat.example.com/ws --open general
//! ```
//!
//! Type to send to the open conversation; `/help` lists commands. Logs go to
//! stderr, the conversation to stdout.

mod command;
mod render;

use std::{
    io::{self, Write},
    time::Duration,
};

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use unichat_chat::{ChatConfig, Runtime, Step};
use unichat_client::{SystemEnv, WsLink};
use unichat_core::{BackoffPolicy, TransportConfig};

use crate::command::{Command, CommandError, HELP};

/// Upper bound on every millisecond flag: one day.
const MAX_FLAG_MS: u64 = 24 * 60 * 60 * 1000;

/// Unichat terminal client
#[derive(Parser, Debug)]
#[command(name = "unichat")]
#[command(about = "Line-oriented terminal client for unichat real-time messaging")]
#[command(version)]
struct Args {
    /// WebSocket endpoint of the message server
    #[arg(long, env = "UNICHAT_URL", default_value = "ws://127.0.0.1:8080/ws")]
    url: String,

    /// User id to authenticate as
    #[arg(short, long, env = "UNICHAT_USER")]
    user: String,

    /// Conversation to open on start
    #[arg(short, long)]
    open: Option<String>,

    /// Delay before the first reconnect attempt, in milliseconds
    #[arg(long, default_value_t = 1000, value_parser = ms_flag())]
    reconnect_base_ms: u64,

    /// Upper bound on the reconnect delay, in milliseconds
    #[arg(long, default_value_t = 30_000, value_parser = ms_flag())]
    reconnect_max_ms: u64,

    /// Reconnect attempts before giving up
    #[arg(long, default_value_t = 8)]
    reconnect_attempts: u32,

    /// Typing debounce window, in milliseconds
    #[arg(long, default_value_t = 1000, value_parser = ms_flag())]
    typing_window_ms: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn ms_flag() -> clap::builder::RangedU64ValueParser {
    clap::value_parser!(u64).range(1..=MAX_FLAG_MS)
}

impl Args {
    fn transport_config(&self) -> TransportConfig {
        TransportConfig {
            backoff: BackoffPolicy {
                base_delay: Duration::from_millis(self.reconnect_base_ms),
                max_delay: Duration::from_millis(self.reconnect_max_ms),
                max_attempts: self.reconnect_attempts,
            },
        }
    }

    fn chat_config(&self) -> ChatConfig {
        ChatConfig {
            typing_window: Duration::from_millis(self.typing_window_ms),
            ..ChatConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer().with_writer(io::stderr)).with(filter).init();

    tracing::info!(url = %args.url, user = %args.user, "unichat starting");

    let mut runtime = Runtime::new(
        WsLink::new(args.url.clone()),
        SystemEnv::new(),
        args.user.clone(),
        args.transport_config(),
        args.chat_config(),
    );

    let connected = runtime.connect().await?;
    tracing::info!(flushed = connected.flushed, "connected");
    runtime.set_presence(true).await;
    if let Some(conversation) = &args.open {
        runtime.open_conversation(&conversation.as_str().into()).await;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match runtime.poll_with(lines.next_line()).await {
            Step::Chat(event) => {
                if let Some(line) = render::event_line(runtime.chat().state(), &event) {
                    show(&line)?;
                }
            },
            Step::External(Ok(Some(line))) => match Command::parse(&line) {
                Ok(Command::Quit) => break,
                Ok(command) => execute(&mut runtime, command).await?,
                Err(CommandError::Empty) => {},
                Err(err) => show(&err.to_string())?,
            },
            Step::External(Ok(None)) => break,
            Step::External(Err(err)) => return Err(err.into()),
        }
    }

    runtime.set_presence(false).await;
    runtime.disconnect().await;
    Ok(())
}

async fn execute(runtime: &mut Runtime<WsLink, SystemEnv>, command: Command) -> io::Result<()> {
    let result = match command {
        Command::Say(text) => match runtime.chat().active().cloned() {
            Some(conversation) => runtime.send_message(&conversation, text).await.map(|id| {
                tracing::debug!(message = %id, "sent");
            }),
            None => return show("no conversation is open, use /open <conversation>"),
        },
        Command::Open(conversation) => {
            runtime.open_conversation(&conversation).await;
            Ok(())
        },
        Command::Close => {
            runtime.close_conversation().await;
            Ok(())
        },
        Command::Typing => runtime.set_typing(true).await,
        Command::StopTyping => runtime.set_typing(false).await,
        Command::Seen { message_id, sender } => runtime.mark_seen(&message_id, &sender).await,
        Command::Delete { message_id, scope } => runtime.delete_message(&message_id, scope).await,
        Command::Presence(online) => {
            runtime.set_presence(online).await;
            Ok(())
        },
        Command::Reconnect => {
            if let Err(err) = runtime.reconnect().await {
                let hint = if err.is_transient() { ", /reconnect to retry" } else { "" };
                return show(&format!("reconnect failed: {err}{hint}"));
            }
            Ok(())
        },
        Command::History => {
            let Some(conversation) = runtime.chat().active() else {
                return show("no conversation is open");
            };
            for message in runtime.chat().messages(conversation) {
                show(&render::message_line(message))?;
            }
            Ok(())
        },
        Command::Help => return show(HELP),
        Command::Quit => Ok(()),
    };

    match result {
        Ok(()) => Ok(()),
        Err(err) => show(&err.to_string()),
    }
}

fn show(line: &str) -> io::Result<()> {
    let mut out = io::stdout().lock();
    writeln!(out, "{line}")
}
