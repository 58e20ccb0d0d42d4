// Terminal chat client.
// Drives a ChatSession against a running relay and prints the transcript as it grows.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{info, warn};

use crate::client::{
    ChatSession, ExchangeOutcome, HttpRelay, PendingAttachment, Sender, TranscriptEvent,
};

#[derive(Debug, PartialEq, Eq)]
pub enum ChatCommand<'a> {
    Send(&'a str),
    Attach(&'a str),
    Quit,
}

pub fn parse_line(line: &str) -> ChatCommand<'_> {
    let line = line.trim_end_matches(['\r', '\n']);
    match line.trim() {
        "/quit" | "/exit" => ChatCommand::Quit,
        trimmed => match trimmed.strip_prefix("/attach ") {
            Some(path) => ChatCommand::Attach(path.trim()),
            None => ChatCommand::Send(line),
        },
    }
}

async fn render_events(mut events: broadcast::Receiver<TranscriptEvent>) {
    let mut stdout = std::io::stdout();
    loop {
        match events.recv().await {
            Ok(TranscriptEvent::Appended { message, .. }) => {
                // Model placeholders stay open so revealed characters follow the header.
                if message.sender == Sender::Model {
                    print!("\n{}: {}", message.sender.label(), message.content);
                } else {
                    println!("\n{}: {}", message.sender.label(), message.content);
                }
            }
            Ok(TranscriptEvent::Revealed { ch, .. }) => print!("{}", ch),
            Err(RecvError::Lagged(skipped)) => warn!("Renderer skipped {} events", skipped),
            Err(RecvError::Closed) => break,
        }
        let _ = stdout.flush();
    }
}

pub async fn run_chat(relay_url: &str, tick: Duration) -> Result<()> {
    info!("Starting chat session against {}", relay_url);
    let mut session = ChatSession::new(Arc::new(HttpRelay::new(relay_url))).with_tick(tick);
    let renderer = tokio::spawn(render_events(session.transcript().lock().await.subscribe()));

    println!("Type a message and press Enter. /attach <path> picks a file, /quit leaves.");

    let mut exchanges = Vec::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_line(&line) {
            ChatCommand::Quit => break,
            ChatCommand::Attach(path) => match PendingAttachment::from_path(path).await {
                Ok(file) => session.select_attachment(file).await,
                Err(e) => eprintln!("Could not read {}: {}", path, e),
            },
            ChatCommand::Send(text) => {
                session.set_input(text);
                if let Some(exchange) = session.submit().await {
                    exchanges.push(exchange);
                }
            }
        }
    }

    // Let replies that are already on their way finish revealing.
    for exchange in exchanges {
        if let Ok(ExchangeOutcome::Replied(reveal)) = exchange.await {
            reveal.finished().await;
        }
    }
    renderer.abort();
    println!();
    info!("Chat session finished.");
    Ok(())
}
