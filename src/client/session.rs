use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::attachment::PendingAttachment;
use super::message::{Sender, FAILURE_NOTICE, FILE_SENT_LABEL, SELECTED_FILE_PREFIX};
use super::reveal::{RevealTask, DEFAULT_TICK};
use super::transcript::{SharedTranscript, Transcript};
use super::transport::{OutboundRequest, RelayTransport, TransportError};

/// How one exchange with the relay ended.
#[derive(Debug)]
pub enum ExchangeOutcome {
    Replied(RevealTask),
    Failed(TransportError),
}

/// Writes relay replies and failures into a transcript.
#[derive(Clone)]
pub struct ReplyRenderer {
    transcript: SharedTranscript,
    tick: Duration,
}

impl ReplyRenderer {
    /// Allocate a fresh model placeholder and start revealing `raw` into it.
    pub async fn on_reply_received(&self, raw: String) -> RevealTask {
        let id = self.transcript.lock().await.append_placeholder(Sender::Model);
        debug!(%id, chars = raw.chars().count(), "Revealing reply");
        RevealTask::spawn(self.transcript.clone(), id, raw, self.tick)
    }

    pub async fn on_reply_failed(&self) {
        self.transcript
            .lock()
            .await
            .append(Sender::Error, FAILURE_NOTICE);
    }
}

/// State of one chat widget: its transcript, input line and pending file.
///
/// Several sessions can coexist; nothing here is global.
pub struct ChatSession {
    transport: Arc<dyn RelayTransport>,
    renderer: ReplyRenderer,
    input: String,
    pending: Option<PendingAttachment>,
}

impl ChatSession {
    pub fn new(transport: Arc<dyn RelayTransport>) -> Self {
        Self {
            transport,
            renderer: ReplyRenderer {
                transcript: Transcript::shared(),
                tick: DEFAULT_TICK,
            },
            input: String::new(),
            pending: None,
        }
    }

    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.renderer.tick = tick;
        self
    }

    pub fn transcript(&self) -> SharedTranscript {
        self.renderer.transcript.clone()
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    pub fn pending_attachment(&self) -> Option<&PendingAttachment> {
        self.pending.as_ref()
    }

    /// Replace the pending file and note the choice in the transcript.
    pub async fn select_attachment(&mut self, file: PendingAttachment) {
        self.renderer.transcript.lock().await.append(
            Sender::User,
            format!("{}{}", SELECTED_FILE_PREFIX, file.file_name),
        );
        self.pending = Some(file);
    }

    /// Send the current input and pending file to the relay.
    ///
    /// Returns `None` without touching anything when both are empty. Otherwise
    /// the user entry is appended and the input cleared before this returns;
    /// the request itself runs on the returned task. The pending file leaves
    /// the session with the request, so the next submission starts clean
    /// whatever the outcome.
    pub async fn submit(&mut self) -> Option<JoinHandle<ExchangeOutcome>> {
        if self.input.is_empty() && self.pending.is_none() {
            return None;
        }
        let msg = std::mem::take(&mut self.input);
        let label = if msg.is_empty() {
            FILE_SENT_LABEL.to_string()
        } else {
            msg.clone()
        };
        self.renderer
            .transcript
            .lock()
            .await
            .append(Sender::User, label);

        let request = OutboundRequest {
            msg,
            file: self.pending.take(),
        };
        let transport = self.transport.clone();
        let renderer = self.renderer.clone();
        Some(tokio::spawn(async move {
            match transport.send(request).await {
                Ok(reply) => ExchangeOutcome::Replied(renderer.on_reply_received(reply).await),
                Err(e) => {
                    warn!("Relay request failed: {}", e);
                    renderer.on_reply_failed().await;
                    ExchangeOutcome::Failed(e)
                }
            }
        }))
    }

    pub async fn on_reply_received(&self, raw: String) -> RevealTask {
        self.renderer.on_reply_received(raw).await
    }

    pub async fn on_reply_failed(&self) {
        self.renderer.on_reply_failed().await
    }
}
