use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::message::DisplayId;
use super::transcript::SharedTranscript;

/// Delay between two revealed characters.
pub const DEFAULT_TICK: Duration = Duration::from_millis(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealOutcome {
    Completed,
    Cancelled,
}

/// Reveals one already-complete reply into its own placeholder, one character
/// per tick. Each task owns its timer; cancelling it leaves other reveals alone.
#[derive(Debug)]
pub struct RevealTask {
    id: DisplayId,
    cancel: CancellationToken,
    handle: JoinHandle<RevealOutcome>,
}

impl RevealTask {
    pub fn spawn(transcript: SharedTranscript, id: DisplayId, text: String, tick: Duration) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let target = id.clone();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick);
            // The first tick completes immediately; the first character waits a full tick.
            interval.tick().await;
            for ch in text.chars() {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => return RevealOutcome::Cancelled,
                    _ = interval.tick() => {}
                }
                transcript.lock().await.push_revealed(&target, ch);
            }
            RevealOutcome::Completed
        });
        Self { id, cancel, handle }
    }

    pub fn id(&self) -> &DisplayId {
        &self.id
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the reveal to stop. A panicked task counts as cancelled.
    pub async fn finished(self) -> RevealOutcome {
        self.handle.await.unwrap_or(RevealOutcome::Cancelled)
    }
}
