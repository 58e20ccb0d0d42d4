use std::sync::Arc;

use tokio::sync::{broadcast, Mutex};

use super::message::{ChatMessage, DisplayId, Sender};

const EVENT_CAPACITY: usize = 1024;

/// Transcript shared between the session and its reveal tasks.
pub type SharedTranscript = Arc<Mutex<Transcript>>;

/// Change notifications for whoever renders the transcript.
#[derive(Debug, Clone, PartialEq)]
pub enum TranscriptEvent {
    Appended { index: usize, message: ChatMessage },
    Revealed { id: DisplayId, ch: char },
}

/// Append-only chat log.
///
/// Entries are never removed or reordered. The only in-place change is
/// [`Transcript::push_revealed`] growing a placeholder's content. Every append
/// moves the scroll anchor to the newest entry.
#[derive(Debug)]
pub struct Transcript {
    entries: Vec<ChatMessage>,
    next_reply: u64,
    scroll_anchor: Option<usize>,
    events: broadcast::Sender<TranscriptEvent>,
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new()
    }
}

impl Transcript {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            entries: Vec::new(),
            next_reply: 0,
            scroll_anchor: None,
            events,
        }
    }

    pub fn shared() -> SharedTranscript {
        Arc::new(Mutex::new(Self::new()))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TranscriptEvent> {
        self.events.subscribe()
    }

    pub fn append(&mut self, sender: Sender, content: impl Into<String>) -> usize {
        self.push(ChatMessage::new(sender, content))
    }

    /// Append an empty entry with a fresh id, ready to be revealed into.
    pub fn append_placeholder(&mut self, sender: Sender) -> DisplayId {
        let id = DisplayId::new(format!("reply-{}", self.next_reply));
        self.next_reply += 1;
        self.push(ChatMessage {
            sender,
            content: String::new(),
            display_id: Some(id.clone()),
        });
        id
    }

    /// Add one revealed character to the entry carrying `id`.
    pub fn push_revealed(&mut self, id: &DisplayId, ch: char) -> bool {
        let Some(entry) = self
            .entries
            .iter_mut()
            .rev()
            .find(|m| m.display_id.as_ref() == Some(id))
        else {
            return false;
        };
        entry.content.push(ch);
        let _ = self.events.send(TranscriptEvent::Revealed { id: id.clone(), ch });
        true
    }

    fn push(&mut self, message: ChatMessage) -> usize {
        let index = self.entries.len();
        self.entries.push(message.clone());
        self.scroll_anchor = Some(index);
        // No receivers is fine; nobody is rendering yet.
        let _ = self.events.send(TranscriptEvent::Appended { index, message });
        index
    }

    pub fn entries(&self) -> &[ChatMessage] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.entries.last()
    }

    pub fn get(&self, id: &DisplayId) -> Option<&ChatMessage> {
        self.entries
            .iter()
            .find(|m| m.display_id.as_ref() == Some(id))
    }

    /// Index of the entry the view is scrolled to.
    pub fn scroll_anchor(&self) -> Option<usize> {
        self.scroll_anchor
    }
}
