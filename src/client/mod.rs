//! Chat client session: the transcript, the pending attachment, the request
//! to the relay and the timed reveal of each reply.

pub mod attachment;
pub mod message;
pub mod reveal;
pub mod session;
pub mod transcript;
pub mod transport;

pub use attachment::PendingAttachment;
pub use message::{ChatMessage, DisplayId, Sender};
pub use reveal::{RevealOutcome, RevealTask, DEFAULT_TICK};
pub use session::{ChatSession, ExchangeOutcome, ReplyRenderer};
pub use transcript::{SharedTranscript, Transcript, TranscriptEvent};
pub use transport::{HttpRelay, OutboundRequest, RelayTransport, TransportError};
