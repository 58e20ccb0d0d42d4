use std::fmt;

/// Transcript label for a send that carries only a file.
pub const FILE_SENT_LABEL: &str = "File Sent";
/// Prefix of the feedback entry written when a file is chosen.
pub const SELECTED_FILE_PREFIX: &str = "Selected File: ";
/// The single notice shown when the relay could not be reached.
pub const FAILURE_NOTICE: &str = "Failed to fetch a response from the server.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sender {
    User,
    Model,
    Error,
}

impl Sender {
    pub fn label(&self) -> &'static str {
        match self {
            Sender::User => "User",
            Sender::Model => "Model",
            Sender::Error => "Error",
        }
    }
}

/// Identifies a transcript entry that is still being revealed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DisplayId(String);

impl DisplayId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DisplayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub sender: Sender,
    pub content: String,
    pub display_id: Option<DisplayId>,
}

impl ChatMessage {
    pub fn new(sender: Sender, content: impl Into<String>) -> Self {
        Self {
            sender,
            content: content.into(),
            display_id: None,
        }
    }
}
