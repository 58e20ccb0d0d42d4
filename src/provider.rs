//! The seam between the relay and whatever produces generated text.

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// One piece of a generation request, in the provider's wire shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: Blob,
    },
}

/// Base64 payload tagged with the MIME type the uploader declared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    pub mime_type: String,
    pub data: String,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text { text: text.into() }
    }

    pub fn inline(bytes: &[u8], mime_type: impl Into<String>) -> Self {
        Part::InlineData {
            inline_data: Blob {
                mime_type: mime_type.into(),
                data: base64::engine::general_purpose::STANDARD.encode(bytes),
            },
        }
    }
}

/// Build the parts for one user turn.
///
/// Text is always sent when there is no file. Alongside a file, an empty
/// message is dropped so the provider never receives an empty text part.
pub fn build_parts(text: &str, file: Option<(&[u8], &str)>) -> Vec<Part> {
    let mut parts = Vec::with_capacity(2);
    if file.is_none() || !text.is_empty() {
        parts.push(Part::text(text));
    }
    if let Some((bytes, mime_type)) = file {
        parts.push(Part::inline(bytes, mime_type));
    }
    parts
}

/// Produces one complete reply for one request. No streaming, no retries.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(&self, parts: Vec<Part>) -> Result<String, ProviderError>;
}
