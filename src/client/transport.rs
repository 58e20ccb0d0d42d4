use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Client,
};
use thiserror::Error;
use tracing::debug;

use super::attachment::PendingAttachment;

/// Exactly what one submission puts on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundRequest {
    pub msg: String,
    pub file: Option<PendingAttachment>,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("could not reach the relay: {0}")]
    Request(#[from] reqwest::Error),
    #[error("attachment has an invalid MIME type: {0}")]
    InvalidMimeType(String),
}

#[async_trait]
pub trait RelayTransport: Send + Sync {
    async fn send(&self, request: OutboundRequest) -> Result<String, TransportError>;
}

/// Posts submissions to a relay's `/get` endpoint as multipart form data.
///
/// Whatever body the relay answers with is the reply, error statuses included;
/// only failing to send or read the request is a transport error.
#[derive(Clone)]
pub struct HttpRelay {
    http: Client,
    endpoint: String,
}

impl HttpRelay {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: Client::new(),
            endpoint: format!("{}/get", base_url.trim_end_matches('/')),
        }
    }
}

#[async_trait]
impl RelayTransport for HttpRelay {
    async fn send(&self, request: OutboundRequest) -> Result<String, TransportError> {
        let mut form = Form::new().text("msg", request.msg);
        if let Some(file) = request.file {
            let part = Part::bytes(file.bytes)
                .file_name(file.file_name)
                .mime_str(&file.mime_type)
                .map_err(|_| TransportError::InvalidMimeType(file.mime_type.clone()))?;
            form = form.part("file", part);
        }

        let response = self.http.post(&self.endpoint).multipart(form).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            debug!(%status, "Relay answered with an error status");
        }
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invalid_mime_type_is_reported_as_such() {
        // Rejected while building the form, before any connection is attempted.
        let relay = HttpRelay::new("http://127.0.0.1:1");
        let request = OutboundRequest {
            msg: "hi".into(),
            file: Some(PendingAttachment::new(vec![1], "not a mime", "blob")),
        };
        match relay.send(request).await {
            Err(TransportError::InvalidMimeType(mime)) => assert_eq!(mime, "not a mime"),
            other => panic!("expected invalid MIME type, got {:?}", other),
        }
    }
}
