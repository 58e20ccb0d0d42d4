//! Per-request storage for uploaded files.
//!
//! An [`UploadArtifact`] belongs to exactly one request. Its backing storage is
//! removed by [`UploadArtifact::release`], or by `Drop` on any path that never
//! reaches the release (early `?` returns, panics).

use std::borrow::Cow;
use std::io;
use std::path::{Path, PathBuf};

use axum::extract::multipart::Field;
use tempfile::TempPath;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::config::{UploadPolicy, UploadStorage};
use crate::error::{ConfigError, RelayError};

const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

#[derive(Debug)]
enum Backing {
    Disk(TempPath),
    Memory(Vec<u8>),
}

/// A file received with one request.
#[derive(Debug)]
pub struct UploadArtifact {
    backing: Backing,
    mime_type: String,
    file_name: Option<String>,
    len: u64,
}

impl UploadArtifact {
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// On-disk location, when the artifact is disk backed.
    pub fn path(&self) -> Option<&Path> {
        match &self.backing {
            Backing::Disk(path) => Some(path),
            Backing::Memory(_) => None,
        }
    }

    pub async fn payload(&self) -> io::Result<Cow<'_, [u8]>> {
        match &self.backing {
            Backing::Disk(path) => Ok(Cow::Owned(tokio::fs::read(path).await?)),
            Backing::Memory(bytes) => Ok(Cow::Borrowed(bytes)),
        }
    }

    /// Delete the backing storage. Consumes the artifact so it runs once.
    pub fn release(self) -> io::Result<()> {
        match self.backing {
            Backing::Disk(path) => {
                debug!(path = %path.display(), "Removing upload artifact");
                path.close()
            }
            Backing::Memory(_) => Ok(()),
        }
    }
}

enum Sink {
    Disk { file: tokio::fs::File, path: TempPath },
    Memory(Vec<u8>),
}

/// Accumulates one upload chunk by chunk while enforcing the policy.
pub struct ArtifactWriter<'a> {
    policy: &'a UploadPolicy,
    sink: Sink,
    mime_type: String,
    file_name: Option<String>,
    len: u64,
}

impl ArtifactWriter<'_> {
    pub async fn write(&mut self, chunk: &[u8]) -> Result<(), RelayError> {
        self.len += chunk.len() as u64;
        if !self.policy.accepts_size(self.len) {
            return Err(RelayError::UploadTooLarge {
                limit: self.policy.max_bytes.unwrap_or_default(),
            });
        }
        match &mut self.sink {
            Sink::Disk { file, .. } => file.write_all(chunk).await?,
            Sink::Memory(buf) => buf.extend_from_slice(chunk),
        }
        Ok(())
    }

    pub async fn finish(self) -> Result<UploadArtifact, RelayError> {
        let backing = match self.sink {
            Sink::Disk { mut file, path } => {
                file.flush().await?;
                drop(file);
                Backing::Disk(path)
            }
            Sink::Memory(buf) => Backing::Memory(buf),
        };
        Ok(UploadArtifact {
            backing,
            mime_type: self.mime_type,
            file_name: self.file_name,
            len: self.len,
        })
    }
}

/// Creates upload artifacts according to the configured storage and policy.
#[derive(Debug, Clone)]
pub struct UploadStore {
    storage: UploadStorage,
    dir: PathBuf,
    policy: UploadPolicy,
}

impl UploadStore {
    pub fn new(storage: UploadStorage, dir: impl Into<PathBuf>, policy: UploadPolicy) -> Self {
        Self {
            storage,
            dir: dir.into(),
            policy,
        }
    }

    pub fn in_memory(policy: UploadPolicy) -> Self {
        Self::new(UploadStorage::Memory, PathBuf::new(), policy)
    }

    pub fn policy(&self) -> &UploadPolicy {
        &self.policy
    }

    /// Make sure the upload directory exists before serving.
    pub fn prepare(&self) -> Result<(), ConfigError> {
        if self.storage == UploadStorage::Disk {
            std::fs::create_dir_all(&self.dir).map_err(|source| ConfigError::UploadDir {
                path: self.dir.clone(),
                source,
            })?;
        }
        Ok(())
    }

    pub fn begin(
        &self,
        mime_type: Option<&str>,
        file_name: Option<&str>,
    ) -> Result<ArtifactWriter<'_>, RelayError> {
        let mime_type = mime_type
            .filter(|m| !m.is_empty())
            .unwrap_or(DEFAULT_MIME_TYPE)
            .to_string();
        if !self.policy.accepts_mime(&mime_type) {
            return Err(RelayError::UnsupportedMediaType(mime_type));
        }
        let sink = match self.storage {
            UploadStorage::Disk => {
                let (file, path) = tempfile::Builder::new()
                    .prefix("upload-")
                    .tempfile_in(&self.dir)?
                    .into_parts();
                Sink::Disk {
                    file: tokio::fs::File::from_std(file),
                    path,
                }
            }
            UploadStorage::Memory => Sink::Memory(Vec::new()),
        };
        Ok(ArtifactWriter {
            policy: &self.policy,
            sink,
            mime_type,
            file_name: file_name.map(str::to_string),
            len: 0,
        })
    }

    /// Stream a multipart file field into a new artifact.
    pub async fn ingest(&self, mut field: Field<'_>) -> Result<UploadArtifact, RelayError> {
        let mut writer = self.begin(field.content_type(), field.file_name())?;
        while let Some(chunk) = field.chunk().await? {
            writer.write(&chunk).await?;
        }
        writer.finish().await
    }
}
