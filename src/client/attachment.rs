use std::io;
use std::path::Path;

const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// The one file waiting to go out with the next submission.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingAttachment {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub file_name: String,
}

impl PendingAttachment {
    pub fn new(
        bytes: impl Into<Vec<u8>>,
        mime_type: impl Into<String>,
        file_name: impl Into<String>,
    ) -> Self {
        Self {
            bytes: bytes.into(),
            mime_type: mime_type.into(),
            file_name: file_name.into(),
        }
    }

    /// Read a file and guess its MIME type from the extension.
    pub async fn from_path<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Self::new(bytes, mime_for_path(path), file_name))
    }
}

pub fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("heic") => "image/heic",
        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain",
        Some("md") => "text/markdown",
        Some("csv") => "text/csv",
        Some("json") => "application/json",
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",
        Some("mp4") => "video/mp4",
        _ => DEFAULT_MIME_TYPE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_mime_guessing() {
        assert_eq!(mime_for_path(Path::new("cat.PNG")), "image/png");
        assert_eq!(mime_for_path(Path::new("photo.jpeg")), "image/jpeg");
        assert_eq!(mime_for_path(Path::new("notes")), DEFAULT_MIME_TYPE);
    }

    #[tokio::test]
    async fn test_from_path_reads_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cat.png");
        std::fs::write(&path, b"\x89PNG").unwrap();

        let attachment = PendingAttachment::from_path(&path).await.unwrap();
        assert_eq!(attachment.file_name, "cat.png");
        assert_eq!(attachment.mime_type, "image/png");
        assert_eq!(attachment.bytes, b"\x89PNG");
    }
}
