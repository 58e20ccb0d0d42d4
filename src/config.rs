// Relay configuration, loaded from the environment (optionally via .env) and CLI flags.

use std::path::PathBuf;

use clap::{Args, ValueEnum};

use crate::error::ConfigError;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";

/// Where an uploaded file lives while its request is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum UploadStorage {
    /// A temporary file inside the upload directory.
    Disk,
    /// An in-memory buffer owned by the request.
    Memory,
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true, help = "Gemini API key.")]
    pub api_key: Option<String>,
    #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT, help = "Port for the web server.")]
    pub port: u16,
    #[arg(long, env = "GEMINI_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,
    #[arg(long, env = "GEMINI_API_BASE", default_value = DEFAULT_API_BASE)]
    pub api_base: String,
    #[arg(long, env = "CHAT_PUBLIC_DIR", default_value = "public", help = "Directory of static assets.")]
    pub public_dir: PathBuf,
    #[arg(long, env = "CHAT_UPLOAD_STORAGE", value_enum, default_value_t = UploadStorage::Disk)]
    pub upload_storage: UploadStorage,
    #[arg(long, env = "CHAT_UPLOAD_DIR", default_value = "uploads")]
    pub upload_dir: PathBuf,
    #[arg(long, env = "CHAT_MAX_UPLOAD_BYTES", help = "Reject uploads larger than this.")]
    pub max_upload_bytes: Option<u64>,
    #[arg(
        long = "allow-mime",
        env = "CHAT_ALLOWED_MIME",
        value_delimiter = ',',
        help = "Accepted upload MIME types, e.g. image/*,application/pdf. Any type when unset."
    )]
    pub allowed_mime_types: Vec<String>,
}

/// Size and type restrictions applied to uploaded files.
///
/// The default accepts anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadPolicy {
    pub max_bytes: Option<u64>,
    pub allowed_mime_types: Vec<String>,
}

impl UploadPolicy {
    pub fn accepts_mime(&self, mime: &str) -> bool {
        if self.allowed_mime_types.is_empty() {
            return true;
        }
        let mime = mime.trim().to_ascii_lowercase();
        self.allowed_mime_types.iter().any(|allowed| {
            let allowed = allowed.trim().to_ascii_lowercase();
            match allowed.strip_suffix("/*") {
                Some(top) => mime.split('/').next() == Some(top),
                None => allowed == mime,
            }
        })
    }

    pub fn accepts_size(&self, len: u64) -> bool {
        self.max_bytes.map_or(true, |max| len <= max)
    }
}

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub api_key: String,
    pub port: u16,
    pub model: String,
    pub api_base: String,
    pub public_dir: PathBuf,
    pub upload_storage: UploadStorage,
    pub upload_dir: PathBuf,
    pub upload_policy: UploadPolicy,
}

impl TryFrom<ServeArgs> for RelayConfig {
    type Error = ConfigError;

    fn try_from(args: ServeArgs) -> Result<Self, Self::Error> {
        let api_key = args
            .api_key
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey)?;
        Ok(Self {
            api_key,
            port: args.port,
            model: args.model,
            api_base: args.api_base.trim_end_matches('/').to_string(),
            public_dir: args.public_dir,
            upload_storage: args.upload_storage,
            upload_dir: args.upload_dir,
            upload_policy: UploadPolicy {
                max_bytes: args.max_upload_bytes,
                allowed_mime_types: args
                    .allowed_mime_types
                    .into_iter()
                    .filter(|m| !m.trim().is_empty())
                    .collect(),
            },
        })
    }
}
