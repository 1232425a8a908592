//! Image intake: inline base64, local file or remote URL → validated payload.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use base64::Engine as _;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Decoded size limit for one report image.
pub const MAX_IMAGE_BYTES: usize = 20 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ImageSource {
    /// Raw base64, optionally with a `data:image/...;base64,` prefix.
    Base64(String),
    FilePath(PathBuf),
    Url(String),
}

impl ImageSource {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Base64(_) => "base64",
            Self::FilePath(_) => "file_path",
            Self::Url(_) => "url",
        }
    }
}

#[derive(Error, Debug)]
pub enum IntakeError {
    #[error("Image payload is not valid base64")]
    InvalidBase64,

    #[error("Image payload is empty")]
    Empty,

    #[error("Image is {size} bytes, limit is {limit}")]
    TooLarge { size: usize, limit: usize },

    #[error("Cannot read image file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported image URL: {0}")]
    UnsupportedUrl(String),

    #[error("Image download failed: {0}")]
    Fetch(String),

    #[error("Image download returned status {0}")]
    FetchStatus(u16),
}

impl IntakeError {
    /// Download failures are the remote side's fault; everything else is
    /// a bad request.
    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::Fetch(_) | Self::FetchStatus(_))
    }
}

/// Validated image ready for the extraction request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub base64: String,
    pub media_type: &'static str,
    pub byte_len: usize,
}

impl ImagePayload {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, IntakeError> {
        check_size(bytes.len())?;
        Ok(Self {
            base64: base64::engine::general_purpose::STANDARD.encode(bytes),
            media_type: sniff_media_type(bytes),
            byte_len: bytes.len(),
        })
    }

    pub fn from_base64(encoded: &str) -> Result<Self, IntakeError> {
        let stripped = strip_data_url(encoded.trim());
        let compact: String = stripped.chars().filter(|c| !c.is_whitespace()).collect();
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(compact.as_bytes())
            .map_err(|_| IntakeError::InvalidBase64)?;
        check_size(bytes.len())?;
        Ok(Self {
            media_type: sniff_media_type(&bytes),
            byte_len: bytes.len(),
            base64: compact,
        })
    }

    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.base64)
    }
}

/// Resolves image sources. Owns the HTTP client used for URL sources.
pub struct ImageIntake {
    client: reqwest::blocking::Client,
}

impl ImageIntake {
    pub fn new(fetch_timeout: Duration) -> Result<Self, IntakeError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(fetch_timeout)
            .build()
            .map_err(|e| IntakeError::Fetch(e.to_string()))?;
        Ok(Self { client })
    }

    pub fn resolve(&self, source: &ImageSource) -> Result<ImagePayload, IntakeError> {
        let payload = match source {
            ImageSource::Base64(encoded) => ImagePayload::from_base64(encoded)?,
            ImageSource::FilePath(path) => read_file(path)?,
            ImageSource::Url(url) => self.fetch(url)?,
        };
        tracing::debug!(
            source = source.kind(),
            bytes = payload.byte_len,
            media_type = payload.media_type,
            "Image resolved"
        );
        Ok(payload)
    }

    fn fetch(&self, url: &str) -> Result<ImagePayload, IntakeError> {
        let parsed =
            reqwest::Url::parse(url).map_err(|_| IntakeError::UnsupportedUrl(url.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(IntakeError::UnsupportedUrl(url.to_string()));
        }

        let response = self
            .client
            .get(parsed)
            .send()
            .map_err(|e| IntakeError::Fetch(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(IntakeError::FetchStatus(status.as_u16()));
        }

        let mut bytes = Vec::new();
        response
            .take(MAX_IMAGE_BYTES as u64 + 1)
            .read_to_end(&mut bytes)
            .map_err(|e| IntakeError::Fetch(e.to_string()))?;
        ImagePayload::from_bytes(&bytes)
    }
}

fn read_file(path: &Path) -> Result<ImagePayload, IntakeError> {
    let size = std::fs::metadata(path)?.len();
    check_size(usize::try_from(size).unwrap_or(usize::MAX))?;
    let bytes = std::fs::read(path)?;
    ImagePayload::from_bytes(&bytes)
}

fn check_size(size: usize) -> Result<(), IntakeError> {
    if size == 0 {
        return Err(IntakeError::Empty);
    }
    if size > MAX_IMAGE_BYTES {
        return Err(IntakeError::TooLarge {
            size,
            limit: MAX_IMAGE_BYTES,
        });
    }
    Ok(())
}

fn strip_data_url(encoded: &str) -> &str {
    if encoded.starts_with("data:") {
        if let Some((_, payload)) = encoded.split_once(";base64,") {
            return payload;
        }
    }
    encoded
}

/// Media type from magic bytes. Unknown formats are sent as JPEG.
fn sniff_media_type(bytes: &[u8]) -> &'static str {
    match bytes {
        [0x89, b'P', b'N', b'G', ..] => "image/png",
        [0xFF, 0xD8, 0xFF, ..] => "image/jpeg",
        [b'G', b'I', b'F', b'8', ..] => "image/gif",
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => "image/webp",
        [b'B', b'M', ..] => "image/bmp",
        _ => "image/jpeg",
    }
}
