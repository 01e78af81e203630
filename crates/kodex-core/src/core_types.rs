//! Core data shapes shared by the wizard, the orchestrator and the Gateway
//!
//! Chat history is an ordered, append-only list of `ChatMessage` values. Images
//! travel as `InlineImage`, which owns the decoded bytes and knows how to turn
//! itself into the `data:<mime>;base64,<payload>` form used by browsers and by
//! the Gateway's inline data parts.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

use crate::errors::KodexError;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ToolCall {
    pub id: Option<String>,
    pub name: String,
    pub arguments: Value,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[derive(Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for InlineImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InlineImage")
            .field("mime_type", &self.mime_type)
            .field("bytes", &format_args!("<{} bytes>", self.bytes.len()))
            .finish()
    }
}

impl InlineImage {
    pub fn new(mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Builds an image from a base64 payload as it arrives in Gateway responses.
    pub fn from_base64(mime_type: impl Into<String>, data: &str) -> Result<Self, KodexError> {
        let bytes = STANDARD
            .decode(data.trim())
            .map_err(|e| KodexError::Validation(format!("Invalid base64 image data: {}", e)))?;
        Ok(Self::new(mime_type, bytes))
    }

    /// Parses `data:<mime>;base64,<payload>`.
    pub fn from_data_uri(uri: &str) -> Result<Self, KodexError> {
        let rest = uri
            .strip_prefix("data:")
            .ok_or_else(|| KodexError::Validation("Data URI must start with 'data:'".into()))?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| KodexError::Validation("Data URI has no payload".into()))?;
        let mime_type = header.strip_suffix(";base64").ok_or_else(|| {
            KodexError::Validation("Only base64-encoded data URIs are supported".into())
        })?;
        if mime_type.is_empty() {
            return Err(KodexError::Validation("Data URI has no MIME type".into()));
        }
        Self::from_base64(mime_type, payload)
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }

    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.to_base64())
    }

    /// Reads an image file, inferring the MIME type from its extension.
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, KodexError> {
        let path = path.as_ref();
        let mime_type = mime_type_for_path(path).ok_or_else(|| {
            KodexError::Validation(format!(
                "Unsupported image type for '{}'; expected png, jpg, jpeg, webp or gif",
                path.display()
            ))
        })?;
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            KodexError::Io(format!("Failed to read image '{}': {}", path.display(), e))
        })?;
        if bytes.is_empty() {
            return Err(KodexError::Validation(format!(
                "Image file '{}' is empty",
                path.display()
            )));
        }
        Ok(Self::new(mime_type, bytes))
    }
}

/// Directives forwarded to the Gateway's vectorizer. Both sliders are 0..=100.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct VectorizationSettings {
    #[serde(default = "default_detail_level")]
    pub detail_level: u8,
    #[serde(default = "default_smoothness")]
    pub smoothness: u8,
    #[serde(default = "default_true")]
    pub remove_background: bool,
    #[serde(default = "default_true")]
    pub single_path: bool,
}

impl Default for VectorizationSettings {
    fn default() -> Self {
        Self {
            detail_level: default_detail_level(),
            smoothness: default_smoothness(),
            remove_background: true,
            single_path: true,
        }
    }
}

impl VectorizationSettings {
    pub fn validate(&self) -> Result<(), KodexError> {
        if self.detail_level > 100 {
            return Err(KodexError::Validation(format!(
                "detail_level must be between 0 and 100, got {}",
                self.detail_level
            )));
        }
        if self.smoothness > 100 {
            return Err(KodexError::Validation(format!(
                "smoothness must be between 0 and 100, got {}",
                self.smoothness
            )));
        }
        Ok(())
    }
}

fn default_detail_level() -> u8 {
    50
}

fn default_smoothness() -> u8 {
    75
}

fn default_true() -> bool {
    true
}

pub fn mime_type_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        _ => None,
    }
}
