//! Staged evidence file

use super::Category;
use crate::error::{ClientResult, ValidationError};
use std::path::Path;
use std::sync::Arc;

/// A file selected for submission
///
/// Immutable once created. The payload is reference-counted so snapshots of
/// the staging state are cheap to take.
#[derive(Debug, Clone, PartialEq)]
pub struct StagedFile {
    name: String,
    mime_type: String,
    category: Category,
    bytes: Arc<[u8]>,
}

impl StagedFile {
    /// Create a staged file from in-memory bytes
    ///
    /// An empty `mime_type` means "not declared"; the category default is
    /// used when the file is sent anywhere.
    pub fn new(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        category: Category,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into().trim().to_string(),
            category,
            bytes: Arc::from(bytes.into()),
        }
    }

    /// Read a file from disk, sniffing its MIME type from content then extension
    ///
    /// When `category` is `None` it is inferred from the detected type.
    pub fn from_path(path: &Path, category: Option<Category>) -> ClientResult<Self> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let mime_type = infer::get(&bytes)
            .map(|kind| kind.mime_type().to_string())
            .or_else(|| mime_from_extension(&name).map(str::to_string))
            .unwrap_or_default();

        let category = match category {
            Some(category) => category,
            None => Category::infer(&mime_type, &name)
                .ok_or_else(|| ValidationError::UnsupportedFileType(name.clone()))?,
        };

        tracing::debug!(
            file = %name,
            mime_type = %mime_type,
            category = %category,
            size_bytes = bytes.len(),
            "Staged file read from disk"
        );

        Ok(Self::new(name, mime_type, category, bytes))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared MIME type; empty when none was declared
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Declared MIME type, or the category default when absent
    pub fn content_type(&self) -> &str {
        if self.mime_type.is_empty() {
            self.category.default_content_type()
        } else {
            &self.mime_type
        }
    }
}

fn mime_from_extension(name: &str) -> Option<&'static str> {
    let ext = name.rsplit_once('.')?.1.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "heic" => "image/heic",
        "mp4" | "m4v" => "video/mp4",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "webm" => "video/webm",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "flac" => "audio/flac",
        "ogg" => "audio/ogg",
        "m4a" => "audio/mp4",
        "pdf" => "application/pdf",
        _ => return None,
    };
    Some(mime)
}
