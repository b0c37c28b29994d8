//! Evidence file categories

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Fixed set of evidence file classes
///
/// The set is closed: staging state holds exactly one sequence per variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Image,
    Video,
    Audio,
    Document,
}

impl Category {
    /// All categories in display order
    pub const ALL: [Category; 4] = [
        Category::Image,
        Category::Video,
        Category::Audio,
        Category::Document,
    ];

    /// Singular name, also used as the object key prefix
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Image => "image",
            Category::Video => "video",
            Category::Audio => "audio",
            Category::Document => "document",
        }
    }

    /// Multipart field name expected by the scoring service
    pub fn field_name(&self) -> &'static str {
        match self {
            Category::Image => "images",
            Category::Video => "videos",
            Category::Audio => "audio",
            Category::Document => "pdfs",
        }
    }

    /// Content type used when a file declares none
    pub fn default_content_type(&self) -> &'static str {
        match self {
            Category::Image => "image/jpeg",
            Category::Video => "video/mp4",
            Category::Audio => "audio/mpeg",
            Category::Document => "application/pdf",
        }
    }

    /// Pick a category from a MIME type, falling back to the file extension
    pub fn infer(mime_type: &str, file_name: &str) -> Option<Category> {
        let mime = mime_type.trim().to_ascii_lowercase();
        if let Some(category) = Self::from_mime(&mime) {
            return Some(category);
        }

        let ext = file_name.rsplit_once('.')?.1.to_ascii_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" | "png" | "gif" | "webp" | "heic" | "bmp" | "tif" | "tiff" => {
                Some(Category::Image)
            }
            "mp4" | "mov" | "avi" | "mkv" | "webm" | "m4v" => Some(Category::Video),
            "mp3" | "wav" | "flac" | "ogg" | "m4a" | "aac" | "opus" => Some(Category::Audio),
            "pdf" => Some(Category::Document),
            _ => None,
        }
    }

    fn from_mime(mime: &str) -> Option<Category> {
        if mime.starts_with("image/") {
            Some(Category::Image)
        } else if mime.starts_with("video/") {
            Some(Category::Video)
        } else if mime.starts_with("audio/") {
            Some(Category::Audio)
        } else if mime == "application/pdf" {
            Some(Category::Document)
        } else {
            None
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    /// Accepts singular, plural, and multipart field spellings
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "image" | "images" => Ok(Category::Image),
            "video" | "videos" => Ok(Category::Video),
            "audio" | "audios" => Ok(Category::Audio),
            "document" | "documents" | "pdf" | "pdfs" => Ok(Category::Document),
            other => Err(format!("unknown category '{}'", other)),
        }
    }
}
