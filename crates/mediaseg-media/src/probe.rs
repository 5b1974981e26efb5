//! Media file probing to get a source description without decoding.

use mediaseg_core::{MediaType, Result, SegmentError, Source, SourceMetadata};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Known container extensions and the media type they carry.
const EXTENSIONS: &[(&str, MediaType)] = &[
    ("mp4", MediaType::Video),
    ("m4v", MediaType::Video),
    ("mov", MediaType::Video),
    ("mkv", MediaType::Video),
    ("webm", MediaType::Video),
    ("avi", MediaType::Video),
    ("mpg", MediaType::Video),
    ("mpeg", MediaType::Video),
    ("ts", MediaType::Video),
    ("mp3", MediaType::Audio),
    ("wav", MediaType::Audio),
    ("flac", MediaType::Audio),
    ("ogg", MediaType::Audio),
    ("m4a", MediaType::Audio),
    ("aac", MediaType::Audio),
    ("png", MediaType::Image),
    ("jpg", MediaType::Image),
    ("jpeg", MediaType::Image),
    ("gif", MediaType::Image),
    ("bmp", MediaType::Image),
    ("tif", MediaType::Image),
    ("tiff", MediaType::Image),
    ("webp", MediaType::Image),
    ("obj", MediaType::Mesh),
    ("stl", MediaType::Mesh),
    ("ply", MediaType::Mesh),
    ("glb", MediaType::Mesh),
    ("gltf", MediaType::Mesh),
];

/// Media type of a file, judged by its extension (case-insensitive).
pub fn media_type_for(path: &Path) -> Option<MediaType> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    EXTENSIONS
        .iter()
        .find(|(known, _)| *known == ext)
        .map(|(_, media_type)| *media_type)
}

/// Information about a media file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaProbe {
    /// File path
    pub path: String,
    /// File name including extension
    pub name: String,
    pub media_type: MediaType,
    /// Container format (lower-case extension)
    pub format: String,
    /// Size on disk in bytes
    pub size_bytes: u64,
}

impl MediaProbe {
    /// Probe a media file.
    pub fn probe<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let path_str = path.to_string_lossy().to_string();

        if !path.exists() {
            return Err(SegmentError::NotFound(format!(
                "File not found: {}",
                path_str
            )));
        }

        let media_type = media_type_for(path).ok_or_else(|| {
            SegmentError::UnsupportedFormat(format!("Unknown media extension: {}", path_str))
        })?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path_str.clone());
        let format = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        let size_bytes = std::fs::metadata(path)?.len();

        tracing::debug!(path = %path_str, media_type = media_type.as_str(), "Probed media file");

        Ok(Self {
            path: path_str,
            name,
            media_type,
            format,
            size_bytes,
        })
    }

    /// Whether frames of this file carry timestamps.
    pub fn is_temporal(&self) -> bool {
        matches!(self.media_type, MediaType::Video | MediaType::Audio)
    }

    /// Build the source description for this file.
    pub fn into_source(self, metadata: SourceMetadata) -> Source {
        Source::new(self.name, self.path, self.media_type).with_metadata(metadata)
    }
}
