//! Image loading and media type detection.

use std::path::Path;

use tracing::debug;

use crate::error::ImageError;
use crate::models::receipt::ExtractionRequest;

/// Media type used when the extension is unknown.
pub const FALLBACK_MEDIA_TYPE: &str = "application/octet-stream";

/// Extensions processed by batch runs (compared case-insensitively).
pub const SUPPORTED_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "tiff"];

/// Check whether a path has one of the supported image extensions.
pub fn is_supported_image(path: &Path) -> bool {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    SUPPORTED_EXTENSIONS
        .iter()
        .any(|supported| supported.eq_ignore_ascii_case(ext))
}

/// Infer a media type from the file extension.
pub fn media_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "tiff" | "tif" => "image/tiff",
        "" => FALLBACK_MEDIA_TYPE,
        _ => mime_guess::from_ext(&ext)
            .first_raw()
            .unwrap_or(FALLBACK_MEDIA_TYPE),
    }
}

/// Reads image files into extraction requests.
#[derive(Debug, Clone)]
pub struct ImageLoader {
    prompt: String,
    max_bytes: u64,
}

impl ImageLoader {
    /// Create a loader that attaches `prompt` to every request.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            max_bytes: 0,
        }
    }

    /// Reject files larger than `max_bytes` (0 = unlimited).
    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Read the whole file and tag it with its media type.
    pub fn load(&self, path: &Path) -> Result<ExtractionRequest, ImageError> {
        let read_error = |source| ImageError::Read {
            path: path.display().to_string(),
            source,
        };

        if self.max_bytes > 0 {
            let size = std::fs::metadata(path).map_err(read_error)?.len();
            if size > self.max_bytes {
                return Err(ImageError::TooLarge {
                    path: path.display().to_string(),
                    size,
                    limit: self.max_bytes,
                });
            }
        }

        let bytes = std::fs::read(path).map_err(read_error)?;
        let media_type = media_type_for(path);

        debug!("Loaded {} ({} bytes, {})", path.display(), bytes.len(), media_type);

        Ok(ExtractionRequest::new(self.prompt.clone(), bytes, media_type))
    }
}

/// Convert a local image file to a `data:` URL.
pub fn image_to_data_url(path: &Path) -> Result<String, ImageError> {
    ImageLoader::new(String::new())
        .load(path)
        .map(|request| request.data_url())
}
