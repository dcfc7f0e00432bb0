//! Uploaded image validation and storage under the media root.

use image::{ImageFormat, ImageReader};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};
use uuid::Uuid;

use crate::web::error::AppError;

/// Directory, relative to the media root, that holds recipe images.
pub const RECIPE_IMAGE_DIR: &str = "uploads/recipe";

const INVALID_IMAGE: &str =
    "Upload a valid image. The file you uploaded was either not an image or a corrupted image.";

const ACCEPTED_FORMATS: [ImageFormat; 6] = [
    ImageFormat::Png,
    ImageFormat::Jpeg,
    ImageFormat::Gif,
    ImageFormat::Bmp,
    ImageFormat::WebP,
    ImageFormat::Tiff,
];

/// Decodes the whole payload and returns its format. A recognised header
/// followed by corrupt data yields `None`.
pub fn decode_format(bytes: &[u8]) -> Option<ImageFormat> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()?;
    let format = reader
        .format()
        .filter(|format| ACCEPTED_FORMATS.contains(format))?;
    reader.decode().ok()?;
    Some(format)
}

fn extension(format: ImageFormat) -> &'static str {
    format.extensions_str().first().copied().unwrap_or("img")
}

#[derive(Debug, Clone)]
pub struct MediaStorage {
    root: PathBuf,
}

impl MediaStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Validates and writes a recipe image, returning its path relative to the media root.
    /// Nothing is written when the payload is rejected.
    pub async fn save_recipe_image(&self, bytes: Vec<u8>) -> Result<String, AppError> {
        if bytes.is_empty() {
            return Err(AppError::validation("image", "The submitted file is empty."));
        }

        let (bytes, format) = tokio::task::spawn_blocking(move || {
            let format = decode_format(&bytes);
            (bytes, format)
        })
        .await
        .map_err(|e| AppError::InternalServerError(format!("Image decoding task failed: {e}")))?;
        let format = format.ok_or_else(|| AppError::validation("image", INVALID_IMAGE))?;

        let relative = format!("{RECIPE_IMAGE_DIR}/{}.{}", Uuid::new_v4(), extension(format));
        let target = self.root.join(&relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&target, &bytes).await?;

        info!(path = %relative, size = bytes.len(), "Stored recipe image.");
        Ok(relative)
    }

    /// Removes a stored file that ended up unreferenced. Failures are only logged.
    pub async fn discard(&self, relative: &str) {
        if let Err(e) = fs::remove_file(self.root.join(relative)).await {
            warn!(path = %relative, error = %e, "Failed to remove unreferenced media file.");
        }
    }
}
