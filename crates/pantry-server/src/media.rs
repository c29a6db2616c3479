use anyhow::{Context, Result};
use image::ImageFormat;
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

/// Directory, relative to the media root, that recipe images are written to
const RECIPE_IMAGE_DIR: &str = "uploads/recipe";

/// Check that `bytes` hold a decodable image and return its format.
///
/// The whole payload is decoded, not just sniffed, so a truncated file with a
/// valid header is rejected too. CPU bound; call from a blocking task.
pub fn detect_image(bytes: &[u8]) -> Result<ImageFormat, image::ImageError> {
    let format = image::guess_format(bytes)?;
    image::load_from_memory_with_format(bytes, format)?;
    Ok(format)
}

/// Media storage handles writing, locating and removing uploaded files
#[derive(Debug, Clone)]
pub struct MediaStorage {
    root: PathBuf,
    url_prefix: String,
}

impl MediaStorage {
    pub fn new(root: impl AsRef<Path>, url_prefix: &str) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            url_prefix: url_prefix.trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write a recipe image under a fresh unique name.
    /// Returns the path relative to the media root.
    pub async fn save_recipe_image(&self, bytes: &[u8], format: ImageFormat) -> Result<String> {
        let ext = format.extensions_str().first().copied().unwrap_or("img");
        let relative = format!("{}/{}.{}", RECIPE_IMAGE_DIR, Uuid::new_v4(), ext);

        let dir = self.root.join(RECIPE_IMAGE_DIR);
        fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create media directory: {:?}", dir))?;

        let path = self.root.join(&relative);
        fs::write(&path, bytes)
            .await
            .with_context(|| format!("Failed to write image: {:?}", path))?;

        Ok(relative)
    }

    /// Public URL of a stored file
    pub fn url_for(&self, relative: &str) -> String {
        format!("{}/{}", self.url_prefix, relative.trim_start_matches('/'))
    }

    /// Remove a stored file. A file that is already gone is not an error.
    pub async fn delete(&self, relative: &str) -> Result<()> {
        let path = self.root.join(relative);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove media file: {:?}", path)),
        }
    }
}
