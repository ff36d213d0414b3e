//! PNG persistence with timestamped filenames.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::info;

use super::{PersistenceProvider, SaveError};
use crate::frame::ImageFrame;

/// Saves flattened frames as PNG files in a target directory.
///
/// Filenames carry a local timestamp; a second save within the same second
/// gets a counter suffix instead of overwriting.
pub struct PngWriter {
    directory: PathBuf,
}

impl PngWriter {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// Encodes a frame as PNG at an explicit path.
    pub fn write_to(path: &Path, frame: &ImageFrame) -> Result<(), SaveError> {
        let rgba = frame.to_rgba();
        let image = image::RgbaImage::from_raw(rgba.width, rgba.height, rgba.data)
            .ok_or(SaveError::MalformedFrame)?;
        image.save(path)?;
        Ok(())
    }
}

impl PersistenceProvider for PngWriter {
    fn save(&mut self, frame: &ImageFrame) -> Result<PathBuf, SaveError> {
        fs::create_dir_all(&self.directory)?;

        let base = format!("iris_{}", Local::now().format("%Y%m%d_%H%M%S"));
        let mut path = self.directory.join(format!("{}.png", base));
        let mut counter = 1;
        while path.exists() {
            path = self.directory.join(format!("{}_{}.png", base, counter));
            counter += 1;
        }

        Self::write_to(&path, frame)?;
        info!("saved {}", path.display());
        Ok(path)
    }
}
