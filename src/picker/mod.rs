//! Photo import providers.

use std::path::{Path, PathBuf};

use rfd::FileDialog;
use thiserror::Error;
use tracing::info;

use crate::frame::{ImageFrame, PixelFormat, SourceImage};

/// Failure while picking or decoding a photo.
#[derive(Debug, Error)]
pub enum PickError {
    /// The user dismissed the dialog. The caller keeps its current source
    /// and selection.
    #[error("pick canceled")]
    Canceled,
    #[error("could not load image: {0}")]
    Image(#[from] image::ImageError),
}

/// Trait for photo import providers.
pub trait PickerProvider {
    /// Produces a photo from outside the app.
    fn pick(&mut self) -> Result<SourceImage, PickError>;
}

/// Imports a known file path.
pub struct FilePicker {
    path: PathBuf,
}

impl FilePicker {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl PickerProvider for FilePicker {
    fn pick(&mut self) -> Result<SourceImage, PickError> {
        load_source(&self.path)
    }
}

/// Native file-open dialog. Dismissing the dialog cancels the pick.
#[derive(Debug, Default)]
pub struct DialogPicker;

impl DialogPicker {
    pub fn new() -> Self {
        Self
    }
}

impl PickerProvider for DialogPicker {
    fn pick(&mut self) -> Result<SourceImage, PickError> {
        let path = FileDialog::new()
            .set_title("Open Photo")
            .add_filter("images", &["png", "jpg", "jpeg", "bmp", "webp"])
            .pick_file()
            .ok_or(PickError::Canceled)?;
        load_source(&path)
    }
}

/// Decodes an image file into an RGBA source.
pub fn load_source(path: &Path) -> Result<SourceImage, PickError> {
    let decoded = image::open(path)?.to_rgba8();
    let width = decoded.width();
    let height = decoded.height();
    let frame = ImageFrame::from_data(width, height, PixelFormat::Rgba, decoded.into_raw());
    info!("loaded {} ({}x{})", path.display(), width, height);
    Ok(SourceImage::new(path.display().to_string(), frame))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_source_round_trips_pixels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.png");

        let mut img = image::RgbaImage::new(3, 2);
        img.put_pixel(0, 0, image::Rgba([255, 0, 0, 255]));
        img.put_pixel(2, 1, image::Rgba([0, 0, 255, 128]));
        img.save(&path).unwrap();

        let source = load_source(&path).unwrap();
        assert_eq!(source.width(), 3);
        assert_eq!(source.height(), 2);
        assert_eq!(source.frame.format, PixelFormat::Rgba);
        assert_eq!(&source.frame.data[0..4], &[255, 0, 0, 255]);
        let last = source.frame.data.len() - 4;
        assert_eq!(&source.frame.data[last..], &[0, 0, 255, 128]);
        assert_eq!(source.origin, path.display().to_string());
    }

    #[test]
    fn test_missing_file_is_an_image_error() {
        let mut picker = FilePicker::new("/definitely/not/here.png");
        assert!(matches!(picker.pick(), Err(PickError::Image(_))));
    }
}
