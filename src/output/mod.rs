//! Persistence and preview output.

pub mod png_writer;
pub mod window_output;

pub use png_writer::PngWriter;
pub use window_output::WindowRenderer;

use std::path::PathBuf;

use thiserror::Error;

use crate::frame::ImageFrame;

/// Failure while saving a flattened frame.
#[derive(Debug, Error)]
pub enum SaveError {
    /// The frame's dimensions do not match its buffer.
    #[error("frame dimensions do not match buffer size")]
    MalformedFrame,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("could not encode image: {0}")]
    Encode(#[from] image::ImageError),
}

/// Trait for persistence providers.
///
/// `save` takes the render surface's flattened output, never the raw source,
/// so the saved artifact is exactly what the preview shows.
pub trait PersistenceProvider {
    /// Writes the frame and returns the path it landed at.
    fn save(&mut self, frame: &ImageFrame) -> Result<PathBuf, SaveError>;
}
