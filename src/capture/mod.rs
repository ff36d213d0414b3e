//! Camera capture providers.

mod nokhwa_backend;

pub use nokhwa_backend::NokhwaCapture;

use thiserror::Error;

use crate::frame::SourceImage;

/// Failure while opening a camera or grabbing a photo.
///
/// Either way the current source image stays as it was; the caller logs and
/// moves on.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// The platform refused camera access.
    #[error("camera permission denied: {0}")]
    PermissionDenied(String),
    /// The device could not be opened or read.
    #[error("capture failed: {0}")]
    Failed(String),
}

/// Trait for camera capture providers.
pub trait CaptureProvider {
    /// Enumerates the cameras the platform exposes.
    fn list_devices() -> Result<Vec<CameraInfo>, CaptureError>
    where
        Self: Sized;

    /// Opens a device for capture.
    fn open(config: CaptureConfig) -> Result<Self, CaptureError>
    where
        Self: Sized;

    /// Grabs one photo from the open device.
    fn capture(&mut self) -> Result<SourceImage, CaptureError>;
}

/// A camera the platform reported.
#[derive(Debug, Clone)]
pub struct CameraInfo {
    /// Index to pass to `open`
    pub index: u32,
    /// Display name
    pub name: String,
}

/// Which device to open and the preferred photo size.
///
/// The size is a hint; drivers pick the closest mode they support.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    pub device_index: u32,
    pub width: u32,
    pub height: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device_index: 0,
            width: 1280,
            height: 720,
        }
    }
}
