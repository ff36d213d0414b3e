//! Nokhwa-based camera capture provider.

use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution,
};
use nokhwa::Camera;
use tracing::info;

use super::{CameraInfo, CaptureConfig, CaptureError, CaptureProvider};
use crate::frame::{ImageFrame, PixelFormat, SourceImage};

/// Camera capture using the nokhwa library.
pub struct NokhwaCapture {
    camera: Camera,
    device_index: u32,
}

impl CaptureProvider for NokhwaCapture {
    fn list_devices() -> Result<Vec<CameraInfo>, CaptureError> {
        let devices = nokhwa::query(nokhwa::utils::ApiBackend::Auto).map_err(classify)?;
        Ok(devices
            .into_iter()
            .map(|d| CameraInfo {
                index: d.index().as_index().unwrap_or(0),
                name: d.human_name().to_string(),
            })
            .collect())
    }

    fn open(config: CaptureConfig) -> Result<Self, CaptureError> {
        // Some drivers reject `Closest` requests whose hint is far from what
        // they support, so walk a ladder of known-good formats until one
        // actually opens a stream.
        let seed_formats = [
            CameraFormat::new(
                Resolution::new(config.width, config.height),
                FrameFormat::NV12,
                30,
            ),
            CameraFormat::new(
                Resolution::new(config.width, config.height),
                FrameFormat::YUYV,
                30,
            ),
            CameraFormat::new(
                Resolution::new(config.width, config.height),
                FrameFormat::MJPEG,
                30,
            ),
            CameraFormat::new(Resolution::new(1280, 720), FrameFormat::NV12, 30),
            CameraFormat::new(Resolution::new(1280, 720), FrameFormat::YUYV, 30),
            CameraFormat::new(Resolution::new(1280, 720), FrameFormat::MJPEG, 30),
            CameraFormat::new(Resolution::new(640, 480), FrameFormat::NV12, 30),
            CameraFormat::new(Resolution::new(640, 480), FrameFormat::YUYV, 30),
            CameraFormat::new(Resolution::new(640, 480), FrameFormat::MJPEG, 30),
        ];

        let mut camera = None;
        let mut last_error = None;
        for seed in seed_formats {
            let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(seed));
            let idx = CameraIndex::Index(config.device_index);

            match Camera::new(idx, requested) {
                // Creating the object isn't enough for some drivers; the
                // stream has to open too.
                Ok(mut cam) => match cam.open_stream() {
                    Ok(()) => {
                        info!(
                            "camera {} opened with seed format {:?}",
                            config.device_index, seed
                        );
                        camera = Some(cam);
                        break;
                    }
                    Err(e) => last_error = Some(e),
                },
                Err(e) => last_error = Some(e),
            }
        }

        let camera = match camera {
            Some(camera) => camera,
            None => {
                return Err(match last_error {
                    Some(err) => classify(err),
                    None => CaptureError::Failed(format!(
                        "camera index {} rejected every standard format",
                        config.device_index
                    )),
                })
            }
        };

        info!("camera resolution: {}", camera.resolution());

        Ok(Self {
            camera,
            device_index: config.device_index,
        })
    }

    fn capture(&mut self) -> Result<SourceImage, CaptureError> {
        let frame = self.camera.frame().map_err(classify)?;
        let decoded = frame.decode_image::<RgbFormat>().map_err(classify)?;
        let width = decoded.width();
        let height = decoded.height();
        let rgb_data = decoded.into_raw();

        let frame = ImageFrame::from_data(width, height, PixelFormat::Rgb, rgb_data);
        Ok(SourceImage::new(
            format!("camera:{}", self.device_index),
            frame,
        ))
    }
}

/// Maps a nokhwa failure onto the provider error contract. Platform
/// permission refusals only surface through the error text.
fn classify(err: nokhwa::NokhwaError) -> CaptureError {
    let message = err.to_string();
    let lowered = message.to_lowercase();
    if lowered.contains("permission")
        || lowered.contains("denied")
        || lowered.contains("not authorized")
    {
        CaptureError::PermissionDenied(message)
    } else {
        CaptureError::Failed(message)
    }
}
