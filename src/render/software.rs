//! CPU render surface mirroring the GPU filter programs.

use super::{RenderError, RenderSurface};
use crate::filter::FilterKind;
use crate::frame::{ImageFrame, PixelFormat, SourceImage};
use crate::shader::FilterNode;

/// Kernel radius of the box blur, matching the blur fragment program.
const BLUR_RADIUS: i32 = 4;
/// Sample spacing of the box blur in texture space.
const BLUR_STEP: f32 = 1.0 / 512.0;
/// Number of samples in the blur kernel.
const BLUR_SAMPLES: f32 = 81.0;

/// Software surface applying the filter transforms on the CPU.
///
/// Used when no GPU adapter is available. Pixel output mirrors the fragment
/// programs: the same per-filter formulas, bilinear clamp-to-edge sampling
/// for blur, and round-to-nearest quantization back to 8 bit.
#[derive(Debug, Default)]
pub struct SoftwareSurface {
    target: Option<ImageFrame>,
}

impl SoftwareSurface {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RenderSurface for SoftwareSurface {
    fn render(
        &mut self,
        node: Option<&FilterNode>,
        source: &SourceImage,
    ) -> Result<(), RenderError> {
        let rgba = source.frame.to_rgba();
        let target = match node {
            None => rgba,
            Some(node) => apply_program(node, &rgba),
        };
        self.target = Some(target);
        Ok(())
    }

    fn flatten(&mut self) -> Result<ImageFrame, RenderError> {
        self.target.clone().ok_or(RenderError::NoFrame)
    }
}

fn apply_program(node: &FilterNode, source: &ImageFrame) -> ImageFrame {
    match node.program.kind {
        FilterKind::None => source.clone(),
        FilterKind::Sepia => map_pixels(source, sepia),
        FilterKind::BlackAndWhite => map_pixels(source, black_and_white),
        FilterKind::Contrast => {
            let strength = node.params.strength;
            map_pixels(source, |px| contrast(px, strength))
        }
        FilterKind::Blur => box_blur(source),
    }
}

/// Applies a per-pixel transform over normalized RGBA values.
fn map_pixels(source: &ImageFrame, f: impl Fn([f32; 4]) -> [f32; 4]) -> ImageFrame {
    let mut data = vec![0u8; source.data.len()];
    for (dst, src) in data.chunks_exact_mut(4).zip(source.data.chunks_exact(4)) {
        let px = [
            src[0] as f32 / 255.0,
            src[1] as f32 / 255.0,
            src[2] as f32 / 255.0,
            src[3] as f32 / 255.0,
        ];
        let out = f(px);
        for c in 0..4 {
            dst[c] = quantize(out[c]);
        }
    }
    ImageFrame::from_data(source.width, source.height, PixelFormat::Rgba, data)
}

fn sepia(px: [f32; 4]) -> [f32; 4] {
    let [r, g, b, _] = px;
    [
        0.393 * r + 0.769 * g + 0.189 * b,
        0.349 * r + 0.686 * g + 0.168 * b,
        0.272 * r + 0.534 * g + 0.131 * b,
        1.0,
    ]
}

fn black_and_white(px: [f32; 4]) -> [f32; 4] {
    let avg = (px[0] + px[1] + px[2]) / 3.0;
    [avg, avg, avg, 1.0]
}

fn contrast(px: [f32; 4], strength: f32) -> [f32; 4] {
    [
        (px[0] - 0.5) * strength + 0.5,
        (px[1] - 0.5) * strength + 0.5,
        (px[2] - 0.5) * strength + 0.5,
        px[3],
    ]
}

fn box_blur(source: &ImageFrame) -> ImageFrame {
    let width = source.width as usize;
    let height = source.height as usize;
    let mut data = vec![0u8; source.data.len()];

    for y in 0..height {
        for x in 0..width {
            let u = (x as f32 + 0.5) / source.width as f32;
            let v = (y as f32 + 0.5) / source.height as f32;

            let mut sum = [0.0f32; 4];
            for dx in -BLUR_RADIUS..=BLUR_RADIUS {
                for dy in -BLUR_RADIUS..=BLUR_RADIUS {
                    let sample = bilinear_sample(
                        source,
                        u + dx as f32 * BLUR_STEP,
                        v + dy as f32 * BLUR_STEP,
                    );
                    for c in 0..4 {
                        sum[c] += sample[c];
                    }
                }
            }

            // All four channels share the 81-sample average, alpha included.
            let idx = (y * width + x) * 4;
            for c in 0..4 {
                data[idx + c] = quantize(sum[c] / BLUR_SAMPLES);
            }
        }
    }

    ImageFrame::from_data(source.width, source.height, PixelFormat::Rgba, data)
}

/// Mirrors the GPU's linear sampler with clamp-to-edge addressing.
fn bilinear_sample(frame: &ImageFrame, u: f32, v: f32) -> [f32; 4] {
    let x = u * frame.width as f32 - 0.5;
    let y = v * frame.height as f32 - 0.5;
    let fx = x.floor();
    let fy = y.floor();
    let dx = x - fx;
    let dy = y - fy;

    let x0 = clamp_texel(fx, frame.width);
    let x1 = clamp_texel(fx + 1.0, frame.width);
    let y0 = clamp_texel(fy, frame.height);
    let y1 = clamp_texel(fy + 1.0, frame.height);

    let p00 = texel(frame, x0, y0);
    let p10 = texel(frame, x1, y0);
    let p01 = texel(frame, x0, y1);
    let p11 = texel(frame, x1, y1);

    let mut out = [0.0f32; 4];
    for c in 0..4 {
        let top = p00[c] + (p10[c] - p00[c]) * dx;
        let bottom = p01[c] + (p11[c] - p01[c]) * dx;
        out[c] = top + (bottom - top) * dy;
    }
    out
}

fn clamp_texel(coord: f32, size: u32) -> usize {
    coord.clamp(0.0, (size - 1) as f32) as usize
}

fn texel(frame: &ImageFrame, x: usize, y: usize) -> [f32; 4] {
    let idx = (y * frame.width as usize + x) * 4;
    [
        frame.data[idx] as f32 / 255.0,
        frame.data[idx + 1] as f32 / 255.0,
        frame.data[idx + 2] as f32 / 255.0,
        frame.data[idx + 3] as f32 / 255.0,
    ]
}

fn quantize(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantize_rounds_to_nearest() {
        assert_eq!(quantize(0.0), 0);
        assert_eq!(quantize(1.0), 255);
        assert_eq!(quantize(0.5), 128);
        assert_eq!(quantize(1.5), 255);
        assert_eq!(quantize(-0.25), 0);
    }

    #[test]
    fn test_sepia_forces_opaque() {
        let out = sepia([0.2, 0.4, 0.6, 0.5]);
        assert_eq!(out[3], 1.0);
    }

    #[test]
    fn test_black_and_white_averages_channels() {
        let out = black_and_white([90.0 / 255.0, 150.0 / 255.0, 210.0 / 255.0, 1.0]);
        let expected = 150.0 / 255.0;
        for c in 0..3 {
            assert!((out[c] - expected).abs() < 1e-6);
        }
        assert_eq!(out[3], 1.0);
    }

    #[test]
    fn test_contrast_scales_around_mid_gray() {
        let out = contrast([0.6, 0.5, 0.4, 0.75], 1.5);
        assert!((out[0] - 0.65).abs() < 1e-6);
        assert!((out[1] - 0.5).abs() < 1e-6);
        assert!((out[2] - 0.35).abs() < 1e-6);
        assert_eq!(out[3], 0.75);
    }

    #[test]
    fn test_bilinear_at_texel_center_is_exact() {
        let frame = ImageFrame::from_data(
            2,
            1,
            PixelFormat::Rgba,
            vec![255, 0, 0, 255, 0, 0, 255, 255],
        );
        let left = bilinear_sample(&frame, 0.25, 0.5);
        assert_eq!(left, [1.0, 0.0, 0.0, 1.0]);
        let right = bilinear_sample(&frame, 0.75, 0.5);
        assert_eq!(right, [0.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_bilinear_clamps_outside_edges() {
        let frame = ImageFrame::from_data(
            2,
            1,
            PixelFormat::Rgba,
            vec![255, 0, 0, 255, 0, 0, 255, 255],
        );
        let outside = bilinear_sample(&frame, -0.5, 0.5);
        assert_eq!(outside, [1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_blur_keeps_solid_image_unchanged() {
        let width = 16u32;
        let height = 12u32;
        let mut data = Vec::with_capacity((width * height * 4) as usize);
        for _ in 0..width * height {
            data.extend_from_slice(&[100, 150, 200, 255]);
        }
        let frame = ImageFrame::from_data(width, height, PixelFormat::Rgba, data.clone());
        let blurred = box_blur(&frame);
        assert_eq!(blurred.data, data);
    }
}
