//! Image frame types, pixel format conversion, and full-screen quad geometry.

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};

/// Pixel layouts a decoded photo can arrive in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// 3 bytes per pixel, no alpha
    Rgb,
    /// 4 bytes per pixel
    Rgba,
}

impl PixelFormat {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Rgb => 3,
            PixelFormat::Rgba => 4,
        }
    }
}

/// A still image: dimensions, pixel format, and raw bytes.
#[derive(Debug, Clone)]
pub struct ImageFrame {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Pixel format of the data
    pub format: PixelFormat,
    /// Raw pixel data, row-major, tightly packed
    pub data: Vec<u8>,
}

impl ImageFrame {
    /// Creates a zeroed frame with the given dimensions and format.
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        let size = (width as usize) * (height as usize) * format.bytes_per_pixel();
        Self {
            width,
            height,
            format,
            data: vec![0; size],
        }
    }

    /// Creates a frame from existing data.
    pub fn from_data(width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            format,
            data,
        }
    }

    /// Normalizes this frame to RGBA, the only layout the render surfaces
    /// upload. RGB pixels gain an opaque alpha channel.
    pub fn to_rgba(&self) -> ImageFrame {
        if self.format == PixelFormat::Rgba {
            return self.clone();
        }

        let pixel_count = (self.width as usize) * (self.height as usize);
        let mut rgba_data = vec![0u8; pixel_count * 4];
        for (dst, src) in rgba_data
            .chunks_exact_mut(4)
            .zip(self.data.chunks_exact(3))
        {
            dst[..3].copy_from_slice(src);
            dst[3] = 255;
        }

        ImageFrame {
            width: self.width,
            height: self.height,
            format: PixelFormat::Rgba,
            data: rgba_data,
        }
    }
}

/// A loaded photograph together with where it came from.
///
/// The pixel buffer is shared: cloning a `SourceImage` references the same
/// frame instead of copying it.
#[derive(Debug, Clone)]
pub struct SourceImage {
    /// Origin identifier, e.g. a file path or `camera:<index>`
    pub origin: String,
    /// Decoded pixels
    pub frame: Arc<ImageFrame>,
}

impl SourceImage {
    /// Wraps a decoded frame with its origin.
    pub fn new(origin: impl Into<String>, frame: ImageFrame) -> Self {
        Self {
            origin: origin.into(),
            frame: Arc::new(frame),
        }
    }

    pub fn width(&self) -> u32 {
        self.frame.width
    }

    pub fn height(&self) -> u32 {
        self.frame.height
    }
}

/// Vertex for rendering a full-screen quad.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct QuadVertex {
    pub position: [f32; 2],
    pub tex_coords: [f32; 2],
}

impl QuadVertex {
    /// Vertices for a full-screen quad.
    pub const VERTICES: &'static [QuadVertex] = &[
        QuadVertex { position: [-1.0, -1.0], tex_coords: [0.0, 1.0] },
        QuadVertex { position: [1.0, -1.0], tex_coords: [1.0, 1.0] },
        QuadVertex { position: [1.0, 1.0], tex_coords: [1.0, 0.0] },
        QuadVertex { position: [-1.0, 1.0], tex_coords: [0.0, 0.0] },
    ];

    /// Indices for the quad (two triangles).
    pub const INDICES: &'static [u16] = &[0, 1, 2, 2, 3, 0];

    /// Returns the vertex buffer layout.
    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<QuadVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 2]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x2,
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_to_rgba_conversion() {
        let rgb_data = vec![255, 0, 0, 0, 255, 0, 0, 0, 255, 255, 255, 255];
        let frame = ImageFrame::from_data(2, 2, PixelFormat::Rgb, rgb_data);
        let rgba_frame = frame.to_rgba();

        assert_eq!(rgba_frame.format, PixelFormat::Rgba);
        assert_eq!(rgba_frame.data.len(), 16);
        // Check first pixel (red)
        assert_eq!(&rgba_frame.data[0..4], &[255, 0, 0, 255]);
        // Check second pixel (green)
        assert_eq!(&rgba_frame.data[4..8], &[0, 255, 0, 255]);
    }

    #[test]
    fn test_rgba_passthrough_is_unchanged() {
        let rgba_data = vec![10, 20, 30, 40, 50, 60, 70, 80];
        let frame = ImageFrame::from_data(2, 1, PixelFormat::Rgba, rgba_data.clone());
        let converted = frame.to_rgba();

        assert_eq!(converted.data, rgba_data);
    }

    #[test]
    fn test_source_image_clone_shares_pixels() {
        let frame = ImageFrame::new(4, 4, PixelFormat::Rgba);
        let source = SourceImage::new("photo.png", frame);
        let copy = source.clone();

        assert!(Arc::ptr_eq(&source.frame, &copy.frame));
        assert_eq!(copy.origin, "photo.png");
    }
}
