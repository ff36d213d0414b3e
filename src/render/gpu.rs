//! wgpu offscreen render surface.

use std::borrow::Cow;
use std::collections::HashMap;

use tracing::info;
use wgpu::util::DeviceExt;

use super::{RenderError, RenderSurface};
use crate::filter::FilterKind;
use crate::frame::{ImageFrame, PixelFormat, QuadVertex, SourceImage};
use crate::shader::{sources, FilterNode, FilterParams, ShaderRegistry};

/// Offscreen GPU surface.
///
/// Owns its device and queue exclusively. One render pipeline per available
/// registry program is built at construction, plus the identity pipeline for
/// renders with no filter; nothing is compiled per frame. The target texture
/// and readback buffer are reallocated only when the source size changes.
pub struct GpuSurface {
    device: wgpu::Device,
    queue: wgpu::Queue,
    identity_pipeline: wgpu::RenderPipeline,
    pipelines: HashMap<FilterKind, wgpu::RenderPipeline>,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    bind_group_layout: wgpu::BindGroupLayout,
    params_buffer: wgpu::Buffer,
    sampler: wgpu::Sampler,

    // Size-keyed cache
    input_texture: Option<wgpu::Texture>,
    target_texture: Option<wgpu::Texture>,
    readback_buffer: Option<wgpu::Buffer>,
    bind_group: Option<wgpu::BindGroup>,
    cached_width: u32,
    cached_height: u32,
    padded_bytes_per_row: u32,
    has_frame: bool,
}

impl GpuSurface {
    /// Creates the surface and builds a pipeline for every program in the
    /// registry.
    pub fn new(registry: &ShaderRegistry) -> Result<Self, RenderError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(|e| RenderError::Gpu(format!("no GPU adapter: {:?}", e)))?;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("Iris Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::Performance,
                ..Default::default()
            },
        ))
        .map_err(|e| RenderError::Gpu(format!("device request failed: {}", e)))?;

        let vertex_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Vertex Shader"),
            source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(sources::VERTEX_SHADER)),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Filter Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Filter Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let identity_pipeline = build_pipeline(
            &device,
            &pipeline_layout,
            &vertex_module,
            "identity",
            sources::IDENTITY_FRAGMENT_SHADER,
            "fs_main",
        );

        let mut pipelines = HashMap::new();
        for program in registry.programs() {
            let pipeline = build_pipeline(
                &device,
                &pipeline_layout,
                &vertex_module,
                &program.name,
                &program.wgsl,
                program.entry_point,
            );
            pipelines.insert(program.kind, pipeline);
        }

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Vertex Buffer"),
            contents: bytemuck::cast_slice(QuadVertex::VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Index Buffer"),
            contents: bytemuck::cast_slice(QuadVertex::INDICES),
            usage: wgpu::BufferUsages::INDEX,
        });

        // Default address mode is clamp-to-edge, which the blur program
        // relies on at the borders.
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Source Sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let params_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Params Buffer"),
            contents: bytemuck::cast_slice(&[FilterParams::identity(0, 0)]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        info!("GPU surface ready with {} filter pipelines", pipelines.len());

        Ok(Self {
            device,
            queue,
            identity_pipeline,
            pipelines,
            vertex_buffer,
            index_buffer,
            bind_group_layout,
            params_buffer,
            sampler,
            input_texture: None,
            target_texture: None,
            readback_buffer: None,
            bind_group: None,
            cached_width: 0,
            cached_height: 0,
            padded_bytes_per_row: 0,
            has_frame: false,
        })
    }

    /// Recreates the size-dependent resources when the source size changes.
    fn ensure_resources(&mut self, width: u32, height: u32) {
        if self.cached_width == width && self.cached_height == height {
            return;
        }

        info!("allocating render target {}x{}", width, height);

        let input_texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Source Texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        let target_texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Target Texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });

        // Texture-to-buffer copies require 256-byte row alignment; rows are
        // unpadded again during flatten.
        let unpadded_bytes_per_row = width * 4;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded_bytes_per_row = (unpadded_bytes_per_row + align - 1) / align * align;

        let readback_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Readback Buffer"),
            size: (padded_bytes_per_row * height) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let input_view = input_texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Filter Bind Group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&input_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: self.params_buffer.as_entire_binding(),
                },
            ],
        });

        self.input_texture = Some(input_texture);
        self.target_texture = Some(target_texture);
        self.readback_buffer = Some(readback_buffer);
        self.bind_group = Some(bind_group);
        self.cached_width = width;
        self.cached_height = height;
        self.padded_bytes_per_row = padded_bytes_per_row;
        self.has_frame = false;
    }
}

impl RenderSurface for GpuSurface {
    fn render(
        &mut self,
        node: Option<&FilterNode>,
        source: &SourceImage,
    ) -> Result<(), RenderError> {
        let rgba = source.frame.to_rgba();
        self.ensure_resources(rgba.width, rgba.height);

        let pipeline = match node {
            Some(node) => self
                .pipelines
                .get(&node.program.kind)
                .ok_or(RenderError::Unavailable(node.program.kind))?,
            None => &self.identity_pipeline,
        };

        let params = match node {
            Some(node) => node.params,
            None => FilterParams::identity(rgba.width, rgba.height),
        };
        self.queue
            .write_buffer(&self.params_buffer, 0, bytemuck::cast_slice(&[params]));

        let input_texture = self
            .input_texture
            .as_ref()
            .ok_or_else(|| RenderError::Gpu("input texture missing".into()))?;
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: input_texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &rgba.data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(rgba.width * 4),
                rows_per_image: Some(rgba.height),
            },
            wgpu::Extent3d {
                width: rgba.width,
                height: rgba.height,
                depth_or_array_layers: 1,
            },
        );

        let target_texture = self
            .target_texture
            .as_ref()
            .ok_or_else(|| RenderError::Gpu("target texture missing".into()))?;
        let readback_buffer = self
            .readback_buffer
            .as_ref()
            .ok_or_else(|| RenderError::Gpu("readback buffer missing".into()))?;
        let bind_group = self
            .bind_group
            .as_ref()
            .ok_or_else(|| RenderError::Gpu("bind group missing".into()))?;

        let target_view = target_texture.create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Filter Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Filter Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            render_pass.set_pipeline(pipeline);
            render_pass.set_bind_group(0, bind_group, &[]);
            render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
            render_pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
            render_pass.draw_indexed(0..6, 0, 0..1);
        }

        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: target_texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: readback_buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(self.padded_bytes_per_row),
                    rows_per_image: Some(rgba.height),
                },
            },
            wgpu::Extent3d {
                width: rgba.width,
                height: rgba.height,
                depth_or_array_layers: 1,
            },
        );

        self.queue.submit(std::iter::once(encoder.finish()));
        self.has_frame = true;
        Ok(())
    }

    fn flatten(&mut self) -> Result<ImageFrame, RenderError> {
        if !self.has_frame {
            return Err(RenderError::NoFrame);
        }
        let readback_buffer = self
            .readback_buffer
            .as_ref()
            .ok_or_else(|| RenderError::Gpu("readback buffer missing".into()))?;

        let buffer_slice = readback_buffer.slice(..);
        let (sender, receiver) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        // Blocks until the queue, and with it the most recent render, has
        // completed.
        self.device
            .poll(wgpu::PollType::Wait {
                submission_index: None,
                timeout: None,
            })
            .map_err(|e| RenderError::Gpu(format!("device poll failed: {:?}", e)))?;
        receiver
            .recv()
            .map_err(|e| RenderError::Readback(format!("map callback dropped: {}", e)))?
            .map_err(|e| RenderError::Readback(format!("buffer map failed: {:?}", e)))?;

        let data = buffer_slice.get_mapped_range();
        let unpadded_bytes_per_row = (self.cached_width * 4) as usize;
        let padded_bytes_per_row = self.padded_bytes_per_row as usize;
        let mut pixels = vec![0u8; unpadded_bytes_per_row * self.cached_height as usize];
        for row in 0..self.cached_height as usize {
            let src = row * padded_bytes_per_row;
            let dst = row * unpadded_bytes_per_row;
            pixels[dst..dst + unpadded_bytes_per_row]
                .copy_from_slice(&data[src..src + unpadded_bytes_per_row]);
        }
        drop(data);
        readback_buffer.unmap();

        Ok(ImageFrame::from_data(
            self.cached_width,
            self.cached_height,
            PixelFormat::Rgba,
            pixels,
        ))
    }
}

fn build_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    vertex_module: &wgpu::ShaderModule,
    name: &str,
    fragment_wgsl: &str,
    entry_point: &str,
) -> wgpu::RenderPipeline {
    let fragment_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(&format!("Fragment Shader {}", name)),
        source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(fragment_wgsl)),
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(&format!("Render Pipeline {}", name)),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: vertex_module,
            entry_point: Some("vs_main"),
            buffers: &[QuadVertex::layout()],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &fragment_module,
            entry_point: Some(entry_point),
            targets: &[Some(wgpu::ColorTargetState {
                format: wgpu::TextureFormat::Rgba8Unorm,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview_mask: None,
        cache: None,
    })
}
