//! wgpu backend
//!
//! Implements [`GpuDevice`] on top of wgpu. Effect shaders are GLSL and go through
//! wgpu's GLSL front end. wgpu tracks resource states itself, so pipeline barriers
//! are only traced; the runtime's layout bookkeeping runs unchanged.
//!
//! Push constants require the device to be created with
//! [`wgpu::Features::PUSH_CONSTANTS`] and a sufficient `max_push_constant_size`.
//! [`WgpuDevice::request`] creates such a device, and also enables
//! [`wgpu::Features::FLOAT32_FILTERABLE`] when the adapter offers it. Every input
//! slot is bound with a filtering sampler, so formats the device cannot filter
//! are reported as unsupported for sampled use.

use crate::device::{
    AttachmentLoad, CommandStream, GpuDevice, GraphicsPipelineDesc, ImageDesc, ImageLayout, ImageSamplerWrite, ImageUsage, PipelineBarrier, RenderPassDesc, SamplerDesc, ScreenQuadDraw, ShaderStage,
    VertexFormat,
};
use crate::image::TextureImage;
use postfx_graph::{BlendMode, FilterMode, PixelFormat, WrapMode};
use std::collections::HashMap;
use wgpu::util::DeviceExt;

/// Every pixel format effect textures may use
const PIXEL_FORMATS: [PixelFormat; 5] = [PixelFormat::Rgba8, PixelFormat::Rgba16f, PixelFormat::R32f, PixelFormat::Rg16f, PixelFormat::Rgba16Snorm];

/// Maps a pixel format to its wgpu texture format
pub fn texture_format(format: PixelFormat) -> wgpu::TextureFormat {
    match format {
        PixelFormat::Rgba8 => wgpu::TextureFormat::Rgba8Unorm,
        PixelFormat::Rgba16f => wgpu::TextureFormat::Rgba16Float,
        PixelFormat::R32f => wgpu::TextureFormat::R32Float,
        PixelFormat::Rg16f => wgpu::TextureFormat::Rg16Float,
        PixelFormat::Rgba16Snorm => wgpu::TextureFormat::Rgba16Snorm,
    }
}

/// Maps a wgpu texture format back to a pixel format
pub fn pixel_format(format: wgpu::TextureFormat) -> Option<PixelFormat> {
    PIXEL_FORMATS.into_iter().find(|candidate| texture_format(*candidate) == format)
}

fn texture_usages(usage: ImageUsage) -> wgpu::TextureUsages {
    let mut usages = wgpu::TextureUsages::empty();
    if usage.contains(ImageUsage::SAMPLED) {
        usages |= wgpu::TextureUsages::TEXTURE_BINDING;
    }
    if usage.contains(ImageUsage::TRANSFER_DST) {
        usages |= wgpu::TextureUsages::COPY_DST;
    }
    if usage.contains(ImageUsage::COLOR_ATTACHMENT) {
        usages |= wgpu::TextureUsages::RENDER_ATTACHMENT;
    }
    usages
}

/// Optional features the runtime uses when the adapter offers them
pub fn optional_features(adapter: &wgpu::Adapter) -> wgpu::Features {
    adapter.features() & (wgpu::Features::PUSH_CONSTANTS | wgpu::Features::FLOAT32_FILTERABLE)
}

/// Narrows the usages the adapter allows for `format` to what the runtime can bind
///
/// Input slots are declared as filterable float textures, so a format that is not
/// filterable with `features` cannot be sampled.
fn usable_usages(format: wgpu::TextureFormat, allowed: wgpu::TextureUsages, features: wgpu::Features) -> wgpu::TextureUsages {
    if !features.contains(format.required_features()) {
        return wgpu::TextureUsages::empty();
    }

    match format.sample_type(None, Some(features)) {
        Some(wgpu::TextureSampleType::Float { filterable: true }) => allowed,
        _ => allowed - wgpu::TextureUsages::TEXTURE_BINDING,
    }
}

fn blend_state(mode: BlendMode) -> wgpu::BlendState {
    match mode {
        BlendMode::None => wgpu::BlendState::REPLACE,
        BlendMode::Additive => {
            let additive = wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::One,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Add,
            };
            wgpu::BlendState { color: additive, alpha: additive }
        }
        BlendMode::Alpha => wgpu::BlendState::ALPHA_BLENDING,
    }
}

/// Staging buffer with rows padded to [`wgpu::COPY_BYTES_PER_ROW_ALIGNMENT`]
#[derive(Debug)]
pub struct WgpuStagingBuffer {
    buffer: wgpu::Buffer,
    padded_bytes_per_row: u32,
}

/// A render pass is only a description in wgpu; it is begun per draw
#[derive(Debug)]
pub struct WgpuRenderPass {
    format: wgpu::TextureFormat,
    load: AttachmentLoad,
}

#[derive(Debug)]
pub struct WgpuFramebuffer {
    view: wgpu::TextureView,
    width: u32,
    height: u32,
}

/// [`GpuDevice`] implementation on a wgpu device and queue
#[derive(Debug)]
pub struct WgpuDevice {
    device: wgpu::Device,
    queue: wgpu::Queue,
    format_usages: HashMap<PixelFormat, wgpu::TextureUsages>,
    upload: Option<wgpu::CommandEncoder>,
    draw: Option<wgpu::CommandEncoder>,
}

impl WgpuDevice {
    /// Creates a device wrapper
    ///
    /// # Arguments
    /// * `adapter` - The adapter `device` was requested from, queried for format support
    /// * `device` - The wgpu device
    /// * `queue` - The queue of `device`
    pub fn new(adapter: &wgpu::Adapter, device: wgpu::Device, queue: wgpu::Queue) -> Self {
        let features = device.features();
        let format_usages = PIXEL_FORMATS
            .into_iter()
            .map(|format| {
                let texture_format = texture_format(format);
                let allowed = adapter.get_texture_format_features(texture_format).allowed_usages;
                (format, usable_usages(texture_format, allowed, features))
            })
            .collect();

        Self {
            device,
            queue,
            format_usages,
            upload: None,
            draw: None,
        }
    }

    /// Requests a device with [`optional_features`] and the adapter's limits
    ///
    /// # Arguments
    /// * `adapter` - The adapter to request the device from
    pub async fn request(adapter: &wgpu::Adapter) -> Result<Self, wgpu::RequestDeviceError> {
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Postprocess Device"),
                required_features: optional_features(adapter),
                required_limits: adapter.limits(),
                memory_hints: wgpu::MemoryHints::default(),
                trace: Default::default(),
            })
            .await?;
        Ok(Self::new(adapter, device, queue))
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Wraps an externally rendered texture, such as the scene color buffer
    ///
    /// # Returns
    /// The image in [`ImageLayout::ColorAttachment`], or None if its format is not a [`PixelFormat`]
    pub fn wrap_texture(&self, texture: wgpu::Texture) -> Option<TextureImage<Self>> {
        let format = pixel_format(texture.format())?;
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let (width, height) = (texture.width(), texture.height());
        Some(TextureImage::from_parts(texture, view, width, height, format, ImageLayout::ColorAttachment))
    }

    /// Submits the upload stream followed by the draw stream
    ///
    /// # Returns
    /// The submission index, or None if nothing was recorded
    pub fn submit(&mut self) -> Option<wgpu::SubmissionIndex> {
        let command_buffers: Vec<_> = [self.upload.take(), self.draw.take()].into_iter().flatten().map(wgpu::CommandEncoder::finish).collect();
        if command_buffers.is_empty() {
            return None;
        }
        Some(self.queue.submit(command_buffers))
    }

    fn encoder(&mut self, stream: CommandStream) -> &mut wgpu::CommandEncoder {
        let (slot, label) = match stream {
            CommandStream::Upload => (&mut self.upload, "Postprocess Upload"),
            CommandStream::Draw => (&mut self.draw, "Postprocess Draw"),
        };
        let device = &self.device;
        slot.get_or_insert_with(|| device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some(label) }))
    }
}

impl GpuDevice for WgpuDevice {
    type Image = wgpu::Texture;
    type ImageView = wgpu::TextureView;
    type Sampler = wgpu::Sampler;
    type StagingBuffer = WgpuStagingBuffer;
    type Buffer = wgpu::Buffer;
    type ShaderModule = wgpu::ShaderModule;
    type DescriptorSetLayout = wgpu::BindGroupLayout;
    type PipelineLayout = wgpu::PipelineLayout;
    type RenderPass = WgpuRenderPass;
    type Pipeline = wgpu::RenderPipeline;
    type Framebuffer = WgpuFramebuffer;
    type DescriptorPool = ();
    type DescriptorSet = wgpu::BindGroup;

    fn is_format_supported(&self, format: PixelFormat, usage: ImageUsage) -> bool {
        self.format_usages.get(&format).is_some_and(|allowed| allowed.contains(texture_usages(usage)))
    }

    fn create_image(&mut self, desc: &ImageDesc<'_>) -> wgpu::Texture {
        self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(desc.label),
            size: wgpu::Extent3d {
                width: desc.width,
                height: desc.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: texture_format(desc.format),
            usage: texture_usages(desc.usage),
            view_formats: &[],
        })
    }

    fn create_image_view(&mut self, image: &wgpu::Texture, format: PixelFormat) -> wgpu::TextureView {
        image.create_view(&wgpu::TextureViewDescriptor {
            format: Some(texture_format(format)),
            ..Default::default()
        })
    }

    fn destroy_image(&mut self, image: wgpu::Texture) {
        image.destroy();
    }

    fn create_staging_buffer(&mut self, data: &[u8], bytes_per_row: u32, rows: u32) -> WgpuStagingBuffer {
        let padded_bytes_per_row = bytes_per_row.next_multiple_of(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT);
        let mut contents = vec![0u8; padded_bytes_per_row as usize * rows as usize];
        for (row, source) in data.chunks_exact(bytes_per_row as usize).take(rows as usize).enumerate() {
            let start = row * padded_bytes_per_row as usize;
            contents[start..start + source.len()].copy_from_slice(source);
        }

        let buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Postprocess Staging Buffer"),
            contents: &contents,
            usage: wgpu::BufferUsages::COPY_SRC,
        });
        WgpuStagingBuffer { buffer, padded_bytes_per_row }
    }

    fn create_vertex_buffer(&mut self, label: &str, data: &[u8]) -> wgpu::Buffer {
        self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: data,
            usage: wgpu::BufferUsages::VERTEX,
        })
    }

    fn create_sampler(&mut self, desc: &SamplerDesc) -> wgpu::Sampler {
        let filter = match desc.filter {
            FilterMode::Nearest => wgpu::FilterMode::Nearest,
            FilterMode::Linear => wgpu::FilterMode::Linear,
        };
        let address_mode = match desc.wrap {
            WrapMode::Clamp => wgpu::AddressMode::ClampToEdge,
            WrapMode::Repeat => wgpu::AddressMode::Repeat,
        };

        self.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(&format!("Sampler {:?} {:?}", desc.filter, desc.wrap)),
            address_mode_u: address_mode,
            address_mode_v: address_mode,
            address_mode_w: address_mode,
            mag_filter: filter,
            min_filter: filter,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        })
    }

    fn create_shader_module(&mut self, label: &str, stage: ShaderStage, source: &str) -> wgpu::ShaderModule {
        self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Glsl {
                shader: source.into(),
                stage: match stage {
                    ShaderStage::Vertex => wgpu::naga::ShaderStage::Vertex,
                    ShaderStage::Fragment => wgpu::naga::ShaderStage::Fragment,
                },
                defines: Default::default(),
            },
        })
    }

    fn create_descriptor_set_layout(&mut self, label: &str, combined_image_samplers: u32) -> wgpu::BindGroupLayout {
        // Combined image sampler i becomes texture binding 2i and sampler binding 2i + 1
        let entries: Vec<_> = (0..combined_image_samplers)
            .flat_map(|slot| {
                [
                    wgpu::BindGroupLayoutEntry {
                        binding: slot * 2,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: slot * 2 + 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ]
            })
            .collect();

        self.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor { label: Some(label), entries: &entries })
    }

    fn create_pipeline_layout(&mut self, label: &str, set_layout: &wgpu::BindGroupLayout, push_constant_size: u32) -> wgpu::PipelineLayout {
        let push_constant_ranges = [wgpu::PushConstantRange {
            stages: wgpu::ShaderStages::FRAGMENT,
            range: 0..push_constant_size,
        }];

        self.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(label),
            bind_group_layouts: &[set_layout],
            push_constant_ranges: if push_constant_size > 0 { &push_constant_ranges } else { &[] },
        })
    }

    fn create_render_pass(&mut self, desc: &RenderPassDesc<'_>) -> WgpuRenderPass {
        WgpuRenderPass {
            format: texture_format(desc.format),
            load: desc.load,
        }
    }

    fn create_graphics_pipeline(&mut self, desc: &GraphicsPipelineDesc<'_, Self>) -> wgpu::RenderPipeline {
        let attributes: Vec<_> = desc
            .vertex_attributes
            .iter()
            .map(|attribute| wgpu::VertexAttribute {
                format: match attribute.format {
                    VertexFormat::Float32x2 => wgpu::VertexFormat::Float32x2,
                    VertexFormat::Float32x3 => wgpu::VertexFormat::Float32x3,
                },
                offset: attribute.offset,
                shader_location: attribute.location,
            })
            .collect();

        self.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(desc.label),
            layout: Some(desc.layout),
            vertex: wgpu::VertexState {
                module: desc.vertex,
                entry_point: Some("main"),
                compilation_options: Default::default(),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: desc.vertex_stride,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &attributes,
                }],
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: desc.fragment,
                entry_point: Some("main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: desc.render_pass.format,
                    blend: Some(blend_state(desc.blend)),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            multiview: None,
            cache: None,
        })
    }

    fn create_framebuffer(&mut self, _render_pass: &WgpuRenderPass, view: &wgpu::TextureView, width: u32, height: u32) -> WgpuFramebuffer {
        WgpuFramebuffer { view: view.clone(), width, height }
    }

    fn create_descriptor_pool(&mut self, _max_sets: u32, _max_descriptors: u32) {}

    fn reset_descriptor_pool(&mut self, _pool: &mut ()) {}

    fn allocate_descriptor_set(&mut self, _pool: &mut (), layout: &wgpu::BindGroupLayout, writes: &[ImageSamplerWrite<'_, Self>]) -> wgpu::BindGroup {
        let entries: Vec<_> = writes
            .iter()
            .zip(0u32..)
            .flat_map(|(write, slot)| {
                [
                    wgpu::BindGroupEntry {
                        binding: slot * 2,
                        resource: wgpu::BindingResource::TextureView(write.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: slot * 2 + 1,
                        resource: wgpu::BindingResource::Sampler(write.sampler),
                    },
                ]
            })
            .collect();

        self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Postprocess Inputs"),
            layout,
            entries: &entries,
        })
    }

    fn pipeline_barrier(&mut self, stream: CommandStream, barrier: &PipelineBarrier<wgpu::Texture>) {
        tracing::trace!(?stream, images = barrier.images.len(), "Skipping pipeline barrier, tracked by wgpu");
    }

    fn copy_buffer_to_image(&mut self, stream: CommandStream, buffer: &WgpuStagingBuffer, image: &wgpu::Texture, width: u32, height: u32) {
        self.encoder(stream).copy_buffer_to_texture(
            wgpu::TexelCopyBufferInfo {
                buffer: &buffer.buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(buffer.padded_bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            wgpu::TexelCopyTextureInfo {
                texture: image,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
    }

    fn draw_screen_quad(&mut self, draw: &ScreenQuadDraw<'_, Self>) {
        let framebuffer = draw.framebuffer;
        // wgpu has no discarding load operation, so both loads preserve the contents
        let load = match draw.render_pass.load {
            AttachmentLoad::DontCare | AttachmentLoad::Load => wgpu::LoadOp::Load,
        };

        // The render area becomes the scissor rectangle, clamped to the target
        let x = draw.viewport.x.clamp(0, framebuffer.width as i32) as u32;
        let y = draw.viewport.y.clamp(0, framebuffer.height as i32) as u32;
        let scissor_width = draw.viewport.width.min(framebuffer.width - x);
        let scissor_height = draw.viewport.height.min(framebuffer.height - y);

        let encoder = self.encoder(CommandStream::Draw);
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Postprocess Step"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &framebuffer.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        pass.set_pipeline(draw.pipeline);
        pass.set_bind_group(0, draw.descriptor_set, &[]);
        pass.set_vertex_buffer(0, draw.vertex_buffer.slice(..));
        pass.set_viewport(
            draw.viewport.x as f32,
            draw.viewport.y as f32,
            draw.viewport.width as f32,
            draw.viewport.height as f32,
            0.0,
            1.0,
        );
        pass.set_scissor_rect(x, y, scissor_width, scissor_height);
        if !draw.push_constants.is_empty() {
            pass.set_push_constants(wgpu::ShaderStages::FRAGMENT, 0, draw.push_constants);
        }
        pass.draw(draw.vertices.clone(), 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PostprocessError;
    use crate::pipeline_ring::PipelineImageRing;
    use crate::texture_cache::TextureCache;
    use postfx_graph::TextureDescriptor;

    #[test]
    fn test_format_mapping_round_trips() {
        for format in PIXEL_FORMATS {
            assert_eq!(pixel_format(texture_format(format)), Some(format));
        }
        assert_eq!(pixel_format(wgpu::TextureFormat::Bgra8Unorm), None);
    }

    #[test]
    fn test_usage_mapping() {
        assert_eq!(texture_usages(ImageUsage::UPLOAD), wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST);
        assert_eq!(
            texture_usages(ImageUsage::RENDER_TARGET),
            wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::RENDER_ATTACHMENT
        );
    }

    #[test]
    fn test_additive_blend() {
        let blend = blend_state(BlendMode::Additive);
        assert_eq!(blend.color.src_factor, wgpu::BlendFactor::One);
        assert_eq!(blend.color.dst_factor, wgpu::BlendFactor::One);
        assert_eq!(blend_state(BlendMode::None), wgpu::BlendState::REPLACE);
    }

    #[test]
    fn test_unfilterable_formats_are_not_sampled() {
        let all = wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST | wgpu::TextureUsages::RENDER_ATTACHMENT;

        let r32 = usable_usages(wgpu::TextureFormat::R32Float, all, wgpu::Features::empty());
        assert!(!r32.contains(wgpu::TextureUsages::TEXTURE_BINDING));
        assert!(r32.contains(wgpu::TextureUsages::RENDER_ATTACHMENT));

        assert_eq!(usable_usages(wgpu::TextureFormat::R32Float, all, wgpu::Features::FLOAT32_FILTERABLE), all);
        assert_eq!(usable_usages(wgpu::TextureFormat::Rgba16Float, all, wgpu::Features::empty()), all);
        assert!(usable_usages(wgpu::TextureFormat::Rgba16Snorm, all, wgpu::Features::empty()).is_empty());
    }

    fn request_adapter() -> Option<wgpu::Adapter> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions::default())).ok()
    }

    #[test]
    fn test_smoke_upload_and_render_targets() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
        let Some(mut device) = request_adapter().and_then(|adapter| pollster::block_on(WgpuDevice::request(&adapter)).ok()) else {
            eprintln!("No wgpu adapter available, skipping");
            return;
        };

        assert!(device.is_format_supported(PixelFormat::Rgba8, ImageUsage::UPLOAD));
        assert!(device.is_format_supported(PixelFormat::Rgba16f, ImageUsage::RENDER_TARGET));
        let filterable = device.device().features().contains(wgpu::Features::FLOAT32_FILTERABLE);
        assert_eq!(device.is_format_supported(PixelFormat::R32f, ImageUsage::UPLOAD), filterable);

        let mut cache = TextureCache::new();
        let palette = TextureDescriptor::new("Tonemap.Palette", 3, 2, PixelFormat::Rgba8).with_data(vec![255u8; 24]);
        cache.ensure(&mut device, &palette).unwrap();
        cache.ensure(&mut device, &TextureDescriptor::new("Bloom.Level0", 64, 32, PixelFormat::Rgba16f)).unwrap();

        let ring = PipelineImageRing::new(&mut device, 2, 64, 64, PixelFormat::Rgba16f);
        assert_eq!(ring.len(), 2);

        assert!(device.submit().is_some());
        assert!(device.submit().is_none());
    }

    #[test]
    fn test_r32f_without_float32_filtering_is_unsupported() {
        let Some(adapter) = request_adapter() else {
            eprintln!("No wgpu adapter available, skipping");
            return;
        };
        let descriptor = wgpu::DeviceDescriptor {
            label: None,
            required_features: wgpu::Features::empty(),
            required_limits: adapter.limits(),
            memory_hints: wgpu::MemoryHints::default(),
            trace: Default::default(),
        };
        let Ok((device, queue)) = pollster::block_on(adapter.request_device(&descriptor)) else {
            eprintln!("No wgpu device available, skipping");
            return;
        };
        let mut device = WgpuDevice::new(&adapter, device, queue);

        assert!(!device.is_format_supported(PixelFormat::R32f, ImageUsage::UPLOAD));
        assert!(!device.is_format_supported(PixelFormat::R32f, ImageUsage::RENDER_TARGET));

        let mut cache = TextureCache::new();
        let exposure = TextureDescriptor::new("Exposure.Level0", 1, 1, PixelFormat::R32f).with_data(vec![0u8; 4]);
        let result = cache.ensure(&mut device, &exposure);
        assert!(matches!(result, Err(PostprocessError::UnsupportedFormat { ref texture, format: PixelFormat::R32f }) if texture == "Exposure.Level0"));
    }
}
