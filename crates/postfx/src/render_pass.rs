//! Render pass setups shared by every step with the same structural key
//!
//! A setup bundles the pipeline objects one kind of step needs. Steps that differ
//! only in the textures they read or write share one setup, so the number of
//! pipelines is bounded by the distinct (shader, blend, format) combinations.

use crate::device::{AttachmentLoad, GpuDevice, GraphicsPipelineDesc, RenderPassDesc, ScreenQuadDraw};
use crate::image::{TextureImage, ViewId};
use crate::screen_quad::{FULLSCREEN_VERTICES, FlatVertex};
use crate::shader_cache::{CachedShader, ShaderId};
use postfx_graph::{BlendMode, PixelFormat, Viewport};
use std::collections::HashMap;

/// Structural identity of a render pass setup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderPassKey {
    /// Blending of the output
    pub blend_mode: BlendMode,
    /// Number of combined image sampler slots
    pub input_count: u32,
    /// Push constant bytes, 0 for none
    pub uniforms_size: u32,
    /// The compiled shader
    pub shader: ShaderId,
    /// Format of the output attachment
    pub output_format: PixelFormat,
}

/// Pipeline objects for one [`RenderPassKey`], plus framebuffers per output view
#[derive(Debug)]
pub struct RenderPassSetup<D: GpuDevice> {
    /// One combined image sampler binding per input
    pub descriptor_layout: D::DescriptorSetLayout,
    /// Descriptor set layout plus the push constant range
    pub pipeline_layout: D::PipelineLayout,
    /// Single color attachment pass
    pub render_pass: D::RenderPass,
    /// Full-screen quad pipeline
    pub pipeline: D::Pipeline,
    /// Framebuffers by output view
    framebuffers: HashMap<ViewId, D::Framebuffer>,
}

impl<D: GpuDevice> RenderPassSetup<D> {
    /// Builds the descriptor set layout, pipeline layout, render pass and pipeline, in that order
    ///
    /// # Arguments
    /// * `device` - The device to create the objects on
    /// * `key` - The structural key of the setup
    /// * `label` - Debug label, usually the shader name
    /// * `shader` - The compiled shader identified by `key.shader`
    pub fn new(device: &mut D, key: &RenderPassKey, label: &str, shader: &CachedShader<D>) -> Self {
        let descriptor_layout = device.create_descriptor_set_layout(label, key.input_count);
        let pipeline_layout = device.create_pipeline_layout(label, &descriptor_layout, key.uniforms_size);
        let render_pass = device.create_render_pass(&RenderPassDesc {
            label,
            format: key.output_format,
            load: AttachmentLoad::for_blend(key.blend_mode),
        });
        let pipeline = device.create_graphics_pipeline(&GraphicsPipelineDesc {
            label,
            vertex: &shader.vertex,
            fragment: &shader.fragment,
            layout: &pipeline_layout,
            render_pass: &render_pass,
            format: key.output_format,
            blend: key.blend_mode,
            vertex_stride: FlatVertex::STRIDE,
            vertex_attributes: &FlatVertex::ATTRIBUTES,
        });

        tracing::debug!(
            shader = %label,
            blend = ?key.blend_mode,
            inputs = key.input_count,
            uniforms = key.uniforms_size,
            format = ?key.output_format,
            "Built render pass setup"
        );

        Self {
            descriptor_layout,
            pipeline_layout,
            render_pass,
            pipeline,
            framebuffers: HashMap::new(),
        }
    }

    /// Returns the framebuffer targeting `output`, creating it the first time that view is used
    pub fn framebuffer(&mut self, device: &mut D, output: &TextureImage<D>) -> &D::Framebuffer {
        let render_pass = &self.render_pass;
        self.framebuffers.entry(output.view_id()).or_insert_with(|| create_framebuffer(device, render_pass, output))
    }

    /// Records a full-screen quad draw into `output` over `viewport`
    ///
    /// # Arguments
    /// * `device` - The device to record into
    /// * `output` - The render target, already in [`crate::device::ImageLayout::ColorAttachment`]
    /// * `descriptor_set` - Input bindings allocated for this draw
    /// * `vertex_buffer` - The shared screen quad buffer
    /// * `viewport` - Render area and viewport
    /// * `push_constants` - Packed uniform values, may be empty
    pub fn draw(&mut self, device: &mut D, output: &TextureImage<D>, descriptor_set: &D::DescriptorSet, vertex_buffer: &D::Buffer, viewport: Viewport, push_constants: &[u8]) {
        let render_pass = &self.render_pass;
        let framebuffer = self.framebuffers.entry(output.view_id()).or_insert_with(|| create_framebuffer(device, render_pass, output));

        device.draw_screen_quad(&ScreenQuadDraw {
            render_pass,
            framebuffer,
            viewport,
            pipeline: &self.pipeline,
            pipeline_layout: &self.pipeline_layout,
            descriptor_set,
            vertex_buffer,
            push_constants,
            vertices: FULLSCREEN_VERTICES,
        });
    }

    pub fn framebuffer_count(&self) -> usize {
        self.framebuffers.len()
    }
}

fn create_framebuffer<D: GpuDevice>(device: &mut D, render_pass: &D::RenderPass, output: &TextureImage<D>) -> D::Framebuffer {
    tracing::debug!(view = ?output.view_id(), width = output.width(), height = output.height(), "Created framebuffer");
    device.create_framebuffer(render_pass, output.view(), output.width(), output.height())
}

/// Cache of render pass setups, cleared as a whole when the render buffers change
#[derive(Debug)]
pub struct RenderPassCache<D: GpuDevice> {
    setups: HashMap<RenderPassKey, RenderPassSetup<D>>,
}

impl<D: GpuDevice> Default for RenderPassCache<D> {
    fn default() -> Self {
        Self { setups: HashMap::new() }
    }
}

impl<D: GpuDevice> RenderPassCache<D> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the setup for `key`, building it on first use
    pub fn ensure(&mut self, device: &mut D, key: RenderPassKey, label: &str, shader: &CachedShader<D>) -> &mut RenderPassSetup<D> {
        self.setups.entry(key).or_insert_with(|| RenderPassSetup::new(device, &key, label, shader))
    }

    pub fn get(&self, key: &RenderPassKey) -> Option<&RenderPassSetup<D>> {
        self.setups.get(key)
    }

    /// Drops every setup and its framebuffers
    pub fn clear(&mut self) {
        if !self.setups.is_empty() {
            tracing::debug!(setups = self.setups.len(), "Cleared render pass setups");
        }
        self.setups.clear();
    }

    pub fn len(&self) -> usize {
        self.setups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.setups.is_empty()
    }

    /// Total number of framebuffers across all setups
    pub fn framebuffer_count(&self) -> usize {
        self.setups.values().map(RenderPassSetup::framebuffer_count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::MemoryLoader;
    use crate::backend::recording::{RecordedCommand, RecordingDevice};
    use crate::device::ImageUsage;
    use crate::shader_cache::ShaderCache;
    use postfx_graph::ShaderDescriptor;

    fn compile(device: &mut RecordingDevice, cache: &mut ShaderCache<RecordingDevice>, name: &str) -> ShaderId {
        let loader = MemoryLoader::new().with_source("quad.vp", "").with_source("copy.fp", "");
        let desc = ShaderDescriptor {
            name: name.to_string(),
            vertex: "quad.vp".to_string(),
            fragment: "copy.fp".to_string(),
            uniforms: Vec::new(),
            defines: String::new(),
            version: 450,
        };
        cache.ensure(device, &loader, &desc).unwrap().id
    }

    fn key(shader: ShaderId, blend_mode: BlendMode) -> RenderPassKey {
        RenderPassKey {
            blend_mode,
            input_count: 1,
            uniforms_size: 0,
            shader,
            output_format: PixelFormat::Rgba16f,
        }
    }

    #[test]
    fn test_equal_keys_share_setup() {
        let mut device = RecordingDevice::new();
        let mut shaders = ShaderCache::new(450);
        let id = compile(&mut device, &mut shaders, "Copy");
        let shader = shaders.get("Copy").unwrap();
        let mut cache = RenderPassCache::new();

        let first = cache.ensure(&mut device, key(id, BlendMode::None), "Copy", shader).pipeline;
        let second = cache.ensure(&mut device, key(id, BlendMode::None), "Copy", shader).pipeline;

        assert_eq!(first, second);
        assert_eq!(cache.len(), 1);
        assert_eq!(device.pipelines_created(), 1);
    }

    #[test]
    fn test_blend_mode_distinguishes_setups() {
        let mut device = RecordingDevice::new();
        let mut shaders = ShaderCache::new(450);
        let id = compile(&mut device, &mut shaders, "Copy");
        let shader = shaders.get("Copy").unwrap();
        let mut cache = RenderPassCache::new();

        let replace = cache.ensure(&mut device, key(id, BlendMode::None), "Copy", shader).pipeline;
        let additive = cache.ensure(&mut device, key(id, BlendMode::Additive), "Copy", shader).pipeline;

        assert_ne!(replace, additive);
        assert_eq!(cache.len(), 2);

        let loads: Vec<_> = device
            .commands
            .iter()
            .filter_map(|command| match command {
                RecordedCommand::CreateRenderPass { load, .. } => Some(*load),
                _ => None,
            })
            .collect();
        assert_eq!(loads, vec![AttachmentLoad::DontCare, AttachmentLoad::Load]);
    }

    #[test]
    fn test_construction_order() {
        let mut device = RecordingDevice::new();
        let mut shaders = ShaderCache::new(450);
        let id = compile(&mut device, &mut shaders, "Copy");
        let shader = shaders.get("Copy").unwrap();
        device.clear_commands();

        let mut cache = RenderPassCache::new();
        cache.ensure(
            &mut device,
            RenderPassKey {
                uniforms_size: 16,
                ..key(id, BlendMode::None)
            },
            "Copy",
            shader,
        );

        assert!(matches!(device.commands[0], RecordedCommand::CreateDescriptorSetLayout { bindings: 1, .. }));
        assert!(matches!(device.commands[1], RecordedCommand::CreatePipelineLayout { push_constant_size: 16, .. }));
        assert!(matches!(device.commands[2], RecordedCommand::CreateRenderPass { .. }));
        assert!(matches!(device.commands[3], RecordedCommand::CreatePipeline { .. }));
    }

    #[test]
    fn test_framebuffers_per_view() {
        let mut device = RecordingDevice::new();
        let mut shaders = ShaderCache::new(450);
        let id = compile(&mut device, &mut shaders, "Copy");
        let shader = shaders.get("Copy").unwrap();
        let mut cache = RenderPassCache::new();

        let ping = TextureImage::new(&mut device, "Ping", 32, 32, PixelFormat::Rgba16f, ImageUsage::RENDER_TARGET);
        let pong = TextureImage::new(&mut device, "Pong", 32, 32, PixelFormat::Rgba16f, ImageUsage::RENDER_TARGET);

        let setup = cache.ensure(&mut device, key(id, BlendMode::None), "Copy", shader);
        let a = *setup.framebuffer(&mut device, &ping);
        let b = *setup.framebuffer(&mut device, &pong);
        let c = *setup.framebuffer(&mut device, &ping);

        assert_eq!(a, c);
        assert_ne!(a, b);
        assert_eq!(device.framebuffers_created(), 2);
        assert_eq!(cache.framebuffer_count(), 2);

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.framebuffer_count(), 0);
    }
}
