//! Recording device for testing
//!
//! Provides a [`RecordingDevice`] that implements [`GpuDevice`] without a GPU
//! context. Every creation call and every recorded command is appended to a log
//! that can be inspected in tests.

use crate::device::{
    AttachmentLoad, CommandStream, GpuDevice, GraphicsPipelineDesc, ImageDesc, ImageSamplerWrite, ImageUsage, PipelineBarrier, RenderPassDesc, SamplerDesc, ScreenQuadDraw, ShaderStage,
};
use postfx_graph::{BlendMode, PixelFormat, Viewport};
use std::collections::HashSet;
use std::ops::Range;

/// Opaque handle of an object created by a [`RecordingDevice`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(pub u64);

/// Record of a device call for test inspection
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCommand {
    CreateImage {
        image: Handle,
        label: String,
        width: u32,
        height: u32,
        format: PixelFormat,
        usage: ImageUsage,
    },
    CreateImageView {
        view: Handle,
        image: Handle,
    },
    DestroyImage {
        image: Handle,
    },
    CreateStagingBuffer {
        buffer: Handle,
        size: usize,
    },
    CreateVertexBuffer {
        buffer: Handle,
        size: usize,
    },
    CreateSampler {
        sampler: Handle,
        desc: SamplerDesc,
    },
    CreateShaderModule {
        module: Handle,
        label: String,
        stage: ShaderStage,
        source: String,
    },
    CreateDescriptorSetLayout {
        layout: Handle,
        bindings: u32,
    },
    CreatePipelineLayout {
        layout: Handle,
        set_layout: Handle,
        push_constant_size: u32,
    },
    CreateRenderPass {
        render_pass: Handle,
        format: PixelFormat,
        load: AttachmentLoad,
    },
    CreatePipeline {
        pipeline: Handle,
        render_pass: Handle,
        format: PixelFormat,
        blend: BlendMode,
    },
    CreateFramebuffer {
        framebuffer: Handle,
        view: Handle,
        width: u32,
        height: u32,
    },
    CreateDescriptorPool {
        pool: Handle,
        max_sets: u32,
        max_descriptors: u32,
    },
    ResetDescriptorPool {
        pool: Handle,
    },
    AllocateDescriptorSet {
        set: Handle,
        pool: Handle,
        views: Vec<Handle>,
    },
    Barrier {
        stream: CommandStream,
        barrier: PipelineBarrier<Handle>,
    },
    CopyBufferToImage {
        stream: CommandStream,
        buffer: Handle,
        image: Handle,
        width: u32,
        height: u32,
    },
    Draw {
        pipeline: Handle,
        framebuffer: Handle,
        descriptor_set: Handle,
        viewport: Viewport,
        push_constants: Vec<u8>,
        vertices: Range<u32>,
    },
}

/// A device that records all calls for testing
#[derive(Debug, Default)]
pub struct RecordingDevice {
    /// All calls made to this device, in order
    pub commands: Vec<RecordedCommand>,
    unsupported: HashSet<PixelFormat>,
    next_handle: u64,
}

impl RecordingDevice {
    /// Creates a device that supports every format
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the device reject images of `format`
    pub fn without_format(mut self, format: PixelFormat) -> Self {
        self.unsupported.insert(format);
        self
    }

    /// Clears the log
    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    fn handle(&mut self) -> Handle {
        self.next_handle += 1;
        Handle(self.next_handle)
    }

    fn count(&self, predicate: impl Fn(&RecordedCommand) -> bool) -> usize {
        self.commands.iter().filter(|command| predicate(command)).count()
    }

    // === Assertion helpers ===

    pub fn images_created(&self) -> usize {
        self.count(|command| matches!(command, RecordedCommand::CreateImage { .. }))
    }

    pub fn images_destroyed(&self) -> usize {
        self.count(|command| matches!(command, RecordedCommand::DestroyImage { .. }))
    }

    pub fn samplers_created(&self) -> usize {
        self.count(|command| matches!(command, RecordedCommand::CreateSampler { .. }))
    }

    pub fn shader_modules_created(&self) -> usize {
        self.count(|command| matches!(command, RecordedCommand::CreateShaderModule { .. }))
    }

    pub fn render_passes_created(&self) -> usize {
        self.count(|command| matches!(command, RecordedCommand::CreateRenderPass { .. }))
    }

    pub fn pipelines_created(&self) -> usize {
        self.count(|command| matches!(command, RecordedCommand::CreatePipeline { .. }))
    }

    pub fn framebuffers_created(&self) -> usize {
        self.count(|command| matches!(command, RecordedCommand::CreateFramebuffer { .. }))
    }

    pub fn descriptor_pools_created(&self) -> usize {
        self.count(|command| matches!(command, RecordedCommand::CreateDescriptorPool { .. }))
    }

    pub fn draws(&self) -> usize {
        self.count(|command| matches!(command, RecordedCommand::Draw { .. }))
    }

    /// Iterates over recorded draws as (pipeline, framebuffer, viewport, push constants)
    pub fn draw_calls(&self) -> impl Iterator<Item = (Handle, Handle, Viewport, &[u8])> {
        self.commands.iter().filter_map(|command| match command {
            RecordedCommand::Draw {
                pipeline,
                framebuffer,
                viewport,
                push_constants,
                ..
            } => Some((*pipeline, *framebuffer, *viewport, push_constants.as_slice())),
            _ => None,
        })
    }

    /// Counts the image transitions recorded for `image` across both streams
    pub fn barriers_for(&self, image: Handle) -> usize {
        self.commands
            .iter()
            .map(|command| match command {
                RecordedCommand::Barrier { barrier, .. } => barrier.images.iter().filter(|transition| transition.image == image).count(),
                _ => 0,
            })
            .sum()
    }

    /// Sources of every shader module compiled so far
    pub fn shader_sources(&self) -> impl Iterator<Item = (&str, ShaderStage, &str)> {
        self.commands.iter().filter_map(|command| match command {
            RecordedCommand::CreateShaderModule { label, stage, source, .. } => Some((label.as_str(), *stage, source.as_str())),
            _ => None,
        })
    }

    /// Position of the last command matching `predicate`
    pub fn last_position(&self, predicate: impl Fn(&RecordedCommand) -> bool) -> Option<usize> {
        self.commands.iter().rposition(predicate)
    }
}

impl GpuDevice for RecordingDevice {
    type Image = Handle;
    type ImageView = Handle;
    type Sampler = Handle;
    type StagingBuffer = Handle;
    type Buffer = Handle;
    type ShaderModule = Handle;
    type DescriptorSetLayout = Handle;
    type PipelineLayout = Handle;
    type RenderPass = Handle;
    type Pipeline = Handle;
    type Framebuffer = Handle;
    type DescriptorPool = Handle;
    type DescriptorSet = Handle;

    fn is_format_supported(&self, format: PixelFormat, _usage: ImageUsage) -> bool {
        !self.unsupported.contains(&format)
    }

    fn create_image(&mut self, desc: &ImageDesc<'_>) -> Handle {
        let image = self.handle();
        self.commands.push(RecordedCommand::CreateImage {
            image,
            label: desc.label.to_string(),
            width: desc.width,
            height: desc.height,
            format: desc.format,
            usage: desc.usage,
        });
        image
    }

    fn create_image_view(&mut self, image: &Handle, _format: PixelFormat) -> Handle {
        let view = self.handle();
        self.commands.push(RecordedCommand::CreateImageView { view, image: *image });
        view
    }

    fn destroy_image(&mut self, image: Handle) {
        self.commands.push(RecordedCommand::DestroyImage { image });
    }

    fn create_staging_buffer(&mut self, data: &[u8], _bytes_per_row: u32, _rows: u32) -> Handle {
        let buffer = self.handle();
        self.commands.push(RecordedCommand::CreateStagingBuffer { buffer, size: data.len() });
        buffer
    }

    fn create_vertex_buffer(&mut self, _label: &str, data: &[u8]) -> Handle {
        let buffer = self.handle();
        self.commands.push(RecordedCommand::CreateVertexBuffer { buffer, size: data.len() });
        buffer
    }

    fn create_sampler(&mut self, desc: &SamplerDesc) -> Handle {
        let sampler = self.handle();
        self.commands.push(RecordedCommand::CreateSampler { sampler, desc: *desc });
        sampler
    }

    fn create_shader_module(&mut self, label: &str, stage: ShaderStage, source: &str) -> Handle {
        let module = self.handle();
        self.commands.push(RecordedCommand::CreateShaderModule {
            module,
            label: label.to_string(),
            stage,
            source: source.to_string(),
        });
        module
    }

    fn create_descriptor_set_layout(&mut self, _label: &str, combined_image_samplers: u32) -> Handle {
        let layout = self.handle();
        self.commands.push(RecordedCommand::CreateDescriptorSetLayout {
            layout,
            bindings: combined_image_samplers,
        });
        layout
    }

    fn create_pipeline_layout(&mut self, _label: &str, set_layout: &Handle, push_constant_size: u32) -> Handle {
        let layout = self.handle();
        self.commands.push(RecordedCommand::CreatePipelineLayout {
            layout,
            set_layout: *set_layout,
            push_constant_size,
        });
        layout
    }

    fn create_render_pass(&mut self, desc: &RenderPassDesc<'_>) -> Handle {
        let render_pass = self.handle();
        self.commands.push(RecordedCommand::CreateRenderPass {
            render_pass,
            format: desc.format,
            load: desc.load,
        });
        render_pass
    }

    fn create_graphics_pipeline(&mut self, desc: &GraphicsPipelineDesc<'_, Self>) -> Handle {
        let pipeline = self.handle();
        self.commands.push(RecordedCommand::CreatePipeline {
            pipeline,
            render_pass: *desc.render_pass,
            format: desc.format,
            blend: desc.blend,
        });
        pipeline
    }

    fn create_framebuffer(&mut self, _render_pass: &Handle, view: &Handle, width: u32, height: u32) -> Handle {
        let framebuffer = self.handle();
        self.commands.push(RecordedCommand::CreateFramebuffer {
            framebuffer,
            view: *view,
            width,
            height,
        });
        framebuffer
    }

    fn create_descriptor_pool(&mut self, max_sets: u32, max_descriptors: u32) -> Handle {
        let pool = self.handle();
        self.commands.push(RecordedCommand::CreateDescriptorPool {
            pool,
            max_sets,
            max_descriptors,
        });
        pool
    }

    fn reset_descriptor_pool(&mut self, pool: &mut Handle) {
        self.commands.push(RecordedCommand::ResetDescriptorPool { pool: *pool });
    }

    fn allocate_descriptor_set(&mut self, pool: &mut Handle, _layout: &Handle, writes: &[ImageSamplerWrite<'_, Self>]) -> Handle {
        let set = self.handle();
        self.commands.push(RecordedCommand::AllocateDescriptorSet {
            set,
            pool: *pool,
            views: writes.iter().map(|write| *write.view).collect(),
        });
        set
    }

    fn pipeline_barrier(&mut self, stream: CommandStream, barrier: &PipelineBarrier<Handle>) {
        self.commands.push(RecordedCommand::Barrier {
            stream,
            barrier: barrier.clone(),
        });
    }

    fn copy_buffer_to_image(&mut self, stream: CommandStream, buffer: &Handle, image: &Handle, width: u32, height: u32) {
        self.commands.push(RecordedCommand::CopyBufferToImage {
            stream,
            buffer: *buffer,
            image: *image,
            width,
            height,
        });
    }

    fn draw_screen_quad(&mut self, draw: &ScreenQuadDraw<'_, Self>) {
        self.commands.push(RecordedCommand::Draw {
            pipeline: *draw.pipeline,
            framebuffer: *draw.framebuffer,
            descriptor_set: *draw.descriptor_set,
            viewport: draw.viewport,
            push_constants: draw.push_constants.to_vec(),
            vertices: draw.vertices.clone(),
        });
    }
}
