//! Graphics device abstraction
//!
//! The postprocess runtime never talks to a graphics API directly. It issues
//! builder-style creation calls and command recordings through [`GpuDevice`],
//! expressed in explicit-synchronization terms: images carry a layout, and every
//! layout change is a [`PipelineBarrier`] recorded into one of two command streams.
//! Backends that track resource states themselves are free to ignore barriers.

use bitflags::bitflags;
use postfx_graph::{BlendMode, FilterMode, PixelFormat, Viewport, WrapMode};
use std::fmt::Debug;
use std::ops::Range;

/// Command stream a recording goes into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandStream {
    /// Texture initialisation, executed before the draw stream
    Upload,
    /// Per-step barriers and full-screen draws
    Draw,
}

/// Usage mode a GPU image is currently laid out for
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageLayout {
    /// Contents are undefined, the state of a freshly created image
    #[default]
    Undefined,
    /// Destination of a buffer copy
    TransferDst,
    /// Sampled by shaders
    ShaderReadOnly,
    /// Rendered into
    ColorAttachment,
}

bitflags! {
    /// Ways an image may be used over its lifetime
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ImageUsage: u32 {
        const SAMPLED = 1 << 0;
        const TRANSFER_DST = 1 << 1;
        const COLOR_ATTACHMENT = 1 << 2;
    }

    /// Pipeline stages a barrier waits on or blocks
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PipelineStages: u32 {
        const TOP_OF_PIPE = 1 << 0;
        const TRANSFER = 1 << 1;
        const FRAGMENT_SHADER = 1 << 2;
        const COLOR_ATTACHMENT_OUTPUT = 1 << 3;
    }

    /// Memory accesses a barrier makes available or visible
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AccessFlags: u32 {
        const TRANSFER_WRITE = 1 << 0;
        const SHADER_READ = 1 << 1;
        const COLOR_ATTACHMENT_READ = 1 << 2;
        const COLOR_ATTACHMENT_WRITE = 1 << 3;
    }
}

impl ImageUsage {
    /// Usage of an image that receives initial data and is only sampled afterwards
    pub const UPLOAD: Self = Self::SAMPLED.union(Self::TRANSFER_DST);
    /// Usage of an image that effects render into and sample from
    pub const RENDER_TARGET: Self = Self::SAMPLED.union(Self::COLOR_ATTACHMENT);
}

/// Shader stage a module is compiled for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

/// What happens to the attachment contents when a render pass begins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttachmentLoad {
    /// Previous contents may be discarded
    DontCare,
    /// Previous contents are preserved, required when blending with them
    Load,
}

impl AttachmentLoad {
    /// Load operation a step with the given blend mode needs
    pub fn for_blend(blend: BlendMode) -> Self {
        match blend {
            BlendMode::None => AttachmentLoad::DontCare,
            BlendMode::Additive | BlendMode::Alpha => AttachmentLoad::Load,
        }
    }
}

/// Format of a vertex attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexFormat {
    Float32x2,
    Float32x3,
}

/// A single attribute of the vertex buffer binding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexAttribute {
    /// Shader input location
    pub location: u32,
    /// Component layout
    pub format: VertexFormat,
    /// Byte offset inside one vertex
    pub offset: u64,
}

/// Parameters of a new image
#[derive(Debug, Clone)]
pub struct ImageDesc<'a> {
    /// Debug label
    pub label: &'a str,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Pixel format
    pub format: PixelFormat,
    /// Ways the image will be used
    pub usage: ImageUsage,
}

/// Parameters of a new sampler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SamplerDesc {
    /// Minification and magnification filter
    pub filter: FilterMode,
    /// Address mode on both axes
    pub wrap: WrapMode,
}

/// Parameters of a new render pass with a single color attachment
///
/// The pass carries an external dependency ordering color attachment writes of
/// earlier passes before color attachment reads of this one.
#[derive(Debug, Clone)]
pub struct RenderPassDesc<'a> {
    /// Debug label
    pub label: &'a str,
    /// Format of the color attachment
    pub format: PixelFormat,
    /// What happens to the attachment contents when the pass begins
    pub load: AttachmentLoad,
}

/// Parameters of a new full-screen graphics pipeline
///
/// Topology is a triangle strip and the viewport is dynamic state.
pub struct GraphicsPipelineDesc<'a, D: GpuDevice + ?Sized> {
    /// Debug label
    pub label: &'a str,
    /// Vertex stage module
    pub vertex: &'a D::ShaderModule,
    /// Fragment stage module
    pub fragment: &'a D::ShaderModule,
    /// Descriptor set and push constant layout
    pub layout: &'a D::PipelineLayout,
    /// Render pass the pipeline is compatible with
    pub render_pass: &'a D::RenderPass,
    /// Format of the color target
    pub format: PixelFormat,
    /// Blending of the color target
    pub blend: BlendMode,
    /// Byte size of one vertex
    pub vertex_stride: u64,
    /// Attributes of the single vertex buffer binding
    pub vertex_attributes: &'a [VertexAttribute],
}

/// Layout transition of one image
#[derive(Debug, Clone, PartialEq)]
pub struct ImageBarrier<I> {
    /// The transitioned image
    pub image: I,
    /// Layout before the barrier
    pub old_layout: ImageLayout,
    /// Layout after the barrier
    pub new_layout: ImageLayout,
    /// Accesses that must complete before the transition
    pub src_access: AccessFlags,
    /// Accesses that wait for the transition
    pub dst_access: AccessFlags,
}

/// A pipeline barrier covering any number of image transitions
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineBarrier<I> {
    /// Stages that must complete before the barrier
    pub src_stages: PipelineStages,
    /// Stages that wait for the barrier
    pub dst_stages: PipelineStages,
    /// Image layout transitions
    pub images: Vec<ImageBarrier<I>>,
}

impl<I> PipelineBarrier<I> {
    /// Creates a barrier without image transitions
    pub fn new(src_stages: PipelineStages, dst_stages: PipelineStages) -> Self {
        Self {
            src_stages,
            dst_stages,
            images: Vec::new(),
        }
    }

    /// Adds an image transition
    pub fn add_image(&mut self, image: I, old_layout: ImageLayout, new_layout: ImageLayout, src_access: AccessFlags, dst_access: AccessFlags) -> &mut Self {
        self.images.push(ImageBarrier {
            image,
            old_layout,
            new_layout,
            src_access,
            dst_access,
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

/// One combined image sampler written into a descriptor set
pub struct ImageSamplerWrite<'a, D: GpuDevice + ?Sized> {
    /// The sampled view
    pub view: &'a D::ImageView,
    /// The sampler paired with `view`
    pub sampler: &'a D::Sampler,
}

impl<D: GpuDevice + ?Sized> Clone for ImageSamplerWrite<'_, D> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<D: GpuDevice + ?Sized> Copy for ImageSamplerWrite<'_, D> {}

/// Everything a full-screen quad draw binds
pub struct ScreenQuadDraw<'a, D: GpuDevice + ?Sized> {
    /// Render pass begun for the draw
    pub render_pass: &'a D::RenderPass,
    /// Framebuffer of the output view
    pub framebuffer: &'a D::Framebuffer,
    /// Render area and viewport
    pub viewport: Viewport,
    /// Pipeline to draw with
    pub pipeline: &'a D::Pipeline,
    /// Layout the push constants are pushed through
    pub pipeline_layout: &'a D::PipelineLayout,
    /// Input bindings at set 0
    pub descriptor_set: &'a D::DescriptorSet,
    /// Shared screen quad vertices
    pub vertex_buffer: &'a D::Buffer,
    /// Fragment stage push constants, skipped when empty
    pub push_constants: &'a [u8],
    /// Vertex range of the quad inside `vertex_buffer`
    pub vertices: Range<u32>,
}

/// A graphics device and its two command streams
pub trait GpuDevice {
    type Image: Clone + Debug;
    type ImageView: Clone + Debug;
    type Sampler: Clone + Debug;
    type StagingBuffer: Debug;
    type Buffer: Debug;
    type ShaderModule: Debug;
    type DescriptorSetLayout: Debug;
    type PipelineLayout: Debug;
    type RenderPass: Debug;
    type Pipeline: Debug;
    type Framebuffer: Debug;
    type DescriptorPool: Debug;
    type DescriptorSet: Debug;

    /// Returns true if images of `format` can be created with every flag of `usage`
    fn is_format_supported(&self, format: PixelFormat, usage: ImageUsage) -> bool;

    /// Creates an image in [`ImageLayout::Undefined`]
    fn create_image(&mut self, desc: &ImageDesc<'_>) -> Self::Image;

    fn create_image_view(&mut self, image: &Self::Image, format: PixelFormat) -> Self::ImageView;

    /// Releases an image; the caller guarantees no pending command references it
    fn destroy_image(&mut self, image: Self::Image);

    /// Creates a CPU-visible buffer holding `rows` rows of `bytes_per_row` tightly packed bytes
    fn create_staging_buffer(&mut self, data: &[u8], bytes_per_row: u32, rows: u32) -> Self::StagingBuffer;

    fn create_vertex_buffer(&mut self, label: &str, data: &[u8]) -> Self::Buffer;

    fn create_sampler(&mut self, desc: &SamplerDesc) -> Self::Sampler;

    fn create_shader_module(&mut self, label: &str, stage: ShaderStage, source: &str) -> Self::ShaderModule;

    /// Creates a layout with one fragment-visible combined image sampler per slot
    fn create_descriptor_set_layout(&mut self, label: &str, combined_image_samplers: u32) -> Self::DescriptorSetLayout;

    /// Creates a pipeline layout, with a fragment push-constant range when `push_constant_size` is non-zero
    fn create_pipeline_layout(&mut self, label: &str, set_layout: &Self::DescriptorSetLayout, push_constant_size: u32) -> Self::PipelineLayout;

    fn create_render_pass(&mut self, desc: &RenderPassDesc<'_>) -> Self::RenderPass;

    fn create_graphics_pipeline(&mut self, desc: &GraphicsPipelineDesc<'_, Self>) -> Self::Pipeline;

    fn create_framebuffer(&mut self, render_pass: &Self::RenderPass, view: &Self::ImageView, width: u32, height: u32) -> Self::Framebuffer;

    fn create_descriptor_pool(&mut self, max_sets: u32, max_descriptors: u32) -> Self::DescriptorPool;

    /// Frees every set allocated from `pool`
    fn reset_descriptor_pool(&mut self, pool: &mut Self::DescriptorPool);

    fn allocate_descriptor_set(&mut self, pool: &mut Self::DescriptorPool, layout: &Self::DescriptorSetLayout, writes: &[ImageSamplerWrite<'_, Self>]) -> Self::DescriptorSet;

    fn pipeline_barrier(&mut self, stream: CommandStream, barrier: &PipelineBarrier<Self::Image>);

    fn copy_buffer_to_image(&mut self, stream: CommandStream, buffer: &Self::StagingBuffer, image: &Self::Image, width: u32, height: u32);

    /// Records begin render pass, binds, viewport, push constants, draw and end render pass into the draw stream
    fn draw_screen_quad(&mut self, draw: &ScreenQuadDraw<'_, Self>);
}
