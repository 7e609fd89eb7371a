//! Effect execution and the per-frame drivers
//!
//! [`Postprocess`] owns every cache of the runtime. Drivers push frame parameters
//! into the effect graph, rebuild it, materialise what it declares, and run a
//! fixed sequence of named effects through [`Postprocess::render_effect`].

use crate::{PostprocessError, Result};
use crate::assets::ShaderSourceLoader;
use crate::config::PostprocessConfig;
use crate::device::{AccessFlags, CommandStream, GpuDevice, ImageLayout, ImageSamplerWrite, PipelineBarrier, PipelineStages};
use crate::frame_pool::FrameResourcePool;
use crate::image::TextureImage;
use crate::pipeline_ring::{PipelineImageRing, RenderBuffers};
use crate::render_pass::{RenderPassCache, RenderPassKey};
use crate::sampler_cache::SamplerCache;
use crate::screen_quad::ScreenQuad;
use crate::shader_cache::ShaderCache;
use crate::texture_cache::TextureCache;
use postfx_graph::{EffectGraph, EffectStep, TextureTarget};

/// Name of the tonemap palette texture dropped by [`Postprocess::clear_tonemap_palette`]
pub const TONEMAP_PALETTE: &str = "Tonemap.Palette";

/// Effects [`Postprocess::post_process_scene`] runs before the after-bloom callback
const SCENE_EFFECTS_BEFORE_CALLBACK: [&str; 2] = ["UpdateCameraExposure", "BloomScene"];
/// Effects [`Postprocess::post_process_scene`] runs after the after-bloom callback
const SCENE_EFFECTS_AFTER_CALLBACK: [&str; 4] = ["TonemapScene", "ColormapScene", "LensDistortScene", "ApplyFXAA"];

/// Resolves a step target to the image it names
fn resolve_target<'a, D: GpuDevice>(target: &TextureTarget, textures: &'a mut TextureCache<D>, buffers: &'a mut Option<RenderBuffers<D>>) -> Result<&'a mut TextureImage<D>> {
    match target {
        TextureTarget::CurrentPipeline => buffers.as_mut().map(|buffers| buffers.pipeline.current_mut()).ok_or(PostprocessError::RenderBuffersMissing),
        TextureTarget::NextPipeline => buffers.as_mut().map(|buffers| buffers.pipeline.next_mut()).ok_or(PostprocessError::RenderBuffersMissing),
        TextureTarget::SceneColor => buffers.as_mut().map(|buffers| &mut buffers.scene_color).ok_or(PostprocessError::RenderBuffersMissing),
        TextureTarget::Named(name) => textures
            .get_mut(name)
            .map(|texture| &mut texture.image)
            .ok_or_else(|| PostprocessError::UnknownTexture { name: name.clone() }),
    }
}

/// Adds a transition to [`ImageLayout::ColorAttachment`] unless the image is already there
fn require_color_attachment<D: GpuDevice>(image: &mut TextureImage<D>, barrier: &mut PipelineBarrier<D::Image>) {
    if image.layout() != ImageLayout::ColorAttachment {
        image.transition(
            barrier,
            ImageLayout::ColorAttachment,
            AccessFlags::SHADER_READ,
            AccessFlags::COLOR_ATTACHMENT_READ | AccessFlags::COLOR_ATTACHMENT_WRITE,
        );
    }
}

fn draw_barrier<D: GpuDevice>() -> PipelineBarrier<D::Image> {
    PipelineBarrier::new(PipelineStages::FRAGMENT_SHADER, PipelineStages::COLOR_ATTACHMENT_OUTPUT)
}

/// The postprocess runtime
///
/// Single-threaded: all cache lookups, resource creation and command recording
/// happen on the caller's thread, in program order, against one device.
pub struct Postprocess<D: GpuDevice> {
    config: PostprocessConfig,
    loader: Box<dyn ShaderSourceLoader>,
    textures: TextureCache<D>,
    shaders: ShaderCache<D>,
    samplers: SamplerCache<D>,
    render_passes: RenderPassCache<D>,
    frame: FrameResourcePool<D>,
    screen_quad: ScreenQuad<D>,
    buffers: Option<RenderBuffers<D>>,
}

impl<D: GpuDevice> Postprocess<D> {
    /// Creates a runtime with empty caches
    ///
    /// # Arguments
    /// * `config` - Runtime configuration, out-of-range values are clamped
    /// * `loader` - Resolves shader source names
    pub fn new(config: PostprocessConfig, loader: impl ShaderSourceLoader + 'static) -> Self {
        let config = config.sanitized();
        Self {
            textures: TextureCache::new(),
            shaders: ShaderCache::new(config.glsl_version),
            samplers: SamplerCache::new(),
            render_passes: RenderPassCache::new(),
            frame: FrameResourcePool::new(config.descriptor_sets_per_pool, config.descriptors_per_pool),
            screen_quad: ScreenQuad::default(),
            buffers: None,
            loader: Box::new(loader),
            config,
        }
    }

    pub fn config(&self) -> &PostprocessConfig {
        &self.config
    }

    /// Starts a new frame, invalidating the descriptor sets of the previous one
    pub fn begin_frame(&mut self, device: &mut D) {
        self.frame.begin_frame(device);
    }

    /// Installs the scene color buffer
    ///
    /// The pipeline image ring is reallocated at the scene size when the size
    /// changed, and every render pass setup is dropped.
    pub fn set_render_buffers(&mut self, device: &mut D, scene_color: TextureImage<D>) {
        if scene_color.format() != self.config.fallback_output_format {
            tracing::warn!(
                scene = ?scene_color.format(),
                fallback = ?self.config.fallback_output_format,
                "Scene color format differs from the output format of scene and pipeline steps"
            );
        }

        let (width, height) = (scene_color.width(), scene_color.height());
        let pipeline = match self.buffers.take() {
            Some(buffers) if buffers.width() == width && buffers.height() == height => buffers.pipeline,
            previous => {
                if let Some(previous) = previous {
                    previous.pipeline.destroy(device);
                }
                PipelineImageRing::new(device, self.config.pipeline_images, width, height, self.config.fallback_output_format)
            }
        };

        self.buffers = Some(RenderBuffers { scene_color, pipeline });
        self.render_buffers_reset();
    }

    /// Drops every render pass setup and the framebuffers they hold
    pub fn render_buffers_reset(&mut self) {
        self.render_passes.clear();
    }

    pub fn render_buffers(&self) -> Option<&RenderBuffers<D>> {
        self.buffers.as_ref()
    }

    pub fn render_buffers_mut(&mut self) -> Option<&mut RenderBuffers<D>> {
        self.buffers.as_mut()
    }

    /// Allocates or resizes every texture the graph declares
    pub fn update_effect_textures(&mut self, device: &mut D, graph: &dyn EffectGraph) -> Result<()> {
        for desc in graph.textures().values() {
            self.textures.ensure(device, desc)?;
        }
        Ok(())
    }

    /// Compiles every shader the graph declares that is not compiled yet
    pub fn compile_effect_shaders(&mut self, device: &mut D, graph: &dyn EffectGraph) -> Result<()> {
        for desc in graph.shaders().values() {
            self.shaders.ensure(device, &*self.loader, desc)?;
        }
        Ok(())
    }

    /// Runs every step of the named effect
    ///
    /// A missing or empty effect is a no-op. Shaders and named textures a step
    /// uses are materialised on demand if the driver has not done so already.
    ///
    /// # Arguments
    /// * `device` - The device to record into
    /// * `graph` - Source of the effect's steps
    /// * `name` - Effect name
    pub fn render_effect(&mut self, device: &mut D, graph: &dyn EffectGraph, name: &str) -> Result<()> {
        let steps = graph.effect(name);
        if steps.is_empty() {
            tracing::trace!(effect = %name, "Skipping empty effect");
            return Ok(());
        }

        for step in steps {
            tracing::trace!(effect = %name, shader = %step.shader, output = %step.output, "Rendering step");
            self.render_step(device, graph, step)?;
        }
        Ok(())
    }

    fn render_step(&mut self, device: &mut D, graph: &dyn EffectGraph, step: &EffectStep) -> Result<()> {
        let Self {
            config,
            loader,
            textures,
            shaders,
            samplers,
            render_passes,
            frame,
            screen_quad,
            buffers,
        } = self;

        let shader_desc = graph.shaders().get(&step.shader).ok_or_else(|| PostprocessError::UnknownShader { name: step.shader.clone() })?;
        let shader = shaders.ensure(device, &**loader, shader_desc)?;

        for name in step.inputs.iter().map(|input| &input.target).chain(std::iter::once(&step.output)).filter_map(TextureTarget::name) {
            let desc = graph.textures().get(name).ok_or_else(|| PostprocessError::UnknownTexture { name: name.to_string() })?;
            textures.ensure(device, desc)?;
        }

        let output_format = match &step.output {
            TextureTarget::Named(_) => resolve_target(&step.output, textures, buffers)?.format(),
            _ => config.fallback_output_format,
        };

        let key = RenderPassKey {
            blend_mode: step.blend_mode,
            input_count: step.inputs.len() as u32,
            uniforms_size: step.uniforms.len() as u32,
            shader: shader.id,
            output_format,
        };
        let setup = render_passes.ensure(device, key, &step.shader, shader);

        // Inputs
        let mut barrier = draw_barrier::<D>();
        let mut bindings = Vec::with_capacity(step.inputs.len());
        for input in &step.inputs {
            let sampler = samplers.get(device, input.filter, input.wrap);
            let image = resolve_target(&input.target, textures, buffers)?;
            require_color_attachment(image, &mut barrier);
            bindings.push((image.view().clone(), sampler));
        }
        let writes: Vec<ImageSamplerWrite<'_, D>> = bindings.iter().map(|(view, sampler)| ImageSamplerWrite { view, sampler }).collect();
        let descriptor_set = frame.allocate(device, &setup.descriptor_layout, &writes);
        if !barrier.is_empty() {
            device.pipeline_barrier(CommandStream::Draw, &barrier);
        }

        // Output
        let output = resolve_target(&step.output, textures, buffers)?;
        let mut barrier = draw_barrier::<D>();
        require_color_attachment(output, &mut barrier);
        if !barrier.is_empty() {
            device.pipeline_barrier(CommandStream::Draw, &barrier);
        }

        let vertex_buffer = screen_quad.buffer(device);
        setup.draw(device, output, descriptor_set, vertex_buffer, step.viewport, &step.uniforms);

        if step.output == TextureTarget::NextPipeline {
            if let Some(buffers) = buffers.as_mut() {
                buffers.pipeline.advance();
            }
        }

        Ok(())
    }

    /// Pushes the scene size into the graph and materialises what it declares
    fn prepare(&mut self, device: &mut D, graph: &mut dyn EffectGraph) -> Result<()> {
        if let Some(buffers) = &self.buffers {
            let params = graph.params_mut();
            params.scene_width = buffers.width();
            params.scene_height = buffers.height();
        }

        graph.rebuild();
        self.compile_effect_shaders(device, graph)?;
        self.update_effect_textures(device, graph)
    }

    /// Runs the scene postprocess chain
    ///
    /// Runs camera exposure and bloom, then `after_bloom`, then tonemap, colormap,
    /// lens distortion and FXAA.
    ///
    /// # Arguments
    /// * `device` - The device to record into
    /// * `graph` - The shared effect graph
    /// * `fixed_colormap` - Active fixed colormap, 0 when none
    /// * `after_bloom` - Called between bloom and tonemapping, typically to draw 2D elements
    pub fn post_process_scene(&mut self, device: &mut D, graph: &mut dyn EffectGraph, fixed_colormap: i32, after_bloom: impl FnOnce(&mut D)) -> Result<()> {
        graph.params_mut().fixed_colormap = fixed_colormap;
        self.prepare(device, graph)?;

        for effect in SCENE_EFFECTS_BEFORE_CALLBACK {
            self.render_effect(device, graph, effect)?;
        }
        after_bloom(device);
        for effect in SCENE_EFFECTS_AFTER_CALLBACK {
            self.render_effect(device, graph, effect)?;
        }
        Ok(())
    }

    /// Runs screen space ambient occlusion
    ///
    /// # Arguments
    /// * `m5` - Element 5 of the projection matrix
    pub fn ambient_occlude_scene(&mut self, device: &mut D, graph: &mut dyn EffectGraph, m5: f32) -> Result<()> {
        graph.params_mut().projection_m5 = m5;
        self.prepare(device, graph)?;
        self.render_effect(device, graph, "AmbientOccludeScene")
    }

    /// Runs the full-screen blur once per eye
    ///
    /// # Arguments
    /// * `blur_amount` - Blur strength, 0 disables the blur
    /// * `eye_count` - Number of stereo eyes, 1 for mono output
    pub fn blur_scene(&mut self, device: &mut D, graph: &mut dyn EffectGraph, blur_amount: f32, eye_count: u32) -> Result<()> {
        graph.params_mut().blur_amount = blur_amount;
        self.prepare(device, graph)?;

        for eye in 0..eye_count {
            self.render_effect(device, graph, "BlurScene")?;
            if eye + 1 < eye_count {
                self.next_eye(eye_count);
            }
        }
        Ok(())
    }

    /// Switches the output to the next stereo eye
    ///
    /// Eyes currently share the same targets, so there is nothing to switch.
    pub fn next_eye(&mut self, eye_count: u32) {
        tracing::trace!(eye_count, "Next eye");
    }

    /// Drops the tonemap palette so the next update regenerates and uploads it again
    pub fn clear_tonemap_palette(&mut self, device: &mut D, graph: &mut dyn EffectGraph) {
        graph.remove_texture(TONEMAP_PALETTE);
        self.textures.remove(device, TONEMAP_PALETTE);
    }

    // === Statistics ===

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    pub fn shader_count(&self) -> usize {
        self.shaders.len()
    }

    pub fn sampler_count(&self) -> usize {
        self.samplers.len()
    }

    pub fn render_pass_setup_count(&self) -> usize {
        self.render_passes.len()
    }

    pub fn framebuffer_count(&self) -> usize {
        self.render_passes.framebuffer_count()
    }

    /// Number of descriptor sets allocated this frame
    pub fn descriptor_sets_in_frame(&self) -> usize {
        self.frame.allocated_sets()
    }

    /// Index of the current pipeline image, None before render buffers are set
    pub fn pipeline_index(&self) -> Option<usize> {
        self.buffers.as_ref().map(|buffers| buffers.pipeline.current_index())
    }

    /// Looks up a materialised effect texture
    pub fn texture(&self, name: &str) -> Option<&TextureImage<D>> {
        self.textures.get(name).map(|texture| &texture.image)
    }
}
