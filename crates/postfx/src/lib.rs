//! GPU postprocess runtime
//!
//! This crate executes the full-screen passes declared by a [`postfx_graph::EffectGraph`]
//! against a [`GpuDevice`]. It caches effect textures, compiled shaders, samplers and
//! render pass setups across frames, allocates per-frame descriptor sets, and
//! rotates a ring of intermediate images effects ping-pong between.
//!
//! The usual frame looks like:
//! 1. [`Postprocess::set_render_buffers`] whenever the scene color buffer changes
//! 2. [`Postprocess::begin_frame`]
//! 3. The drivers: [`Postprocess::ambient_occlude_scene`], [`Postprocess::post_process_scene`], [`Postprocess::blur_scene`]

mod error;
mod executor;

pub mod assets;
pub mod backend;
pub mod config;
pub mod device;
pub mod frame_pool;
pub mod image;
pub mod pipeline_ring;
pub mod render_pass;
pub mod sampler_cache;
pub mod screen_quad;
pub mod shader_cache;
pub mod texture_cache;

pub use assets::{DirectoryLoader, MemoryLoader, ShaderSourceLoader};
pub use config::PostprocessConfig;
pub use device::{CommandStream, GpuDevice, ImageLayout, ImageUsage};
pub use error::{PostprocessError, Result};
pub use executor::{Postprocess, TONEMAP_PALETTE};
pub use image::TextureImage;
pub use pipeline_ring::{PipelineImageRing, RenderBuffers};
