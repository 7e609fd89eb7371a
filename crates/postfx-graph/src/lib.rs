//! Effect graph description for the postfx runtime
//!
//! This crate provides the vocabulary shared between an effect graph (which decides
//! which full-screen passes run and in what order) and the runtime that executes them:
//! texture and shader declarations, effect steps, per-frame parameters, and a
//! YAML manifest implementation of the [`EffectGraph`] trait.

mod error;
mod graph;
mod params;
mod scale_factor;
mod types;
mod uniforms;

pub mod manifest;

pub use error::GraphError;
pub use graph::{EffectGraph, EffectStep, ShaderDescriptor, TextureDescriptor, TextureInput, TextureTarget};
pub use manifest::ManifestEffectGraph;
pub use params::FrameParams;
pub use scale_factor::{ScaleFactor, ScaleFactorParseError};
pub use types::{BlendMode, FilterMode, PixelFormat, UniformField, UniformType, Viewport, WrapMode};
pub use uniforms::pack_uniforms;
