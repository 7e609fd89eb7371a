//! Effect graph declarations and the trait the runtime consumes them through

use crate::{BlendMode, FilterMode, FrameParams, PixelFormat, UniformField, Viewport, WrapMode};
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Declaration of a named effect texture
#[derive(Debug, Clone, PartialEq)]
pub struct TextureDescriptor {
    /// Unique texture name
    pub name: String,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Pixel format
    pub format: PixelFormat,
    /// Initial pixel data, tightly packed rows of `width * format.pixel_size()` bytes
    pub data: Option<Arc<[u8]>>,
}

impl TextureDescriptor {
    /// Creates a render target descriptor without initial data
    pub fn new(name: impl Into<String>, width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            format,
            data: None,
        }
    }

    /// Attaches initial pixel data
    pub fn with_data(mut self, data: impl Into<Arc<[u8]>>) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Number of bytes a full image of this descriptor occupies
    pub fn byte_size(&self) -> usize {
        self.width as usize * self.height as usize * self.format.pixel_size()
    }
}

/// Declaration of a named effect shader
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderDescriptor {
    /// Unique shader name
    pub name: String,
    /// Source name of the vertex stage
    pub vertex: String,
    /// Source name of the fragment stage
    pub fragment: String,
    /// Fields of the push-constant uniform block, empty for none
    pub uniforms: Vec<UniformField>,
    /// Preprocessor text inserted ahead of the fragment source
    pub defines: String,
    /// Shading language version the source was written against
    pub version: u32,
}

/// Where a step reads an input from or writes its output to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TextureTarget {
    /// The current image of the pipeline image ring
    CurrentPipeline,
    /// The image after the current one in the pipeline image ring
    NextPipeline,
    /// A named effect texture
    Named(String),
    /// The scene color buffer
    SceneColor,
}

impl TextureTarget {
    /// Returns the texture name for named targets
    pub fn name(&self) -> Option<&str> {
        match self {
            TextureTarget::Named(name) => Some(name),
            _ => None,
        }
    }
}

impl FromStr for TextureTarget {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "current" => TextureTarget::CurrentPipeline,
            "next" => TextureTarget::NextPipeline,
            "scene" => TextureTarget::SceneColor,
            name => TextureTarget::Named(name.to_string()),
        })
    }
}

impl fmt::Display for TextureTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextureTarget::CurrentPipeline => write!(f, "current"),
            TextureTarget::NextPipeline => write!(f, "next"),
            TextureTarget::SceneColor => write!(f, "scene"),
            TextureTarget::Named(name) => write!(f, "{name}"),
        }
    }
}

impl<'de> Deserialize<'de> for TextureTarget {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A texture bound as a step input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureInput {
    /// The texture to sample
    pub target: TextureTarget,
    /// Sampler filter
    pub filter: FilterMode,
    /// Sampler address mode
    pub wrap: WrapMode,
}

impl TextureInput {
    pub fn new(target: TextureTarget, filter: FilterMode, wrap: WrapMode) -> Self {
        Self { target, filter, wrap }
    }
}

/// One full-screen shader pass
#[derive(Debug, Clone, PartialEq)]
pub struct EffectStep {
    /// Name of the shader to draw with
    pub shader: String,
    /// Blending applied to the output
    pub blend_mode: BlendMode,
    /// Input textures, bound to consecutive slots in order
    pub inputs: Vec<TextureInput>,
    /// Render target
    pub output: TextureTarget,
    /// Rectangle of the output that is rendered
    pub viewport: Viewport,
    /// Packed uniform values, pushed as push constants when non-empty
    pub uniforms: Vec<u8>,
}

/// Source of texture, shader, and effect declarations
///
/// The graph decides which effects run and in what order; the runtime only
/// consumes what it declares. Drivers push frame parameters through
/// [`EffectGraph::params_mut`] and then call [`EffectGraph::rebuild`] before
/// materialising resources and executing effects.
pub trait EffectGraph {
    /// Current frame parameters
    fn params(&self) -> &FrameParams;

    /// Mutable access to the frame parameters
    fn params_mut(&mut self) -> &mut FrameParams;

    /// Declares every shader the graph's effects use
    fn declare_shaders(&mut self);

    /// Recomputes texture declarations from the current frame parameters
    fn update_textures(&mut self);

    /// Recomputes effect steps (viewports, uniform values) from the current declarations
    fn update_steps(&mut self);

    /// Declared shaders by name
    fn shaders(&self) -> &BTreeMap<String, ShaderDescriptor>;

    /// Declared textures by name
    fn textures(&self) -> &BTreeMap<String, TextureDescriptor>;

    /// Ordered steps of the named effect; unknown effects have no steps
    fn effect(&self, name: &str) -> &[EffectStep];

    /// Removes a texture declaration until the next [`EffectGraph::update_textures`]
    fn remove_texture(&mut self, name: &str) -> Option<TextureDescriptor>;

    /// Runs the update sequence: shaders, then textures, then steps
    fn rebuild(&mut self) {
        self.declare_shaders();
        self.update_textures();
        self.update_steps();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_texture_target_parsing() {
        assert_eq!("current".parse::<TextureTarget>().unwrap(), TextureTarget::CurrentPipeline);
        assert_eq!("next".parse::<TextureTarget>().unwrap(), TextureTarget::NextPipeline);
        assert_eq!("scene".parse::<TextureTarget>().unwrap(), TextureTarget::SceneColor);
        assert_eq!("Bloom.Level0".parse::<TextureTarget>().unwrap(), TextureTarget::Named("Bloom.Level0".to_string()));
    }

    #[test]
    fn test_texture_descriptor_byte_size() {
        let desc = TextureDescriptor::new("Exposure.Level0", 16, 8, PixelFormat::R32f);
        assert_eq!(desc.byte_size(), 16 * 8 * 4);
        let desc = TextureDescriptor::new("Tonemap.Palette", 512, 512, PixelFormat::Rgba16f);
        assert_eq!(desc.byte_size(), 512 * 512 * 8);
    }
}
