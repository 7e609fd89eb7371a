//! Value types shared by effect steps and the runtime

use serde::{Deserialize, Serialize};

/// Pixel formats available to effect textures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
pub enum PixelFormat {
    /// 8-bit unsigned normalized RGBA
    #[serde(rename = "rgba8")]
    Rgba8,
    /// 16-bit float RGBA
    #[serde(rename = "rgba16f")]
    Rgba16f,
    /// 32-bit float single channel
    #[serde(rename = "r32f")]
    R32f,
    /// 16-bit float two channel
    #[serde(rename = "rg16f")]
    Rg16f,
    /// 16-bit signed normalized RGBA
    #[serde(rename = "rgba16_snorm")]
    Rgba16Snorm,
}

impl PixelFormat {
    /// Returns the size of one pixel in bytes
    pub fn pixel_size(&self) -> usize {
        match self {
            PixelFormat::Rgba8 | PixelFormat::R32f | PixelFormat::Rg16f => 4,
            PixelFormat::Rgba16f | PixelFormat::Rgba16Snorm => 8,
        }
    }
}

/// Color blending applied when a step writes its output
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum BlendMode {
    /// Output replaces the destination
    #[default]
    #[serde(rename = "none")]
    None,
    /// Output is added to the destination (src + dst)
    #[serde(rename = "additive")]
    Additive,
    /// Output is alpha blended over the destination
    #[serde(rename = "alpha")]
    Alpha,
}

/// Texture sampling filter modes
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum FilterMode {
    /// Nearest neighbor filtering - sharp, pixelated
    #[serde(rename = "nearest")]
    Nearest = 0,
    /// Linear interpolation filtering - smooth, blurred
    #[default]
    #[serde(rename = "linear")]
    Linear = 1,
}

/// Texture addressing outside of the [0, 1] range
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum WrapMode {
    /// Coordinates are clamped to the edge texels
    #[default]
    #[serde(rename = "clamp")]
    Clamp = 0,
    /// Coordinates wrap around
    #[serde(rename = "repeat")]
    Repeat = 1,
}

/// Rectangle a step renders into, in output pixels
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct Viewport {
    /// Left edge in pixels
    pub x: i32,
    /// Top edge in pixels
    pub y: i32,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Viewport {
    /// Creates a viewport covering a whole `width` x `height` target
    pub const fn full(width: u32, height: u32) -> Self {
        Self { x: 0, y: 0, width, height }
    }
}

/// Types a uniform block field can have
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum UniformType {
    #[serde(rename = "int")]
    Int,
    #[serde(rename = "uint")]
    UInt,
    #[serde(rename = "float")]
    Float,
    #[serde(rename = "vec2")]
    Vec2,
    #[serde(rename = "vec3")]
    Vec3,
    #[serde(rename = "vec4")]
    Vec4,
    #[serde(rename = "mat4")]
    Mat4,
}

impl UniformType {
    /// Number of scalar components
    pub fn components(&self) -> usize {
        match self {
            UniformType::Int | UniformType::UInt | UniformType::Float => 1,
            UniformType::Vec2 => 2,
            UniformType::Vec3 => 3,
            UniformType::Vec4 => 4,
            UniformType::Mat4 => 16,
        }
    }

    /// Byte alignment of the field inside a push-constant block
    pub fn alignment(&self) -> usize {
        match self {
            UniformType::Int | UniformType::UInt | UniformType::Float => 4,
            UniformType::Vec2 => 8,
            UniformType::Vec3 | UniformType::Vec4 | UniformType::Mat4 => 16,
        }
    }

    /// GLSL spelling of the type
    pub fn glsl_name(&self) -> &'static str {
        match self {
            UniformType::Int => "int",
            UniformType::UInt => "uint",
            UniformType::Float => "float",
            UniformType::Vec2 => "vec2",
            UniformType::Vec3 => "vec3",
            UniformType::Vec4 => "vec4",
            UniformType::Mat4 => "mat4",
        }
    }
}

/// A single named field of a shader's uniform block
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct UniformField {
    /// Field name as declared in the shader
    pub name: String,
    /// Field type
    #[serde(rename = "type")]
    pub ty: UniformType,
}

impl UniformField {
    pub fn new(name: impl Into<String>, ty: UniformType) -> Self {
        Self { name: name.into(), ty }
    }
}
