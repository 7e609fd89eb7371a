//! Error types for effect graph loading and validation

use crate::{PixelFormat, ScaleFactorParseError};

/// Errors raised while loading or validating an effect graph manifest
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// The manifest is not valid YAML or does not match the expected schema
    #[error("failed to parse effect manifest: {0}")]
    Parse(#[from] serde_norway::Error),

    /// The manifest file could not be read
    #[error("failed to read effect manifest: {0}")]
    Io(#[from] std::io::Error),

    /// A scale factor string could not be parsed
    #[error("invalid scale factor: {0}")]
    ScaleFactor(#[from] ScaleFactorParseError),

    /// A step references a shader that is not declared
    #[error("effect '{effect}' references undeclared shader '{shader}'")]
    UnknownShader { effect: String, shader: String },

    /// A step references a texture that is not declared
    #[error("effect '{effect}' references undeclared texture '{texture}'")]
    UnknownTexture { effect: String, texture: String },

    /// A uniform value or effect toggle references an unknown frame parameter
    #[error("'{context}' references unknown frame parameter '{param}'")]
    UnknownParam { context: String, param: String },

    /// A step assigns a value to a uniform field its shader does not declare
    #[error("shader '{shader}' has no uniform field '{field}'")]
    UnknownUniform { shader: String, field: String },

    /// A uniform value has the wrong number of components for its field type
    #[error("uniform '{field}' expects {expected} component(s), got {actual}")]
    UniformArity { field: String, expected: usize, actual: usize },

    /// A texture declares neither or both of a scaled and a fixed size
    #[error("texture '{texture}' must declare either 'scale' or both 'width' and 'height'")]
    InvalidSize { texture: String },

    /// A texture fill pattern does not match the size of one pixel
    #[error("texture '{texture}' fill must be {expected} bytes for {format:?}, got {actual}")]
    InvalidFill { texture: String, format: PixelFormat, expected: usize, actual: usize },
}
