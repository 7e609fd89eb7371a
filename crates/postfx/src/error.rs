//! Error types for the postprocess runtime

use postfx_graph::{GraphError, PixelFormat};

/// Fatal configuration and asset errors
///
/// None of these are retried. They indicate a content or device defect and are
/// propagated to the caller of the driver, which is expected to abandon the renderer.
#[derive(Debug, thiserror::Error)]
pub enum PostprocessError {
    /// The device cannot create an image of the requested format and usage
    #[error("texture '{texture}': image format {format:?} is not supported by the device")]
    UnsupportedFormat { texture: String, format: PixelFormat },

    /// A shader source asset could not be located
    #[error("shader source '{name}' not found")]
    MissingShaderSource { name: String },

    /// A step references a shader the graph does not declare
    #[error("shader '{name}' is not declared by the effect graph")]
    UnknownShader { name: String },

    /// A step references a texture the graph does not declare
    #[error("texture '{name}' is not declared by the effect graph")]
    UnknownTexture { name: String },

    /// Initial texture data does not cover the declared image
    #[error("texture '{texture}': initial data is {actual} bytes, expected {expected}")]
    InvalidTextureData { texture: String, expected: usize, actual: usize },

    /// An effect uses the scene color or the pipeline images before render buffers were installed
    #[error("render buffers have not been set")]
    RenderBuffersMissing,

    /// The effect graph could not be loaded
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// A shader source file could not be read
    #[error("failed to read shader source: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for postprocess operations
pub type Result<T> = std::result::Result<T, PostprocessError>;
