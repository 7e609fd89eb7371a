//! Runtime configuration

use postfx_graph::PixelFormat;
use serde::Deserialize;

/// Smallest pipeline image ring that still allows reading one image while writing the other
pub const MIN_PIPELINE_IMAGES: usize = 2;

/// Configuration of the postprocess runtime
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PostprocessConfig {
    /// Number of images in the pipeline image ring
    pub pipeline_images: usize,
    /// Descriptor sets one frame pool block can allocate
    pub descriptor_sets_per_pool: u32,
    /// Combined image samplers one frame pool block can allocate
    pub descriptors_per_pool: u32,
    /// Output format of steps that do not render into a named texture
    pub fallback_output_format: PixelFormat,
    /// `#version` header of assembled shader sources
    pub glsl_version: u32,
}

impl Default for PostprocessConfig {
    fn default() -> Self {
        Self {
            pipeline_images: MIN_PIPELINE_IMAGES,
            descriptor_sets_per_pool: 50,
            descriptors_per_pool: 50,
            fallback_output_format: PixelFormat::Rgba16f,
            glsl_version: 450,
        }
    }
}

impl PostprocessConfig {
    /// Returns a copy with out-of-range values clamped
    pub fn sanitized(mut self) -> Self {
        if self.pipeline_images < MIN_PIPELINE_IMAGES {
            tracing::warn!(requested = self.pipeline_images, "Pipeline image ring too small, using {MIN_PIPELINE_IMAGES}");
            self.pipeline_images = MIN_PIPELINE_IMAGES;
        }
        if self.descriptor_sets_per_pool == 0 || self.descriptors_per_pool == 0 {
            tracing::warn!("Empty descriptor pool blocks requested, using defaults");
            let defaults = Self::default();
            self.descriptor_sets_per_pool = defaults.descriptor_sets_per_pool;
            self.descriptors_per_pool = defaults.descriptors_per_pool;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_document() {
        let config: PostprocessConfig = serde_norway::from_str("{}").unwrap();
        assert_eq!(config, PostprocessConfig::default());
    }

    #[test]
    fn test_partial_document() {
        let config: PostprocessConfig = serde_norway::from_str("pipeline_images: 3\nfallback_output_format: rgba8\n").unwrap();
        assert_eq!(config.pipeline_images, 3);
        assert_eq!(config.fallback_output_format, PixelFormat::Rgba8);
        assert_eq!(config.descriptor_sets_per_pool, 50);
    }

    #[test]
    fn test_sanitized_clamps_ring_size() {
        let config = PostprocessConfig {
            pipeline_images: 1,
            descriptors_per_pool: 0,
            ..Default::default()
        }
        .sanitized();
        assert_eq!(config.pipeline_images, MIN_PIPELINE_IMAGES);
        assert_eq!(config.descriptors_per_pool, 50);
    }
}
