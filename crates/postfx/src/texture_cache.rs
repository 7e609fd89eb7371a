//! Named effect textures, allocated on first use and replaced on resize

use crate::{PostprocessError, Result};
use crate::device::{AccessFlags, CommandStream, GpuDevice, ImageLayout, ImageUsage, PipelineBarrier, PipelineStages};
use crate::image::TextureImage;
use postfx_graph::TextureDescriptor;
use std::collections::HashMap;

/// A materialised effect texture
#[derive(Debug)]
pub struct CachedTexture<D: GpuDevice> {
    /// The image with its layout bookkeeping
    pub image: TextureImage<D>,
    /// Buffer the initial data was uploaded from
    pub staging: Option<D::StagingBuffer>,
}

impl<D: GpuDevice> CachedTexture<D> {
    /// Allocates the image and records its initialisation into the upload stream
    ///
    /// Images with initial data are sampled-only and end up in
    /// [`ImageLayout::ShaderReadOnly`] after a staging copy. Images without data are
    /// render targets and end up in [`ImageLayout::ColorAttachment`].
    fn create(device: &mut D, desc: &TextureDescriptor) -> Result<Self> {
        let usage = if desc.data.is_some() { ImageUsage::UPLOAD } else { ImageUsage::RENDER_TARGET };
        if !device.is_format_supported(desc.format, usage) {
            return Err(PostprocessError::UnsupportedFormat {
                texture: desc.name.clone(),
                format: desc.format,
            });
        }

        if let Some(data) = &desc.data {
            if data.len() != desc.byte_size() {
                return Err(PostprocessError::InvalidTextureData {
                    texture: desc.name.clone(),
                    expected: desc.byte_size(),
                    actual: data.len(),
                });
            }
        }

        let mut image = TextureImage::new(device, &desc.name, desc.width, desc.height, desc.format, usage);

        let staging = match &desc.data {
            Some(data) => {
                let bytes_per_row = desc.width * desc.format.pixel_size() as u32;
                let staging = device.create_staging_buffer(data, bytes_per_row, desc.height);

                let mut barrier = PipelineBarrier::new(PipelineStages::TOP_OF_PIPE, PipelineStages::TRANSFER);
                image.transition(&mut barrier, ImageLayout::TransferDst, AccessFlags::empty(), AccessFlags::TRANSFER_WRITE);
                device.pipeline_barrier(CommandStream::Upload, &barrier);

                device.copy_buffer_to_image(CommandStream::Upload, &staging, image.image(), desc.width, desc.height);

                let mut barrier = PipelineBarrier::new(PipelineStages::TRANSFER, PipelineStages::FRAGMENT_SHADER);
                image.transition(&mut barrier, ImageLayout::ShaderReadOnly, AccessFlags::TRANSFER_WRITE, AccessFlags::SHADER_READ);
                device.pipeline_barrier(CommandStream::Upload, &barrier);

                Some(staging)
            }
            None => {
                let mut barrier = PipelineBarrier::new(PipelineStages::TOP_OF_PIPE, PipelineStages::COLOR_ATTACHMENT_OUTPUT);
                image.transition(&mut barrier, ImageLayout::ColorAttachment, AccessFlags::empty(), AccessFlags::COLOR_ATTACHMENT_WRITE | AccessFlags::COLOR_ATTACHMENT_READ);
                device.pipeline_barrier(CommandStream::Upload, &barrier);
                None
            }
        };

        tracing::debug!(
            texture = %desc.name,
            width = desc.width,
            height = desc.height,
            format = ?desc.format,
            uploaded = staging.is_some(),
            "Allocated effect texture"
        );

        Ok(Self { image, staging })
    }

    fn matches(&self, desc: &TextureDescriptor) -> bool {
        self.image.width() == desc.width && self.image.height() == desc.height
    }

    fn destroy(self, device: &mut D) {
        self.image.destroy(device);
    }
}

/// Cache of named effect textures
#[derive(Debug)]
pub struct TextureCache<D: GpuDevice> {
    textures: HashMap<String, CachedTexture<D>>,
}

impl<D: GpuDevice> Default for TextureCache<D> {
    fn default() -> Self {
        Self { textures: HashMap::new() }
    }
}

impl<D: GpuDevice> TextureCache<D> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the texture for `desc`, allocating it if missing or if its size changed
    ///
    /// # Arguments
    /// * `device` - The device to allocate on and record uploads into
    /// * `desc` - The texture declaration
    ///
    /// # Returns
    /// The cached texture, or [`PostprocessError::UnsupportedFormat`] if the device
    /// cannot create it
    pub fn ensure(&mut self, device: &mut D, desc: &TextureDescriptor) -> Result<&mut CachedTexture<D>> {
        let reuse = self.textures.get(&desc.name).is_some_and(|texture| texture.matches(desc));

        if !reuse {
            if let Some(stale) = self.textures.remove(&desc.name) {
                tracing::debug!(
                    texture = %desc.name,
                    old_width = stale.image.width(),
                    old_height = stale.image.height(),
                    "Replacing resized effect texture"
                );
                stale.destroy(device);
            }

            let texture = CachedTexture::create(device, desc)?;
            self.textures.insert(desc.name.clone(), texture);
        }

        self.get_mut(&desc.name).ok_or_else(|| PostprocessError::UnknownTexture { name: desc.name.clone() })
    }

    pub fn get(&self, name: &str) -> Option<&CachedTexture<D>> {
        self.textures.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut CachedTexture<D>> {
        self.textures.get_mut(name)
    }

    /// Releases a texture so the next [`TextureCache::ensure`] recreates it
    ///
    /// # Returns
    /// true if a texture was released
    pub fn remove(&mut self, device: &mut D, name: &str) -> bool {
        match self.textures.remove(name) {
            Some(texture) => {
                tracing::debug!(texture = %name, "Evicted effect texture");
                texture.destroy(device);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::recording::{RecordedCommand, RecordingDevice};
    use postfx_graph::PixelFormat;

    #[test]
    fn test_same_descriptor_reuses_texture() {
        let mut device = RecordingDevice::new();
        let mut cache = TextureCache::new();
        let desc = TextureDescriptor::new("A", 256, 256, PixelFormat::Rgba8);

        let first = *cache.ensure(&mut device, &desc).unwrap().image.image();
        let second = *cache.ensure(&mut device, &desc).unwrap().image.image();

        assert_eq!(first, second);
        assert_eq!(device.images_created(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_resize_replaces_texture() {
        let mut device = RecordingDevice::new();
        let mut cache = TextureCache::new();

        let old = *cache.ensure(&mut device, &TextureDescriptor::new("A", 256, 256, PixelFormat::Rgba8)).unwrap().image.image();
        let texture = cache.ensure(&mut device, &TextureDescriptor::new("A", 512, 256, PixelFormat::Rgba8)).unwrap();

        assert_eq!((texture.image.width(), texture.image.height()), (512, 256));
        assert_ne!(*texture.image.image(), old);
        assert_eq!(device.images_destroyed(), 1);
        assert_eq!(device.images_created(), 2);

        let destroyed = device.last_position(|command| matches!(command, RecordedCommand::DestroyImage { image } if *image == old)).unwrap();
        let created = device.last_position(|command| matches!(command, RecordedCommand::CreateImage { .. })).unwrap();
        assert!(destroyed < created);
    }

    #[test]
    fn test_render_target_initialisation() {
        let mut device = RecordingDevice::new();
        let mut cache = TextureCache::new();
        let texture = cache.ensure(&mut device, &TextureDescriptor::new("A", 16, 16, PixelFormat::Rgba16f)).unwrap();

        assert_eq!(texture.image.layout(), ImageLayout::ColorAttachment);
        assert!(texture.staging.is_none());
        let image = *texture.image.image();
        assert_eq!(device.barriers_for(image), 1);
        assert!(device.commands.iter().any(|command| matches!(
            command,
            RecordedCommand::CreateImage { usage, .. } if *usage == ImageUsage::RENDER_TARGET
        )));
    }

    #[test]
    fn test_upload_initialisation() {
        let mut device = RecordingDevice::new();
        let mut cache = TextureCache::new();
        let desc = TextureDescriptor::new("Tonemap.Palette", 2, 2, PixelFormat::Rgba8).with_data(vec![0u8; 16]);
        let texture = cache.ensure(&mut device, &desc).unwrap();

        assert_eq!(texture.image.layout(), ImageLayout::ShaderReadOnly);
        assert!(texture.staging.is_some());
        let image = *texture.image.image();
        assert_eq!(device.barriers_for(image), 2);

        let layouts: Vec<_> = device
            .commands
            .iter()
            .filter_map(|command| match command {
                RecordedCommand::Barrier { stream, barrier } => {
                    assert_eq!(*stream, CommandStream::Upload);
                    Some((barrier.images[0].old_layout, barrier.images[0].new_layout))
                }
                RecordedCommand::CopyBufferToImage { .. } => Some((ImageLayout::TransferDst, ImageLayout::TransferDst)),
                _ => None,
            })
            .collect();
        assert_eq!(
            layouts,
            vec![
                (ImageLayout::Undefined, ImageLayout::TransferDst),
                (ImageLayout::TransferDst, ImageLayout::TransferDst),
                (ImageLayout::TransferDst, ImageLayout::ShaderReadOnly),
            ]
        );
    }

    #[test]
    fn test_unsupported_format_is_fatal() {
        let mut device = RecordingDevice::new().without_format(PixelFormat::Rgba16Snorm);
        let mut cache = TextureCache::new();
        let result = cache.ensure(&mut device, &TextureDescriptor::new("SSAO.Normals", 8, 8, PixelFormat::Rgba16Snorm));

        assert!(matches!(result, Err(PostprocessError::UnsupportedFormat { format: PixelFormat::Rgba16Snorm, .. })));
        assert_eq!(device.images_created(), 0);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_short_initial_data_is_rejected() {
        let mut device = RecordingDevice::new();
        let mut cache = TextureCache::new();
        let desc = TextureDescriptor::new("Tonemap.Palette", 4, 4, PixelFormat::Rgba8).with_data(vec![0u8; 4]);

        assert!(matches!(
            cache.ensure(&mut device, &desc),
            Err(PostprocessError::InvalidTextureData { expected: 64, actual: 4, .. })
        ));
    }

    #[test]
    fn test_remove_releases_texture() {
        let mut device = RecordingDevice::new();
        let mut cache = TextureCache::new();
        cache.ensure(&mut device, &TextureDescriptor::new("A", 4, 4, PixelFormat::Rgba8)).unwrap();

        assert!(cache.remove(&mut device, "A"));
        assert!(!cache.remove(&mut device, "A"));
        assert_eq!(device.images_destroyed(), 1);
        assert!(cache.get("A").is_none());
    }
}
