//! Rotating intermediate images and the scene color buffer

use crate::config::MIN_PIPELINE_IMAGES;
use crate::device::{AccessFlags, CommandStream, GpuDevice, ImageLayout, ImageUsage, PipelineBarrier, PipelineStages};
use crate::image::TextureImage;
use postfx_graph::PixelFormat;

/// Ring of intermediate images effects ping-pong between
///
/// "next" is always the image after "current". Writing "next" and then calling
/// [`PipelineImageRing::advance`] makes the written image the new "current".
#[derive(Debug)]
pub struct PipelineImageRing<D: GpuDevice> {
    images: Vec<TextureImage<D>>,
    current: usize,
}

impl<D: GpuDevice> PipelineImageRing<D> {
    /// Allocates `count` render target images of the given size, at least two
    ///
    /// The images are transitioned to [`ImageLayout::ColorAttachment`] on the upload stream.
    pub fn new(device: &mut D, count: usize, width: u32, height: u32, format: PixelFormat) -> Self {
        let count = count.max(MIN_PIPELINE_IMAGES);
        let mut barrier = PipelineBarrier::new(PipelineStages::TOP_OF_PIPE, PipelineStages::COLOR_ATTACHMENT_OUTPUT);

        let images = (0..count)
            .map(|index| {
                let mut image = TextureImage::new(device, &format!("Pipeline Image {index}"), width, height, format, ImageUsage::RENDER_TARGET);
                image.transition(&mut barrier, ImageLayout::ColorAttachment, AccessFlags::empty(), AccessFlags::COLOR_ATTACHMENT_WRITE | AccessFlags::COLOR_ATTACHMENT_READ);
                image
            })
            .collect();
        device.pipeline_barrier(CommandStream::Upload, &barrier);

        tracing::debug!(count, width, height, ?format, "Allocated pipeline images");
        Self { images, current: 0 }
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Index of the current image
    pub fn current_index(&self) -> usize {
        self.current
    }

    fn next_index(&self) -> usize {
        (self.current + 1) % self.images.len()
    }

    pub fn current(&self) -> &TextureImage<D> {
        &self.images[self.current]
    }

    pub fn current_mut(&mut self) -> &mut TextureImage<D> {
        &mut self.images[self.current]
    }

    pub fn next(&self) -> &TextureImage<D> {
        &self.images[self.next_index()]
    }

    pub fn next_mut(&mut self) -> &mut TextureImage<D> {
        let index = self.next_index();
        &mut self.images[index]
    }

    /// Makes the next image the current one
    pub fn advance(&mut self) {
        self.current = self.next_index();
    }

    /// Releases every image
    pub fn destroy(self, device: &mut D) {
        for image in self.images {
            image.destroy(device);
        }
    }
}

/// The scene color buffer and the pipeline image ring sized after it
#[derive(Debug)]
pub struct RenderBuffers<D: GpuDevice> {
    /// Externally rendered scene color image
    pub scene_color: TextureImage<D>,
    /// Intermediate images at the scene size
    pub pipeline: PipelineImageRing<D>,
}

impl<D: GpuDevice> RenderBuffers<D> {
    pub fn width(&self) -> u32 {
        self.scene_color.width()
    }

    pub fn height(&self) -> u32 {
        self.scene_color.height()
    }
}
