//! GPU images with their layout bookkeeping

use crate::device::{AccessFlags, GpuDevice, ImageDesc, ImageLayout, ImageUsage, PipelineBarrier};
use postfx_graph::PixelFormat;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_VIEW_ID: AtomicU64 = AtomicU64::new(1);

/// Stable identity of an image view, used to key framebuffers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewId(u64);

impl ViewId {
    fn next() -> Self {
        ViewId(NEXT_VIEW_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// An image, its view, and the layout the recorded commands leave it in
///
/// The layout is a prediction of GPU state. It is only changed through
/// [`TextureImage::transition`], which records the matching barrier, so it stays
/// consistent with the barriers issued in program order.
#[derive(Debug)]
pub struct TextureImage<D: GpuDevice> {
    image: D::Image,
    view: D::ImageView,
    view_id: ViewId,
    width: u32,
    height: u32,
    format: PixelFormat,
    layout: ImageLayout,
}

impl<D: GpuDevice> TextureImage<D> {
    /// Creates an image and a view of it, starting out in [`ImageLayout::Undefined`]
    ///
    /// # Arguments
    /// * `device` - The device to create the image on
    /// * `label` - Debug label of the image
    /// * `width`, `height` - Size in pixels
    /// * `format` - Pixel format of the image and its view
    /// * `usage` - Every way the image will be used
    pub fn new(device: &mut D, label: &str, width: u32, height: u32, format: PixelFormat, usage: ImageUsage) -> Self {
        let image = device.create_image(&ImageDesc {
            label,
            width,
            height,
            format,
            usage,
        });
        let view = device.create_image_view(&image, format);
        Self::from_parts(image, view, width, height, format, ImageLayout::Undefined)
    }

    /// Wraps an externally created image, such as the scene color buffer
    pub fn from_parts(image: D::Image, view: D::ImageView, width: u32, height: u32, format: PixelFormat, layout: ImageLayout) -> Self {
        Self {
            image,
            view,
            view_id: ViewId::next(),
            width,
            height,
            format,
            layout,
        }
    }

    pub fn image(&self) -> &D::Image {
        &self.image
    }

    pub fn view(&self) -> &D::ImageView {
        &self.view
    }

    pub fn view_id(&self) -> ViewId {
        self.view_id
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn layout(&self) -> ImageLayout {
        self.layout
    }

    /// Adds a transition to `new_layout` to `barrier` and records the new layout
    pub fn transition(&mut self, barrier: &mut PipelineBarrier<D::Image>, new_layout: ImageLayout, src_access: AccessFlags, dst_access: AccessFlags) {
        barrier.add_image(self.image.clone(), self.layout, new_layout, src_access, dst_access);
        self.layout = new_layout;
    }

    /// Releases the image
    pub fn destroy(self, device: &mut D) {
        device.destroy_image(self.image);
    }
}
