//! [`crate::device::GpuDevice`] implementations

pub mod recording;
pub mod wgpu_device;

pub use recording::RecordingDevice;
pub use wgpu_device::WgpuDevice;
