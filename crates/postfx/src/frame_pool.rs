//! Per-frame descriptor set allocation
//!
//! Descriptor sets are never freed individually. Every set allocated during a
//! frame stays alive until [`FrameResourcePool::begin_frame`] resets the whole
//! pool, so no set may be used outside the frame it was allocated in.

use crate::device::{GpuDevice, ImageSamplerWrite};

#[derive(Debug)]
struct PoolBlock<D: GpuDevice> {
    pool: D::DescriptorPool,
    /// Combined image samplers the pool was created with
    capacity: u32,
    sets: u32,
    descriptors: u32,
}

/// Descriptor pool blocks plus the sets allocated from them this frame
#[derive(Debug)]
pub struct FrameResourcePool<D: GpuDevice> {
    blocks: Vec<PoolBlock<D>>,
    current: usize,
    sets: Vec<D::DescriptorSet>,
    max_sets: u32,
    max_descriptors: u32,
}

impl<D: GpuDevice> FrameResourcePool<D> {
    /// Creates an empty pool; blocks hold `max_sets` sets and `max_descriptors` combined image samplers
    pub fn new(max_sets: u32, max_descriptors: u32) -> Self {
        Self {
            blocks: Vec::new(),
            current: 0,
            sets: Vec::new(),
            max_sets: max_sets.max(1),
            max_descriptors: max_descriptors.max(1),
        }
    }

    /// Invalidates every set allocated during the previous frame
    pub fn begin_frame(&mut self, device: &mut D) {
        self.sets.clear();
        for block in &mut self.blocks {
            if block.sets > 0 {
                device.reset_descriptor_pool(&mut block.pool);
            }
            block.sets = 0;
            block.descriptors = 0;
        }
        self.current = 0;
    }

    /// Allocates a set for `layout` with one combined image sampler per write
    ///
    /// Moves on to the next block, creating it if needed, when the current one is full.
    pub fn allocate(&mut self, device: &mut D, layout: &D::DescriptorSetLayout, writes: &[ImageSamplerWrite<'_, D>]) -> &D::DescriptorSet {
        let needed = writes.len() as u32;

        loop {
            if self.current == self.blocks.len() {
                let capacity = self.max_descriptors.max(needed);
                tracing::debug!(block = self.current, sets = self.max_sets, descriptors = capacity, "Created descriptor pool block");
                self.blocks.push(PoolBlock {
                    pool: device.create_descriptor_pool(self.max_sets, capacity),
                    capacity,
                    sets: 0,
                    descriptors: 0,
                });
            }

            let block = &mut self.blocks[self.current];
            // Oversized sets only fit a block created for them
            if block.sets < self.max_sets && block.descriptors + needed <= block.capacity {
                block.sets += 1;
                block.descriptors += needed;
                let set = device.allocate_descriptor_set(&mut block.pool, layout, writes);
                self.sets.push(set);
                break;
            }

            self.current += 1;
        }

        &self.sets[self.sets.len() - 1]
    }

    /// Number of sets allocated this frame
    pub fn allocated_sets(&self) -> usize {
        self.sets.len()
    }

    /// Number of pool blocks created so far
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::recording::{Handle, RecordedCommand, RecordingDevice};

    #[test]
    fn test_first_block_is_lazy() {
        let mut device = RecordingDevice::new();
        let mut pool = FrameResourcePool::<RecordingDevice>::new(50, 50);
        pool.begin_frame(&mut device);
        assert_eq!(pool.block_count(), 0);
        assert_eq!(device.descriptor_pools_created(), 0);
    }

    #[test]
    fn test_grows_when_block_is_full() {
        let mut device = RecordingDevice::new();
        let mut pool = FrameResourcePool::new(2, 50);
        let layout = device.create_descriptor_set_layout("Copy", 0);

        for _ in 0..5 {
            pool.allocate(&mut device, &layout, &[]);
        }

        assert_eq!(pool.allocated_sets(), 5);
        assert_eq!(pool.block_count(), 3);
    }

    #[test]
    fn test_descriptor_capacity() {
        let mut device = RecordingDevice::new();
        let mut pool = FrameResourcePool::new(50, 3);
        let layout = device.create_descriptor_set_layout("Combine", 2);
        let view = Handle(900);
        let sampler = Handle(901);
        let writes = [ImageSamplerWrite::<RecordingDevice> { view: &view, sampler: &sampler }, ImageSamplerWrite { view: &view, sampler: &sampler }];

        pool.allocate(&mut device, &layout, &writes);
        pool.allocate(&mut device, &layout, &writes);
        assert_eq!(pool.block_count(), 2);
    }

    #[test]
    fn test_oversized_set_skips_smaller_reused_blocks() {
        let mut device = RecordingDevice::new();
        let mut pool = FrameResourcePool::new(50, 2);
        let small = device.create_descriptor_set_layout("Copy", 1);
        let large = device.create_descriptor_set_layout("Combine", 3);
        let view = Handle(900);
        let sampler = Handle(901);
        let write = ImageSamplerWrite::<RecordingDevice> { view: &view, sampler: &sampler };

        pool.allocate(&mut device, &small, &[write]);
        pool.begin_frame(&mut device);
        pool.allocate(&mut device, &large, &[write, write, write]);

        assert_eq!(pool.block_count(), 2);
        let capacities: Vec<_> = device
            .commands
            .iter()
            .filter_map(|command| match command {
                RecordedCommand::CreateDescriptorPool { max_descriptors, .. } => Some(*max_descriptors),
                _ => None,
            })
            .collect();
        assert_eq!(capacities, vec![2, 3]);

        // The oversized block is reused for the same set next frame
        pool.begin_frame(&mut device);
        pool.allocate(&mut device, &large, &[write, write, write]);
        assert_eq!(pool.block_count(), 2);
    }

    #[test]
    fn test_begin_frame_resets_blocks() {
        let mut device = RecordingDevice::new();
        let mut pool = FrameResourcePool::new(1, 50);
        let layout = device.create_descriptor_set_layout("Copy", 0);

        pool.allocate(&mut device, &layout, &[]);
        pool.allocate(&mut device, &layout, &[]);
        pool.begin_frame(&mut device);

        assert_eq!(pool.allocated_sets(), 0);
        let resets = device.commands.iter().filter(|command| matches!(command, RecordedCommand::ResetDescriptorPool { .. })).count();
        assert_eq!(resets, 2);

        // Blocks are reused rather than recreated
        pool.allocate(&mut device, &layout, &[]);
        pool.allocate(&mut device, &layout, &[]);
        assert_eq!(device.descriptor_pools_created(), 2);
    }
}
