//! Samplers keyed by filter and wrap mode

use crate::device::{GpuDevice, SamplerDesc};
use postfx_graph::{FilterMode, WrapMode};
use std::collections::HashMap;

/// Packs a filter and wrap mode into a sampler cache key
pub fn sampler_key(filter: FilterMode, wrap: WrapMode) -> u32 {
    ((filter as u32) << 2) | wrap as u32
}

/// Lazily created samplers, never invalidated
#[derive(Debug)]
pub struct SamplerCache<D: GpuDevice> {
    samplers: HashMap<u32, D::Sampler>,
}

impl<D: GpuDevice> Default for SamplerCache<D> {
    fn default() -> Self {
        Self { samplers: HashMap::new() }
    }
}

impl<D: GpuDevice> SamplerCache<D> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the sampler for `filter` and `wrap`, creating it on first use
    pub fn get(&mut self, device: &mut D, filter: FilterMode, wrap: WrapMode) -> D::Sampler {
        self.samplers
            .entry(sampler_key(filter, wrap))
            .or_insert_with(|| {
                tracing::debug!(?filter, ?wrap, "Created sampler");
                device.create_sampler(&SamplerDesc { filter, wrap })
            })
            .clone()
    }

    pub fn len(&self) -> usize {
        self.samplers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samplers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::recording::RecordingDevice;

    #[test]
    fn test_sampler_keys_are_distinct() {
        let keys = [
            sampler_key(FilterMode::Nearest, WrapMode::Clamp),
            sampler_key(FilterMode::Nearest, WrapMode::Repeat),
            sampler_key(FilterMode::Linear, WrapMode::Clamp),
            sampler_key(FilterMode::Linear, WrapMode::Repeat),
        ];
        assert_eq!(keys, [0, 1, 4, 5]);
    }

    #[test]
    fn test_samplers_are_reused() {
        let mut device = RecordingDevice::new();
        let mut cache = SamplerCache::new();

        let a = cache.get(&mut device, FilterMode::Linear, WrapMode::Clamp);
        let b = cache.get(&mut device, FilterMode::Linear, WrapMode::Clamp);
        let c = cache.get(&mut device, FilterMode::Nearest, WrapMode::Repeat);

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(device.samplers_created(), 2);
        assert_eq!(cache.len(), 2);
    }
}
