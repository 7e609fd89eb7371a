//! Packing of uniform values into push-constant bytes

use crate::{UniformField, UniformType};

/// Packs uniform values into a push-constant block
///
/// Fields are laid out in declaration order with scalars aligned to 4 bytes,
/// `vec2` to 8, and `vec3`/`vec4`/`mat4` to 16. Integer fields convert their
/// value from float. Fields without a value are left zeroed.
///
/// # Arguments
/// * `fields` - The uniform block layout
/// * `value_of` - Returns the components of a field, or None to leave it zeroed
///
/// # Returns
/// The packed bytes, empty when `fields` is empty
pub fn pack_uniforms(fields: &[UniformField], mut value_of: impl FnMut(&UniformField) -> Option<Vec<f32>>) -> Vec<u8> {
    let mut bytes = Vec::new();

    for field in fields {
        let offset = bytes.len().next_multiple_of(field.ty.alignment());
        bytes.resize(offset, 0);

        let components = field.ty.components();
        let values = value_of(field).unwrap_or_default();
        for i in 0..components {
            let value = values.get(i).copied().unwrap_or(0.0);
            match field.ty {
                UniformType::Int => bytes.extend_from_slice(bytemuck::bytes_of(&(value as i32))),
                UniformType::UInt => bytes.extend_from_slice(bytemuck::bytes_of(&(value as u32))),
                _ => bytes.extend_from_slice(bytemuck::bytes_of(&value)),
            }
        }
    }

    bytes
}
