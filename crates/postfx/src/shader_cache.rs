//! Compiled effect shaders, compiled once per name for the life of the cache

use crate::Result;
use crate::assets::ShaderSourceLoader;
use crate::device::{GpuDevice, ShaderStage};
use postfx_graph::{ShaderDescriptor, UniformField};
use std::collections::HashMap;

/// Stable identity of a compiled shader, assigned in compilation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShaderId(u32);

/// The two stage modules of an effect shader
#[derive(Debug)]
pub struct CachedShader<D: GpuDevice> {
    /// Identity used in render pass keys
    pub id: ShaderId,
    /// Vertex stage module
    pub vertex: D::ShaderModule,
    /// Fragment stage module, compiled with the uniform block and defines
    pub fragment: D::ShaderModule,
}

/// Builds the push-constant uniform block declaration for `fields`
///
/// # Returns
/// The declaration, or an empty string when there are no fields
pub fn uniform_block(fields: &[UniformField]) -> String {
    if fields.is_empty() {
        return String::new();
    }

    let mut decl = String::from("layout(push_constant) uniform Uniforms {\n");
    for field in fields {
        decl.push_str(&format!("\t{} {};\n", field.ty.glsl_name(), field.name));
    }
    decl.push_str("};\n");
    decl
}

/// Assembles one stage's translation unit
///
/// The `#line 1` directive makes diagnostics refer to lines of `body`.
pub fn assemble_source(glsl_version: u32, prolog: &str, body: &str) -> String {
    format!("#version {glsl_version}\n{prolog}#line 1\n{body}")
}

/// Cache of compiled effect shaders
#[derive(Debug)]
pub struct ShaderCache<D: GpuDevice> {
    shaders: HashMap<String, CachedShader<D>>,
    glsl_version: u32,
    next_id: u32,
}

impl<D: GpuDevice> ShaderCache<D> {
    /// Creates an empty cache assembling sources for `glsl_version`
    pub fn new(glsl_version: u32) -> Self {
        Self {
            shaders: HashMap::new(),
            glsl_version,
            next_id: 0,
        }
    }

    /// Returns the shader for `desc`, compiling it on first use
    ///
    /// The uniform block and the defines go ahead of the fragment stage only.
    ///
    /// # Arguments
    /// * `device` - The device to create the modules on
    /// * `loader` - Resolves the stage source names
    /// * `desc` - The shader declaration
    ///
    /// # Returns
    /// The cached shader, or [`crate::PostprocessError::MissingShaderSource`]
    pub fn ensure(&mut self, device: &mut D, loader: &dyn ShaderSourceLoader, desc: &ShaderDescriptor) -> Result<&CachedShader<D>> {
        if !self.shaders.contains_key(&desc.name) {
            let vertex_source = loader.load(&desc.vertex)?;
            let fragment_source = loader.load(&desc.fragment)?;

            if desc.version != self.glsl_version {
                tracing::trace!(shader = %desc.name, declared = desc.version, used = self.glsl_version, "Shader declares a different version");
            }

            let prolog = uniform_block(&desc.uniforms) + &desc.defines;
            let vertex = device.create_shader_module(&desc.vertex, ShaderStage::Vertex, &assemble_source(self.glsl_version, "", &vertex_source));
            let fragment = device.create_shader_module(&desc.fragment, ShaderStage::Fragment, &assemble_source(self.glsl_version, &prolog, &fragment_source));

            let id = ShaderId(self.next_id);
            self.next_id += 1;
            tracing::debug!(shader = %desc.name, id = id.0, "Compiled effect shader");

            self.shaders.insert(desc.name.clone(), CachedShader { id, vertex, fragment });
        }

        self.get(&desc.name).ok_or_else(|| crate::PostprocessError::UnknownShader { name: desc.name.clone() })
    }

    pub fn get(&self, name: &str) -> Option<&CachedShader<D>> {
        self.shaders.get(name)
    }

    pub fn len(&self) -> usize {
        self.shaders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shaders.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PostprocessError;
    use crate::assets::MemoryLoader;
    use crate::backend::recording::RecordingDevice;
    use postfx_graph::UniformType;

    fn blur_shader() -> ShaderDescriptor {
        ShaderDescriptor {
            name: "BlurHorizontal".to_string(),
            vertex: "pp/screenquad.vp".to_string(),
            fragment: "pp/blur.fp".to_string(),
            uniforms: vec![UniformField::new("SampleWeights", UniformType::Vec4), UniformField::new("Scale", UniformType::Float)],
            defines: "#define BLUR_HORIZONTAL\n".to_string(),
            version: 450,
        }
    }

    fn loader() -> MemoryLoader {
        MemoryLoader::new()
            .with_source("pp/screenquad.vp", "void main() { gl_Position = vec4(0); }\n")
            .with_source("pp/blur.fp", "void main() {}\n")
    }

    #[test]
    fn test_uniform_block_declaration() {
        assert_eq!(uniform_block(&[]), "");
        assert_eq!(
            uniform_block(&blur_shader().uniforms),
            "layout(push_constant) uniform Uniforms {\n\tvec4 SampleWeights;\n\tfloat Scale;\n};\n"
        );
    }

    #[test]
    fn test_source_assembly() {
        let mut device = RecordingDevice::new();
        let mut cache = ShaderCache::new(450);
        cache.ensure(&mut device, &loader(), &blur_shader()).unwrap();

        let sources: Vec<_> = device.shader_sources().collect();
        assert_eq!(sources.len(), 2);

        let (_, stage, vertex) = sources[0];
        assert_eq!(stage, ShaderStage::Vertex);
        assert_eq!(vertex, "#version 450\n#line 1\nvoid main() { gl_Position = vec4(0); }\n");

        let (_, stage, fragment) = sources[1];
        assert_eq!(stage, ShaderStage::Fragment);
        assert!(fragment.starts_with("#version 450\nlayout(push_constant) uniform Uniforms {\n"));
        assert!(fragment.ends_with("};\n#define BLUR_HORIZONTAL\n#line 1\nvoid main() {}\n"));
    }

    #[test]
    fn test_compiles_once() {
        let mut device = RecordingDevice::new();
        let mut cache = ShaderCache::new(450);
        let first = cache.ensure(&mut device, &loader(), &blur_shader()).unwrap().id;
        let second = cache.ensure(&mut device, &loader(), &blur_shader()).unwrap().id;

        assert_eq!(first, second);
        assert_eq!(device.shader_modules_created(), 2);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_missing_source_is_fatal() {
        let mut device = RecordingDevice::new();
        let mut cache = ShaderCache::new(450);
        let loader = MemoryLoader::new().with_source("pp/screenquad.vp", "");

        let result = cache.ensure(&mut device, &loader, &blur_shader());
        assert!(matches!(result, Err(PostprocessError::MissingShaderSource { ref name }) if name == "pp/blur.fp"));
        assert!(cache.is_empty());
        assert_eq!(device.shader_modules_created(), 0);
    }
}
