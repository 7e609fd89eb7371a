//! Effect Graph Manifest Parser
//!
//! This module provides parsing and validation for YAML manifest files that declare
//! effect textures, shaders, and the ordered steps of each named effect, and an
//! [`EffectGraph`] implementation that derives per-frame declarations from them.

use crate::{
    BlendMode, EffectGraph, EffectStep, FilterMode, FrameParams, GraphError, PixelFormat, ScaleFactor, ShaderDescriptor, TextureDescriptor, TextureInput, TextureTarget, UniformField,
    Viewport, WrapMode, pack_uniforms,
};
use serde::Deserialize;
use std::collections::BTreeMap;

/// Default shading language version of declared shaders
const DEFAULT_SHADER_VERSION: u32 = 450;

fn default_shader_version() -> u32 {
    DEFAULT_SHADER_VERSION
}

/// Texture declaration as parsed from YAML
#[derive(Debug, Clone, Deserialize)]
pub struct TextureSpec {
    /// Pixel format
    pub format: PixelFormat,
    /// Size relative to the scene [width_scale, height_scale]
    #[serde(default)]
    pub scale: Option<[ScaleFactor; 2]>,
    /// Fixed width in pixels
    #[serde(default)]
    pub width: Option<u32>,
    /// Fixed height in pixels
    #[serde(default)]
    pub height: Option<u32>,
    /// Bytes of one pixel, repeated to form the initial data
    #[serde(default)]
    pub fill: Option<Vec<u8>>,
}

impl TextureSpec {
    /// Computes the texture size for the given frame parameters
    pub fn size(&self, params: &FrameParams) -> (u32, u32) {
        match (self.scale, self.width, self.height) {
            (Some([sx, sy]), _, _) => (sx.apply(params.scene_width), sy.apply(params.scene_height)),
            (None, Some(width), Some(height)) => (width.max(1), height.max(1)),
            _ => (params.scene_width.max(1), params.scene_height.max(1)),
        }
    }

    fn validate(&self, name: &str) -> Result<(), GraphError> {
        let fixed = self.width.is_some() || self.height.is_some();
        let complete_fixed = self.width.is_some() && self.height.is_some();
        if self.scale.is_some() == fixed || (fixed && !complete_fixed) {
            return Err(GraphError::InvalidSize { texture: name.to_string() });
        }

        if let Some(fill) = &self.fill {
            let expected = self.format.pixel_size();
            if fill.len() != expected {
                return Err(GraphError::InvalidFill {
                    texture: name.to_string(),
                    format: self.format,
                    expected,
                    actual: fill.len(),
                });
            }
        }

        Ok(())
    }
}

/// Shader declaration as parsed from YAML
#[derive(Debug, Clone, Deserialize)]
pub struct ShaderSpec {
    /// Vertex stage source name
    pub vertex: String,
    /// Fragment stage source name
    pub fragment: String,
    /// Uniform block fields
    #[serde(default)]
    pub uniforms: Vec<UniformField>,
    /// Preprocessor defines
    #[serde(default)]
    pub defines: String,
    /// Shading language version
    #[serde(default = "default_shader_version")]
    pub version: u32,
}

/// Input texture binding of a step
#[derive(Debug, Clone, Deserialize)]
pub struct InputSpec {
    /// Texture to sample: `scene`, `current`, `next`, or a declared texture name
    pub texture: TextureTarget,
    /// Filter mode (defaults to linear)
    #[serde(default)]
    pub filter: FilterMode,
    /// Wrap mode (defaults to clamp)
    #[serde(default)]
    pub wrap: WrapMode,
}

/// Value assigned to a uniform field
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum UniformValueSpec {
    /// Taken from a frame parameter each frame
    Param { param: String },
    /// A literal scalar
    Scalar(f32),
    /// Literal vector or matrix components
    Vector(Vec<f32>),
}

impl UniformValueSpec {
    fn arity(&self) -> usize {
        match self {
            UniformValueSpec::Param { .. } | UniformValueSpec::Scalar(_) => 1,
            UniformValueSpec::Vector(values) => values.len(),
        }
    }

    fn resolve(&self, params: &FrameParams) -> Vec<f32> {
        match self {
            UniformValueSpec::Param { param } => vec![params.lookup(param).unwrap_or(0.0)],
            UniformValueSpec::Scalar(value) => vec![*value],
            UniformValueSpec::Vector(values) => values.clone(),
        }
    }
}

/// A single step of an effect as parsed from YAML
#[derive(Debug, Clone, Deserialize)]
pub struct StepSpec {
    /// Shader name
    pub shader: String,
    /// Blend mode (defaults to none)
    #[serde(default)]
    pub blend: BlendMode,
    /// Input textures in slot order
    #[serde(default)]
    pub inputs: Vec<InputSpec>,
    /// Render target
    pub output: TextureTarget,
    /// Explicit viewport; defaults to the full output
    #[serde(default)]
    pub viewport: Option<Viewport>,
    /// Uniform values by field name
    #[serde(default)]
    pub uniforms: BTreeMap<String, UniformValueSpec>,
}

/// A named effect as parsed from YAML
#[derive(Debug, Clone, Deserialize)]
pub struct EffectSpec {
    /// Frame parameter that disables the effect when zero
    #[serde(default)]
    pub enabled_by: Option<String>,
    /// Ordered steps
    #[serde(default)]
    pub steps: Vec<StepSpec>,
}

/// Raw effect manifest as parsed from YAML
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EffectManifest {
    /// Texture declarations by name
    #[serde(default)]
    pub textures: BTreeMap<String, TextureSpec>,
    /// Shader declarations by name
    #[serde(default)]
    pub shaders: BTreeMap<String, ShaderSpec>,
    /// Effects by name
    #[serde(default)]
    pub effects: BTreeMap<String, EffectSpec>,
}

impl EffectManifest {
    /// Parses a manifest from YAML content
    ///
    /// # Arguments
    /// * `yaml_content` - YAML string containing the manifest
    pub fn from_yaml(yaml_content: &str) -> Result<Self, GraphError> {
        Ok(serde_norway::from_str(yaml_content)?)
    }

    /// Parses a manifest from a YAML file
    ///
    /// # Arguments
    /// * `path` - Path to the YAML manifest file
    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, GraphError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Checks that every reference in the manifest resolves
    pub fn validate(&self) -> Result<(), GraphError> {
        for (name, texture) in &self.textures {
            texture.validate(name)?;
        }

        for (effect_name, effect) in &self.effects {
            if let Some(param) = &effect.enabled_by {
                if !FrameParams::is_known(param) {
                    return Err(GraphError::UnknownParam {
                        context: effect_name.clone(),
                        param: param.clone(),
                    });
                }
            }

            for step in &effect.steps {
                let shader = self.shaders.get(&step.shader).ok_or_else(|| GraphError::UnknownShader {
                    effect: effect_name.clone(),
                    shader: step.shader.clone(),
                })?;

                let targets = step.inputs.iter().map(|input| &input.texture).chain(std::iter::once(&step.output));
                for target in targets {
                    if let Some(texture) = target.name() {
                        if !self.textures.contains_key(texture) {
                            return Err(GraphError::UnknownTexture {
                                effect: effect_name.clone(),
                                texture: texture.to_string(),
                            });
                        }
                    }
                }

                for (field_name, value) in &step.uniforms {
                    let field = shader.uniforms.iter().find(|field| &field.name == field_name).ok_or_else(|| GraphError::UnknownUniform {
                        shader: step.shader.clone(),
                        field: field_name.clone(),
                    })?;

                    if value.arity() != field.ty.components() {
                        return Err(GraphError::UniformArity {
                            field: field_name.clone(),
                            expected: field.ty.components(),
                            actual: value.arity(),
                        });
                    }

                    if let UniformValueSpec::Param { param } = value {
                        if !FrameParams::is_known(param) {
                            return Err(GraphError::UnknownParam {
                                context: format!("{effect_name}.{field_name}"),
                                param: param.clone(),
                            });
                        }
                    }
                }
            }
        }

        Ok(())
    }
}

/// An [`EffectGraph`] backed by a validated manifest
#[derive(Debug, Clone)]
pub struct ManifestEffectGraph {
    manifest: EffectManifest,
    params: FrameParams,
    shaders: BTreeMap<String, ShaderDescriptor>,
    textures: BTreeMap<String, TextureDescriptor>,
    effects: BTreeMap<String, Vec<EffectStep>>,
}

impl ManifestEffectGraph {
    /// Creates a graph from a manifest, validating every reference
    pub fn new(manifest: EffectManifest) -> Result<Self, GraphError> {
        manifest.validate()?;
        tracing::debug!(
            textures = manifest.textures.len(),
            shaders = manifest.shaders.len(),
            effects = manifest.effects.len(),
            "Loaded effect manifest"
        );

        Ok(Self {
            manifest,
            params: FrameParams::default(),
            shaders: BTreeMap::new(),
            textures: BTreeMap::new(),
            effects: BTreeMap::new(),
        })
    }

    /// Creates a graph from YAML content
    pub fn from_yaml(yaml_content: &str) -> Result<Self, GraphError> {
        Self::new(EffectManifest::from_yaml(yaml_content)?)
    }

    /// Creates a graph from a YAML file
    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, GraphError> {
        Self::new(EffectManifest::from_file(path)?)
    }

    /// The manifest this graph was built from
    pub fn manifest(&self) -> &EffectManifest {
        &self.manifest
    }

    fn default_viewport(&self, output: &TextureTarget) -> Viewport {
        let texture = output.name().and_then(|name| self.textures.get(name));
        match texture {
            Some(texture) => Viewport::full(texture.width, texture.height),
            None => Viewport::full(self.params.scene_width, self.params.scene_height),
        }
    }
}

impl EffectGraph for ManifestEffectGraph {
    fn params(&self) -> &FrameParams {
        &self.params
    }

    fn params_mut(&mut self) -> &mut FrameParams {
        &mut self.params
    }

    fn declare_shaders(&mut self) {
        if self.shaders.len() == self.manifest.shaders.len() {
            return;
        }

        self.shaders = self
            .manifest
            .shaders
            .iter()
            .map(|(name, spec)| {
                let desc = ShaderDescriptor {
                    name: name.clone(),
                    vertex: spec.vertex.clone(),
                    fragment: spec.fragment.clone(),
                    uniforms: spec.uniforms.clone(),
                    defines: spec.defines.clone(),
                    version: spec.version,
                };
                (name.clone(), desc)
            })
            .collect();
    }

    fn update_textures(&mut self) {
        let mut textures = BTreeMap::new();

        for (name, spec) in &self.manifest.textures {
            let (width, height) = spec.size(&self.params);
            let mut desc = TextureDescriptor::new(name.clone(), width, height, spec.format);

            if let Some(fill) = &spec.fill {
                // Reuse the previous data when the size did not change
                let previous = self.textures.get(name).filter(|prev| prev.width == width && prev.height == height).and_then(|prev| prev.data.clone());
                desc.data = Some(previous.unwrap_or_else(|| {
                    let pixels = width as usize * height as usize;
                    fill.iter().copied().cycle().take(pixels * fill.len()).collect::<Vec<u8>>().into()
                }));
            }

            textures.insert(name.clone(), desc);
        }

        self.textures = textures;
    }

    fn update_steps(&mut self) {
        let mut effects = BTreeMap::new();

        for (name, spec) in &self.manifest.effects {
            let enabled = spec.enabled_by.as_deref().and_then(|param| self.params.lookup(param)).is_none_or(|value| value != 0.0);
            if !enabled {
                effects.insert(name.clone(), Vec::new());
                continue;
            }

            let steps = spec
                .steps
                .iter()
                .map(|step| {
                    let fields = self.manifest.shaders.get(&step.shader).map(|shader| shader.uniforms.as_slice()).unwrap_or_default();
                    let uniforms = pack_uniforms(fields, |field| step.uniforms.get(&field.name).map(|value| value.resolve(&self.params)));

                    EffectStep {
                        shader: step.shader.clone(),
                        blend_mode: step.blend,
                        inputs: step.inputs.iter().map(|input| TextureInput::new(input.texture.clone(), input.filter, input.wrap)).collect(),
                        output: step.output.clone(),
                        viewport: step.viewport.unwrap_or_else(|| self.default_viewport(&step.output)),
                        uniforms,
                    }
                })
                .collect();

            effects.insert(name.clone(), steps);
        }

        self.effects = effects;
    }

    fn shaders(&self) -> &BTreeMap<String, ShaderDescriptor> {
        &self.shaders
    }

    fn textures(&self) -> &BTreeMap<String, TextureDescriptor> {
        &self.textures
    }

    fn effect(&self, name: &str) -> &[EffectStep] {
        self.effects.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    fn remove_texture(&mut self, name: &str) -> Option<TextureDescriptor> {
        self.textures.remove(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::UniformType;
    use std::sync::Arc;

    const BLOOM_MANIFEST: &str = r##"
textures:
  Bloom.Level0:
    format: rgba16f
    scale: ["1/2", "1/2"]
  Tonemap.Palette:
    format: rgba8
    width: 4
    height: 2
    fill: [255, 0, 128, 255]
shaders:
  BloomExtract:
    vertex: shaders/pp/screenquad.vp
    fragment: shaders/pp/bloomextract.fp
    uniforms:
      - { name: Scale, type: vec2 }
      - { name: Offset, type: vec2 }
  BloomCombine:
    vertex: shaders/pp/screenquad.vp
    fragment: shaders/pp/bloomcombine.fp
  Blur:
    vertex: shaders/pp/screenquad.vp
    fragment: shaders/pp/blur.fp
    defines: "#define BLUR_HORIZONTAL\n"
    uniforms:
      - { name: SampleWeights, type: float }
effects:
  BloomScene:
    steps:
      - shader: BloomExtract
        inputs:
          - { texture: current }
        output: Bloom.Level0
        uniforms:
          Scale: [1.0, 1.0]
          Offset: [0, 0]
      - shader: BloomCombine
        blend: additive
        inputs:
          - { texture: Bloom.Level0, filter: linear }
        output: current
  BlurScene:
    enabled_by: blur_amount
    steps:
      - shader: Blur
        inputs:
          - { texture: current, wrap: clamp, filter: nearest }
        output: next
        uniforms:
          SampleWeights: { param: blur_amount }
"##;

    fn graph() -> ManifestEffectGraph {
        ManifestEffectGraph::from_yaml(BLOOM_MANIFEST).unwrap()
    }

    #[test]
    fn test_manifest_parsing() {
        let graph = graph();
        let manifest = graph.manifest();
        assert_eq!(manifest.textures.len(), 2);
        assert_eq!(manifest.shaders.len(), 3);
        assert_eq!(manifest.effects.len(), 2);

        let blur = &manifest.shaders["Blur"];
        assert_eq!(blur.version, DEFAULT_SHADER_VERSION);
        assert_eq!(blur.uniforms, vec![UniformField::new("SampleWeights", UniformType::Float)]);
        assert_eq!(blur.defines, "#define BLUR_HORIZONTAL\n");
        assert!(manifest.shaders["BloomCombine"].defines.is_empty());

        let bloom = &manifest.effects["BloomScene"];
        assert_eq!(bloom.steps[1].blend, BlendMode::Additive);
        assert_eq!(bloom.steps[1].output, TextureTarget::CurrentPipeline);
    }

    #[test]
    fn test_rebuild_derives_sizes_and_viewports() {
        let mut graph = graph();
        graph.params_mut().scene_width = 1280;
        graph.params_mut().scene_height = 720;
        graph.rebuild();

        assert_eq!(graph.shaders().len(), 3);
        let bloom = &graph.textures()["Bloom.Level0"];
        assert_eq!((bloom.width, bloom.height), (640, 360));
        assert!(bloom.data.is_none());

        let steps = graph.effect("BloomScene");
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].viewport, Viewport::full(640, 360));
        assert_eq!(steps[1].viewport, Viewport::full(1280, 720));
        // Two vec2 fields
        assert_eq!(steps[0].uniforms.len(), 16);
        assert!(steps[1].uniforms.is_empty());
    }

    #[test]
    fn test_fill_data_is_repeated_per_pixel() {
        let mut graph = graph();
        graph.rebuild();

        let palette = &graph.textures()["Tonemap.Palette"];
        let data = palette.data.as_ref().unwrap();
        assert_eq!(data.len(), palette.byte_size());
        assert_eq!(&data[4..8], &[255, 0, 128, 255]);

        // Unchanged sizes keep the same allocation
        let before = data.clone();
        graph.update_textures();
        assert!(Arc::ptr_eq(&before, graph.textures()["Tonemap.Palette"].data.as_ref().unwrap()));
    }

    #[test]
    fn test_removed_texture_is_redeclared_by_update() {
        let mut graph = graph();
        graph.rebuild();

        assert!(graph.remove_texture("Tonemap.Palette").is_some());
        assert!(!graph.textures().contains_key("Tonemap.Palette"));

        graph.update_textures();
        assert!(graph.textures().contains_key("Tonemap.Palette"));
    }

    #[test]
    fn test_disabled_effect_has_no_steps() {
        let mut graph = graph();
        graph.rebuild();
        assert!(graph.effect("BlurScene").is_empty());

        graph.params_mut().blur_amount = 0.5;
        graph.update_steps();
        let steps = graph.effect("BlurScene");
        assert_eq!(steps.len(), 1);
        assert_eq!(bytemuck::pod_read_unaligned::<f32>(&steps[0].uniforms[0..4]), 0.5);
        assert_eq!(steps[0].inputs[0].filter, FilterMode::Nearest);
    }

    #[test]
    fn test_unknown_effect_is_empty() {
        let mut graph = graph();
        graph.rebuild();
        assert!(graph.effect("LensDistortScene").is_empty());
    }

    #[test]
    fn test_unknown_shader_is_rejected() {
        let yaml = r#"
effects:
  TonemapScene:
    steps:
      - shader: Tonemap
        output: next
"#;
        let err = ManifestEffectGraph::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, GraphError::UnknownShader { ref shader, .. } if shader == "Tonemap"));
    }

    #[test]
    fn test_unknown_texture_is_rejected() {
        let yaml = r#"
shaders:
  Copy: { vertex: a.vp, fragment: b.fp }
effects:
  Present:
    steps:
      - shader: Copy
        inputs: [{ texture: Missing.Texture }]
        output: scene
"#;
        let err = ManifestEffectGraph::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, GraphError::UnknownTexture { ref texture, .. } if texture == "Missing.Texture"));
    }

    #[test]
    fn test_uniform_validation() {
        let unknown_field = r#"
shaders:
  Copy: { vertex: a.vp, fragment: b.fp, uniforms: [{ name: Scale, type: vec2 }] }
effects:
  Present:
    steps:
      - { shader: Copy, output: scene, uniforms: { Offset: [0, 0] } }
"#;
        assert!(matches!(ManifestEffectGraph::from_yaml(unknown_field).unwrap_err(), GraphError::UnknownUniform { .. }));

        let wrong_arity = r#"
shaders:
  Copy: { vertex: a.vp, fragment: b.fp, uniforms: [{ name: Scale, type: vec2 }] }
effects:
  Present:
    steps:
      - { shader: Copy, output: scene, uniforms: { Scale: 1.0 } }
"#;
        assert!(matches!(
            ManifestEffectGraph::from_yaml(wrong_arity).unwrap_err(),
            GraphError::UniformArity { expected: 2, actual: 1, .. }
        ));

        let unknown_param = r#"
shaders:
  Copy: { vertex: a.vp, fragment: b.fp, uniforms: [{ name: Amount, type: float }] }
effects:
  Present:
    steps:
      - { shader: Copy, output: scene, uniforms: { Amount: { param: exposure } } }
"#;
        assert!(matches!(ManifestEffectGraph::from_yaml(unknown_param).unwrap_err(), GraphError::UnknownParam { .. }));
    }

    #[test]
    fn test_texture_size_validation() {
        let both = r#"
textures:
  A: { format: rgba8, scale: ["1", "1"], width: 4, height: 4 }
"#;
        assert!(matches!(ManifestEffectGraph::from_yaml(both).unwrap_err(), GraphError::InvalidSize { .. }));

        let half = r#"
textures:
  A: { format: rgba8, width: 4 }
"#;
        assert!(matches!(ManifestEffectGraph::from_yaml(half).unwrap_err(), GraphError::InvalidSize { .. }));

        let bad_fill = r#"
textures:
  A: { format: rgba16f, width: 4, height: 4, fill: [0, 0, 0, 0] }
"#;
        assert!(matches!(
            ManifestEffectGraph::from_yaml(bad_fill).unwrap_err(),
            GraphError::InvalidFill { expected: 8, actual: 4, .. }
        ));
    }
}
