//! Per-frame parameters pushed into the effect graph by the drivers

/// Frame parameters the effect graph derives its textures and uniforms from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameParams {
    /// Width of the scene color buffer in pixels
    pub scene_width: u32,
    /// Height of the scene color buffer in pixels
    pub scene_height: u32,
    /// Active fixed colormap, 0 when none
    pub fixed_colormap: i32,
    /// Element 5 of the projection matrix, used to reconstruct view depth for ambient occlusion
    pub projection_m5: f32,
    /// Strength of the full-screen blur, 0 disables it
    pub blur_amount: f32,
}

impl Default for FrameParams {
    fn default() -> Self {
        Self {
            scene_width: 1,
            scene_height: 1,
            fixed_colormap: 0,
            projection_m5: 1.0,
            blur_amount: 0.0,
        }
    }
}

impl FrameParams {
    /// Names accepted by [`FrameParams::lookup`]
    pub const NAMES: &'static [&'static str] = &[
        "scene_width",
        "scene_height",
        "inv_scene_width",
        "inv_scene_height",
        "fixed_colormap",
        "projection_m5",
        "blur_amount",
    ];

    /// Looks up a parameter by name as a float
    ///
    /// # Returns
    /// The parameter value, or None if the name is unknown
    pub fn lookup(&self, name: &str) -> Option<f32> {
        let value = match name {
            "scene_width" => self.scene_width as f32,
            "scene_height" => self.scene_height as f32,
            "inv_scene_width" => 1.0 / self.scene_width.max(1) as f32,
            "inv_scene_height" => 1.0 / self.scene_height.max(1) as f32,
            "fixed_colormap" => self.fixed_colormap as f32,
            "projection_m5" => self.projection_m5,
            "blur_amount" => self.blur_amount,
            _ => return None,
        };
        Some(value)
    }

    /// Returns true if `name` is a known parameter
    pub fn is_known(name: &str) -> bool {
        Self::NAMES.contains(&name)
    }
}
