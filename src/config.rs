use glam::Vec4;

/// Number of light slots in the shader uniform block.
pub const LIGHT_SLOTS: usize = 2;

/// Window and projection settings.
#[derive(Debug, Clone, PartialEq)]
pub struct RendererConfig {
    pub width: u32,
    pub height: u32,
    pub title: String,
    pub clear_color: Vec4,
    pub near: f32,
    pub far: f32,
    /// Half the visible height of the orthographic view volume.
    pub ortho_half_height: f32,
    pub max_lights: usize,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            title: "Scene Renderer".to_string(),
            clear_color: Vec4::new(0.0, 0.0, 0.0, 1.0),
            near: 0.1,
            far: 100.0,
            ortho_half_height: 5.0,
            max_lights: LIGHT_SLOTS,
        }
    }
}

impl RendererConfig {
    /// Aspect ratio of the configured window, guarded against zero height.
    pub fn aspect(&self) -> f32 {
        self.width.max(1) as f32 / self.height.max(1) as f32
    }

    /// Lights that actually reach the shader.
    pub fn light_capacity(&self) -> usize {
        self.max_lights.min(LIGHT_SLOTS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_window_settings() {
        let config = RendererConfig::default();
        assert_eq!((config.width, config.height), (1280, 720));
        assert_eq!(config.title, "Scene Renderer");
        assert_eq!(config.near, 0.1);
        assert_eq!(config.far, 100.0);
        assert!((config.aspect() - 16.0 / 9.0).abs() < 1e-6);
    }

    #[test]
    fn light_capacity_never_exceeds_shader_slots() {
        let config = RendererConfig {
            max_lights: 8,
            ..RendererConfig::default()
        };
        assert_eq!(config.light_capacity(), LIGHT_SLOTS);
        let config = RendererConfig {
            max_lights: 1,
            ..RendererConfig::default()
        };
        assert_eq!(config.light_capacity(), 1);
    }

    #[test]
    fn zero_height_does_not_divide_by_zero() {
        let config = RendererConfig {
            height: 0,
            ..RendererConfig::default()
        };
        assert!(config.aspect().is_finite());
    }
}
