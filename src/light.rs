use glam::Vec3;

/// Point light. A default light is white and dark until given an intensity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    position: Vec3,
    color: Vec3,
    intensity: f32,
}

impl Default for Light {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            color: Vec3::ONE,
            intensity: 0.0,
        }
    }
}

impl Light {
    pub fn new(position: Vec3, color: Vec3, intensity: f32) -> Self {
        let mut light = Self::default();
        light
            .set_position(position.x, position.y, position.z)
            .set_color(color.x, color.y, color.z)
            .set_intensity(intensity);
        light
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn color(&self) -> Vec3 {
        self.color
    }

    pub fn intensity(&self) -> f32 {
        self.intensity
    }

    pub fn set_position(&mut self, x: f32, y: f32, z: f32) -> &mut Self {
        self.position = Vec3::new(x, y, z);
        self
    }

    /// RGB components, each clamped to `[0, 1]`.
    pub fn set_color(&mut self, r: f32, g: f32, b: f32) -> &mut Self {
        self.color = Vec3::new(r, g, b).clamp(Vec3::ZERO, Vec3::ONE);
        self
    }

    /// Negative intensities are stored as zero.
    pub fn set_intensity(&mut self, intensity: f32) -> &mut Self {
        self.intensity = intensity.max(0.0);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_light_is_white_and_dark() {
        let light = Light::default();
        assert_eq!(light.position(), Vec3::ZERO);
        assert_eq!(light.color(), Vec3::ONE);
        assert_eq!(light.intensity(), 0.0);
    }

    #[test]
    fn negative_intensity_clamps_to_zero() {
        let mut light = Light::default();
        light.set_intensity(-3.0);
        assert_eq!(light.intensity(), 0.0);
        light.set_intensity(2.5);
        assert_eq!(light.intensity(), 2.5);
    }

    #[test]
    fn constructor_applies_setter_rules() {
        let light = Light::new(Vec3::new(1.0, 2.0, 3.0), Vec3::new(2.0, 0.5, -1.0), -1.0);
        assert_eq!(light.position(), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(light.color(), Vec3::new(1.0, 0.5, 0.0));
        assert_eq!(light.intensity(), 0.0);
    }
}
