use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

use crate::config::LIGHT_SLOTS;
use crate::light::Light;

/// One light slot. `color.w` carries the intensity; an empty slot is all
/// zeros and contributes nothing.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct LightUniform {
    pub position: [f32; 4],
    pub color: [f32; 4],
}

impl LightUniform {
    pub fn from_light(light: &Light) -> Self {
        Self {
            position: light.position().extend(1.0).into(),
            color: light.color().extend(light.intensity()).into(),
        }
    }

    pub fn intensity(&self) -> f32 {
        self.color[3]
    }
}

/// Per-draw uniform block, laid out to match `MeshUniforms` in the WGSL
/// source.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct MeshUniforms {
    pub model: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    pub rotation: [[f32; 4]; 4],
    pub normal_matrix: [[f32; 4]; 4],
    pub view_position: [f32; 4],
    pub lights: [LightUniform; LIGHT_SLOTS],
    /// `x` is the shininess factor.
    pub material: [f32; 4],
}

pub struct FrameMatrices {
    pub view: Mat4,
    pub projection: Mat4,
    pub view_position: Vec3,
}

impl MeshUniforms {
    pub const SIZE: u64 = std::mem::size_of::<Self>() as u64;

    pub fn new(
        frame: &FrameMatrices,
        model: Mat4,
        rotation: Mat4,
        normal_matrix: Mat4,
        shininess: f32,
        lights: &[Light],
    ) -> Self {
        let mut slots = [LightUniform::zeroed(); LIGHT_SLOTS];
        for (slot, light) in slots.iter_mut().zip(lights) {
            *slot = LightUniform::from_light(light);
        }
        Self {
            model: model.to_cols_array_2d(),
            view: frame.view.to_cols_array_2d(),
            projection: frame.projection.to_cols_array_2d(),
            rotation: rotation.to_cols_array_2d(),
            normal_matrix: normal_matrix.to_cols_array_2d(),
            view_position: frame.view_position.extend(1.0).into(),
            lights: slots,
            material: [shininess, 0.0, 0.0, 0.0],
        }
    }

    pub fn shininess(&self) -> f32 {
        self.material[0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> FrameMatrices {
        FrameMatrices {
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            view_position: Vec3::ZERO,
        }
    }

    #[test]
    fn block_size_matches_wgsl_layout() {
        // five mat4x4, view position, two lights and the material vector
        assert_eq!(MeshUniforms::SIZE, 5 * 64 + 16 + 2 * 32 + 16);
        assert_eq!(MeshUniforms::SIZE % 16, 0);
    }

    #[test]
    fn missing_lights_upload_zero_intensity() {
        let uniforms = MeshUniforms::new(
            &frame(),
            Mat4::IDENTITY,
            Mat4::IDENTITY,
            Mat4::IDENTITY,
            0.5,
            &[],
        );
        assert!(uniforms.lights.iter().all(|light| light.intensity() == 0.0));
        assert_eq!(uniforms.shininess(), 0.5);
    }

    #[test]
    fn extra_lights_are_dropped() {
        let lights = [
            Light::new(Vec3::X, Vec3::ONE, 1.0),
            Light::new(Vec3::Y, Vec3::ONE, 2.0),
            Light::new(Vec3::Z, Vec3::ONE, 3.0),
        ];
        let uniforms = MeshUniforms::new(
            &frame(),
            Mat4::IDENTITY,
            Mat4::IDENTITY,
            Mat4::IDENTITY,
            0.0,
            &lights,
        );
        assert_eq!(uniforms.lights[0].intensity(), 1.0);
        assert_eq!(uniforms.lights[1].intensity(), 2.0);
        assert_eq!(uniforms.lights[1].position, [0.0, 1.0, 0.0, 1.0]);
    }
}
