//! CPU form of the shading model evaluated by the generated fragment shaders.
//!
//! The renderer never calls [`shade`] per pixel; it exists so the lighting
//! math and the normal transform can be checked without a GPU, and it must
//! stay in step with `render::shader`.

use glam::{Mat3, Mat4, Vec3, Vec4};

use crate::light::Light;

pub const AMBIENT_STRENGTH: f32 = 0.2;
pub const SPECULAR_STRENGTH: f32 = 0.8;
pub const HIGHLIGHT_EXPONENT: f32 = 16.0;

/// Inverse-transpose of the model matrix's linear part, padded to a `Mat4`
/// for uniform upload. Singular models fall back to identity.
pub fn normal_matrix(model: Mat4) -> Mat4 {
    let linear = Mat3::from_mat4(model);
    if linear.determinant().abs() <= f32::EPSILON {
        return Mat4::IDENTITY;
    }
    Mat4::from_mat3(linear.inverse().transpose())
}

/// World-space normal: the mesh rotation is applied first, then the normal
/// matrix.
pub fn transform_normal(rotation: Mat4, normal_matrix: Mat4, normal: Vec3) -> Vec3 {
    let rotated = rotation.transform_vector3(normal);
    normal_matrix
        .transform_vector3(rotated)
        .try_normalize()
        .unwrap_or(Vec3::ZERO)
}

/// One shaded point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fragment {
    pub position: Vec3,
    pub normal: Vec3,
    pub base_color: Vec3,
}

/// Phong shading with a fixed ambient term and up to two point lights.
pub fn shade(fragment: &Fragment, view_position: Vec3, lights: &[Light], shininess: f32) -> Vec4 {
    let normal = fragment.normal.try_normalize().unwrap_or(Vec3::ZERO);
    let view = (view_position - fragment.position)
        .try_normalize()
        .unwrap_or(Vec3::ZERO);

    let mut diffuse = Vec3::ZERO;
    let mut specular = Vec3::ZERO;
    for light in lights.iter().take(2) {
        let to_light = (light.position() - fragment.position)
            .try_normalize()
            .unwrap_or(Vec3::ZERO);
        let lambert = normal.dot(to_light).max(0.0);
        diffuse += lambert * light.color() * light.intensity();

        if shininess > 0.0 {
            let reflected = reflect(-to_light, normal);
            let highlight = view.dot(reflected).max(0.0);
            specular += SPECULAR_STRENGTH
                * light.intensity()
                * shininess
                * highlight.powf(HIGHLIGHT_EXPONENT * shininess)
                * light.color();
        }
    }

    let ambient = Vec3::splat(AMBIENT_STRENGTH);
    ((ambient + diffuse + specular) * fragment.base_color).extend(1.0)
}

fn reflect(incident: Vec3, normal: Vec3) -> Vec3 {
    incident - 2.0 * normal.dot(incident) * normal
}
