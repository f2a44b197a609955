use std::path::{Path, PathBuf};

use glam::{Mat4, Vec3, Vec4};

use crate::error::RenderError;

/// Semantic vertex attribute and the shader location it is bound to.
///
/// This is the single mapping between the interleaved vertex layout and the
/// `@location(..)` inputs of the generated shaders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeSlot {
    Position = 0,
    Color = 1,
    TexCoord = 2,
    Normal = 3,
}

impl AttributeSlot {
    /// Slots in interleave order.
    pub const ALL: [AttributeSlot; 4] = [
        AttributeSlot::Position,
        AttributeSlot::Color,
        AttributeSlot::TexCoord,
        AttributeSlot::Normal,
    ];

    pub const fn location(self) -> u32 {
        self as u32
    }

    /// Component count of the attribute when present.
    pub const fn canonical_count(self) -> u32 {
        match self {
            AttributeSlot::Position => 3,
            AttributeSlot::Color => 4,
            AttributeSlot::TexCoord => 2,
            AttributeSlot::Normal => 3,
        }
    }
}

/// Per-attribute component counts of an interleaved vertex stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttributeCounts {
    pub position: u32,
    pub color: u32,
    pub uv: u32,
    pub normal: u32,
}

impl Default for AttributeCounts {
    fn default() -> Self {
        Self {
            position: 3,
            color: 4,
            uv: 0,
            normal: 0,
        }
    }
}

impl AttributeCounts {
    /// Layout produced by the shape generators: every attribute present.
    pub const FULL: AttributeCounts = AttributeCounts {
        position: 3,
        color: 4,
        uv: 2,
        normal: 3,
    };

    pub fn count(&self, slot: AttributeSlot) -> u32 {
        match slot {
            AttributeSlot::Position => self.position,
            AttributeSlot::Color => self.color,
            AttributeSlot::TexCoord => self.uv,
            AttributeSlot::Normal => self.normal,
        }
    }

    pub fn has(&self, slot: AttributeSlot) -> bool {
        self.count(slot) > 0
    }

    /// Floats per vertex.
    pub fn stride(&self) -> usize {
        (self.position + self.color + self.uv + self.normal) as usize
    }

    /// Float offset of `slot` inside one vertex, or `None` when absent.
    pub fn offset(&self, slot: AttributeSlot) -> Option<usize> {
        if !self.has(slot) {
            return None;
        }
        let preceding: u32 = AttributeSlot::ALL
            .iter()
            .take_while(|other| **other != slot)
            .map(|other| self.count(*other))
            .sum();
        Some(preceding as usize)
    }

    fn validate(&self) -> Result<(), RenderError> {
        for slot in AttributeSlot::ALL {
            let count = self.count(slot);
            let required = slot == AttributeSlot::Position;
            if count != slot.canonical_count() && (required || count != 0) {
                return Err(RenderError::InvalidMesh(format!(
                    "{slot:?} attribute has {count} components, expected {}{}",
                    slot.canonical_count(),
                    if required { "" } else { " or 0" }
                )));
            }
        }
        Ok(())
    }
}

/// One attribute as it is bound for drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundAttribute {
    pub slot: AttributeSlot,
    pub components: u32,
    pub offset_bytes: u64,
}

/// Attribute bindings derived from [`AttributeCounts`].
///
/// Texture coordinates are only bound for textured draws; the stride always
/// covers every attribute stored in the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexLayout {
    pub counts: AttributeCounts,
    pub bind_uv: bool,
}

impl VertexLayout {
    pub fn new(counts: AttributeCounts, textured: bool) -> Self {
        Self {
            counts,
            bind_uv: textured && counts.has(AttributeSlot::TexCoord),
        }
    }

    pub fn stride_bytes(&self) -> u64 {
        (self.counts.stride() * std::mem::size_of::<f32>()) as u64
    }

    pub fn is_bound(&self, slot: AttributeSlot) -> bool {
        match slot {
            AttributeSlot::TexCoord => self.bind_uv,
            other => self.counts.has(other),
        }
    }

    pub fn attributes(&self) -> Vec<BoundAttribute> {
        AttributeSlot::ALL
            .iter()
            .filter(|slot| self.is_bound(**slot))
            .filter_map(|slot| {
                self.counts.offset(*slot).map(|offset| BoundAttribute {
                    slot: *slot,
                    components: self.counts.count(*slot),
                    offset_bytes: (offset * std::mem::size_of::<f32>()) as u64,
                })
            })
            .collect()
    }
}

/// CPU-side geometry, local transform and material reference.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshDescriptor {
    pub vertices: Vec<f32>,
    pub indices: Vec<u32>,
    pub counts: AttributeCounts,
    texture: Option<PathBuf>,
    scale: Mat4,
    rotation: Mat4,
    translation: Mat4,
    shininess: f32,
}

impl Default for MeshDescriptor {
    fn default() -> Self {
        Self {
            vertices: Vec::new(),
            indices: Vec::new(),
            counts: AttributeCounts::default(),
            texture: None,
            scale: Mat4::IDENTITY,
            rotation: Mat4::IDENTITY,
            translation: Mat4::IDENTITY,
            shininess: 0.0,
        }
    }
}

impl MeshDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parts(vertices: Vec<f32>, indices: Vec<u32>, counts: AttributeCounts) -> Self {
        Self {
            vertices,
            indices,
            counts,
            ..Self::default()
        }
    }

    pub fn vertex_count(&self) -> usize {
        match self.counts.stride() {
            0 => 0,
            stride => self.vertices.len() / stride,
        }
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Local to world transform, `translation · rotation · scale`.
    pub fn model(&self) -> Mat4 {
        self.translation * self.rotation * self.scale
    }

    /// Rotation-only part of [`MeshDescriptor::model`].
    pub fn rotation(&self) -> Mat4 {
        self.rotation
    }

    pub fn set_scale(&mut self, x: f32, y: f32, z: f32) -> &mut Self {
        self.scale = Mat4::from_scale(Vec3::new(x, y, z));
        self
    }

    /// Replaces the rotation with `degrees` about `axis`.
    pub fn set_rotation(&mut self, degrees: f32, axis: Vec3) -> &mut Self {
        self.rotation = axis_rotation(degrees, axis);
        self
    }

    /// Applies an extra rotation after the current one.
    pub fn add_rotation(&mut self, degrees: f32, axis: Vec3) -> &mut Self {
        self.rotation = axis_rotation(degrees, axis) * self.rotation;
        self
    }

    pub fn set_translation(&mut self, x: f32, y: f32, z: f32) -> &mut Self {
        self.translation = Mat4::from_translation(Vec3::new(x, y, z));
        self
    }

    pub fn shininess(&self) -> f32 {
        self.shininess
    }

    pub fn set_shininess(&mut self, factor: f32) -> &mut Self {
        self.shininess = if factor.is_nan() {
            0.0
        } else {
            factor.clamp(0.0, 1.0)
        };
        self
    }

    pub fn texture(&self) -> Option<&Path> {
        self.texture.as_deref()
    }

    pub fn set_texture(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        let path = path.into();
        self.texture = (!path.as_os_str().is_empty()).then_some(path);
        self
    }

    /// Overwrites the color attribute of every vertex. No-op unless the
    /// layout carries a full RGBA color.
    pub fn set_color(&mut self, color: Vec4) -> &mut Self {
        let slot = AttributeSlot::Color;
        if self.counts.count(slot) != slot.canonical_count() {
            return self;
        }
        let (Some(offset), stride) = (self.counts.offset(slot), self.counts.stride()) else {
            return self;
        };
        for vertex in self.vertices.chunks_exact_mut(stride) {
            if let Some(target) = vertex.get_mut(offset..offset + 4) {
                target.copy_from_slice(&color.to_array());
            }
        }
        self
    }

    /// Reads one attribute of one vertex.
    pub fn attribute(&self, vertex: usize, slot: AttributeSlot) -> Option<&[f32]> {
        let offset = self.counts.offset(slot)?;
        let start = vertex * self.counts.stride() + offset;
        self.vertices
            .get(start..start + self.counts.count(slot) as usize)
    }

    pub fn position(&self, vertex: usize) -> Option<Vec3> {
        self.attribute(vertex, AttributeSlot::Position)
            .map(Vec3::from_slice)
    }

    pub fn normal(&self, vertex: usize) -> Option<Vec3> {
        self.attribute(vertex, AttributeSlot::Normal)
            .map(Vec3::from_slice)
    }

    /// Checks the layout, stride and index invariants.
    pub fn validate(&self) -> Result<(), RenderError> {
        self.counts.validate()?;
        let stride = self.counts.stride();
        if self.vertices.len() % stride != 0 {
            return Err(RenderError::InvalidMesh(format!(
                "{} vertex floats is not a multiple of the {stride}-float stride",
                self.vertices.len()
            )));
        }
        if self.indices.len() % 3 != 0 {
            return Err(RenderError::InvalidMesh(format!(
                "{} indices do not form whole triangles",
                self.indices.len()
            )));
        }
        let vertex_count = self.vertex_count();
        if let Some(bad) = self
            .indices
            .iter()
            .find(|index| **index as usize >= vertex_count)
        {
            return Err(RenderError::InvalidMesh(format!(
                "index {bad} is out of range for {vertex_count} vertices"
            )));
        }
        Ok(())
    }
}

fn axis_rotation(degrees: f32, axis: Vec3) -> Mat4 {
    match axis.try_normalize() {
        Some(axis) if degrees != 0.0 => Mat4::from_axis_angle(axis, degrees.to_radians()),
        _ => Mat4::IDENTITY,
    }
}
