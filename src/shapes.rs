//! Procedural primitives.
//!
//! Every generator returns a [`MeshDescriptor`] with an identity transform,
//! white vertex colors and the full `position | color | uv | normal` layout.
//! Triangles wind counter-clockwise when seen from the side their normals
//! point to.

use std::f32::consts::{FRAC_PI_2, PI, TAU};

use glam::{Vec2, Vec3};

use crate::mesh::{AttributeCounts, MeshDescriptor};

const WHITE: [f32; 4] = [1.0, 1.0, 1.0, 1.0];

pub const MIN_CYLINDER_SIDES: u32 = 3;
pub const MIN_SPHERE_SLICES: u32 = 3;
pub const MIN_SPHERE_STACKS: u32 = 2;

/// Shape selector used by scene descriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    Plane,
    Cube,
    Pyramid,
    Cylinder { sides: u32 },
    Sphere { slices: u32, stacks: u32 },
}

impl ShapeKind {
    pub fn build(self) -> MeshDescriptor {
        match self {
            ShapeKind::Plane => plane(),
            ShapeKind::Cube => cube(),
            ShapeKind::Pyramid => pyramid(),
            ShapeKind::Cylinder { sides } => cylinder(sides),
            ShapeKind::Sphere { slices, stacks } => sphere(slices, stacks),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ShapeKind::Plane => "plane",
            ShapeKind::Cube => "cube",
            ShapeKind::Pyramid => "pyramid",
            ShapeKind::Cylinder { .. } => "cylinder",
            ShapeKind::Sphere { .. } => "sphere",
        }
    }
}

struct ShapeBuilder {
    vertices: Vec<f32>,
    indices: Vec<u32>,
}

impl ShapeBuilder {
    fn with_capacity(vertices: usize, indices: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(vertices * AttributeCounts::FULL.stride()),
            indices: Vec::with_capacity(indices),
        }
    }

    fn vertex(&mut self, position: Vec3, uv: Vec2, normal: Vec3) -> u32 {
        let index = (self.vertices.len() / AttributeCounts::FULL.stride()) as u32;
        self.vertices.extend_from_slice(&position.to_array());
        self.vertices.extend_from_slice(&WHITE);
        self.vertices.extend_from_slice(&uv.to_array());
        self.vertices.extend_from_slice(&normal.to_array());
        index
    }

    fn triangle(&mut self, a: u32, b: u32, c: u32) {
        self.indices.extend_from_slice(&[a, b, c]);
    }

    fn finish(self) -> MeshDescriptor {
        MeshDescriptor::from_parts(self.vertices, self.indices, AttributeCounts::FULL)
    }
}

/// Unit square on `y = 0` spanning `x ∈ [0, 1]`, `z ∈ [-1, 0]`, facing up.
pub fn plane() -> MeshDescriptor {
    let mut shape = ShapeBuilder::with_capacity(4, 6);
    let up = Vec3::Y;
    shape.vertex(Vec3::new(0.0, 0.0, 0.0), Vec2::new(0.0, 1.0), up);
    shape.vertex(Vec3::new(1.0, 0.0, 0.0), Vec2::new(1.0, 1.0), up);
    shape.vertex(Vec3::new(1.0, 0.0, -1.0), Vec2::new(1.0, 0.0), up);
    shape.vertex(Vec3::new(0.0, 0.0, -1.0), Vec2::new(0.0, 0.0), up);
    shape.triangle(0, 1, 2);
    shape.triangle(2, 3, 0);
    shape.finish()
}

/// Corners of each cube face, counter-clockwise from outside, starting at
/// the face's lower-left corner.
#[rustfmt::skip]
const CUBE_FACES: [([[f32; 3]; 4], [f32; 3]); 6] = [
    // front
    ([[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]], [0.0, 0.0, 1.0]),
    // back
    ([[1.0, 0.0, -1.0], [0.0, 0.0, -1.0], [0.0, 1.0, -1.0], [1.0, 1.0, -1.0]], [0.0, 0.0, -1.0]),
    // left
    ([[0.0, 0.0, -1.0], [0.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 1.0, -1.0]], [-1.0, 0.0, 0.0]),
    // right
    ([[1.0, 0.0, 0.0], [1.0, 0.0, -1.0], [1.0, 1.0, -1.0], [1.0, 1.0, 0.0]], [1.0, 0.0, 0.0]),
    // bottom
    ([[0.0, 0.0, -1.0], [1.0, 0.0, -1.0], [1.0, 0.0, 0.0], [0.0, 0.0, 0.0]], [0.0, -1.0, 0.0]),
    // top
    ([[0.0, 1.0, 0.0], [1.0, 1.0, 0.0], [1.0, 1.0, -1.0], [0.0, 1.0, -1.0]], [0.0, 1.0, 0.0]),
];

const QUAD_UVS: [[f32; 2]; 4] = [[0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]];

/// Two triangles per quad, relative to the quad's first vertex.
const QUAD_OFFSETS: [u32; 6] = [0, 1, 2, 2, 3, 0];

/// Unit cube spanning `x, y ∈ [0, 1]`, `z ∈ [-1, 0]`.
///
/// Faces do not share vertices so each one keeps a flat normal and its own
/// texture coordinates.
pub fn cube() -> MeshDescriptor {
    let mut shape = ShapeBuilder::with_capacity(24, 36);
    for (corners, normal) in CUBE_FACES {
        let normal = Vec3::from_array(normal);
        for (corner, uv) in corners.iter().zip(QUAD_UVS) {
            shape.vertex(Vec3::from_array(*corner), Vec2::from_array(uv), normal);
        }
    }
    for face in 0..CUBE_FACES.len() as u32 {
        let base = face * 4;
        shape
            .indices
            .extend(QUAD_OFFSETS.iter().map(|offset| base + offset));
    }
    shape.finish()
}

/// Square pyramid on the plane footprint with its apex at `(0.5, 1, -0.5)`.
pub fn pyramid() -> MeshDescriptor {
    let mut shape = ShapeBuilder::with_capacity(16, 18);
    let base = [
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(1.0, 0.0, -1.0),
        Vec3::new(0.0, 0.0, -1.0),
    ];
    let apex = Vec3::new(0.5, 1.0, -0.5);

    // base, seen from below
    let down = Vec3::NEG_Y;
    let b0 = shape.vertex(base[3], Vec2::new(0.0, 1.0), down);
    let b1 = shape.vertex(base[2], Vec2::new(1.0, 1.0), down);
    let b2 = shape.vertex(base[1], Vec2::new(1.0, 0.0), down);
    let b3 = shape.vertex(base[0], Vec2::new(0.0, 0.0), down);
    shape.triangle(b0, b1, b2);
    shape.triangle(b2, b3, b0);

    for side in 0..4 {
        let a = base[side];
        let b = base[(side + 1) % 4];
        let normal = (b - a).cross(apex - a).normalize();
        let i0 = shape.vertex(a, Vec2::new(0.0, 1.0), normal);
        let i1 = shape.vertex(b, Vec2::new(1.0, 1.0), normal);
        let i2 = shape.vertex(apex, Vec2::new(0.5, 0.0), normal);
        shape.triangle(i0, i1, i2);
    }
    shape.finish()
}

/// Unit-radius cylinder standing on `y = 0` with height 1.
///
/// Layout: bottom cap (center + `sides + 1` rim), top cap (same), then the
/// side strip as `sides + 1` bottom/top pairs. The last rim and strip
/// samples repeat the first angle so the texture seam does not wrap.
pub fn cylinder(sides: u32) -> MeshDescriptor {
    let sides = sides.max(MIN_CYLINDER_SIDES);
    let rim = sides + 1;
    let mut shape = ShapeBuilder::with_capacity((4 * rim + 2) as usize, (12 * sides) as usize);

    let circle: Vec<(f32, f32)> = (0..=sides)
        .map(|step| {
            let angle = TAU * (step % sides) as f32 / sides as f32;
            (angle.cos(), angle.sin())
        })
        .collect();
    let u = |step: u32| step as f32 / sides as f32;

    for (height, normal, v) in [(0.0, Vec3::NEG_Y, 1.0), (1.0, Vec3::Y, 0.0)] {
        let center = shape.vertex(Vec3::new(0.0, height, 0.0), Vec2::splat(0.5), normal);
        for (step, (x, z)) in circle.iter().enumerate() {
            shape.vertex(Vec3::new(*x, height, *z), Vec2::new(u(step as u32), v), normal);
        }
        for step in 0..sides {
            let current = center + 1 + step;
            if normal.y < 0.0 {
                shape.triangle(center, current, current + 1);
            } else {
                shape.triangle(center, current + 1, current);
            }
        }
    }

    let strip = shape.vertices.len() as u32 / AttributeCounts::FULL.stride() as u32;
    for (step, (x, z)) in circle.iter().enumerate() {
        let normal = Vec3::new(*x, 0.0, *z);
        shape.vertex(Vec3::new(*x, 0.0, *z), Vec2::new(u(step as u32), 1.0), normal);
        shape.vertex(Vec3::new(*x, 1.0, *z), Vec2::new(u(step as u32), 0.0), normal);
    }
    for step in 0..sides {
        let bottom = strip + 2 * step;
        let top = bottom + 1;
        let next_bottom = bottom + 2;
        let next_top = bottom + 3;
        shape.triangle(bottom, top, next_bottom);
        shape.triangle(top, next_top, next_bottom);
    }

    shape.finish()
}

/// Unit UV-sphere centered on the origin.
///
/// Rows run from the north pole (`+90°`) to the south pole (`-90°`); each
/// row holds `slices + 1` vertices so the seam is duplicated. Positions are
/// used verbatim as normals.
pub fn sphere(slices: u32, stacks: u32) -> MeshDescriptor {
    let slices = slices.max(MIN_SPHERE_SLICES);
    let stacks = stacks.max(MIN_SPHERE_STACKS);
    let row = slices + 1;
    let mut shape =
        ShapeBuilder::with_capacity((row * (stacks + 1)) as usize, (6 * slices * stacks) as usize);

    for stack in 0..=stacks {
        let latitude = FRAC_PI_2 - PI * stack as f32 / stacks as f32;
        let (sin_lat, cos_lat) = latitude.sin_cos();
        for slice in 0..=slices {
            let longitude = TAU * (slice % slices) as f32 / slices as f32;
            let (sin_lon, cos_lon) = longitude.sin_cos();
            let point = Vec3::new(cos_lat * cos_lon, sin_lat, cos_lat * sin_lon);
            let uv = Vec2::new(
                slice as f32 / slices as f32,
                stack as f32 / stacks as f32,
            );
            shape.vertex(point, uv, point);
        }
    }

    let at = |stack: u32, slice: u32| stack * row + slice;
    for slice in 0..slices {
        // north pole fan
        shape.triangle(at(0, slice + 1), at(1, slice + 1), at(1, slice));
    }
    for stack in 1..stacks - 1 {
        for slice in 0..slices {
            shape.triangle(at(stack, slice), at(stack, slice + 1), at(stack + 1, slice));
            shape.triangle(
                at(stack, slice + 1),
                at(stack + 1, slice + 1),
                at(stack + 1, slice),
            );
        }
    }
    let last = stacks - 1;
    for slice in 0..slices {
        // south pole fan
        shape.triangle(at(last, slice), at(last, slice + 1), at(stacks, slice));
    }

    shape.finish()
}
