use glam::{Mat4, Vec4};

use crate::config::RendererConfig;
use crate::error::RenderError;
use crate::mesh::VertexLayout;
use crate::texture::DecodedImage;

pub mod controller;
pub mod headless;
pub mod native;
pub mod shader;
pub mod uniforms;

pub use controller::{ControllerState, GpuMesh, RenderController};
pub use headless::RecordingBackend;
pub use native::WgpuBackend;
pub use uniforms::{LightUniform, MeshUniforms};

/// Handle to vertex and index buffers owned by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshBuffersId(pub usize);

/// Handle to an uploaded texture owned by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub usize);

/// Fragment program variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderKind {
    Textured,
    Untextured,
}

impl ShaderKind {
    pub fn label(self) -> &'static str {
        match self {
            ShaderKind::Textured => "textured",
            ShaderKind::Untextured => "untextured",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ProjectionMode {
    #[default]
    Perspective,
    Orthographic,
}

impl ProjectionMode {
    pub fn toggled(self) -> Self {
        match self {
            ProjectionMode::Perspective => ProjectionMode::Orthographic,
            ProjectionMode::Orthographic => ProjectionMode::Perspective,
        }
    }

    /// Projection for the configured window aspect and the given vertical
    /// field of view in degrees. Depth maps to `[0, 1]`.
    pub fn matrix(self, field_of_view: f32, config: &RendererConfig) -> Mat4 {
        let aspect = config.aspect();
        match self {
            ProjectionMode::Perspective => Mat4::perspective_rh(
                field_of_view.to_radians(),
                aspect,
                config.near,
                config.far,
            ),
            ProjectionMode::Orthographic => {
                let half_height = config.ortho_half_height;
                let half_width = half_height * aspect;
                Mat4::orthographic_rh(
                    -half_width,
                    half_width,
                    -half_height,
                    half_height,
                    config.near,
                    config.far,
                )
            }
        }
    }
}

/// Geometry handed to a backend once, at registration.
#[derive(Debug, Clone, Copy)]
pub struct MeshUpload<'a> {
    pub label: &'a str,
    pub vertices: &'a [f32],
    pub indices: &'a [u32],
    pub layout: VertexLayout,
    pub shader: ShaderKind,
    pub texture: Option<TextureId>,
}

/// One indexed draw with its per-mesh uniforms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawCommand {
    pub mesh: MeshBuffersId,
    pub shader: ShaderKind,
    pub texture: Option<TextureId>,
    pub index_count: u32,
    pub uniforms: MeshUniforms,
}

/// GPU side of the renderer.
///
/// A frame is `begin_frame`, any number of `draw` calls, then `present`.
pub trait RenderBackend {
    /// Uploads vertex and index data and prepares the pipeline the mesh is
    /// drawn with. Shader failures surface here rather than mid-frame.
    fn upload_mesh(&mut self, mesh: &MeshUpload<'_>) -> Result<MeshBuffersId, RenderError>;

    fn upload_texture(
        &mut self,
        image: &DecodedImage,
        label: &str,
    ) -> Result<TextureId, RenderError>;

    /// Clears color and depth. Returns `false` when the frame must be
    /// skipped, for example while the surface is being reconfigured.
    fn begin_frame(&mut self, clear_color: Vec4) -> Result<bool, RenderError>;

    fn draw(&mut self, command: &DrawCommand) -> Result<(), RenderError>;

    fn present(&mut self) -> Result<(), RenderError>;

    fn resize(&mut self, width: u32, height: u32);
}
