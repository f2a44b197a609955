//! Real-time scene renderer.
//!
//! Procedural meshes are uploaded once, then drawn every frame from a
//! free-fly camera with two-light Phong shading. The GPU sits behind
//! [`render::RenderBackend`] so scene setup and the frame loop can run
//! against the in-memory [`RecordingBackend`] in tests and headless tools.

pub mod app;
pub mod camera;
pub mod config;
pub mod error;
pub mod input;
pub mod light;
pub mod lighting;
pub mod mesh;
pub mod render;
pub mod scene;
pub mod shapes;
pub mod texture;

pub use app::{run_headless, run_interactive, FrameSummary, WindowInitError};
pub use camera::{Camera, CameraDirection};
pub use config::RendererConfig;
pub use error::RenderError;
pub use input::{InputQueue, Key};
pub use light::Light;
pub use mesh::{AttributeCounts, AttributeSlot, MeshDescriptor, VertexLayout};
pub use render::{
    ProjectionMode, RecordingBackend, RenderBackend, RenderController, ShaderKind, WgpuBackend,
};
pub use scene::{MeshSpec, SceneDescription};
pub use shapes::ShapeKind;
pub use texture::{load_image, DecodedImage};
