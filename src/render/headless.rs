//! In-memory backend used for `--summary-only` runs and tests.

use glam::Vec4;

use crate::error::RenderError;
use crate::mesh::VertexLayout;
use crate::texture::DecodedImage;

use super::{DrawCommand, MeshBuffersId, MeshUpload, RenderBackend, ShaderKind, TextureId};

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedUpload {
    pub label: String,
    pub vertex_floats: usize,
    pub index_count: usize,
    pub layout: VertexLayout,
    pub shader: ShaderKind,
    pub texture: Option<TextureId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedTexture {
    pub label: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedFrame {
    pub clear_color: Vec4,
    pub draws: Vec<DrawCommand>,
}

/// Records every backend call instead of talking to a GPU.
#[derive(Debug)]
pub struct RecordingBackend {
    uploads: Vec<RecordedUpload>,
    textures: Vec<RecordedTexture>,
    frames: Vec<RecordedFrame>,
    current: Option<RecordedFrame>,
    size: (u32, u32),
    skip_next: bool,
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self {
            uploads: Vec::new(),
            textures: Vec::new(),
            frames: Vec::new(),
            current: None,
            size: (1280, 720),
            skip_next: false,
        }
    }
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn uploads(&self) -> &[RecordedUpload] {
        &self.uploads
    }

    pub fn textures(&self) -> &[RecordedTexture] {
        &self.textures
    }

    /// Presented frames, oldest first.
    pub fn frames(&self) -> &[RecordedFrame] {
        &self.frames
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    /// Makes the next `begin_frame` report a lost surface.
    pub fn skip_next_frame(&mut self) {
        self.skip_next = true;
    }
}

impl RenderBackend for RecordingBackend {
    fn upload_mesh(&mut self, mesh: &MeshUpload<'_>) -> Result<MeshBuffersId, RenderError> {
        self.uploads.push(RecordedUpload {
            label: mesh.label.to_string(),
            vertex_floats: mesh.vertices.len(),
            index_count: mesh.indices.len(),
            layout: mesh.layout,
            shader: mesh.shader,
            texture: mesh.texture,
        });
        Ok(MeshBuffersId(self.uploads.len() - 1))
    }

    fn upload_texture(
        &mut self,
        image: &DecodedImage,
        label: &str,
    ) -> Result<TextureId, RenderError> {
        self.textures.push(RecordedTexture {
            label: label.to_string(),
            width: image.width,
            height: image.height,
        });
        Ok(TextureId(self.textures.len() - 1))
    }

    fn begin_frame(&mut self, clear_color: Vec4) -> Result<bool, RenderError> {
        if std::mem::take(&mut self.skip_next) {
            return Ok(false);
        }
        self.current = Some(RecordedFrame {
            clear_color,
            draws: Vec::new(),
        });
        Ok(true)
    }

    fn draw(&mut self, command: &DrawCommand) -> Result<(), RenderError> {
        let frame = self
            .current
            .as_mut()
            .ok_or_else(|| RenderError::Surface("draw outside of a frame".into()))?;
        frame.draws.push(*command);
        Ok(())
    }

    fn present(&mut self) -> Result<(), RenderError> {
        let frame = self
            .current
            .take()
            .ok_or_else(|| RenderError::Surface("present without a frame".into()))?;
        self.frames.push(frame);
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.size = (width, height);
    }
}
