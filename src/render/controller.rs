use std::collections::HashMap;
use std::path::PathBuf;

use glam::Mat4;
use log::{debug, info, warn};

use crate::camera::Camera;
use crate::config::RendererConfig;
use crate::error::RenderError;
use crate::input::{InputQueue, Key};
use crate::light::Light;
use crate::lighting::normal_matrix;
use crate::mesh::{AttributeSlot, MeshDescriptor, VertexLayout};
use crate::texture::load_image;

use super::uniforms::FrameMatrices;
use super::{
    DrawCommand, MeshBuffersId, MeshUniforms, MeshUpload, ProjectionMode, RenderBackend,
    ShaderKind, TextureId,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    /// Meshes and lights may still be added.
    Registering,
    Running,
    Closed,
}

/// A registered mesh: backend buffers plus the transform and material
/// captured when it was registered.
#[derive(Debug, Clone, PartialEq)]
pub struct GpuMesh {
    pub label: String,
    pub buffers: MeshBuffersId,
    pub vertex_count: u32,
    pub index_count: u32,
    pub model: Mat4,
    pub rotation: Mat4,
    pub normal_matrix: Mat4,
    pub shininess: f32,
    pub texture: Option<TextureId>,
    pub shader: ShaderKind,
    pub layout: VertexLayout,
}

/// Owns the scene content and drives one backend frame by frame.
pub struct RenderController<B: RenderBackend> {
    backend: B,
    config: RendererConfig,
    camera: Camera,
    lights: Vec<Light>,
    meshes: Vec<GpuMesh>,
    textures: HashMap<PathBuf, TextureId>,
    projection_mode: ProjectionMode,
    projection: Mat4,
    input: InputQueue,
    state: ControllerState,
    warned_extra_lights: bool,
}

impl<B: RenderBackend> RenderController<B> {
    pub fn new(backend: B, config: RendererConfig) -> Self {
        let camera = Camera::new();
        let projection_mode = ProjectionMode::default();
        let projection = projection_mode.matrix(camera.field_of_view(), &config);
        Self {
            backend,
            config,
            camera,
            lights: Vec::new(),
            meshes: Vec::new(),
            textures: HashMap::new(),
            projection_mode,
            projection,
            input: InputQueue::new(),
            state: ControllerState::Registering,
            warned_extra_lights: false,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Replaces the camera and refreshes the projection for its field of view.
    pub fn set_camera(&mut self, camera: Camera) {
        self.camera = camera;
        self.refresh_projection();
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    pub fn meshes(&self) -> &[GpuMesh] {
        &self.meshes
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn is_closed(&self) -> bool {
        self.state == ControllerState::Closed
    }

    pub fn close(&mut self) {
        self.state = ControllerState::Closed;
    }

    pub fn projection_mode(&self) -> ProjectionMode {
        self.projection_mode
    }

    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    /// Event callbacks push into this queue; it is drained by
    /// [`RenderController::process_input`].
    pub fn input_mut(&mut self) -> &mut InputQueue {
        &mut self.input
    }

    /// Uploads a mesh and appends it to the render list.
    pub fn register_mesh(
        &mut self,
        label: &str,
        mesh: &MeshDescriptor,
    ) -> Result<usize, RenderError> {
        if self.state != ControllerState::Registering {
            return Err(RenderError::RegistrationClosed("mesh"));
        }
        mesh.validate()?;

        let texture = match mesh.texture() {
            Some(path) => {
                if !mesh.counts.has(AttributeSlot::TexCoord) {
                    return Err(RenderError::InvalidMesh(format!(
                        "{label} has a texture but no texture coordinates"
                    )));
                }
                Some(self.texture_for(path.to_path_buf())?)
            }
            None => None,
        };
        let shader = match texture {
            Some(_) => ShaderKind::Textured,
            None => ShaderKind::Untextured,
        };
        let layout = VertexLayout::new(mesh.counts, texture.is_some());

        let buffers = self.backend.upload_mesh(&MeshUpload {
            label,
            vertices: &mesh.vertices,
            indices: &mesh.indices,
            layout,
            shader,
            texture,
        })?;

        let model = mesh.model();
        self.meshes.push(GpuMesh {
            label: label.to_string(),
            buffers,
            vertex_count: mesh.vertex_count() as u32,
            index_count: mesh.index_count() as u32,
            model,
            rotation: mesh.rotation(),
            normal_matrix: normal_matrix(model),
            shininess: mesh.shininess(),
            texture,
            shader,
            layout,
        });
        debug!(
            "registered mesh {label}: {} vertices, {} triangles, {} shader",
            mesh.vertex_count(),
            mesh.triangle_count(),
            shader.label()
        );
        Ok(self.meshes.len() - 1)
    }

    fn texture_for(&mut self, path: PathBuf) -> Result<TextureId, RenderError> {
        if let Some(id) = self.textures.get(&path) {
            return Ok(*id);
        }
        let image = load_image(&path)?;
        let id = self
            .backend
            .upload_texture(&image, &path.display().to_string())?;
        self.textures.insert(path, id);
        Ok(id)
    }

    pub fn register_light(&mut self, light: Light) -> Result<(), RenderError> {
        if self.state != ControllerState::Registering {
            return Err(RenderError::RegistrationClosed("light"));
        }
        self.lights.push(light);
        let capacity = self.config.light_capacity();
        if self.lights.len() > capacity && !self.warned_extra_lights {
            warn!(
                "only {capacity} lights are rendered; light {} and later are ignored",
                capacity + 1
            );
            self.warned_extra_lights = true;
        }
        Ok(())
    }

    pub fn set_projection_mode(&mut self, mode: ProjectionMode) {
        self.projection_mode = mode;
        self.refresh_projection();
    }

    fn refresh_projection(&mut self) {
        self.projection = self
            .projection_mode
            .matrix(self.camera.field_of_view(), &self.config);
    }

    /// Applies the input gathered since the previous frame.
    pub fn process_input(&mut self, frame_time: f32) {
        let frame = self.input.take_frame();
        for key in &frame.held {
            if let Some(direction) = key.movement() {
                self.camera.move_in(direction, frame_time);
            }
        }
        if frame.mouse_delta.x != 0.0 || frame.mouse_delta.y != 0.0 {
            // screen y grows downwards
            self.camera.rotate(frame.mouse_delta.x, -frame.mouse_delta.y);
        }
        if frame.scroll != 0.0 {
            self.camera.change_speed(frame.scroll);
        }
        if frame.was_pressed(Key::P) {
            self.set_projection_mode(self.projection_mode.toggled());
            info!("switched to {:?} projection", self.projection_mode);
        }
        if frame.was_pressed(Key::Escape) {
            self.close();
        }
    }

    /// Draws every registered mesh once. Returns the number of draws issued;
    /// zero when the frame was skipped or the controller is closed.
    pub fn render_frame(&mut self) -> Result<usize, RenderError> {
        match self.state {
            ControllerState::Closed => return Ok(0),
            ControllerState::Registering => {
                info!(
                    "rendering {} meshes with {} lights",
                    self.meshes.len(),
                    self.lights.len().min(self.config.light_capacity())
                );
                self.state = ControllerState::Running;
            }
            ControllerState::Running => {}
        }

        if !self.backend.begin_frame(self.config.clear_color)? {
            return Ok(0);
        }

        let frame = FrameMatrices {
            view: self.camera.view(),
            projection: self.projection,
            view_position: self.camera.position(),
        };
        let active_lights = &self.lights[..self.lights.len().min(self.config.light_capacity())];
        for mesh in &self.meshes {
            let uniforms = MeshUniforms::new(
                &frame,
                mesh.model,
                mesh.rotation,
                mesh.normal_matrix,
                mesh.shininess,
                active_lights,
            );
            self.backend.draw(&DrawCommand {
                mesh: mesh.buffers,
                shader: mesh.shader,
                texture: mesh.texture,
                index_count: mesh.index_count,
                uniforms,
            })?;
        }
        self.backend.present()?;
        Ok(self.meshes.len())
    }

    /// Reconfigures the drawing surface. The projection keeps the configured
    /// window aspect.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.backend.resize(width, height);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::headless::RecordingBackend;
    use crate::shapes;
    use glam::Vec3;
    use image::RgbImage;
    use tempfile::tempdir;

    fn controller() -> RenderController<RecordingBackend> {
        RenderController::new(RecordingBackend::new(), RendererConfig::default())
    }

    #[test]
    fn plane_without_lights_draws_untextured_with_dark_lights() {
        let mut controller = controller();
        controller
            .register_mesh("plane", &shapes::plane())
            .unwrap();

        assert_eq!(controller.render_frame().unwrap(), 1);
        let frames = controller.backend().frames();
        assert_eq!(frames.len(), 1);
        let draw = &frames[0].draws[0];
        assert_eq!(draw.shader, ShaderKind::Untextured);
        assert_eq!(draw.index_count, 6);
        assert!(draw.uniforms.lights.iter().all(|l| l.intensity() == 0.0));
    }

    #[test]
    fn default_descriptor_layout_is_accepted() {
        let mut controller = controller();
        #[rustfmt::skip]
        let vertices = vec![
            0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0,
            1.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0,
            0.0, 1.0, 0.0, 1.0, 1.0, 1.0, 1.0,
        ];
        let mesh = MeshDescriptor::from_parts(vertices, vec![0, 1, 2], Default::default());
        controller.register_mesh("triangle", &mesh).unwrap();
        let gpu = &controller.meshes()[0];
        assert_eq!(gpu.layout.stride_bytes(), 28);
        assert_eq!(gpu.vertex_count, 3);
    }

    #[test]
    fn registration_closes_after_first_frame() {
        let mut controller = controller();
        controller.register_mesh("cube", &shapes::cube()).unwrap();
        controller.render_frame().unwrap();
        assert_eq!(controller.state(), ControllerState::Running);

        let err = controller
            .register_mesh("late", &shapes::cube())
            .unwrap_err();
        assert!(matches!(err, RenderError::RegistrationClosed("mesh")));
        let err = controller.register_light(Light::default()).unwrap_err();
        assert!(matches!(err, RenderError::RegistrationClosed("light")));
    }

    #[test]
    fn invalid_mesh_is_rejected_before_upload() {
        let mut controller = controller();
        let mut mesh = shapes::plane();
        mesh.indices.push(99);
        mesh.indices.extend([0, 1]);
        assert!(matches!(
            controller.register_mesh("broken", &mesh),
            Err(RenderError::InvalidMesh(_))
        ));
        assert!(controller.backend().uploads().is_empty());
    }

    #[test]
    fn textured_mesh_uploads_texture_once() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("checker.png");
        RgbImage::from_pixel(2, 2, image::Rgb([200, 100, 50]))
            .save(&path)
            .unwrap();

        let mut controller = controller();
        let mut first = shapes::cube();
        first.set_texture(&path);
        let mut second = shapes::plane();
        second.set_texture(&path);
        controller.register_mesh("box", &first).unwrap();
        controller.register_mesh("floor", &second).unwrap();

        assert_eq!(controller.backend().textures().len(), 1);
        let uploads = controller.backend().uploads();
        assert!(uploads.iter().all(|u| u.shader == ShaderKind::Textured));
        assert!(uploads.iter().all(|u| u.layout.bind_uv));

        controller.render_frame().unwrap();
        let draws = &controller.backend().frames()[0].draws;
        assert_eq!(draws[0].texture, draws[1].texture);
        assert!(draws[0].texture.is_some());
    }

    #[test]
    fn missing_texture_fails_registration() {
        let mut controller = controller();
        let mut mesh = shapes::cube();
        mesh.set_texture("no/such/texture.png");
        assert!(matches!(
            controller.register_mesh("box", &mesh),
            Err(RenderError::TextureLoad { .. })
        ));
        assert!(controller.meshes().is_empty());
    }

    #[test]
    fn render_order_follows_registration() {
        let mut controller = controller();
        controller.register_mesh("a", &shapes::plane()).unwrap();
        controller.register_mesh("b", &shapes::cube()).unwrap();
        controller.register_mesh("c", &shapes::sphere(8, 4)).unwrap();
        controller.render_frame().unwrap();
        let draws: Vec<_> = controller.backend().frames()[0]
            .draws
            .iter()
            .map(|d| d.mesh)
            .collect();
        let registered: Vec<_> = controller.meshes().iter().map(|m| m.buffers).collect();
        assert_eq!(draws, registered);
    }

    #[test]
    fn transform_is_captured_at_registration() {
        let mut controller = controller();
        let mut mesh = shapes::cube();
        mesh.set_translation(1.0, 2.0, 3.0).set_shininess(0.7);
        controller.register_mesh("box", &mesh).unwrap();
        mesh.set_translation(9.0, 9.0, 9.0);

        controller.render_frame().unwrap();
        let uniforms = controller.backend().frames()[0].draws[0].uniforms;
        assert_eq!(uniforms.model[3], [1.0, 2.0, 3.0, 1.0]);
        assert_eq!(uniforms.shininess(), 0.7);
    }

    #[test]
    fn third_light_is_stored_but_not_uploaded() {
        let mut controller = controller();
        for intensity in [1.0, 2.0, 3.0] {
            controller
                .register_light(Light::new(Vec3::Y, Vec3::ONE, intensity))
                .unwrap();
        }
        controller.register_mesh("cube", &shapes::cube()).unwrap();
        controller.render_frame().unwrap();
        assert_eq!(controller.lights().len(), 3);
        let uniforms = controller.backend().frames()[0].draws[0].uniforms;
        assert_eq!(uniforms.lights[0].intensity(), 1.0);
        assert_eq!(uniforms.lights[1].intensity(), 2.0);
    }

    #[test]
    fn input_is_consumed_once_per_frame() {
        let mut controller = controller();
        controller.input_mut().key_pressed(Key::W);
        controller.input_mut().mouse_motion(10.0, 0.0);
        let look = controller.camera().look_direction();

        controller.process_input(0.5);
        let moved = controller.camera().position();
        assert!(moved.z < 0.0);
        assert_ne!(controller.camera().look_direction(), look);

        // W is still held, but the mouse delta was already applied
        let look = controller.camera().look_direction();
        controller.process_input(0.0);
        assert_eq!(controller.camera().look_direction(), look);
        assert_eq!(controller.camera().position(), moved);
    }

    #[test]
    fn mouse_up_looks_up() {
        let mut controller = controller();
        controller.input_mut().mouse_motion(0.0, -50.0);
        controller.process_input(0.016);
        assert!(controller.camera().pitch() > 0.0);
    }

    #[test]
    fn p_toggles_projection_and_escape_closes() {
        let mut controller = controller();
        let perspective = controller.projection();
        controller.input_mut().key_pressed(Key::P);
        controller.process_input(0.016);
        assert_eq!(controller.projection_mode(), ProjectionMode::Orthographic);
        assert_ne!(controller.projection(), perspective);

        // holding P does not toggle again
        controller.process_input(0.016);
        assert_eq!(controller.projection_mode(), ProjectionMode::Orthographic);

        controller.input_mut().key_pressed(Key::Escape);
        controller.process_input(0.016);
        assert!(controller.is_closed());
        assert_eq!(controller.render_frame().unwrap(), 0);
    }

    #[test]
    fn scroll_changes_speed() {
        let mut controller = controller();
        let before = controller.camera().pan_speed();
        controller.input_mut().scrolled(2.0);
        controller.process_input(0.016);
        assert!(controller.camera().pan_speed() > before);
    }

    #[test]
    fn resize_keeps_projection() {
        let mut controller = controller();
        let projection = controller.projection();
        controller.resize(640, 640);
        assert_eq!(controller.projection(), projection);
        assert_eq!(controller.backend().size(), (640, 640));
        controller.resize(0, 10);
        assert_eq!(controller.backend().size(), (640, 640));
    }

    #[test]
    fn skipped_frame_draws_nothing() {
        let mut backend = RecordingBackend::new();
        backend.skip_next_frame();
        let mut controller = RenderController::new(backend, RendererConfig::default());
        controller.register_mesh("cube", &shapes::cube()).unwrap();
        assert_eq!(controller.render_frame().unwrap(), 0);
        assert_eq!(controller.render_frame().unwrap(), 1);
    }
}
