use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use log::{error, info, warn};
use pollster::block_on;
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{DeviceEvent, DeviceId, ElementState, KeyEvent, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{CursorGrabMode, Window, WindowId};

use crate::input::Key;
use crate::render::{ProjectionMode, RecordingBackend, RenderController, WgpuBackend};
use crate::scene::SceneDescription;

/// Longest frame step fed to the camera, so a stall does not teleport it.
const MAX_FRAME_TIME: f32 = 0.1;

/// Pixel scroll deltas are converted to lines at this rate.
const PIXELS_PER_LINE: f32 = 20.0;

/// Window system could not be brought up; callers may fall back to a
/// headless run.
#[derive(Debug)]
pub struct WindowInitError {
    message: String,
}

impl WindowInitError {
    fn from_panic(stage: &str, panic: Box<dyn Any + Send>) -> Self {
        Self {
            message: format!("failed to initialize {stage}: {}", panic_message(panic)),
        }
    }

    fn from_error(stage: &str, err: impl fmt::Display) -> Self {
        Self {
            message: format!("failed to initialize {stage}: {err}"),
        }
    }
}

impl fmt::Display for WindowInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for WindowInitError {}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    match panic.downcast::<String>() {
        Ok(msg) => *msg,
        Err(panic) => match panic.downcast::<&'static str>() {
            Ok(msg) => (*msg).to_string(),
            Err(_) => "unknown panic".into(),
        },
    }
}

/// Result of a headless run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSummary {
    pub draw_calls: usize,
    pub active_lights: usize,
}

/// Registers the scene against the recording backend and renders a single
/// frame.
pub fn run_headless(scene: &SceneDescription, projection: ProjectionMode) -> Result<FrameSummary> {
    let mut controller = RenderController::new(RecordingBackend::new(), scene.config.clone());
    scene.populate(&mut controller)?;
    controller.set_projection_mode(projection);
    let draw_calls = controller
        .render_frame()
        .context("failed to render frame")?;
    Ok(FrameSummary {
        draw_calls,
        active_lights: controller
            .lights()
            .len()
            .min(controller.config().light_capacity()),
    })
}

/// Opens a window and renders `scene` until it is closed.
pub fn run_interactive(scene: SceneDescription, projection: ProjectionMode) -> Result<()> {
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(|_| {}));
    let event_loop = panic::catch_unwind(AssertUnwindSafe(EventLoop::new));
    panic::set_hook(default_hook);
    let event_loop = event_loop
        .map_err(|panic| WindowInitError::from_panic("event loop", panic))?
        .map_err(|err| WindowInitError::from_error("event loop", err))?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(scene, projection);
    event_loop
        .run_app(&mut app)
        .context("event loop terminated abnormally")?;

    match app.last_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

struct App {
    scene: SceneDescription,
    projection: ProjectionMode,
    window: Option<Arc<Window>>,
    controller: Option<RenderController<WgpuBackend>>,
    last_frame: Option<Instant>,
    last_error: Option<anyhow::Error>,
}

impl App {
    fn new(scene: SceneDescription, projection: ProjectionMode) -> Self {
        Self {
            scene,
            projection,
            window: None,
            controller: None,
            last_frame: None,
            last_error: None,
        }
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let config = &self.scene.config;
        let attributes = Window::default_attributes()
            .with_title(config.title.clone())
            .with_inner_size(LogicalSize::new(config.width as f64, config.height as f64));
        let window = Arc::new(
            event_loop
                .create_window(attributes)
                .map_err(|err| WindowInitError::from_error("window", err))?,
        );
        capture_cursor(&window);

        let backend = block_on(WgpuBackend::new(Arc::clone(&window)))?;
        let mut controller = RenderController::new(backend, config.clone());
        self.scene.populate(&mut controller)?;
        controller.set_projection_mode(self.projection);

        self.window = Some(window);
        self.controller = Some(controller);
        Ok(())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        error!("{err:#}");
        self.last_error = Some(err);
        event_loop.exit();
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(controller) = self.controller.as_mut() else {
            return;
        };
        let now = Instant::now();
        let frame_time = self
            .last_frame
            .map(|last| (now - last).as_secs_f32().min(MAX_FRAME_TIME))
            .unwrap_or(0.0);
        self.last_frame = Some(now);

        controller.process_input(frame_time);
        if controller.is_closed() {
            event_loop.exit();
            return;
        }
        if let Err(err) = controller.render_frame() {
            self.fail(event_loop, err.into());
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.controller.is_some() {
            return;
        }
        if let Err(err) = self.init(event_loop) {
            self.fail(event_loop, err);
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                if let Some(controller) = self.controller.as_mut() {
                    controller.close();
                }
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(controller) = self.controller.as_mut() {
                    controller.resize(size.width, size.height);
                }
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state,
                        ..
                    },
                ..
            } => {
                let (Some(controller), Some(key)) = (self.controller.as_mut(), map_key(code))
                else {
                    return;
                };
                match state {
                    ElementState::Pressed => controller.input_mut().key_pressed(key),
                    ElementState::Released => controller.input_mut().key_released(key),
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(position) => position.y as f32 / PIXELS_PER_LINE,
                };
                if let Some(controller) = self.controller.as_mut() {
                    controller.input_mut().scrolled(lines);
                }
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _device_id: DeviceId, event: DeviceEvent) {
        if let (DeviceEvent::MouseMotion { delta }, Some(controller)) =
            (event, self.controller.as_mut())
        {
            controller
                .input_mut()
                .mouse_motion(delta.0 as f32, delta.1 as f32);
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(controller) = &self.controller {
            info!(
                "closing after rendering {} meshes; camera at {:.2}",
                controller.meshes().len(),
                controller.camera().position()
            );
        }
    }
}

/// Hides the cursor and locks it to the window so mouse motion drives the
/// camera. Platforms without locking fall back to confining it.
fn capture_cursor(window: &Window) {
    let grabbed = window
        .set_cursor_grab(CursorGrabMode::Locked)
        .or_else(|_| window.set_cursor_grab(CursorGrabMode::Confined));
    if let Err(err) = grabbed {
        warn!("cursor capture unavailable: {err}");
    }
    window.set_cursor_visible(false);
}

fn map_key(code: KeyCode) -> Option<Key> {
    Some(match code {
        KeyCode::KeyW => Key::W,
        KeyCode::KeyA => Key::A,
        KeyCode::KeyS => Key::S,
        KeyCode::KeyD => Key::D,
        KeyCode::KeyQ => Key::Q,
        KeyCode::KeyE => Key::E,
        KeyCode::KeyP => Key::P,
        KeyCode::Escape => Key::Escape,
        _ => return None,
    })
}
