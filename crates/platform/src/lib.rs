//! Platform layer: window, event loop and input for the model viewer.
//!
//! The model is loaded before the event loop starts; GPU state is created on
//! the first `resumed` callback, once a window exists.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use asset::{LoadOptions, Mesh};
use corelib::camera::{CameraController, FlyCamera, MoveInput, OrbitCamera, Projection};
use corelib::{Vec2, Vec3};
use renderer::{FrameParams, GpuState, ShadingMode};
use winit::{
    application::ApplicationHandler,
    dpi::{PhysicalPosition, PhysicalSize},
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

/// Which camera drives the view.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CameraMode {
    #[default]
    Orbit,
    Fly,
}

/// Everything the viewer needs from the command line.
#[derive(Clone, Debug)]
pub struct ViewerConfig {
    /// Path to the `.obj` file. Material and texture paths resolve
    /// against its directory.
    pub model: PathBuf,
    pub backends: wgpu::Backends,
    pub width: u32,
    pub height: u32,
    pub show_fps: bool,
    pub camera: CameraMode,
    pub load: LoadOptions,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            model: PathBuf::from("assets/sponza/sponza.obj"),
            backends: wgpu::Backends::all(),
            width: 1280,
            height: 720,
            show_fps: false,
            camera: CameraMode::Orbit,
            load: LoadOptions::default(),
        }
    }
}

/// Load the model named by `config` and show it until the window closes.
pub fn run_viewer(config: ViewerConfig) -> Result<()> {
    let directory = config
        .model
        .parent()
        .map(PathBuf::from)
        .unwrap_or_default();
    let filename = config
        .model
        .file_name()
        .and_then(|f| f.to_str())
        .with_context(|| format!("Invalid model path {:?}", config.model))?;

    let started = Instant::now();
    let mesh = asset::load_model(&directory, filename, &config.load)
        .with_context(|| format!("Failed to load {:?}", config.model))?;
    log::info!(
        "Loaded {:?} in {:.2?}: {} triangles, {} parts, {} materials",
        config.model,
        started.elapsed(),
        mesh.triangle_count(),
        mesh.parts.len(),
        mesh.materials.len()
    );

    let event_loop = EventLoop::new().context("Failed to create event loop")?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = ViewerApp::new(config, mesh);
    event_loop
        .run_app(&mut app)
        .map_err(|e| anyhow::anyhow!("Event loop error: {e:?}"))?;

    match app.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Orbit and fly cameras placed to see the whole model.
fn frame_model(mesh: &Mesh) -> (OrbitCamera, FlyCamera, Projection) {
    let (lo, hi) = mesh
        .bounds()
        .map(|(lo, hi)| (Vec3::from(lo), Vec3::from(hi)))
        .unwrap_or((Vec3::splat(-1.0), Vec3::splat(1.0)));
    let center = (lo + hi) * 0.5;
    let radius = ((hi - lo).length() * 0.5).max(1e-3);

    let orbit = OrbitCamera::new(center, radius * 2.0);
    let fly = FlyCamera::new(center, radius * 0.25);
    let projection = Projection::new(60f32.to_radians(), radius * 1e-3, radius * 10.0, 1.0);
    (orbit, fly, projection)
}

struct FpsCounter {
    frames: u32,
    since: Instant,
}

impl FpsCounter {
    const PERIOD: Duration = Duration::from_secs(10);

    fn new() -> Self {
        Self {
            frames: 0,
            since: Instant::now(),
        }
    }

    fn tick(&mut self) {
        self.frames += 1;
        let elapsed = self.since.elapsed();
        if elapsed >= Self::PERIOD {
            let secs = elapsed.as_secs_f32();
            log::info!(
                "{:.1} fps ({:.2} ms/frame)",
                self.frames as f32 / secs,
                secs * 1000.0 / self.frames as f32
            );
            self.frames = 0;
            self.since = Instant::now();
        }
    }
}

struct ViewerApp {
    config: ViewerConfig,
    mesh: Mesh,
    window: Option<Arc<Window>>,
    gpu: Option<GpuState>,
    error: Option<anyhow::Error>,

    orbit: OrbitCamera,
    fly: FlyCamera,
    projection: Projection,
    camera: CameraMode,

    mode: ShadingMode,
    isolate: Option<usize>,
    bump_mapping: bool,

    dragging: bool,
    cursor: Option<PhysicalPosition<f64>>,
    held: HashSet<KeyCode>,
    last_frame: Instant,
    fps: Option<FpsCounter>,
}

impl ViewerApp {
    fn new(config: ViewerConfig, mesh: Mesh) -> Self {
        let (orbit, fly, projection) = frame_model(&mesh);
        Self {
            camera: config.camera,
            bump_mapping: config.load.bump_mapping,
            fps: config.show_fps.then(FpsCounter::new),
            config,
            mesh,
            window: None,
            gpu: None,
            error: None,
            orbit,
            fly,
            projection,
            mode: ShadingMode::Material,
            isolate: None,
            dragging: false,
            cursor: None,
            held: HashSet::new(),
            last_frame: Instant::now(),
        }
    }

    fn controller(&mut self) -> &mut dyn CameraController {
        match self.camera {
            CameraMode::Orbit => &mut self.orbit,
            CameraMode::Fly => &mut self.fly,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("{error:#}");
        self.error = Some(error);
        event_loop.exit();
    }

    fn move_input(&self) -> MoveInput {
        let axis = |pos: KeyCode, neg: KeyCode| {
            self.held.contains(&pos) as i32 as f32 - self.held.contains(&neg) as i32 as f32
        };
        MoveInput(Vec3::new(
            axis(KeyCode::KeyW, KeyCode::KeyS),
            axis(KeyCode::Space, KeyCode::ShiftLeft),
            axis(KeyCode::KeyD, KeyCode::KeyA),
        ))
    }

    fn key_pressed(&mut self, event_loop: &ActiveEventLoop, key: KeyCode) {
        match key {
            KeyCode::Escape => {
                log::info!("Escape pressed. Exiting event loop.");
                event_loop.exit();
            }
            KeyCode::KeyC => {
                self.camera = match self.camera {
                    CameraMode::Orbit => CameraMode::Fly,
                    CameraMode::Fly => CameraMode::Orbit,
                };
                log::info!("Camera: {:?}", self.camera);
            }
            KeyCode::Digit1 | KeyCode::Digit2 | KeyCode::Digit3 | KeyCode::Digit4 => {
                self.mode = match key {
                    KeyCode::Digit1 => ShadingMode::Material,
                    KeyCode::Digit2 => ShadingMode::TexCoord,
                    KeyCode::Digit3 => ShadingMode::Normal,
                    _ => ShadingMode::Flat,
                };
                log::info!("Shading: {:?}", self.mode);
            }
            KeyCode::KeyP => {
                let parts = self.gpu.as_ref().map_or(0, GpuState::part_count);
                self.isolate = next_isolated(self.isolate, parts);
                match self.isolate {
                    Some(i) => log::info!("Showing part {} of {}", i + 1, parts),
                    None => log::info!("Showing all parts"),
                }
            }
            KeyCode::KeyB => {
                self.bump_mapping = !self.bump_mapping;
                log::info!("Bump mapping: {}", self.bump_mapping);
            }
            _ => {}
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let now = Instant::now();
        let dt = (now - self.last_frame).as_secs_f32();
        self.last_frame = now;

        let input = self.move_input();
        let camera = self.controller();
        camera.update(dt, input);
        let (view, eye) = (camera.view(), camera.eye());

        let Some(gpu) = self.gpu.as_mut() else {
            return;
        };
        let params = FrameParams {
            view,
            proj: self.projection.with_aspect(gpu.aspect()).matrix(),
            eye,
            mode: self.mode,
            isolate: self.isolate,
            bump_mapping: self.bump_mapping,
        };
        match gpu.render(&params) {
            Ok(()) => {
                if let Some(fps) = self.fps.as_mut() {
                    fps.tick();
                }
            }
            Err(e) if GpuState::is_surface_lost(&e) => {
                log::warn!("Surface lost/outdated. Recreating…");
                gpu.recreate_surface();
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                self.fail(event_loop, anyhow::anyhow!("Out of GPU memory"));
            }
            Err(e) => log::warn!("Frame skipped: {e:?}"),
        }
    }
}

/// Cycle all → 0 → 1 → … → last → all.
fn next_isolated(current: Option<usize>, parts: usize) -> Option<usize> {
    match current {
        None if parts > 0 => Some(0),
        Some(i) if i + 1 < parts => Some(i + 1),
        _ => None,
    }
}

impl ApplicationHandler for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        let title = format!("ObjView - {}", self.config.model.display());
        let attrs = Window::default_attributes()
            .with_title(title)
            .with_inner_size(PhysicalSize::new(self.config.width, self.config.height));
        let window = match event_loop.create_window(attrs) {
            Ok(w) => Arc::new(w),
            Err(e) => return self.fail(event_loop, anyhow::Error::new(e).context("Failed to create window")),
        };
        log::info!(
            "Window created: {}x{}",
            window.inner_size().width,
            window.inner_size().height
        );

        match pollster::block_on(GpuState::new(window.clone(), self.config.backends, &self.mesh)) {
            Ok(gpu) => self.gpu = Some(gpu),
            Err(e) => return self.fail(event_loop, e),
        }
        self.window = Some(window);
        self.last_frame = Instant::now();
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested. Exiting event loop.");
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                if let Some(gpu) = self.gpu.as_mut() {
                    gpu.resize(new_size.width, new_size.height);
                }
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            WindowEvent::KeyboardInput { event, .. } => {
                let PhysicalKey::Code(key) = event.physical_key else {
                    return;
                };
                match event.state {
                    ElementState::Pressed => {
                        if self.held.insert(key) {
                            self.key_pressed(event_loop, key);
                        }
                    }
                    ElementState::Released => {
                        self.held.remove(&key);
                    }
                }
            }
            WindowEvent::MouseInput {
                button: MouseButton::Left,
                state,
                ..
            } => {
                self.dragging = state == ElementState::Pressed;
            }
            WindowEvent::CursorMoved { position, .. } => {
                if let (true, Some(last)) = (self.dragging, self.cursor) {
                    let delta = Vec2::new(
                        (position.x - last.x) as f32,
                        (position.y - last.y) as f32,
                    );
                    self.controller().mouse_moved(delta);
                }
                self.cursor = Some(position);
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let steps = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(p) => (p.y / 50.0) as f32,
                };
                self.controller().scrolled(steps);
            }
            WindowEvent::Focused(false) => {
                self.held.clear();
                self.dragging = false;
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use asset::Vertex;

    #[test]
    fn isolation_cycles_through_parts() {
        let mut cur = None;
        let mut seen = Vec::new();
        for _ in 0..4 {
            cur = next_isolated(cur, 3);
            seen.push(cur);
        }
        assert_eq!(seen, vec![Some(0), Some(1), Some(2), None]);
        assert_eq!(next_isolated(None, 0), None);
    }

    #[test]
    fn framing_centers_on_bounds() {
        let mesh = Mesh {
            vertices: vec![
                Vertex::new([0.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0; 2]),
                Vertex::new([4.0, 2.0, 0.0], [0.0, 0.0, 1.0], [0.0; 2]),
            ],
            ..Default::default()
        };
        let (orbit, fly, proj) = frame_model(&mesh);
        assert_eq!(orbit.center, Vec3::new(2.0, 1.0, 0.0));
        assert_eq!(fly.position, orbit.center);
        assert!(orbit.distance > (Vec3::new(4.0, 2.0, 0.0).length() * 0.5));
        assert!(proj.z_near > 0.0 && proj.z_far > orbit.distance);
    }

    #[test]
    fn empty_mesh_still_frames() {
        let (orbit, _, proj) = frame_model(&Mesh::default());
        assert_eq!(orbit.center, Vec3::ZERO);
        assert!(proj.matrix().is_finite());
    }
}
